// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![doc = include_str!("../README.md")]

pub mod certificate;
pub use certificate::{
    CertificateValidation, HealthCertificate, SignatureValidation,
};

mod error;
pub use error::Error;

mod formats;

mod parser;
pub use parser::{parse, parse_with, parse_with_tracker};

pub use hcert_status_tracker::StatusTracker;

mod recovery;
pub use recovery::RecoveryCertificate;

mod test_certificate;
pub use test_certificate::{TestCertificate, TestResult};

mod trust_store;
pub use trust_store::TrustStore;

mod vaccination;
pub use vaccination::{VaccinationCertificate, VaccinationState};
