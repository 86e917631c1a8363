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

//! The health certificate data model shared by all wire formats.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{RecoveryCertificate, TestCertificate, VaccinationCertificate};

/// Result of attempting to verify the cryptographic signature of a
/// certificate.
///
/// [`Unchecked`] and [`Unknown`] must never be reported as [`Valid`]:
/// the ordering of trust is strict.
///
/// [`Valid`]: Self::Valid
/// [`Unknown`]: Self::Unknown
/// [`Unchecked`]: Self::Unchecked
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum SignatureValidation {
    /// The signature is valid.
    Valid,

    /// The signature is invalid.
    Invalid,

    /// Signature verification was attempted but didn't yield a result, e.g.
    /// due to a missing certificate of the signing entity.
    #[default]
    Unknown,

    /// Signature verification was not attempted, e.g. as it's not
    /// implemented for the specific certificate type.
    Unchecked,
}

/// Overall validation state of a certificate.
///
/// Unlike [`SignatureValidation`] this also folds in temporal and structural
/// business rules (expiry, dose completeness). It is a pure function of the
/// certificate's fields plus the current time, recomputed on every read.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CertificateValidation {
    /// The certificate is valid.
    Valid,

    /// The certificate is valid but provides only limited use, e.g. a
    /// partial vaccination or an unverifiable signature.
    Partial,

    /// The certificate is invalid.
    Invalid,

    /// No conclusive result could be computed.
    Unknown,
}

/// A decoded health certificate: exactly one of three kinds.
///
/// Deliberately not `#[non_exhaustive]`: consumers are expected to match
/// all three kinds exhaustively.
#[derive(Clone, Debug, Serialize)]
pub enum HealthCertificate {
    /// A vaccination certificate.
    Vaccination(VaccinationCertificate),

    /// A test certificate.
    Test(TestCertificate),

    /// A recovery certificate.
    Recovery(RecoveryCertificate),
}

impl HealthCertificate {
    /// The person's full name.
    pub fn name(&self) -> &str {
        match self {
            Self::Vaccination(cert) => &cert.name,
            Self::Test(cert) => &cert.name,
            Self::Recovery(cert) => &cert.name,
        }
    }

    /// The entity that issued this certificate.
    pub fn certificate_issuer(&self) -> &str {
        match self {
            Self::Vaccination(cert) => &cert.certificate_issuer,
            Self::Test(cert) => &cert.certificate_issuer,
            Self::Recovery(cert) => &cert.certificate_issuer,
        }
    }

    /// The unique identifier of this certificate.
    pub fn certificate_id(&self) -> &str {
        match self {
            Self::Vaccination(cert) => &cert.certificate_id,
            Self::Test(cert) => &cert.certificate_id,
            Self::Recovery(cert) => &cert.certificate_id,
        }
    }

    /// When this certificate was issued.
    pub fn certificate_issue_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Vaccination(cert) => cert.certificate_issue_date,
            Self::Test(cert) => cert.certificate_issue_date,
            Self::Recovery(cert) => cert.certificate_issue_date,
        }
    }

    /// When this certificate expires.
    pub fn certificate_expiry_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Vaccination(cert) => cert.certificate_expiry_date,
            Self::Test(cert) => cert.certificate_expiry_date,
            Self::Recovery(cert) => cert.certificate_expiry_date,
        }
    }

    /// The exact bytes as scanned, for audit and round-tripping.
    pub fn raw_data(&self) -> &[u8] {
        match self {
            Self::Vaccination(cert) => &cert.raw_data,
            Self::Test(cert) => &cert.raw_data,
            Self::Recovery(cert) => &cert.raw_data,
        }
    }

    pub(crate) fn set_raw_data(&mut self, raw_data: Vec<u8>) {
        match self {
            Self::Vaccination(cert) => cert.raw_data = raw_data,
            Self::Test(cert) => cert.raw_data = raw_data,
            Self::Recovery(cert) => cert.raw_data = raw_data,
        }
    }

    /// Result of verifying this certificate's signature.
    pub fn signature_state(&self) -> SignatureValidation {
        match self {
            Self::Vaccination(cert) => cert.signature_state,
            Self::Test(cert) => cert.signature_state,
            Self::Recovery(cert) => cert.signature_state,
        }
    }

    /// The overall validation state, relative to the current time.
    pub fn validation_state(&self) -> CertificateValidation {
        self.validation_state_at(Utc::now())
    }

    /// The overall validation state, relative to `now`.
    pub fn validation_state_at(&self, now: DateTime<Utc>) -> CertificateValidation {
        match self {
            Self::Vaccination(cert) => cert.validation_state_at(now),
            Self::Test(cert) => cert.validation_state_at(now),
            Self::Recovery(cert) => cert.validation_state_at(now),
        }
    }

    /// Returns the last date until this certificate is relevant.
    ///
    /// That is, past the returned date the certificate is considered expired
    /// and thus provides no or only very limited use anymore. This is useful
    /// for sorting a set of certificates in a meaningful way.
    pub fn relevant_until(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Vaccination(cert) => cert.relevant_until(),
            Self::Test(cert) => cert.relevant_until(),
            Self::Recovery(cert) => cert.relevant_until(),
        }
    }
}
