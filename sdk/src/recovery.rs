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

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{CertificateValidation, SignatureValidation};

/// A recovery certificate.
#[derive(Clone, Debug, Default, Serialize)]
#[non_exhaustive]
pub struct RecoveryCertificate {
    /// Full name of the recovered person.
    pub name: String,

    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,

    /// Date of the first positive test.
    pub date_of_positive_test: Option<NaiveDate>,

    /// Begin of the validity window of this certificate.
    pub valid_from: Option<NaiveDate>,

    /// End of the validity window of this certificate.
    pub valid_until: Option<NaiveDate>,

    /// Display name of the disease recovered from.
    pub disease: String,

    /// The entity that issued this certificate.
    pub certificate_issuer: String,

    /// The unique identifier of this certificate.
    pub certificate_id: String,

    /// When this certificate was issued.
    pub certificate_issue_date: Option<DateTime<Utc>>,

    /// When this certificate expires.
    pub certificate_expiry_date: Option<DateTime<Utc>>,

    /// The exact bytes as scanned.
    #[serde(skip)]
    pub raw_data: Vec<u8>,

    /// Result of verifying this certificate's signature.
    pub signature_state: SignatureValidation,
}

impl RecoveryCertificate {
    /// The overall validation state, relative to `now`.
    pub fn validation_state_at(&self, now: DateTime<Utc>) -> CertificateValidation {
        if self
            .certificate_issue_date
            .is_some_and(|issued| issued > now)
            || self
                .certificate_expiry_date
                .is_some_and(|expiry| expiry < now)
        {
            return CertificateValidation::Invalid;
        }
        if self.signature_state == SignatureValidation::Invalid {
            return CertificateValidation::Invalid;
        }

        if self.signature_state == SignatureValidation::Unknown {
            return CertificateValidation::Partial;
        }

        let today = now.date_naive();
        if self.valid_from.is_some_and(|from| from > today) {
            return CertificateValidation::Invalid;
        }
        if self.valid_until.is_some_and(|until| until < today) {
            return CertificateValidation::Invalid;
        }

        if self.valid_from.is_some_and(|from| from <= today)
            && self.valid_until.is_some_and(|until| until >= today)
        {
            return CertificateValidation::Valid;
        }

        CertificateValidation::Unknown
    }

    pub(crate) fn relevant_until(&self) -> Option<DateTime<Utc>> {
        self.valid_until
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}
