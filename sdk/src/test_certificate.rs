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

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::{CertificateValidation, SignatureValidation};

/// The outcome of a test.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum TestResult {
    /// The result could not be determined.
    #[default]
    Unknown,

    /// Negative result, no infection detected.
    Negative,

    /// Positive result, infection detected.
    Positive,
}

/// A test certificate.
#[derive(Clone, Debug, Default, Serialize)]
#[non_exhaustive]
pub struct TestCertificate {
    /// Full name of the tested person.
    pub name: String,

    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,

    /// Date the sample was taken.
    pub date: Option<NaiveDate>,

    /// Display name of the tested disease.
    pub disease: String,

    /// Display name of the type of test.
    pub test_type: String,

    /// Identifier of the NAA test used.
    pub test_name: String,

    /// Reference URL for the RAT test device used.
    pub test_url: String,

    /// The outcome of the test.
    pub result: TestResult,

    /// Free-text result, as printed on the certificate.
    pub result_string: String,

    /// The facility that performed the test.
    pub test_center: String,

    /// Country the test was performed in.
    pub country: String,

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

impl TestCertificate {
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
        if self.result == TestResult::Positive {
            return CertificateValidation::Invalid;
        }

        if !self.is_current_at(now) {
            return CertificateValidation::Invalid;
        }
        if self.signature_state == SignatureValidation::Unknown {
            return CertificateValidation::Partial;
        }

        if self.result == TestResult::Negative {
            CertificateValidation::Valid
        } else {
            CertificateValidation::Unknown
        }
    }

    /// `true` while the sample is no older than two days.
    pub fn is_current_at(&self, now: DateTime<Utc>) -> bool {
        self.date
            .and_then(|date| date.checked_add_days(Days::new(2)))
            .is_some_and(|stale| stale >= now.date_naive())
    }

    /// `true` while the sample is no older than two days, relative to the
    /// current time.
    pub fn is_current(&self) -> bool {
        self.is_current_at(Utc::now())
    }

    pub(crate) fn relevant_until(&self) -> Option<DateTime<Utc>> {
        self.date
            .and_then(|date| date.checked_add_days(Days::new(2)))
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 5, 31, 12, 0, 0).single().unwrap()
    }

    fn base_cert() -> TestCertificate {
        TestCertificate {
            date: NaiveDate::from_ymd_opt(2021, 5, 30),
            result: TestResult::Negative,
            signature_state: SignatureValidation::Valid,
            ..Default::default()
        }
    }

    #[test]
    fn fresh_negative_test_is_valid() {
        let cert = base_cert();
        assert!(cert.is_current_at(fixed_now()));
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Valid
        );
    }

    #[test]
    fn positive_test_is_invalid() {
        let cert = TestCertificate {
            result: TestResult::Positive,
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Invalid
        );
    }

    #[test]
    fn stale_sample_is_invalid() {
        let cert = TestCertificate {
            date: NaiveDate::from_ymd_opt(2021, 5, 1),
            ..base_cert()
        };
        assert!(!cert.is_current_at(fixed_now()));
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Invalid
        );
    }

    #[test]
    fn unknown_signature_downgrades_to_partial() {
        let cert = TestCertificate {
            signature_state: SignatureValidation::Unknown,
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Partial
        );
    }

    #[test]
    fn indeterminate_result_is_unknown() {
        let cert = TestCertificate {
            result: TestResult::Unknown,
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Unknown
        );
    }

    #[test]
    fn expired_certificate_window_is_invalid() {
        let cert = TestCertificate {
            certificate_expiry_date: Utc.with_ymd_and_hms(2021, 5, 30, 0, 0, 0).single(),
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Invalid
        );
    }

    #[test]
    fn relevant_until_is_two_days_after_sampling() {
        let cert = base_cert();
        assert_eq!(
            cert.relevant_until(),
            Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).single()
        );
    }
}
