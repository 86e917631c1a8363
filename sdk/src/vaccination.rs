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

/// How complete a vaccination is.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum VaccinationState {
    /// The last dose is too recent to provide full protection yet.
    VaccinationTooRecent,

    /// Vaccinated, without knowing how many doses are expected.
    Vaccinated,

    /// Fewer doses than expected so far.
    PartiallyVaccinated,

    /// All expected doses received.
    FullyVaccinated,
}

/// A vaccination certificate.
#[derive(Clone, Debug, Default, Serialize)]
#[non_exhaustive]
pub struct VaccinationCertificate {
    /// Full name of the vaccinated person.
    pub name: String,

    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,

    /// Date of the (most recent) vaccination.
    pub date: Option<NaiveDate>,

    /// Display name of the targeted disease.
    pub disease: String,

    /// Display name of the vaccine product.
    pub vaccine: String,

    /// Type of the vaccine (e.g. mRNA).
    pub vaccine_type: String,

    /// Reference URL with further information about the vaccine product.
    pub vaccine_url: String,

    /// Display name of the vaccine manufacturer.
    pub manufacturer: String,

    /// Number of the (most recent) dose.
    pub dose: u32,

    /// Total number of expected doses, 0 if unknown.
    pub total_doses: u32,

    /// Country the vaccination was administered in.
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

impl VaccinationCertificate {
    /// The overall validation state, relative to `now`.
    pub fn validation_state_at(&self, now: DateTime<Utc>) -> CertificateValidation {
        let today = now.date_naive();

        if self
            .certificate_expiry_date
            .is_some_and(|expiry| expiry < now)
        {
            return CertificateValidation::Invalid;
        }
        if self.signature_state == SignatureValidation::Invalid {
            return CertificateValidation::Invalid;
        }
        if self.date.is_some_and(|date| date > today) || (self.dose == 0 && self.total_doses > 0) {
            return CertificateValidation::Invalid;
        }

        if self.signature_state == SignatureValidation::Unknown {
            return CertificateValidation::Partial;
        }
        if self.is_too_recent(today) {
            return CertificateValidation::Partial;
        }
        if self.dose < self.total_doses {
            return CertificateValidation::Partial;
        }

        CertificateValidation::Valid
    }

    /// How complete this vaccination is, relative to `now`.
    pub fn vaccination_state_at(&self, now: DateTime<Utc>) -> VaccinationState {
        if self.dose < self.total_doses {
            return VaccinationState::PartiallyVaccinated;
        }
        if self.is_too_recent(now.date_naive()) {
            return VaccinationState::VaccinationTooRecent;
        }
        if self.total_doses == 0 {
            return VaccinationState::Vaccinated;
        }
        VaccinationState::FullyVaccinated
    }

    /// How complete this vaccination is, relative to the current time.
    pub fn vaccination_state(&self) -> VaccinationState {
        self.vaccination_state_at(Utc::now())
    }

    // full protection is assumed two weeks after the last dose
    fn is_too_recent(&self, today: NaiveDate) -> bool {
        self.date
            .and_then(|date| date.checked_add_days(Days::new(14)))
            .is_some_and(|reached| reached >= today)
    }

    pub(crate) fn relevant_until(&self) -> Option<DateTime<Utc>> {
        if self.certificate_expiry_date.is_some() {
            return self.certificate_expiry_date;
        }
        self.date
            .and_then(|date| date.checked_add_months(chrono::Months::new(12)))
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
        Utc.with_ymd_and_hms(2021, 10, 1, 12, 0, 0).single().unwrap()
    }

    fn base_cert() -> VaccinationCertificate {
        VaccinationCertificate {
            date: NaiveDate::from_ymd_opt(2021, 5, 29),
            dose: 2,
            total_doses: 2,
            signature_state: SignatureValidation::Valid,
            ..Default::default()
        }
    }

    #[test]
    fn complete_vaccination_is_valid() {
        let cert = base_cert();
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Valid
        );
        assert_eq!(
            cert.vaccination_state_at(fixed_now()),
            VaccinationState::FullyVaccinated
        );
    }

    #[test]
    fn partial_vaccination_is_partial() {
        let cert = VaccinationCertificate {
            dose: 1,
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Partial
        );
        assert_eq!(
            cert.vaccination_state_at(fixed_now()),
            VaccinationState::PartiallyVaccinated
        );
    }

    #[test]
    fn recent_vaccination_is_partial() {
        let cert = VaccinationCertificate {
            date: NaiveDate::from_ymd_opt(2021, 9, 25),
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Partial
        );
        assert_eq!(
            cert.vaccination_state_at(fixed_now()),
            VaccinationState::VaccinationTooRecent
        );
    }

    #[test]
    fn invalid_signature_dominates() {
        let cert = VaccinationCertificate {
            signature_state: SignatureValidation::Invalid,
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Invalid
        );
    }

    #[test]
    fn unknown_signature_downgrades_to_partial() {
        let cert = VaccinationCertificate {
            signature_state: SignatureValidation::Unknown,
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Partial
        );
    }

    #[test]
    fn unchecked_signature_does_not_downgrade() {
        let cert = VaccinationCertificate {
            signature_state: SignatureValidation::Unchecked,
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Valid
        );
    }

    #[test]
    fn expired_certificate_is_invalid() {
        let cert = VaccinationCertificate {
            certificate_expiry_date: Utc.with_ymd_and_hms(2021, 9, 1, 0, 0, 0).single(),
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Invalid
        );
    }

    #[test]
    fn zero_of_n_doses_is_invalid() {
        let cert = VaccinationCertificate {
            dose: 0,
            ..base_cert()
        };
        assert_eq!(
            cert.validation_state_at(fixed_now()),
            CertificateValidation::Invalid
        );
    }

    #[test]
    fn dose_count_without_expectation_is_vaccinated() {
        let cert = VaccinationCertificate {
            total_doses: 0,
            dose: 1,
            ..base_cert()
        };
        assert_eq!(
            cert.vaccination_state_at(fixed_now()),
            VaccinationState::Vaccinated
        );
    }

    #[test]
    fn relevant_until_prefers_expiry() {
        let expiry = Utc.with_ymd_and_hms(2022, 1, 28, 7, 47, 53).single();
        let cert = VaccinationCertificate {
            certificate_expiry_date: expiry,
            ..base_cert()
        };
        assert_eq!(cert.relevant_until(), expiry);

        let cert = base_cert();
        assert_eq!(
            cert.relevant_until(),
            Utc.with_ymd_and_hms(2022, 5, 29, 0, 0, 0).single()
        );
    }
}
