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

//! Parser for EU Digital COVID Certificates.
//!
//! Wire format: `HC1:` prefix, RFC 9285 Base45, zlib, COSE_Sign1, CBOR
//! claims with the health certificate under claim key -260.

use hcert_crypto::{
    base45, cbor::Reader, cose::CoseSign1, inflate, raw_signature::RawSignatureValidationError,
};
use hcert_status_tracker::{
    log_item,
    validation_codes::{
        ALGORITHM_UNSUPPORTED, PAYLOAD_DECOMPRESS_FAILED, SIGNATURE_MISMATCH, SIGNATURE_VALIDATED,
        SIGNER_NOT_FOUND,
    },
    StatusTracker,
};

use crate::{
    formats::{epoch_seconds, parse_iso_date},
    HealthCertificate, RecoveryCertificate, SignatureValidation, TestCertificate, TestResult,
    TrustStore, VaccinationCertificate,
};

const CLAIM_HCERT: i64 = -260;
const CLAIM_ISSUER: i64 = 1;
const CLAIM_EXPIRY: i64 = 4;
const CLAIM_ISSUED_AT: i64 = 6;

pub(crate) fn parse(
    data: &[u8],
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> Option<HealthCertificate> {
    let encoded = data.strip_prefix(b"HC1:")?;

    let decoded = base45::decode(encoded).ok()?;
    let decompressed = match inflate::zlib(&decoded) {
        Ok(decompressed) => decompressed,
        Err(err) => {
            log_item!("eu-dgc", "payload decompression failed", "parse")
                .validation_status(PAYLOAD_DECOMPRESS_FAILED)
                .failure_no_throw(tracker, &err);
            return None;
        }
    };

    let cose = CoseSign1::parse(&decompressed).ok()?;
    if cose.payload.is_empty() {
        return None;
    }

    let signature_state = verify_signature(&cose, store, tracker);

    let mut reader = Reader::new(&cose.payload);
    if !reader.is_map() {
        return None;
    }
    reader.enter_container().ok()?;

    let mut builder = DgcBuilder::default();
    let mut issue_date = None;
    let mut expiry_date = None;

    while reader.has_next() {
        if !reader.is_integer() {
            reader.skip_value().ok()?;
            reader.skip_value().ok()?;
            continue;
        }
        let key = reader.read_integer().ok()?;
        match key {
            CLAIM_HCERT => parse_hcert_claim(&mut reader, store, &mut builder)?,
            CLAIM_ISSUER => {
                let issuer_country = reader.read_text().ok()?;
                log::debug!("key issuer: {issuer_country}");
            }
            CLAIM_EXPIRY => expiry_date = epoch_seconds(reader.read_integer().ok()?),
            CLAIM_ISSUED_AT => issue_date = epoch_seconds(reader.read_integer().ok()?),
            _ => {
                log::debug!("unhandled header key: {key}");
                reader.skip_value().ok()?;
            }
        }
    }
    reader.leave_container().ok()?;

    let mut certificate = builder.assemble()?;
    match &mut certificate {
        HealthCertificate::Vaccination(cert) => {
            cert.certificate_issue_date = issue_date;
            cert.certificate_expiry_date = expiry_date;
            cert.signature_state = signature_state;
        }
        HealthCertificate::Test(cert) => {
            cert.certificate_issue_date = issue_date;
            cert.certificate_expiry_date = expiry_date;
            cert.signature_state = signature_state;
        }
        HealthCertificate::Recovery(cert) => {
            cert.certificate_issue_date = issue_date;
            cert.certificate_expiry_date = expiry_date;
            cert.signature_state = signature_state;
        }
    }
    certificate.set_raw_data(data.to_vec());
    Some(certificate)
}

/// Accumulates parse results instead of mutating a shared certificate in
/// place; the claim map order (name before or after the certificate array)
/// then no longer matters.
#[derive(Default)]
struct DgcBuilder {
    name: Option<String>,
    date_of_birth: Option<chrono::NaiveDate>,
    certificate: Option<HealthCertificate>,
}

impl DgcBuilder {
    fn assemble(self) -> Option<HealthCertificate> {
        let mut certificate = self.certificate?;
        let name = self.name.unwrap_or_default();
        match &mut certificate {
            HealthCertificate::Vaccination(cert) => {
                cert.name = name;
                cert.date_of_birth = self.date_of_birth;
            }
            HealthCertificate::Test(cert) => {
                cert.name = name;
                cert.date_of_birth = self.date_of_birth;
            }
            HealthCertificate::Recovery(cert) => {
                cert.name = name;
                cert.date_of_birth = self.date_of_birth;
            }
        }
        Some(certificate)
    }
}

fn verify_signature(
    cose: &CoseSign1,
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> SignatureValidation {
    let key_id = hex::encode(&cose.key_id);
    let keys = store.eu_dgc_keys(&key_id);
    if keys.is_empty() {
        log_item!("COSE_Sign1", "unable to find certificate for key id", "parse")
            .validation_status(SIGNER_NOT_FOUND)
            .failure_no_throw(tracker, format!("kid {key_id}"));
        return SignatureValidation::Unknown;
    }

    let mut state = SignatureValidation::Invalid;
    for spki in keys {
        match cose.verify(spki) {
            Ok(()) => {
                log_item!("COSE_Sign1", "signature validated", "parse")
                    .validation_status(SIGNATURE_VALIDATED)
                    .success(tracker);
                return SignatureValidation::Valid;
            }
            Err(RawSignatureValidationError::UnsupportedAlgorithm) => {
                log_item!("COSE_Sign1", "signature algorithm not implemented", "parse")
                    .validation_status(ALGORITHM_UNSUPPORTED)
                    .failure_no_throw(tracker, RawSignatureValidationError::UnsupportedAlgorithm);
                state = SignatureValidation::Unknown;
            }
            Err(err) => {
                log_item!("COSE_Sign1", "signature does not verify", "parse")
                    .validation_status(SIGNATURE_MISMATCH)
                    .failure_no_throw(tracker, err);
            }
        }
    }
    state
}

fn parse_hcert_claim(
    reader: &mut Reader<'_>,
    store: &TrustStore,
    builder: &mut DgcBuilder,
) -> Option<()> {
    if !reader.is_map() {
        return None;
    }
    reader.enter_container().ok()?;
    while reader.has_next() {
        if !reader.is_integer() {
            reader.skip_value().ok()?;
            reader.skip_value().ok()?;
            continue;
        }
        let version = reader.read_integer().ok()?;
        if version == 1 {
            parse_hcert_v1(reader, store, builder)?;
        } else {
            log::debug!("unknown EU DGC version: {version}");
            reader.skip_value().ok()?;
        }
    }
    reader.leave_container().ok()?;
    Some(())
}

fn parse_hcert_v1(
    reader: &mut Reader<'_>,
    store: &TrustStore,
    builder: &mut DgcBuilder,
) -> Option<()> {
    if !reader.is_map() {
        return None;
    }
    reader.enter_container().ok()?;
    while reader.has_next() {
        let key = reader.read_text().ok()?;
        match key.as_str() {
            "v" => parse_certificate_array(reader, |reader| {
                parse_vaccination_certificate(reader, store).map(HealthCertificate::Vaccination)
            }, builder)?,
            "t" => parse_certificate_array(reader, |reader| {
                parse_test_certificate(reader, store).map(HealthCertificate::Test)
            }, builder)?,
            "r" => parse_certificate_array(reader, |reader| {
                parse_recovery_certificate(reader, store).map(HealthCertificate::Recovery)
            }, builder)?,
            "nam" => parse_name(reader, builder)?,
            "dob" => {
                builder.date_of_birth = parse_iso_date(&reader.read_text().ok()?);
            }
            _ => {
                log::debug!("unhandled element: {key}");
                reader.skip_value().ok()?;
            }
        }
    }
    reader.leave_container().ok()?;
    Some(())
}

fn parse_certificate_array(
    reader: &mut Reader<'_>,
    parse_entry: impl Fn(&mut Reader<'_>) -> Option<HealthCertificate>,
    builder: &mut DgcBuilder,
) -> Option<()> {
    if !reader.is_array() {
        return None;
    }
    reader.enter_container().ok()?;
    while reader.has_next() {
        builder.certificate = parse_entry(reader);
        builder.certificate.as_ref()?;
    }
    reader.leave_container().ok()?;
    Some(())
}

fn vaccine_product_url(product_id: &str) -> String {
    // EU-registered products link to the community register
    if let Some(registration) = product_id.strip_prefix("EU/1/") {
        if let Some(number) = registration.rsplit('/').next() {
            return format!(
                "https://ec.europa.eu/health/documents/community-register/html/h{number}.htm"
            );
        }
    }
    String::new()
}

fn parse_vaccination_certificate(
    reader: &mut Reader<'_>,
    store: &TrustStore,
) -> Option<VaccinationCertificate> {
    if !reader.is_map() {
        return None;
    }
    let mut cert = VaccinationCertificate::default();
    reader.enter_container().ok()?;
    while reader.has_next() {
        let key = reader.read_text().ok()?;
        match key.as_str() {
            "tg" => cert.disease = store.display_string("tg", &reader.read_text().ok()?),
            "vp" => cert.vaccine_type = store.display_string("vp", &reader.read_text().ok()?),
            "dt" => cert.date = parse_iso_date(&reader.read_text().ok()?),
            "mp" => {
                let product = reader.read_text().ok()?;
                cert.vaccine = store.display_string("mp", &product);
                cert.vaccine_url = vaccine_product_url(&product);
            }
            "ma" => cert.manufacturer = store.display_string("ma", &reader.read_text().ok()?),
            "dn" => cert.dose = u32::try_from(reader.read_integer().ok()?).ok()?,
            "sd" => cert.total_doses = u32::try_from(reader.read_integer().ok()?).ok()?,
            "co" => cert.country = reader.read_text().ok()?,
            "is" => cert.certificate_issuer = reader.read_text().ok()?,
            "ci" => cert.certificate_id = reader.read_text().ok()?,
            _ => {
                log::debug!("unhandled vaccine key: {key}");
                reader.skip_value().ok()?;
            }
        }
    }
    reader.leave_container().ok()?;
    Some(cert)
}

fn parse_test_certificate(reader: &mut Reader<'_>, store: &TrustStore) -> Option<TestCertificate> {
    if !reader.is_map() {
        return None;
    }
    let mut cert = TestCertificate::default();
    reader.enter_container().ok()?;
    while reader.has_next() {
        let key = reader.read_text().ok()?;
        match key.as_str() {
            "tg" => cert.disease = store.display_string("tg", &reader.read_text().ok()?),
            "tt" => cert.test_type = store.display_string("tcTt", &reader.read_text().ok()?),
            "nm" => cert.test_name = reader.read_text().ok()?,
            "ma" => {
                let device = reader.read_text().ok()?;
                cert.test_url = format!(
                    "https://covid-19-diagnostics.jrc.ec.europa.eu/devices/detail/{device}"
                );
            }
            "sc" => cert.date = parse_iso_date(&reader.read_text().ok()?),
            "tr" => {
                let value = reader.read_text().ok()?;
                cert.result_string = store.display_string("tcTr", &value);
                cert.result = if value == "260415000" {
                    TestResult::Negative
                } else {
                    TestResult::Positive
                };
            }
            "tc" => cert.test_center = reader.read_text().ok()?,
            "co" => cert.country = reader.read_text().ok()?,
            "is" => cert.certificate_issuer = reader.read_text().ok()?,
            "ci" => cert.certificate_id = reader.read_text().ok()?,
            _ => {
                log::debug!("unhandled test key: {key}");
                reader.skip_value().ok()?;
            }
        }
    }
    reader.leave_container().ok()?;
    Some(cert)
}

fn parse_recovery_certificate(
    reader: &mut Reader<'_>,
    store: &TrustStore,
) -> Option<RecoveryCertificate> {
    if !reader.is_map() {
        return None;
    }
    let mut cert = RecoveryCertificate::default();
    reader.enter_container().ok()?;
    while reader.has_next() {
        let key = reader.read_text().ok()?;
        match key.as_str() {
            "tg" => cert.disease = store.display_string("tg", &reader.read_text().ok()?),
            "fr" => cert.date_of_positive_test = parse_iso_date(&reader.read_text().ok()?),
            "df" => cert.valid_from = parse_iso_date(&reader.read_text().ok()?),
            "du" => cert.valid_until = parse_iso_date(&reader.read_text().ok()?),
            "is" => cert.certificate_issuer = reader.read_text().ok()?,
            "ci" => cert.certificate_id = reader.read_text().ok()?,
            _ => {
                log::debug!("unhandled recovery key: {key}");
                reader.skip_value().ok()?;
            }
        }
    }
    reader.leave_container().ok()?;
    Some(cert)
}

fn parse_name(reader: &mut Reader<'_>, builder: &mut DgcBuilder) -> Option<()> {
    if !reader.is_map() {
        return None;
    }
    let mut family_name = String::new();
    let mut given_name = String::new();
    reader.enter_container().ok()?;
    while reader.has_next() {
        let key = reader.read_text().ok()?;
        match key.as_str() {
            "fn" => family_name = reader.read_text().ok()?,
            "gn" => given_name = reader.read_text().ok()?,
            _ => reader.skip_value().ok()?,
        }
    }
    reader.leave_container().ok()?;

    builder.name = Some(format!("{given_name} {family_name}").trim().to_owned());
    Some(())
}
