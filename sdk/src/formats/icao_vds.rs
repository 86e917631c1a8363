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

//! Parser for ICAO Visible Digital Seals for non-constrained environments
//! (VDS-NC), as used for vaccination and test certificates.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hcert_crypto::{raw_signature::EcdsaValidator, x509};
use hcert_status_tracker::{
    log_item,
    validation_codes::{
        SIGNATURE_MISMATCH, SIGNATURE_VALIDATED, SIGNER_CHAIN_MISMATCH, SIGNER_CHAIN_VALIDATED,
        SIGNER_NOT_FOUND,
    },
    StatusTracker,
};
use serde_json::Value;

use crate::{
    formats::parse_iso_date,
    HealthCertificate, SignatureValidation, TestCertificate, TestResult, TrustStore,
    VaccinationCertificate,
};

pub(crate) fn parse(
    data: &[u8],
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> Option<HealthCertificate> {
    let doc: Value = serde_json::from_slice(data).ok()?;

    let root = match &doc {
        Value::Object(_) => &doc,
        Value::Array(entries) if entries.len() == 1 => entries.first()?,
        _ => return None,
    };

    let data_value = root.get("data")?;
    let hdr = data_value.get("hdr")?.as_object()?;
    let msg = data_value.get("msg")?;

    if hdr.get("v").map(json_to_int) != Some(1) {
        return None;
    }

    let signature_state = verify_signature(root, data_value, store, tracker);

    let kind = hdr.get("t").and_then(Value::as_str).unwrap_or_default();
    match kind {
        "icao.vacc" => {
            let mut cert = VaccinationCertificate::default();
            parse_personal_information(msg.get("pid"), &mut cert.name, &mut cert.date_of_birth);
            cert.certificate_id = string_field(msg, "uvci");

            let ve = msg.get("ve")?.as_array()?.first()?;
            // TODO handle multiple vaccine entries, should any show up in the wild
            cert.vaccine_type = string_field(ve, "des");
            cert.disease = store.display_string("icd11", &string_field(ve, "dis"));
            cert.vaccine = string_field(ve, "nam");

            let empty = Vec::new();
            for vd in ve.get("vd").and_then(Value::as_array).unwrap_or(&empty) {
                let seq = vd.get("seq").map(json_to_int).unwrap_or_default();
                if seq < cert.dose as i64 {
                    continue;
                }
                cert.dose = u32::try_from(seq).unwrap_or_default();
                cert.date = parse_iso_date(&string_field(vd, "dvc"));
                cert.country = string_field(vd, "ctr");
            }

            cert.raw_data = data.to_vec();
            cert.signature_state = signature_state;
            Some(HealthCertificate::Vaccination(cert))
        }
        "icao.test" => {
            let mut cert = TestCertificate::default();
            parse_personal_information(msg.get("pid"), &mut cert.name, &mut cert.date_of_birth);
            cert.certificate_id = string_field(msg, "utci");

            if let Some(sp) = msg.get("sp") {
                cert.test_center = string_field(sp, "spn");
                cert.country = string_field(sp, "ctr");
            }
            if let Some(dat) = msg.get("dat") {
                cert.date = parse_iso_date(&string_field(dat, "sc"));
            }
            if let Some(tr) = msg.get("tr") {
                cert.test_type = string_field(tr, "tc");
                let result = string_field(tr, "r");
                cert.result_string = result.clone();
                cert.result = if result.eq_ignore_ascii_case("negative") {
                    TestResult::Negative
                } else if result.eq_ignore_ascii_case("positive") {
                    TestResult::Positive
                } else {
                    TestResult::Unknown
                };
            }

            cert.raw_data = data.to_vec();
            cert.signature_state = signature_state;
            Some(HealthCertificate::Test(cert))
        }
        _ => None,
    }
}

fn parse_personal_information(
    pid: Option<&Value>,
    name: &mut String,
    date_of_birth: &mut Option<chrono::NaiveDate>,
) {
    let Some(pid) = pid else {
        return;
    };
    *name = string_field(pid, "n");
    *date_of_birth = parse_iso_date(&string_field(pid, "dob"));
}

fn json_to_int(value: &Value) -> i64 {
    match value {
        Value::Number(number) => number.as_i64().unwrap_or_default(),
        Value::String(text) => text.parse().unwrap_or_default(),
        _ => 0,
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Verify the detached signature object.
///
/// The content signature covers the compact serialization of the `data`
/// object with lexicographically ordered keys. This matches the observed
/// reference behavior but is NOT full RFC 8785 canonicalization; see
/// DESIGN.md before "fixing" this.
fn verify_signature(
    root: &Value,
    data_value: &Value,
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> SignatureValidation {
    let Some(sig) = root.get("sig") else {
        return SignatureValidation::Unchecked;
    };

    let Ok(signer_der) = URL_SAFE_NO_PAD.decode(string_field(sig, "cer")) else {
        return SignatureValidation::Unknown;
    };
    let Ok(signature) = URL_SAFE_NO_PAD.decode(string_field(sig, "sigvl")) else {
        return SignatureValidation::Unknown;
    };

    let algorithm = sig.get("alg").and_then(Value::as_str).unwrap_or("ES256");
    let validator = match algorithm {
        "ES256" => EcdsaValidator::Es256,
        "ES384" => EcdsaValidator::Es384,
        "ES512" => EcdsaValidator::Es512,
        other => {
            log::warn!("unsupported VDS-NC signature algorithm: {other}");
            return SignatureValidation::Unknown;
        }
    };

    // serde_json's Value keeps object keys sorted, so this is the compact
    // key-ordered form the signature covers
    let Ok(canonical) = serde_json::to_vec(data_value) else {
        return SignatureValidation::Unknown;
    };

    use hcert_crypto::raw_signature::RawSignatureValidationError;
    match x509::verify_content_signature(&signer_der, &validator, &canonical, &signature) {
        Ok(()) => {}
        Err(
            err @ (RawSignatureValidationError::SignatureMismatch
            | RawSignatureValidationError::InvalidSignature),
        ) => {
            log_item!("vds-nc", "content signature does not verify", "parse")
                .validation_status(SIGNATURE_MISMATCH)
                .failure_no_throw(tracker, err);
            return SignatureValidation::Invalid;
        }
        Err(err) => {
            // an unusable signer certificate is inconclusive, not proof of
            // tampering
            log_item!("vds-nc", "signer certificate is unusable", "parse")
                .failure_no_throw(tracker, err);
            return SignatureValidation::Unknown;
        }
    }

    // chain of trust: find the issuer by the signer's authority key id
    let Some(aki) = x509::authority_key_id(&signer_der) else {
        log_item!("vds-nc", "signer certificate has no authority key id", "parse")
            .validation_status(SIGNER_NOT_FOUND)
            .failure_no_throw(tracker, "missing AKI");
        return SignatureValidation::Unchecked;
    };

    let issuers = store.icao_issuers(&aki);
    if issuers.is_empty() {
        log_item!("vds-nc", "no issuer certificate for authority key id", "parse")
            .validation_status(SIGNER_NOT_FOUND)
            .failure_no_throw(tracker, format!("aki {aki}"));
        // a valid content signature without a resolvable issuer is not
        // independently verifiable
        return SignatureValidation::Unchecked;
    }

    let chain_ok = issuers.iter().any(|issuer_der| {
        x509::public_key_der(issuer_der)
            .ok()
            .map(|issuer_spki| x509::verify_cert_signature(&signer_der, &issuer_spki).is_ok())
            .unwrap_or(false)
    });

    if chain_ok {
        log_item!("vds-nc", "signer certificate chain validated", "parse")
            .validation_status(SIGNER_CHAIN_VALIDATED)
            .success(tracker);
        log_item!("vds-nc", "content signature validated", "parse")
            .validation_status(SIGNATURE_VALIDATED)
            .success(tracker);
        SignatureValidation::Valid
    } else {
        log_item!("vds-nc", "signer certificate does not chain to any issuer", "parse")
            .validation_status(SIGNER_CHAIN_MISMATCH)
            .failure_no_throw(tracker, format!("aki {aki}"));
        SignatureValidation::Invalid
    }
}
