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

//! Parser for US SMART Health Cards.
//!
//! Wire format: `shc:/` prefix, digit pairs encoding `byte - 45`, compact
//! JWS with a raw-deflated FHIR bundle payload.

use hcert_crypto::{jwk, jws::CompactJws};
use hcert_status_tracker::{
    log_item,
    validation_codes::{SIGNATURE_MISMATCH, SIGNATURE_VALIDATED, SIGNER_NOT_FOUND},
    StatusTracker,
};
use serde_json::Value;

use crate::{
    formats::{epoch_seconds, parse_iso_date},
    HealthCertificate, SignatureValidation, TrustStore, VaccinationCertificate,
};

const IMMUNIZATION_TYPE: &str = "https://smarthealth.cards#immunization";
const CVX_SYSTEM: &str = "http://hl7.org/fhir/sid/cvx";

pub(crate) fn parse(
    data: &[u8],
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> Option<HealthCertificate> {
    let encoded = data.strip_prefix(b"shc:/")?;
    if encoded.contains(&b'/') {
        log::warn!("SHC chunked data not supported");
        return None;
    }

    let mut unpacked = Vec::with_capacity(encoded.len() / 2);
    for pair in encoded.chunks_exact(2) {
        if !pair[0].is_ascii_digit() || !pair[1].is_ascii_digit() {
            return None;
        }
        unpacked.push((pair[0] - b'0') * 10 + (pair[1] - b'0') + 45);
    }

    let jws = CompactJws::parse(&unpacked).ok()?;
    let payload: Value = serde_json::from_slice(&jws.payload).ok()?;

    let signature_state = verify_signature(&jws, store, tracker);

    let issue_date = payload
        .get("nbf")
        .and_then(Value::as_f64)
        .and_then(|nbf| epoch_seconds(nbf as i64));
    let vc = payload.get("vc")?;

    let types = vc.get("type").and_then(Value::as_array)?;
    if !types
        .iter()
        .any(|t| t.as_str() == Some(IMMUNIZATION_TYPE))
    {
        return None;
    }

    let mut cert = parse_immunization(vc.get("credentialSubject")?, store)?;
    cert.certificate_issue_date = issue_date;
    cert.certificate_issuer = payload
        .get("iss")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    cert.raw_data = data.to_vec();
    cert.signature_state = signature_state;
    Some(HealthCertificate::Vaccination(cert))
}

fn verify_signature(
    jws: &CompactJws,
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> SignatureValidation {
    let kid = jws.header.kid.as_deref().unwrap_or_default();
    let Some(jwk_json) = store.shc_key(kid) else {
        log_item!("jws", "no key found for key id", "parse")
            .validation_status(SIGNER_NOT_FOUND)
            .failure_no_throw(tracker, format!("kid {kid}"));
        return SignatureValidation::Invalid;
    };

    let public_key = match jwk::public_key_from_jwk(jwk_json) {
        Ok(public_key) => public_key,
        Err(err) => {
            log_item!("jws", "stored key is unusable", "parse").failure_no_throw(tracker, err);
            return SignatureValidation::Invalid;
        }
    };

    match jws.verify(&public_key) {
        Ok(()) => {
            log_item!("jws", "signature validated", "parse")
                .validation_status(SIGNATURE_VALIDATED)
                .success(tracker);
            SignatureValidation::Valid
        }
        Err(err) => {
            log_item!("jws", "signature does not verify", "parse")
                .validation_status(SIGNATURE_MISMATCH)
                .failure_no_throw(tracker, err);
            SignatureValidation::Invalid
        }
    }
}

fn parse_immunization(subject: &Value, store: &TrustStore) -> Option<VaccinationCertificate> {
    let entries = subject
        .get("fhirBundle")?
        .get("entry")?
        .as_array()?;

    let mut cert = VaccinationCertificate::default();
    for entry in entries {
        let Some(resource) = entry.get("resource") else {
            continue;
        };
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match resource_type {
            "Patient" => {
                cert.date_of_birth = resource
                    .get("birthDate")
                    .and_then(Value::as_str)
                    .and_then(parse_iso_date);

                let names = resource.get("name").and_then(Value::as_array)?;
                if names.len() != 1 {
                    return None;
                }
                let name = &names[0];
                let mut parts: Vec<String> = name
                    .get("given")
                    .and_then(Value::as_array)
                    .map(|given| {
                        given
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_owned)
                            .collect()
                    })
                    .unwrap_or_default();
                if let Some(family) = name.get("family").and_then(Value::as_str) {
                    parts.push(family.to_owned());
                }
                cert.name = parts.join(" ");
            }
            "Immunization" => {
                if resource.get("status").and_then(Value::as_str) != Some("completed") {
                    continue;
                }
                let date = resource
                    .get("occurrenceDateTime")
                    .and_then(Value::as_str)
                    .and_then(parse_iso_date);
                // multiple doses are folded into one certificate; the most
                // recent one provides the product details
                if cert.date.is_some() && cert.date > date {
                    cert.dose += 1;
                    continue;
                }
                cert.date = date;
                cert.dose = std::cmp::max(1, cert.dose + 1);

                let codings = resource
                    .get("vaccineCode")
                    .and_then(|code| code.get("coding"))
                    .and_then(Value::as_array);
                let Some(codings) = codings else {
                    continue;
                };
                if codings.len() != 1 {
                    continue;
                }
                let coding = &codings[0];
                let system = coding.get("system").and_then(Value::as_str).unwrap_or_default();
                let code = coding.get("code").and_then(Value::as_str).unwrap_or_default();

                let cvx = (system == CVX_SYSTEM)
                    .then(|| store.cvx_code(code))
                    .flatten();
                match cvx {
                    Some(cvx) => {
                        cert.vaccine = cvx
                            .get("n")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_owned();
                        cert.disease = cvx
                            .get("d")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_owned();
                        cert.manufacturer = cvx
                            .get("m")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_owned();
                    }
                    None => cert.vaccine = format!("{system}/{code}"),
                }
            }
            other => {
                log::debug!("unhandled resource type: {other}");
            }
        }
    }
    Some(cert)
}
