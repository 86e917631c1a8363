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

//! Parser for DIVOC certificates, such as used in India.
//!
//! The payload is a JSON-LD verifiable credential carrying an RFC 7797
//! detached-payload JWS (`proof.jws`, PS256). The signed bytes are rebuilt
//! from the URDNA2015-canonicalized RDF form of the proof options and of
//! the credential without its proof block.
//!
//! See <https://divoc.egov.org.in/>.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hcert_crypto::{
    c14n::jsonld::JsonLdToRdf,
    c14n::rdf,
    raw_signature::{RawSignatureValidator, RsaPssValidator},
};
use hcert_status_tracker::{
    log_item,
    validation_codes::{SIGNATURE_MISMATCH, SIGNATURE_VALIDATED, SIGNER_NOT_FOUND},
    StatusTracker,
};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::{
    formats::{parse_iso_date, parse_iso_datetime},
    HealthCertificate, SignatureValidation, TrustStore, VaccinationCertificate,
};

const VACCINATION_CONTEXT_HOST: &str = "cowin.gov.in";
const SECURITY_V2_CONTEXT: &str = "https://w3id.org/security/v2";

/// The known schema documents `@context` references resolve to.
const SCHEMA_DOCUMENTS: &[(&str, &str)] = &[
    (
        "https://www.w3.org/2018/credentials/v1",
        include_str!("../resources/divoc/credentials-v1.json"),
    ),
    (
        "https://cowin.gov.in/credentials/vaccination/v1",
        include_str!("../resources/divoc/vaccination-v1.json"),
    ),
    (
        "https://w3id.org/security/v1",
        include_str!("../resources/divoc/security-v1.json"),
    ),
    (
        "https://w3id.org/security/v2",
        include_str!("../resources/divoc/security-v2.json"),
    ),
];

fn load_schema_document(reference: &str) -> Option<String> {
    SCHEMA_DOCUMENTS
        .iter()
        .find(|(uri, _)| *uri == reference)
        .map(|(_, document)| (*document).to_owned())
}

pub(crate) fn parse(
    data: &[u8],
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> Option<HealthCertificate> {
    let doc: Value = serde_json::from_slice(data).ok()?;
    let obj = doc.as_object()?;

    if !references_vaccination_context(obj.get("@context")?) {
        return None;
    }

    let mut cert = VaccinationCertificate::default();

    let subject = obj.get("credentialSubject")?.as_object()?;
    cert.name = subject
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let evidence = obj.get("evidence")?.as_array()?.first()?.as_object()?;
    cert.date = evidence
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_iso_date);
    cert.vaccine = evidence
        .get("vaccine")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    cert.manufacturer = evidence
        .get("manufacturer")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    cert.dose = evidence.get("dose").and_then(Value::as_u64).unwrap_or(0) as u32;
    cert.total_doses = evidence
        .get("totalDoses")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    cert.certificate_id = match evidence.get("certificateId") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    };
    cert.country = evidence
        .get("facility")
        .and_then(|facility| facility.get("address"))
        .and_then(|address| address.get("addressCountry"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    cert.certificate_issuer = obj
        .get("issuer")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    cert.certificate_issue_date = obj
        .get("issuanceDate")
        .and_then(Value::as_str)
        .and_then(parse_iso_datetime);

    cert.signature_state = verify_proof(obj, store, tracker);
    cert.raw_data = data.to_vec();

    Some(HealthCertificate::Vaccination(cert))
}

fn references_vaccination_context(context: &Value) -> bool {
    match context {
        Value::String(reference) => reference.contains(VACCINATION_CONTEXT_HOST),
        Value::Array(parts) => parts.iter().any(|part| {
            part.as_str()
                .is_some_and(|reference| reference.contains(VACCINATION_CONTEXT_HOST))
        }),
        _ => false,
    }
}

/// The canonical N-Quads form of a JSON-LD document.
fn canonical_rdf(obj: &Map<String, Value>) -> Vec<u8> {
    let loader = load_schema_document;
    let mut converter = JsonLdToRdf::new(&loader);
    let mut quads = converter.to_rdf(obj);
    rdf::normalize(&mut quads);
    rdf::serialize(&quads)
}

// see RFC 7515 §3.1 for the compact serialization being taken apart here
fn verify_proof(
    obj: &Map<String, Value>,
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> SignatureValidation {
    let proof = obj
        .get("proof")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let jws = proof.get("jws").and_then(Value::as_str).unwrap_or_default();

    let mut segments = jws.split('.');
    let (Some(header_b64), Some(_payload), Some(signature_b64)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return SignatureValidation::Invalid;
    };

    let Ok(header_bytes) = URL_SAFE_NO_PAD.decode(header_b64) else {
        return SignatureValidation::Invalid;
    };
    let Ok(signature) = URL_SAFE_NO_PAD.decode(signature_b64) else {
        return SignatureValidation::Invalid;
    };
    let header: Value = serde_json::from_slice(&header_bytes).unwrap_or_default();
    if header.get("alg").and_then(Value::as_str) != Some("PS256") {
        log::warn!("not implemented JWS algorithm: {header}");
        return SignatureValidation::Invalid;
    }

    // the signed content: the proof options and the credential itself, both
    // canonicalized and hashed
    let mut proof_options = proof.clone();
    proof_options.remove("jws");
    proof_options.remove("signatureValue");
    proof_options.remove("proofValue");
    proof_options.insert(
        "@context".to_owned(),
        Value::String(SECURITY_V2_CONTEXT.to_owned()),
    );

    let mut content = obj.clone();
    content.remove("proof");

    let canonical_proof = canonical_rdf(&proof_options);
    let canonical_content = canonical_rdf(&content);

    let mut signed_data = header_b64.as_bytes().to_vec();
    signed_data.push(b'.');
    signed_data.extend_from_slice(&Sha256::digest(&canonical_proof));
    signed_data.extend_from_slice(&Sha256::digest(&canonical_content));

    let verification_method = proof
        .get("verificationMethod")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let Some(public_key) = store.divoc_key(verification_method) else {
        log_item!("divoc", "no signing key available", "verify_proof")
            .validation_status(SIGNER_NOT_FOUND)
            .failure_no_throw(tracker, format!("method {verification_method}"));
        return SignatureValidation::Unknown;
    };

    match RsaPssValidator::Ps256.validate(&signature, &signed_data, public_key) {
        Ok(()) => {
            log_item!("divoc", "proof signature validated", "verify_proof")
                .validation_status(SIGNATURE_VALIDATED)
                .success(tracker);
            SignatureValidation::Valid
        }
        Err(err) => {
            log_item!("divoc", "proof signature does not verify", "verify_proof")
                .validation_status(SIGNATURE_MISMATCH)
                .failure_no_throw(tracker, err);
            SignatureValidation::Invalid
        }
    }
}
