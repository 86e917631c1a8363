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

//! Parser for Dutch CoronaCheck certificates.
//!
//! Wire format: `NL2:` prefix, the whole-string Base45 variant, an ASN.1
//! SEQUENCE carrying an IRMA disclosure proof. Disclosed attribute values
//! are doubled on the wire (a parity bit in the least significant
//! position), so their true byte strings are recovered by halving.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{Duration, NaiveDate};
use hcert_crypto::{
    base45,
    der::{tag, Object},
    irma::{self, IrmaProof, IrmaPublicKey},
};
use hcert_status_tracker::{
    log_item,
    validation_codes::{
        PROOF_CHALLENGE_MISMATCH, SIGNATURE_VALIDATED, SIGNER_NOT_FOUND,
    },
    StatusTracker,
};
use num_bigint::BigUint;
use num_traits::Zero;
use sha2::{Digest, Sha256};

use crate::{
    formats::epoch_seconds,
    HealthCertificate, SignatureValidation, TestCertificate, TestResult, TrustStore,
    VaccinationCertificate,
};

/// Disclosed attribute positions within the ADisclosed sequence.
/// metadata, isSpecimen, isPaperProof, validFrom, validForHours,
/// firstNameInitial, lastNameInitial, birthDay, birthMonth
const DISCLOSED_ATTRIBUTE_COUNT: usize = 9;

/// Validity windows shorter than this classify the result as a test
/// certificate; the distinction is encoded in the wire data itself.
const TEST_WINDOW_HOURS: i64 = 48;

pub(crate) fn parse(
    data: &[u8],
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> Option<HealthCertificate> {
    if !data.starts_with(b"NL2:") || data.len() < 5 {
        return None;
    }
    let raw = base45::nl_decode(&data[4..]).ok()?;

    let root = Object::parse(&raw).ok()?;
    if root.tag() != tag::SEQUENCE {
        log::warn!("wrong ASN.1 root node type: {}", root.tag());
        return None;
    }

    // DisclosureTimeSeconds, C, A, EResponse, VResponse, AResponse,
    // ADisclosed
    let field = root.first_child().ok()?;
    let disclosure_time = field.read_i64().ok()?;
    let field = field.next().ok()?;
    let c = field.read_biguint().ok()?;
    let field = field.next().ok()?;
    let a = field.read_biguint().ok()?;
    let field = field.next().ok()?;
    let e_response = field.read_biguint().ok()?;
    let field = field.next().ok()?;
    let v_response = field.read_biguint().ok()?;
    let field = field.next().ok()?;
    let a_response = field.read_biguint().ok()?;
    let field = field.next().ok()?;
    if field.tag() != tag::SEQUENCE {
        log::warn!("wrong ADisclosed field type: {}", field.tag());
        return None;
    }

    let mut disclosed = Vec::with_capacity(DISCLOSED_ATTRIBUTE_COUNT);
    let mut entry = field.first_child().ok()?;
    loop {
        disclosed.push(entry.read_biguint().ok()?);
        if !entry.has_next() {
            break;
        }
        entry = entry.next().ok()?;
    }
    if disclosed.len() < DISCLOSED_ATTRIBUTE_COUNT {
        log::warn!("ADisclosed sequence too short");
        return None;
    }

    // metadata: another ASN.1 sequence holding the version tag and the
    // issuer key id
    let metadata_bytes = decode_attribute(&disclosed[0]);
    let metadata = Object::parse(&metadata_bytes).ok()?;
    if metadata.tag() != tag::SEQUENCE {
        log::warn!("meta data is not an ASN.1 SEQUENCE");
        return None;
    }
    let version = metadata.first_child().ok()?;
    let version_bytes = version.read_octet_string().ok()?;
    if version_bytes != [0x02].as_slice() {
        log::warn!("unsupported NL certificate version: {version_bytes:?}");
        return None;
    }
    let issuer = version.next().ok()?.read_printable_string().ok()?.to_owned();

    let is_specimen = {
        let raw_specimen = decode_attribute(&disclosed[1]);
        raw_specimen != b"0"
    };
    // disclosed[2] is the paper-proof flag, not needed here

    let valid_from_secs: i64 = attribute_string(&disclosed[3]).parse().ok()?;
    let valid_hours: i64 = attribute_string(&disclosed[4]).parse().ok()?;
    let valid_from = epoch_seconds(valid_from_secs)?;
    let valid_until = valid_from + Duration::hours(valid_hours);

    let mut name = attribute_string(&disclosed[5]);
    name.push(' ');
    name.push_str(&attribute_string(&disclosed[6]));

    let birth_day: u32 = attribute_string(&disclosed[7]).parse().unwrap_or(0);
    let birth_month: u32 = attribute_string(&disclosed[8]).parse().unwrap_or(0);
    // only day and month are disclosed; the year is withheld by design of
    // the scheme
    let date_of_birth = NaiveDate::from_ymd_opt(1900, birth_month, birth_day);

    let proof = IrmaProof {
        disclosure_time,
        c,
        a,
        e_response,
        v_response,
        a_responses: vec![a_response],
        a_disclosed: disclosed,
    };

    let mut signature_state = verify_proof(&proof, &issuer, store, tracker);
    if is_specimen {
        signature_state = SignatureValidation::Invalid;
    }

    let certificate_id = STANDARD.encode(&Sha256::digest(&raw)[..16]);

    if valid_hours < TEST_WINDOW_HOURS {
        let mut cert = TestCertificate {
            country: "NL".to_owned(),
            disease: "COVID-19".to_owned(),
            result: TestResult::Negative,
            name: name.trim().to_owned(),
            date_of_birth,
            date: Some(valid_from.date_naive()),
            certificate_issue_date: Some(valid_from),
            certificate_expiry_date: Some(valid_until),
            certificate_issuer: issuer,
            certificate_id,
            signature_state,
            ..Default::default()
        };
        cert.raw_data = data.to_vec();
        Some(HealthCertificate::Test(cert))
    } else {
        let mut cert = VaccinationCertificate {
            country: "NL".to_owned(),
            disease: "COVID-19".to_owned(),
            name: name.trim().to_owned(),
            date_of_birth,
            certificate_issue_date: Some(valid_from),
            certificate_expiry_date: Some(valid_until),
            certificate_issuer: issuer,
            certificate_id,
            signature_state,
            ..Default::default()
        };
        cert.raw_data = data.to_vec();
        Some(HealthCertificate::Vaccination(cert))
    }
}

/// Recover a disclosed attribute's byte string.
///
/// The wire encoding multiplies attribute values by two, using the least
/// significant bit as a presence marker.
fn decode_attribute(value: &BigUint) -> Vec<u8> {
    let halved = value >> 1u32;
    if halved.is_zero() {
        return Vec::new();
    }
    halved.to_bytes_be()
}

fn attribute_string(value: &BigUint) -> String {
    String::from_utf8(decode_attribute(value)).unwrap_or_default()
}

fn verify_proof(
    proof: &IrmaProof,
    issuer: &str,
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> SignatureValidation {
    let Some(xml) = store.irma_key(issuer) else {
        log_item!("irma", "no public key for issuer", "verify_proof")
            .validation_status(SIGNER_NOT_FOUND)
            .failure_no_throw(tracker, format!("issuer {issuer}"));
        return SignatureValidation::Unknown;
    };

    let key = match IrmaPublicKey::from_xml(xml) {
        Ok(key) => key,
        Err(err) => {
            log_item!("irma", "stored public key is unusable", "verify_proof")
                .failure_no_throw(tracker, err);
            return SignatureValidation::Unknown;
        }
    };

    match irma::verify(proof, &key) {
        Ok(true) => {
            log_item!("irma", "disclosure proof validated", "verify_proof")
                .validation_status(SIGNATURE_VALIDATED)
                .success(tracker);
            SignatureValidation::Valid
        }
        Ok(false) => {
            log_item!("irma", "challenge does not match", "verify_proof")
                .validation_status(PROOF_CHALLENGE_MISMATCH)
                .failure_no_throw(tracker, "challenge mismatch");
            SignatureValidation::Invalid
        }
        Err(err) => {
            log_item!("irma", "proof cannot be verified with this key", "verify_proof")
                .failure_no_throw(tracker, err);
            SignatureValidation::Unknown
        }
    }
}
