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

//! End-to-end tests for the ICAO VDS-NC parser, including the
//! chain-of-trust lookup through the authority key identifier.

mod common;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{NaiveDate, TimeZone, Utc};
use hcert::{
    CertificateValidation, HealthCertificate, SignatureValidation, TestResult, TrustStore,
};
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use serde_json::Value;

const CSCA_KEY_ID: &[u8] = &[0x42; 20];
const SIGNER_KEY_ID: &[u8] = &[0x17; 20];

fn vaccination_message() -> Value {
    serde_json::json!({
        "data": {
            "hdr": {"is": "AUS", "t": "icao.vacc", "v": 1},
            "msg": {
                "pid": {"dob": "1990-01-02", "n": "Smith Bill", "sex": "M"},
                "uvci": "U32870",
                "ve": [
                    {
                        "des": "XM0GQ8",
                        "dis": "RA01",
                        "nam": "Comirnaty",
                        "vd": [
                            {
                                "adm": "General Practitioner",
                                "ctr": "AUS",
                                "dvc": "2021-03-03",
                                "lot": "VC52099",
                                "seq": 1
                            }
                        ]
                    }
                ]
            }
        }
    })
}

fn test_message() -> Value {
    serde_json::json!({
        "data": {
            "hdr": {"is": "AUS", "t": "icao.test", "v": 1},
            "msg": {
                "pid": {"dob": "1990-01-29", "n": "Cook Gerald"},
                "utci": "U01932",
                "sp": {"ctr": "AUS", "spn": "General Hospital"},
                "dat": {"rt": "2020-12-12T12:00:19+00:00", "sc": "2020-12-12T00:00:01+00:00"},
                "tr": {"r": "negative", "tc": "molecular(PCR)"}
            }
        }
    })
}

/// Sign the compact key-ordered serialization of the `data` object and
/// attach the detached signature object.
fn attach_signature(mut root: Value, signer_key: &SigningKey, signer_cert: &[u8]) -> Vec<u8> {
    let canonical = serde_json::to_vec(&root["data"]).expect("canonical json");
    let signature: Signature = signer_key.sign(&canonical);

    root["sig"] = serde_json::json!({
        "alg": "ES256",
        "cer": URL_SAFE_NO_PAD.encode(signer_cert),
        "sigvl": URL_SAFE_NO_PAD.encode(signature.to_bytes()),
    });
    serde_json::to_vec(&root).expect("json")
}

struct Chain {
    signer_key: SigningKey,
    signer_cert: Vec<u8>,
    csca_cert: Vec<u8>,
}

fn build_chain() -> Chain {
    let (csca_key, csca_spki) = common::p256_keypair();
    let (signer_key, signer_spki) = common::p256_keypair();

    let csca_cert =
        common::build_certificate("test CSCA", &csca_spki, CSCA_KEY_ID, CSCA_KEY_ID, &csca_key);
    let signer_cert = common::build_certificate(
        "test BSC",
        &signer_spki,
        SIGNER_KEY_ID,
        CSCA_KEY_ID,
        &csca_key,
    );

    Chain {
        signer_key,
        signer_cert,
        csca_cert,
    }
}

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 4, 1, 12, 0, 0).single().expect("timestamp")
}

#[test]
fn vaccination_with_full_chain_is_valid() {
    let chain = build_chain();
    let data = attach_signature(vaccination_message(), &chain.signer_key, &chain.signer_cert);

    let mut store = TrustStore::with_bundled_resources();
    store.add_icao_issuer(hex::encode(CSCA_KEY_ID), chain.csca_cert.clone());

    let cert = hcert::parse_with(&data, &store).expect("certificate");
    let HealthCertificate::Vaccination(vac) = &cert else {
        panic!("expected a vaccination certificate");
    };

    assert_eq!(vac.name, "Smith Bill");
    assert_eq!(vac.date_of_birth, NaiveDate::from_ymd_opt(1990, 1, 2));
    assert_eq!(vac.country, "AUS");
    assert_eq!(vac.dose, 1);
    assert_eq!(vac.total_doses, 0);
    assert_eq!(vac.date, NaiveDate::from_ymd_opt(2021, 3, 3));
    assert_eq!(vac.disease, "COVID-19");
    assert_eq!(vac.vaccine, "Comirnaty");
    assert_eq!(vac.vaccine_type, "XM0GQ8");
    assert_eq!(vac.certificate_id, "U32870");
    assert_eq!(vac.signature_state, SignatureValidation::Valid);
    assert_eq!(
        cert.validation_state_at(fixed_now()),
        CertificateValidation::Valid
    );
    assert_eq!(cert.raw_data(), data.as_slice());
}

#[test]
fn missing_issuer_yields_unchecked() {
    let chain = build_chain();
    let data = attach_signature(vaccination_message(), &chain.signer_key, &chain.signer_cert);

    // no CSCA certificate in the store: content verifiable, chain is not
    let store = TrustStore::with_bundled_resources();
    let cert = hcert::parse_with(&data, &store).expect("certificate");
    assert_eq!(cert.signature_state(), SignatureValidation::Unchecked);
    assert_eq!(
        cert.validation_state_at(fixed_now()),
        CertificateValidation::Valid
    );
}

#[test]
fn wrong_issuer_yields_invalid() {
    let chain = build_chain();
    let data = attach_signature(vaccination_message(), &chain.signer_key, &chain.signer_cert);

    // an unrelated certificate under the same key id: every candidate fails
    let (unrelated_key, unrelated_spki) = common::p256_keypair();
    let unrelated_cert = common::build_certificate(
        "unrelated CSCA",
        &unrelated_spki,
        CSCA_KEY_ID,
        CSCA_KEY_ID,
        &unrelated_key,
    );
    let mut store = TrustStore::with_bundled_resources();
    store.add_icao_issuer(hex::encode(CSCA_KEY_ID), unrelated_cert);

    let cert = hcert::parse_with(&data, &store).expect("certificate");
    assert_eq!(cert.signature_state(), SignatureValidation::Invalid);
    assert_eq!(
        cert.validation_state_at(fixed_now()),
        CertificateValidation::Invalid
    );
}

#[test]
fn any_issuer_candidate_success_is_sufficient() {
    let chain = build_chain();
    let data = attach_signature(vaccination_message(), &chain.signer_key, &chain.signer_cert);

    let (unrelated_key, unrelated_spki) = common::p256_keypair();
    let unrelated_cert = common::build_certificate(
        "unrelated CSCA",
        &unrelated_spki,
        CSCA_KEY_ID,
        CSCA_KEY_ID,
        &unrelated_key,
    );
    let mut store = TrustStore::with_bundled_resources();
    store.add_icao_issuer(hex::encode(CSCA_KEY_ID), unrelated_cert);
    store.add_icao_issuer(hex::encode(CSCA_KEY_ID), chain.csca_cert.clone());

    let cert = hcert::parse_with(&data, &store).expect("certificate");
    assert_eq!(cert.signature_state(), SignatureValidation::Valid);
}

#[test]
fn tampered_content_is_invalid() {
    let chain = build_chain();
    let data = attach_signature(vaccination_message(), &chain.signer_key, &chain.signer_cert);
    // re-parse, tweak a signed field, re-serialize
    let mut doc: Value = serde_json::from_slice(&data).expect("json");
    doc["data"]["msg"]["uvci"] = Value::String("U99999".into());
    let tampered = serde_json::to_vec(&doc).expect("json");

    let mut store = TrustStore::with_bundled_resources();
    store.add_icao_issuer(hex::encode(CSCA_KEY_ID), chain.csca_cert.clone());

    let cert = hcert::parse_with(&tampered, &store).expect("certificate");
    assert_eq!(cert.signature_state(), SignatureValidation::Invalid);
}

#[test]
fn test_certificate_without_signature_is_unchecked() {
    let data = serde_json::to_vec(&test_message()).expect("json");
    let cert =
        hcert::parse_with(&data, &TrustStore::with_bundled_resources()).expect("certificate");
    let HealthCertificate::Test(test) = &cert else {
        panic!("expected a test certificate");
    };

    assert_eq!(test.name, "Cook Gerald");
    assert_eq!(test.date_of_birth, NaiveDate::from_ymd_opt(1990, 1, 29));
    assert_eq!(test.country, "AUS");
    assert_eq!(test.test_center, "General Hospital");
    assert_eq!(test.date, NaiveDate::from_ymd_opt(2020, 12, 12));
    assert_eq!(test.result, TestResult::Negative);
    assert_eq!(test.result_string, "negative");
    assert_eq!(test.test_type, "molecular(PCR)");
    assert_eq!(test.certificate_id, "U01932");
    assert_eq!(test.signature_state, SignatureValidation::Unchecked);
}

#[test]
fn singleton_array_wrapping_is_accepted() {
    let data = serde_json::to_vec(&serde_json::json!([test_message()])).expect("json");
    assert!(hcert::parse_with(&data, &TrustStore::with_bundled_resources()).is_some());
}

#[test]
fn wrong_header_version_is_absent() {
    let mut root = test_message();
    root["data"]["hdr"]["v"] = serde_json::json!(2);
    let data = serde_json::to_vec(&root).expect("json");
    assert!(hcert::parse_with(&data, &TrustStore::with_bundled_resources()).is_none());
}

#[test]
fn garbage_signer_certificate_is_unknown() {
    let mut root = vaccination_message();
    root["sig"] = serde_json::json!({
        "alg": "ES256",
        "cer": URL_SAFE_NO_PAD.encode(b"not a certificate"),
        "sigvl": URL_SAFE_NO_PAD.encode([0u8; 64]),
    });
    let data = serde_json::to_vec(&root).expect("json");
    let cert =
        hcert::parse_with(&data, &TrustStore::with_bundled_resources()).expect("certificate");
    assert_eq!(cert.signature_state(), SignatureValidation::Unknown);
}
