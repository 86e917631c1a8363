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

//! End-to-end tests for the NL CoronaCheck parser: the Dutch Base45
//! variant, the ASN.1 proof structure, and the IRMA verification paths.

mod common;

use chrono::{NaiveDate, TimeZone, Utc};
use hcert::{
    CertificateValidation, HealthCertificate, SignatureValidation, TestResult, TrustStore,
};
use num_bigint::{BigUint, RandBigInt};
use rand::rngs::OsRng;

const NL_ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Encode bytes in the whole-string base-45 variant (the inverse of the
/// decoder under test).
fn nl_base45_encode(data: &[u8]) -> Vec<u8> {
    let mut value = BigUint::from_bytes_be(data);
    let forty_five = BigUint::from(45u32);
    let mut out = Vec::new();
    while value > BigUint::from(0u32) {
        let digit = (&value % &forty_five).to_u32_digits();
        out.push(NL_ALPHABET[digit.first().copied().unwrap_or(0) as usize]);
        value /= &forty_five;
    }
    out.reverse();
    out
}

/// A disclosed attribute: the wire form doubles the value.
fn attribute(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes) << 1u32
}

fn metadata_attribute(issuer: &str) -> BigUint {
    let inner = common::der_seq(&[
        common::der_octet_string(&[0x02]),
        common::der_printable_string(issuer),
    ]);
    BigUint::from_bytes_be(&inner) << 1u32
}

struct ProofSpec {
    issuer: &'static str,
    valid_from: i64,
    valid_hours: u32,
    is_specimen: bool,
}

fn build_nl(spec: &ProofSpec) -> Vec<u8> {
    let mut rng = OsRng;

    let disclosed = [
        metadata_attribute(spec.issuer),
        attribute(if spec.is_specimen { b"1" } else { b"0" }),
        attribute(b"0"), // paper proof flag
        attribute(spec.valid_from.to_string().as_bytes()),
        attribute(spec.valid_hours.to_string().as_bytes()),
        attribute(b"B"),
        attribute(b"B"),
        attribute(b"31"),
        attribute(b"7"),
    ];

    let mut members = vec![
        hcert_crypto::der::encode_integer(&BigUint::from(1627465200u64)), // disclosure time
        hcert_crypto::der::encode_integer(&rng.gen_biguint(256)),         // C
        hcert_crypto::der::encode_integer(&rng.gen_biguint(2000)),        // A
        hcert_crypto::der::encode_integer(&rng.gen_biguint(600)),         // EResponse
        hcert_crypto::der::encode_integer(&rng.gen_biguint(2000)),        // VResponse
        hcert_crypto::der::encode_integer(&rng.gen_biguint(500)),         // AResponse
    ];
    let disclosed_members: Vec<Vec<u8>> = disclosed
        .iter()
        .map(hcert_crypto::der::encode_integer)
        .collect();
    members.push(hcert_crypto::der::encode_sequence(&disclosed_members));
    let sequence = hcert_crypto::der::encode_sequence(&members);

    let mut out = b"NL2:".to_vec();
    out.extend_from_slice(&nl_base45_encode(&sequence));
    out
}

fn irma_key_xml() -> String {
    let mut rng = OsRng;
    let mut n = rng.gen_biguint(2048);
    n.set_bit(2047, true);
    n.set_bit(0, true);
    let z = rng.gen_biguint_below(&n);
    let s = rng.gen_biguint_below(&n);
    let bases: String = (0..12)
        .map(|i| format!("<Base_{i}>{}</Base_{i}>", rng.gen_biguint_below(&n)))
        .collect();
    format!(
        "<IssuerPublicKey><Elements><n>{n}</n><Z>{z}</Z><S>{s}</S>\
         <Bases num=\"12\">{bases}</Bases></Elements></IssuerPublicKey>"
    )
}

fn test_spec() -> ProofSpec {
    ProofSpec {
        issuer: "testissuer",
        valid_from: 1627466400, // 2021-07-28T10:00:00Z
        valid_hours: 25,
        is_specimen: false,
    }
}

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 7, 28, 18, 0, 0).single().expect("timestamp")
}

#[test]
fn short_window_is_a_test_certificate() {
    let data = build_nl(&test_spec());
    let mut store = TrustStore::with_bundled_resources();
    store.add_irma_key("testissuer", irma_key_xml());

    let cert = hcert::parse_with(&data, &store).expect("certificate");
    let HealthCertificate::Test(test) = &cert else {
        panic!("expected a test certificate");
    };

    assert_eq!(test.name, "B B");
    assert_eq!(test.date_of_birth, NaiveDate::from_ymd_opt(1900, 7, 31));
    assert_eq!(test.country, "NL");
    assert_eq!(test.disease, "COVID-19");
    assert_eq!(test.result, TestResult::Negative);
    assert_eq!(test.certificate_issuer, "testissuer");
    assert_eq!(
        test.certificate_issue_date,
        Utc.with_ymd_and_hms(2021, 7, 28, 10, 0, 0).single()
    );
    assert_eq!(
        test.certificate_expiry_date,
        Utc.with_ymd_and_hms(2021, 7, 29, 11, 0, 0).single()
    );
    // a random proof cannot satisfy the Fiat-Shamir challenge
    assert_eq!(test.signature_state, SignatureValidation::Invalid);
    assert_eq!(
        cert.validation_state_at(fixed_now()),
        CertificateValidation::Invalid
    );
    assert_eq!(cert.raw_data(), data.as_slice());
    // two days after the sample date
    assert_eq!(
        cert.relevant_until(),
        Utc.with_ymd_and_hms(2021, 7, 30, 0, 0, 0).single()
    );
}

#[test]
fn long_window_is_a_vaccination_certificate() {
    let spec = ProofSpec {
        valid_hours: 744,
        ..test_spec()
    };
    let data = build_nl(&spec);
    let mut store = TrustStore::with_bundled_resources();
    store.add_irma_key("testissuer", irma_key_xml());

    let cert = hcert::parse_with(&data, &store).expect("certificate");
    assert!(matches!(cert, HealthCertificate::Vaccination(_)));
    assert_eq!(cert.name(), "B B");
}

#[test]
fn missing_issuer_key_is_unknown() {
    let data = build_nl(&test_spec());
    let cert =
        hcert::parse_with(&data, &TrustStore::with_bundled_resources()).expect("certificate");
    assert_eq!(cert.signature_state(), SignatureValidation::Unknown);
    assert_eq!(
        cert.validation_state_at(fixed_now()),
        CertificateValidation::Partial
    );
}

#[test]
fn specimen_certificates_are_invalid() {
    let spec = ProofSpec {
        is_specimen: true,
        ..test_spec()
    };
    let data = build_nl(&spec);
    let mut store = TrustStore::with_bundled_resources();
    store.add_irma_key("testissuer", irma_key_xml());

    let cert = hcert::parse_with(&data, &store).expect("certificate");
    assert_eq!(cert.signature_state(), SignatureValidation::Invalid);
}

#[test]
fn unsupported_key_size_is_unknown() {
    let data = build_nl(&test_spec());
    let mut store = TrustStore::with_bundled_resources();
    // a 1536-bit modulus has no defined system parameters
    let mut rng = OsRng;
    let mut n = rng.gen_biguint(1536);
    n.set_bit(1535, true);
    n.set_bit(0, true);
    store.add_irma_key(
        "testissuer",
        format!(
            "<IssuerPublicKey><Elements><n>{n}</n><Z>5</Z><S>7</S>\
             <Bases num=\"1\"><Base_0>11</Base_0></Bases></Elements></IssuerPublicKey>"
        ),
    );

    let cert = hcert::parse_with(&data, &store).expect("certificate");
    assert_eq!(cert.signature_state(), SignatureValidation::Unknown);
}

#[test]
fn malformed_structures_are_absent() {
    // wrong root type
    let mut out = b"NL2:".to_vec();
    out.extend_from_slice(&nl_base45_encode(&[0x02, 0x01, 0x05]));
    assert!(hcert::parse(&out).is_none());

    // too few disclosed attributes
    let mut members: Vec<Vec<u8>> = (0..6)
        .map(|_| hcert_crypto::der::encode_integer(&BigUint::from(5u32)))
        .collect();
    members.push(hcert_crypto::der::encode_sequence(&[
        hcert_crypto::der::encode_integer(&metadata_attribute("x")),
    ]));
    let sequence = hcert_crypto::der::encode_sequence(&members);
    let mut out = b"NL2:".to_vec();
    out.extend_from_slice(&nl_base45_encode(&sequence));
    assert!(hcert::parse(&out).is_none());
}
