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

//! Test support: deterministic signing keys and a minimal X.509 builder for
//! synthesizing trust material at test time.

#![allow(dead_code)] // not every test file uses every helper

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::{
    ecdsa::{signature::Signer, Signature, SigningKey},
    pkcs8::EncodePublicKey,
};
use rand::rngs::OsRng;

/// A fresh P-256 key pair as (signing key, SPKI DER).
pub fn p256_keypair() -> (SigningKey, Vec<u8>) {
    let signing_key = SigningKey::random(&mut OsRng);
    let spki = signing_key
        .verifying_key()
        .to_public_key_der()
        .expect("SPKI encoding")
        .into_vec();
    (signing_key, spki)
}

/// The P-256 public key as a JWK document.
pub fn p256_jwk(signing_key: &SigningKey) -> Vec<u8> {
    let point = signing_key.verifying_key().to_encoded_point(false);
    serde_json::json!({
        "kty": "EC",
        "crv": "P-256",
        "x": URL_SAFE_NO_PAD.encode(point.x().expect("x coordinate")),
        "y": URL_SAFE_NO_PAD.encode(point.y().expect("y coordinate")),
    })
    .to_string()
    .into_bytes()
}

// --- minimal DER building blocks ---

pub fn der(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    if content.len() < 0x80 {
        out.push(content.len() as u8);
    } else {
        let bytes = content.len().to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
    out.extend_from_slice(content);
    out
}

pub fn der_seq(members: &[Vec<u8>]) -> Vec<u8> {
    der(0x30, &members.concat())
}

pub fn der_int(value: &[u8]) -> Vec<u8> {
    der(0x02, value)
}

pub fn der_oid(encoded: &[u8]) -> Vec<u8> {
    der(0x06, encoded)
}

pub fn der_octet_string(content: &[u8]) -> Vec<u8> {
    der(0x04, content)
}

pub fn der_printable_string(text: &str) -> Vec<u8> {
    der(0x13, text.as_bytes())
}

fn der_utctime(text: &str) -> Vec<u8> {
    der(0x17, text.as_bytes())
}

fn der_bitstring(content: &[u8]) -> Vec<u8> {
    let mut padded = vec![0u8];
    padded.extend_from_slice(content);
    der(0x03, &padded)
}

const OID_ECDSA_WITH_SHA256: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02];
const OID_COMMON_NAME: &[u8] = &[0x55, 0x04, 0x03];
const OID_SUBJECT_KEY_ID: &[u8] = &[0x55, 0x1d, 0x0e];
const OID_AUTHORITY_KEY_ID: &[u8] = &[0x55, 0x1d, 0x23];

fn name(common_name: &str) -> Vec<u8> {
    let attribute = der_seq(&[der_oid(OID_COMMON_NAME), der_printable_string(common_name)]);
    der_seq(&[der(0x31, &attribute)]) // SET OF one attribute
}

fn extension(oid: &[u8], inner: &[u8]) -> Vec<u8> {
    der_seq(&[der_oid(oid), der_octet_string(inner)])
}

/// Build a DER certificate with subject/authority key id extensions, signed
/// with ECDSA P-256 / SHA-256 by `issuer_key`.
///
/// Only the fields the verification paths read are populated with
/// meaningful values; this is trust-store fodder, not a general-purpose CA.
pub fn build_certificate(
    subject_cn: &str,
    subject_spki_der: &[u8],
    subject_key_id: &[u8],
    authority_key_id: &[u8],
    issuer_key: &SigningKey,
) -> Vec<u8> {
    let ski_inner = der_octet_string(subject_key_id);
    let aki_inner = der_seq(&[der(0x80, authority_key_id)]); // [0] IMPLICIT KeyIdentifier
    let extensions = der_seq(&[
        extension(OID_SUBJECT_KEY_ID, &ski_inner),
        extension(OID_AUTHORITY_KEY_ID, &aki_inner),
    ]);

    let tbs = der_seq(&[
        der(0xa0, &der_int(&[0x02])), // [0] EXPLICIT version v3
        der_int(&[0x01]),
        der_seq(&[der_oid(OID_ECDSA_WITH_SHA256)]),
        name("hcert test issuer"),
        der_seq(&[
            der_utctime("200101000000Z"),
            der_utctime("301231235959Z"),
        ]),
        name(subject_cn),
        subject_spki_der.to_vec(),
        der(0xa3, &extensions), // [3] EXPLICIT extensions
    ]);

    let signature: Signature = issuer_key.sign(&tbs);
    let signature_der = signature.to_der();

    der_seq(&[
        tbs,
        der_seq(&[der_oid(OID_ECDSA_WITH_SHA256)]),
        der_bitstring(signature_der.as_bytes()),
    ])
}

#[cfg(test)]
mod self_checks {
    use super::*;

    #[test]
    fn built_certificates_parse_and_verify() {
        let (issuer_key, issuer_spki) = p256_keypair();
        let (_, subject_spki) = p256_keypair();

        let cert = build_certificate(
            "signer",
            &subject_spki,
            &[0x11; 20],
            &[0x22; 20],
            &issuer_key,
        );

        assert_eq!(
            hcert_crypto::x509::public_key_der(&cert).expect("SPKI"),
            subject_spki
        );
        assert_eq!(
            hcert_crypto::x509::subject_key_id(&cert).as_deref(),
            Some(hex::encode([0x11; 20]).as_str())
        );
        assert_eq!(
            hcert_crypto::x509::authority_key_id(&cert).as_deref(),
            Some(hex::encode([0x22; 20]).as_str())
        );
        assert!(hcert_crypto::x509::verify_cert_signature(&cert, &issuer_spki).is_ok());
    }
}
