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

//! COSE_Sign1 envelope parsing and verification (RFC 8152).
//!
//! Only the single-signer `COSE_Sign1` structure is supported; multi-signer
//! `COSE_Sign` messages are out of scope.

use thiserror::Error;

use crate::{
    cbor::{CborError, Reader, Writer},
    raw_signature::{
        validator_for_signing_alg, RawSignatureValidationError, SigningAlg,
    },
};

/// CBOR tag identifying a COSE_Sign1 message (RFC 8152 §2).
const COSE_SIGN1_TAG: u64 = 18;

const HEADER_ALG: i64 = 1;
const HEADER_KID: i64 = 4;

/// Describes errors that can occur while parsing a COSE_Sign1 envelope.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CoseError {
    /// The outer CBOR tag is not COSE_Sign1.
    #[error("not a COSE_Sign1 message")]
    NotCoseSign1,

    /// The 4-element signing structure is malformed.
    #[error("malformed COSE_Sign1 structure: {0}")]
    Malformed(#[from] CborError),
}

/// A parsed COSE_Sign1 message.
///
/// The protected header bytes are kept verbatim: they are part of the signed
/// structure, and re-encoding them would break verification silently.
#[derive(Debug, Default, PartialEq)]
pub struct CoseSign1 {
    /// Raw protected header bytes, exactly as they appeared on the wire.
    pub protected: Vec<u8>,

    /// The signature algorithm from the protected headers, if present.
    pub algorithm: Option<i64>,

    /// Key id, from the protected headers or, failing that, the unprotected
    /// headers.
    pub key_id: Vec<u8>,

    /// The signed content.
    pub payload: Vec<u8>,

    /// The signature bytes.
    pub signature: Vec<u8>,
}

impl CoseSign1 {
    /// Parse a COSE_Sign1 message.
    pub fn parse(data: &[u8]) -> Result<Self, CoseError> {
        let mut reader = Reader::new(data);
        let tag = reader.read_tag().map_err(|_| CoseError::NotCoseSign1)?;
        if tag != COSE_SIGN1_TAG {
            return Err(CoseError::NotCoseSign1);
        }
        if !reader.is_array() {
            return Err(CoseError::NotCoseSign1);
        }

        reader.enter_container()?;

        let protected = reader.read_bytes()?;
        let (algorithm, mut key_id) = read_protected_headers(&protected);

        // the key id may live in the unprotected header map instead
        if reader.is_map() {
            reader.enter_container()?;
            while reader.has_next() {
                if !reader.is_integer() {
                    reader.skip_value()?;
                    reader.skip_value()?;
                    continue;
                }
                let key = reader.read_integer()?;
                if key == HEADER_KID && key_id.is_empty() && reader.is_bytes() {
                    key_id = reader.read_bytes()?;
                } else {
                    reader.skip_value()?;
                }
            }
            reader.leave_container()?;
        } else {
            reader.skip_value()?;
        }

        let payload = reader.read_bytes()?;
        let signature = reader.read_bytes()?;

        Ok(Self {
            protected,
            algorithm,
            key_id,
            payload,
            signature,
        })
    }

    /// The raw data that is signed, see RFC 8152 §4.4.
    pub fn sig_structure(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.array(4);
        writer.text("Signature1");
        writer.bytes(&self.protected);
        writer.bytes(&[]);
        writer.bytes(&self.payload);
        writer.into_bytes()
    }

    /// Verify the signature against a signer public key (SPKI DER).
    pub fn verify(&self, public_key: &[u8]) -> Result<(), RawSignatureValidationError> {
        let alg = self
            .algorithm
            .and_then(SigningAlg::from_cose_alg)
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        validator_for_signing_alg(alg).validate(&self.signature, &self.sig_structure(), public_key)
    }
}

/// Decode the protected header bytes as a CBOR map and extract the signature
/// algorithm and key id.
fn read_protected_headers(protected: &[u8]) -> (Option<i64>, Vec<u8>) {
    let mut algorithm = None;
    let mut key_id = Vec::new();

    let mut reader = Reader::new(protected);
    if !reader.is_map() || reader.enter_container().is_err() {
        return (algorithm, key_id);
    }
    while reader.has_next() {
        if !reader.is_integer() {
            if reader.skip_value().is_err() || reader.skip_value().is_err() {
                break;
            }
            continue;
        }
        let Ok(key) = reader.read_integer() else {
            break;
        };
        match key {
            HEADER_ALG if reader.is_integer() => {
                algorithm = reader.read_integer().ok();
            }
            HEADER_KID if reader.is_bytes() => {
                key_id = reader.read_bytes().unwrap_or_default();
            }
            _ => {
                if reader.skip_value().is_err() {
                    break;
                }
            }
        }
    }

    (algorithm, key_id)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use p256::{
        ecdsa::{signature::Signer, Signature, SigningKey},
        pkcs8::EncodePublicKey,
    };
    use rand::rngs::OsRng;

    use super::*;
    use crate::cbor::Writer;

    fn build_sign1(
        protected: &[u8],
        unprotected_kid: Option<&[u8]>,
        payload: &[u8],
        signature: &[u8],
    ) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.tag(COSE_SIGN1_TAG);
        writer.array(4);
        writer.bytes(protected);
        match unprotected_kid {
            Some(kid) => {
                writer.map(1);
                writer.integer(HEADER_KID);
                writer.bytes(kid);
            }
            None => writer.map(0),
        }
        writer.bytes(payload);
        writer.bytes(signature);
        writer.into_bytes()
    }

    fn protected_headers(alg: i64, kid: Option<&[u8]>) -> Vec<u8> {
        let mut writer = Writer::new();
        match kid {
            Some(kid) => {
                writer.map(2);
                writer.integer(HEADER_ALG);
                writer.integer(alg);
                writer.integer(HEADER_KID);
                writer.bytes(kid);
            }
            None => {
                writer.map(1);
                writer.integer(HEADER_ALG);
                writer.integer(alg);
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn parses_headers_and_payload() {
        let protected = protected_headers(-7, Some(b"key-1"));
        let message = build_sign1(&protected, None, b"claims", &[0xab; 64]);

        let sign1 = CoseSign1::parse(&message).unwrap();
        assert_eq!(sign1.algorithm, Some(-7));
        assert_eq!(sign1.key_id, b"key-1");
        assert_eq!(sign1.payload, b"claims");
        assert_eq!(sign1.signature, vec![0xab; 64]);
        assert_eq!(sign1.protected, protected);
    }

    #[test]
    fn kid_falls_back_to_unprotected_headers() {
        let protected = protected_headers(-7, None);
        let message = build_sign1(&protected, Some(b"key-2"), b"claims", &[0xab; 64]);

        let sign1 = CoseSign1::parse(&message).unwrap();
        assert_eq!(sign1.key_id, b"key-2");
    }

    #[test]
    fn sig_structure_is_byte_exact() {
        let sign1 = CoseSign1 {
            protected: vec![0xa1, 0x01, 0x26],
            payload: b"p".to_vec(),
            ..Default::default()
        };
        assert_eq!(
            sign1.sig_structure(),
            [
                0x84, 0x6a, b'S', b'i', b'g', b'n', b'a', b't', b'u', b'r', b'e', b'1', 0x43, 0xa1,
                0x01, 0x26, 0x40, 0x41, b'p'
            ]
        );
    }

    #[test]
    fn wrong_tag_is_not_cose_sign1() {
        let mut writer = Writer::new();
        writer.tag(98); // COSE_Sign
        writer.array(4);
        writer.bytes(&[]);
        writer.map(0);
        writer.bytes(&[]);
        writer.bytes(&[]);
        assert_eq!(
            CoseSign1::parse(&writer.into_bytes()),
            Err(CoseError::NotCoseSign1)
        );
    }

    #[test]
    fn sign_then_verify_round_trip() {
        let signing_key = SigningKey::random(&mut OsRng);
        let spki = signing_key
            .verifying_key()
            .to_public_key_der()
            .unwrap()
            .into_vec();

        let protected = protected_headers(-7, Some(b"kid"));
        let mut unsigned = CoseSign1 {
            protected: protected.clone(),
            algorithm: Some(-7),
            payload: b"health certificate claims".to_vec(),
            ..Default::default()
        };
        let signature: Signature = signing_key.sign(&unsigned.sig_structure());
        unsigned.signature = signature.to_bytes().to_vec();

        let message = build_sign1(
            &protected,
            None,
            &unsigned.payload,
            &unsigned.signature,
        );
        let sign1 = CoseSign1::parse(&message).unwrap();
        assert_eq!(sign1.verify(&spki), Ok(()));

        let mut tampered = message.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        let bad = CoseSign1::parse(&tampered).unwrap();
        assert_eq!(
            bad.verify(&spki),
            Err(RawSignatureValidationError::SignatureMismatch)
        );
    }

    #[test]
    fn unsupported_algorithm_is_flagged() {
        let protected = protected_headers(-8, None); // EdDSA
        let message = build_sign1(&protected, None, b"x", &[0u8; 64]);
        let sign1 = CoseSign1::parse(&message).unwrap();
        assert_eq!(
            sign1.verify(&[0u8; 32]),
            Err(RawSignatureValidationError::UnsupportedAlgorithm)
        );
    }
}
