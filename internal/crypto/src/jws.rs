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

//! Compact JWS/JWT parsing and verification (RFC 7515).

use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    inflate,
    raw_signature::{validator_for_signing_alg, RawSignatureValidationError, SigningAlg},
};

/// Describes errors that can occur while parsing a compact JWS.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JwsError {
    /// The input is not a dot-separated triple.
    #[error("not a compact JWS")]
    NotCompactJws,

    /// A segment is not valid base64url.
    #[error("invalid base64url segment")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The JOSE header is not a valid JSON object.
    #[error("malformed JOSE header")]
    MalformedHeader,

    /// The compressed payload failed to decompress.
    #[error(transparent)]
    Decompress(#[from] inflate::InflateError),
}

/// The JOSE header fields used by the health certificate formats.
#[derive(Debug, Default, Deserialize)]
pub struct JoseHeader {
    /// Signature algorithm name ("ES256", "PS256", ...).
    #[serde(default)]
    pub alg: String,

    /// Key id used to resolve the verification key.
    #[serde(default)]
    pub kid: Option<String>,

    /// Payload compression; `DEF` means raw deflate.
    #[serde(default)]
    pub zip: Option<String>,
}

/// A decoded compact JWS.
#[derive(Debug)]
pub struct CompactJws {
    /// Decoded JOSE header.
    pub header: JoseHeader,

    /// Decoded (and, when `zip: DEF`, decompressed) payload bytes.
    pub payload: Vec<u8>,

    /// Decoded signature bytes.
    pub signature: Vec<u8>,

    /// The ASCII `header.payload` bytes exactly as transmitted; this is the
    /// signed content (RFC 7515 §5.1).
    pub signing_input: Vec<u8>,
}

impl CompactJws {
    /// Split and decode a compact JWS.
    pub fn parse(data: &[u8]) -> Result<Self, JwsError> {
        let first_dot = data
            .iter()
            .position(|&b| b == b'.')
            .ok_or(JwsError::NotCompactJws)?;
        let second_dot = data[first_dot + 1..]
            .iter()
            .position(|&b| b == b'.')
            .map(|p| p + first_dot + 1)
            .ok_or(JwsError::NotCompactJws)?;

        let header_bytes = URL_SAFE_NO_PAD.decode(&data[..first_dot])?;
        let header: JoseHeader =
            serde_json::from_slice(&header_bytes).map_err(|_| JwsError::MalformedHeader)?;

        let mut payload = URL_SAFE_NO_PAD.decode(&data[first_dot + 1..second_dot])?;
        if header.zip.as_deref() == Some("DEF") {
            payload = inflate::deflate(&payload)?;
        }

        let signature = URL_SAFE_NO_PAD.decode(&data[second_dot + 1..])?;

        Ok(Self {
            header,
            payload,
            signature,
            signing_input: data[..second_dot].to_vec(),
        })
    }

    /// Verify the signature against a public key (SPKI DER).
    ///
    /// Only the ECDSA family is accepted here; an unsupported `alg` is
    /// reported as a failure, never silently accepted.
    pub fn verify(&self, public_key: &[u8]) -> Result<(), RawSignatureValidationError> {
        let alg = match SigningAlg::from_str(&self.header.alg) {
            Ok(alg @ (SigningAlg::Es256 | SigningAlg::Es384 | SigningAlg::Es512)) => alg,
            _ => {
                log::warn!("signature algorithm not supported: {}", self.header.alg);
                return Err(RawSignatureValidationError::UnsupportedAlgorithm);
            }
        };

        validator_for_signing_alg(alg).validate(&self.signature, &self.signing_input, public_key)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Write;

    use flate2::{write::DeflateEncoder, Compression};
    use p256::{
        ecdsa::{signature::Signer, Signature, SigningKey},
        pkcs8::EncodePublicKey,
    };
    use rand::rngs::OsRng;

    use super::*;

    fn b64(data: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(data)
    }

    fn build_jws(header: &str, payload: &[u8], signing_key: &SigningKey) -> Vec<u8> {
        let mut out = format!("{}.{}", b64(header.as_bytes()), b64(payload));
        let signature: Signature = signing_key.sign(out.as_bytes());
        out.push('.');
        out.push_str(&b64(&signature.to_bytes()));
        out.into_bytes()
    }

    #[test]
    fn parse_and_verify_es256() {
        let signing_key = SigningKey::random(&mut OsRng);
        let spki = signing_key
            .verifying_key()
            .to_public_key_der()
            .unwrap()
            .into_vec();

        let data = build_jws(
            r#"{"alg":"ES256","kid":"abc"}"#,
            br#"{"iss":"https://example.org"}"#,
            &signing_key,
        );

        let jws = CompactJws::parse(&data).unwrap();
        assert_eq!(jws.header.alg, "ES256");
        assert_eq!(jws.header.kid.as_deref(), Some("abc"));
        assert_eq!(jws.payload, br#"{"iss":"https://example.org"}"#);
        assert_eq!(jws.verify(&spki), Ok(()));
    }

    #[test]
    fn deflated_payload_is_inflated() {
        let signing_key = SigningKey::random(&mut OsRng);

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"nbf":1633000000}"#).unwrap();
        let compressed = encoder.finish().unwrap();

        let data = build_jws(r#"{"alg":"ES256","zip":"DEF"}"#, &compressed, &signing_key);
        let jws = CompactJws::parse(&data).unwrap();
        assert_eq!(jws.payload, br#"{"nbf":1633000000}"#);
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let signing_key = SigningKey::random(&mut OsRng);
        let spki = signing_key
            .verifying_key()
            .to_public_key_der()
            .unwrap()
            .into_vec();

        let mut data = build_jws(r#"{"alg":"ES256"}"#, b"{}", &signing_key);
        // tamper with the signature segment
        let len = data.len();
        data[len - 1] = if data[len - 1] == b'A' { b'B' } else { b'A' };

        let jws = CompactJws::parse(&data).unwrap();
        assert!(jws.verify(&spki).is_err());
    }

    #[test]
    fn unsupported_alg_is_a_failure() {
        let signing_key = SigningKey::random(&mut OsRng);
        let data = build_jws(r#"{"alg":"HS256"}"#, b"{}", &signing_key);
        let jws = CompactJws::parse(&data).unwrap();
        assert_eq!(
            jws.verify(&[0u8; 32]),
            Err(RawSignatureValidationError::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn missing_dots_is_not_a_jws() {
        assert!(CompactJws::parse(b"no separators here").is_err());
        assert!(CompactJws::parse(b"one.only").is_err());
    }
}
