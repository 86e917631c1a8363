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

//! JSON Web Key (RFC 7517) decoding into SubjectPublicKeyInfo DER.
//!
//! Only elliptic-curve keys are supported; that is the only key type the
//! SMART Health Cards trust material uses.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;

/// Describes errors that can occur while decoding a JWK.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JwkError {
    /// The key document is not valid JSON.
    #[error("malformed JWK document")]
    MalformedDocument,

    /// The key type is not supported.
    #[error("unsupported key type {0}")]
    UnsupportedKeyType(String),

    /// The curve is not supported.
    #[error("unsupported curve type {0}")]
    UnsupportedCurve(String),

    /// The coordinate encoding is invalid for the declared curve.
    #[error("invalid key coordinates")]
    InvalidCoordinates,
}

#[derive(Deserialize)]
struct EcJwk {
    #[serde(default)]
    kty: String,
    #[serde(default)]
    crv: String,
    #[serde(default)]
    x: String,
    #[serde(default)]
    y: String,
}

fn decode_coordinate(value: &str, field_len: usize) -> Result<Vec<u8>, JwkError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| JwkError::InvalidCoordinates)?;
    if bytes.len() > field_len {
        return Err(JwkError::InvalidCoordinates);
    }
    let mut out = vec![0u8; field_len - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}

/// Decode a JWK document into SubjectPublicKeyInfo DER bytes.
pub fn public_key_from_jwk(jwk_json: &[u8]) -> Result<Vec<u8>, JwkError> {
    let jwk: EcJwk = serde_json::from_slice(jwk_json).map_err(|_| JwkError::MalformedDocument)?;

    if jwk.kty != "EC" {
        return Err(JwkError::UnsupportedKeyType(jwk.kty));
    }

    let field_len = match jwk.crv.as_str() {
        "P-256" => 32,
        "P-384" => 48,
        "P-521" => 66,
        _ => return Err(JwkError::UnsupportedCurve(jwk.crv)),
    };

    // SEC1 uncompressed point
    let mut point = Vec::with_capacity(1 + 2 * field_len);
    point.push(0x04);
    point.extend_from_slice(&decode_coordinate(&jwk.x, field_len)?);
    point.extend_from_slice(&decode_coordinate(&jwk.y, field_len)?);

    match jwk.crv.as_str() {
        "P-256" => {
            use p256::pkcs8::EncodePublicKey;
            let key = p256::PublicKey::from_sec1_bytes(&point)
                .map_err(|_| JwkError::InvalidCoordinates)?;
            key.to_public_key_der()
                .map(|der| der.into_vec())
                .map_err(|_| JwkError::InvalidCoordinates)
        }
        "P-384" => {
            use p384::pkcs8::EncodePublicKey;
            let key = p384::PublicKey::from_sec1_bytes(&point)
                .map_err(|_| JwkError::InvalidCoordinates)?;
            key.to_public_key_der()
                .map(|der| der.into_vec())
                .map_err(|_| JwkError::InvalidCoordinates)
        }
        "P-521" => {
            use p521::pkcs8::EncodePublicKey;
            let key = p521::PublicKey::from_sec1_bytes(&point)
                .map_err(|_| JwkError::InvalidCoordinates)?;
            key.to_public_key_der()
                .map(|der| der.into_vec())
                .map_err(|_| JwkError::InvalidCoordinates)
        }
        _ => Err(JwkError::UnsupportedCurve(jwk.crv)),
    }
}
