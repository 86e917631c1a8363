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

//! Raw signature validation.

use thiserror::Error;

mod ecdsa_validator;
pub use ecdsa_validator::EcdsaValidator;

mod rsa_pss_validator;
pub use rsa_pss_validator::RsaPssValidator;

mod signing_alg;
pub use signing_alg::SigningAlg;

/// A `RawSignatureValidator` implementation checks a signature encoded using
/// a specific signature algorithm and a private/public key pair.
///
/// IMPORTANT: This signature is typically embedded in a wrapper provided by
/// another signature mechanism. In the health certificate ecosystem, these
/// wrappers are COSE_Sign1, compact JWS, and the ICAO detached signature
/// object, none of which are implemented here.
pub trait RawSignatureValidator {
    /// Return `Ok(())` if the signature `sig` is valid for the raw content
    /// `data` and the public key `public_key` (SubjectPublicKeyInfo DER).
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError>;
}

/// Return a built-in signature validator for the requested signature
/// algorithm.
pub fn validator_for_signing_alg(alg: SigningAlg) -> Box<dyn RawSignatureValidator> {
    match alg {
        SigningAlg::Es256 => Box::new(EcdsaValidator::Es256),
        SigningAlg::Es384 => Box::new(EcdsaValidator::Es384),
        SigningAlg::Es512 => Box::new(EcdsaValidator::Es512),
        SigningAlg::Ps256 => Box::new(RsaPssValidator::Ps256),
        SigningAlg::Ps384 => Box::new(RsaPssValidator::Ps384),
        SigningAlg::Ps512 => Box::new(RsaPssValidator::Ps512),
    }
}

/// Describes errors that can be identified when validating a raw signature.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum RawSignatureValidationError {
    /// The signature does not match the provided data or public key.
    #[error("the signature does not match the provided data or public key")]
    SignatureMismatch,

    /// An invalid public key was provided.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// An invalid signature value was provided.
    #[error("invalid signature value")]
    InvalidSignature,

    /// The signature uses an unsupported signing or hash algorithm.
    #[error("signature uses an unsupported algorithm")]
    UnsupportedAlgorithm,

    /// An unexpected internal error occurred during validation.
    #[error("internal error ({0})")]
    InternalError(String),
}
