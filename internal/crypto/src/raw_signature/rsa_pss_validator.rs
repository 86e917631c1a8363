// Copyright 2025 Adobe. All rights reserved.
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

use rsa::{pkcs8::DecodePublicKey, pss::Pss, traits::PublicKeyParts, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::raw_signature::{RawSignatureValidationError, RawSignatureValidator};

/// An `RsaPssValidator` can validate raw signatures with one of the
/// RSASSA-PSS signature algorithms.
///
/// The PSS salt length always equals the digest length, which is what both
/// the COSE RSA-PSS algorithms and the DIVOC `PS256` signatures use.
pub enum RsaPssValidator {
    /// RSASSA-PSS with SHA-256
    Ps256,

    /// RSASSA-PSS with SHA-384
    Ps384,

    /// RSASSA-PSS with SHA-512
    Ps512,
}

impl RsaPssValidator {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Ps256 => Sha256::digest(data).to_vec(),
            Self::Ps384 => Sha384::digest(data).to_vec(),
            Self::Ps512 => Sha512::digest(data).to_vec(),
        }
    }

    fn padding(&self) -> Pss {
        match self {
            Self::Ps256 => Pss::new::<Sha256>(),
            Self::Ps384 => Pss::new::<Sha384>(),
            Self::Ps512 => Pss::new::<Sha512>(),
        }
    }

}

impl RawSignatureValidator for RsaPssValidator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let vk = RsaPublicKey::from_public_key_der(public_key)
            .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

        if sig.len() != vk.size() {
            return Err(RawSignatureValidationError::InvalidSignature);
        }

        vk.verify(self.padding(), &self.digest(data), sig)
            .map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}
