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

use std::{fmt, str::FromStr};

/// Describes the signature algorithms the health certificate formats use.
///
/// Names are as defined in the IANA [JOSE algorithms registry]; the COSE
/// numeric identifiers from RFC 8152 §8 map onto the same set.
///
/// [JOSE algorithms registry]: https://www.iana.org/assignments/jose/jose.xhtml
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SigningAlg {
    /// ECDSA with SHA-256
    Es256,

    /// ECDSA with SHA-384
    Es384,

    /// ECDSA with SHA-512
    Es512,

    /// RSASSA-PSS with SHA-256
    Ps256,

    /// RSASSA-PSS with SHA-384
    Ps384,

    /// RSASSA-PSS with SHA-512
    Ps512,
}

impl SigningAlg {
    /// Map a COSE algorithm identifier (RFC 8152 §8) to a signing algorithm.
    pub fn from_cose_alg(alg: i64) -> Option<Self> {
        match alg {
            -7 => Some(Self::Es256),
            -35 => Some(Self::Es384),
            -36 => Some(Self::Es512),
            -37 => Some(Self::Ps256),
            -38 => Some(Self::Ps384),
            -39 => Some(Self::Ps512),
            _ => None,
        }
    }
}

impl FromStr for SigningAlg {
    type Err = UnknownAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ES256" => Ok(Self::Es256),
            "ES384" => Ok(Self::Es384),
            "ES512" => Ok(Self::Es512),
            "PS256" => Ok(Self::Ps256),
            "PS384" => Ok(Self::Ps384),
            "PS512" => Ok(Self::Ps512),
            _ => Err(UnknownAlgorithmError(s.to_owned())),
        }
    }
}

impl fmt::Display for SigningAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
        })
    }
}

/// An algorithm name outside the supported set was encountered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownAlgorithmError(pub String);

impl fmt::Display for UnknownAlgorithmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown algorithm name {}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithmError {}
