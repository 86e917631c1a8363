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

use num_bigint::BigUint;
use quick_xml::{events::Event, Reader};

use crate::irma::IrmaError;

/// Public key parameters for the IRMA system.
///
/// Only the subset relevant for verifying CoronaCheck disclosures is
/// modeled.
// see https://pkg.go.dev/github.com/privacybydesign/gabi/gabikeys#PublicKey
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IrmaPublicKey {
    /// The modulus.
    pub n: BigUint,

    /// Generator Z.
    pub z: BigUint,

    /// Generator S.
    pub s: BigUint,

    /// Per-attribute bases.
    pub r: Vec<BigUint>,
}

impl IrmaPublicKey {
    /// Parse the XML encoding used by the IRMA scheme repositories.
    pub fn from_xml(xml: &str) -> Result<Self, IrmaError> {
        let mut reader = Reader::from_str(xml);

        let mut n = None;
        let mut z = None;
        let mut s = None;
        let mut r = Vec::new();
        let mut current: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    current = Some(name);
                }
                Ok(Event::Text(text)) => {
                    let Some(element) = current.as_deref() else {
                        continue;
                    };
                    let Ok(text) = text.unescape() else {
                        return Err(IrmaError::MalformedKey);
                    };
                    let value = || {
                        BigUint::parse_bytes(text.trim().as_bytes(), 10)
                            .ok_or(IrmaError::MalformedKey)
                    };
                    match element {
                        "n" => n = Some(value()?),
                        "Z" => z = Some(value()?),
                        "S" => s = Some(value()?),
                        name if name.starts_with("Base_") => r.push(value()?),
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => current = None,
                Ok(Event::Eof) => break,
                Err(_) => return Err(IrmaError::MalformedKey),
                _ => {}
            }
        }

        match (n, z, s) {
            (Some(n), Some(z), Some(s)) if !r.is_empty() => Ok(Self { n, z, s, r }),
            _ => Err(IrmaError::MalformedKey),
        }
    }

    /// System parameters derived from the modulus size.
    pub fn params(&self) -> Result<SystemParameters, IrmaError> {
        SystemParameters::for_modulus_bits(self.n.bits())
    }
}

/// Size parameters of the gabi protocol, keyed by modulus bit length.
// see gabikeys/keys.go DefaultSystemParameters
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SystemParameters {
    /// Maximum size in bits of an attribute value.
    pub l_m: u64,

    /// Statistical zero-knowledge margin.
    pub l_statzk: u64,

    /// Size in bits of the epsilon exponent.
    pub l_e: u64,

    /// Size in bits of the challenge hash.
    pub l_h: u64,
}

impl SystemParameters {
    /// Look up the parameter set for a modulus bit length.
    pub fn for_modulus_bits(bits: u64) -> Result<Self, IrmaError> {
        match bits {
            1024 => Ok(Self {
                l_m: 256,
                l_statzk: 80,
                l_e: 597,
                l_h: 256,
            }),
            2048 => Ok(Self {
                l_m: 256,
                l_statzk: 128,
                l_e: 645,
                l_h: 256,
            }),
            4096 => Ok(Self {
                l_m: 512,
                l_statzk: 128,
                l_e: 901,
                l_h: 256,
            }),
            _ => Err(IrmaError::UnsupportedKeySize(bits)),
        }
    }

    /// Maximum size in bits of an attribute response.
    pub fn l_m_commit(&self) -> u64 {
        self.l_m + self.l_statzk + self.l_h
    }

    /// Maximum size in bits of the epsilon response.
    pub fn l_e_commit(&self) -> u64 {
        self.l_e + self.l_statzk + self.l_h
    }
}
