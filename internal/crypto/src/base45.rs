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

//! Base45 codecs.
//!
//! Two distinct algorithms share the RFC 9285 alphabet but are not
//! interchangeable:
//!
//! * [`decode`] / [`encode`]: the RFC 9285 positional code used by EU DGC
//!   payloads, grouping 2-3 input characters into 1-2 output bytes.
//! * [`nl_decode`]: the Dutch CoronaCheck variant, which treats the entire
//!   remaining string as one large base-45 number and serializes it to
//!   minimal big-endian bytes.

use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

const ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Describes errors that can occur while decoding Base45 text.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Base45Error {
    /// A character outside the Base45 alphabet was encountered.
    #[error("invalid base45 character {0:#04x}")]
    InvalidCharacter(u8),

    /// The input length is not a valid Base45 grouping (3n+1).
    #[error("invalid base45 input length {0}")]
    InvalidLength(usize),

    /// A character group decodes to a value outside the byte range.
    #[error("base45 group value out of range")]
    ValueOutOfRange,
}

fn map_char(c: u8) -> Result<u64, Base45Error> {
    ALPHABET
        .iter()
        .position(|&a| a == c)
        .map(|p| p as u64)
        .ok_or(Base45Error::InvalidCharacter(c))
}

/// Decode RFC 9285 Base45 text into bytes.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, Base45Error> {
    if data.len() % 3 == 1 {
        return Err(Base45Error::InvalidLength(data.len()));
    }

    let mut out = Vec::with_capacity((data.len() / 3) * 2 + 1);
    for chunk in data.chunks(3) {
        let mut value = 0u64;
        for &c in chunk.iter().rev() {
            value = value * 45 + map_char(c)?;
        }
        match chunk.len() {
            3 => {
                if value > u16::MAX as u64 {
                    return Err(Base45Error::ValueOutOfRange);
                }
                out.push((value >> 8) as u8);
                out.push((value & 0xff) as u8);
            }
            2 => {
                if value > u8::MAX as u64 {
                    return Err(Base45Error::ValueOutOfRange);
                }
                out.push(value as u8);
            }
            _ => return Err(Base45Error::InvalidLength(data.len())),
        }
    }
    Ok(out)
}

/// Encode bytes as RFC 9285 Base45 text.
pub fn encode(data: &[u8]) -> String {
    let mut out = Vec::with_capacity((data.len() / 2) * 3 + 2);
    for chunk in data.chunks(2) {
        if chunk.len() == 2 {
            let mut value = ((chunk[0] as usize) << 8) | chunk[1] as usize;
            for _ in 0..3 {
                out.push(ALPHABET[value % 45]);
                value /= 45;
            }
        } else {
            let value = chunk[0] as usize;
            out.push(ALPHABET[value % 45]);
            out.push(ALPHABET[value / 45]);
        }
    }
    // the alphabet is ASCII
    String::from_utf8(out).unwrap_or_default()
}

/// Decode the Dutch CoronaCheck Base45 variant.
///
/// The whole input is read as a single base-45 number, most significant
/// character first, and returned as its minimal big-endian byte encoding.
pub fn nl_decode(data: &[u8]) -> Result<Vec<u8>, Base45Error> {
    let mut value = BigUint::zero();
    for &c in data {
        value = value * 45u32 + map_char(c)?;
    }
    if value.is_zero() {
        return Ok(Vec::new());
    }
    Ok(value.to_bytes_be())
}
