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

//! zlib / raw-deflate decompression.
//!
//! Decompression failure is a hard parse failure for every caller, so these
//! helpers return errors rather than empty buffers. Output is capped well
//! above any legitimate barcode payload to keep adversarial input bounded.

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};
use thiserror::Error;

/// Decompressed payloads larger than this are treated as corrupt.
const MAX_DECOMPRESSED_SIZE: u64 = 16 * 1024 * 1024;

/// Describes errors that can occur while decompressing payload data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InflateError {
    /// The compressed stream is corrupt.
    #[error("decompression failed: {0}")]
    Corrupt(#[from] std::io::Error),

    /// The decompressed payload exceeds the size limit.
    #[error("decompressed payload too large")]
    TooLarge,
}

fn read_capped<R: Read>(mut reader: R) -> Result<Vec<u8>, InflateError> {
    let mut out = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_DECOMPRESSED_SIZE)
        .read_to_end(&mut out)?;
    if read as u64 == MAX_DECOMPRESSED_SIZE && reader.read(&mut [0u8]).unwrap_or(1) > 0 {
        return Err(InflateError::TooLarge);
    }
    Ok(out)
}

/// Decompress a zlib stream (deflate with the zlib header).
pub fn zlib(data: &[u8]) -> Result<Vec<u8>, InflateError> {
    read_capped(ZlibDecoder::new(data))
}

/// Decompress a raw deflate stream (no header), as used by the JWS `zip`
/// header value `DEF`.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>, InflateError> {
    read_capped(DeflateDecoder::new(data))
}
