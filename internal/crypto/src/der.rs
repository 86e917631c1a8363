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

//! A reduced ASN.1 DER object reader and writer.
//!
//! [`Object`] is a non-owning view into the original buffer: it borrows the
//! slice from the object's first header byte to the end of the *enclosing*
//! content, so sibling traversal via [`Object::next`] never escapes the
//! parent's bounds. Only single-byte tags are supported, which covers the
//! DER subset used by the health certificate wire formats.

use num_bigint::BigUint;
use thiserror::Error;

/// ASN.1 universal tag numbers used by this crate.
pub mod tag {
    /// INTEGER
    pub const INTEGER: u8 = 0x02;
    /// OCTET STRING
    pub const OCTET_STRING: u8 = 0x04;
    /// SEQUENCE
    pub const SEQUENCE: u8 = 0x10;
    /// PrintableString
    pub const PRINTABLE_STRING: u8 = 0x13;
}

/// Describes errors that can occur while reading DER data.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum DerError {
    /// The buffer ended in the middle of an object.
    #[error("truncated DER object")]
    Truncated,

    /// Multi-byte tags or unsupported length encodings.
    #[error("unsupported DER encoding")]
    Unsupported,

    /// The object has a different tag than requested.
    #[error("unexpected DER tag")]
    TagMismatch,

    /// An INTEGER does not fit the requested native type.
    #[error("DER integer out of range")]
    IntegerOutOfRange,

    /// There is no further sibling object.
    #[error("no next DER object")]
    NoNext,
}

/// A non-owning view of a single DER object inside a larger buffer.
#[derive(Clone, Copy, Debug)]
pub struct Object<'a> {
    /// Buffer from this object's first byte to the end of the enclosing
    /// content.
    buf: &'a [u8],
    tag: u8,
    class: u8,
    constructed: bool,
    header_len: usize,
    content_len: usize,
}

impl<'a> Object<'a> {
    /// Parse the object starting at the beginning of `buf`.
    ///
    /// `buf` must extend exactly to the end of the enclosing content; the
    /// remainder after this object is available through [`Self::next`].
    pub fn parse(buf: &'a [u8]) -> Result<Self, DerError> {
        let initial = *buf.first().ok_or(DerError::Truncated)?;
        if initial & 0x1f == 0x1f {
            // multi-byte tag
            return Err(DerError::Unsupported);
        }
        let tag = initial & 0x1f;
        let class = initial >> 6;
        let constructed = initial & 0x20 != 0;

        let len_byte = *buf.get(1).ok_or(DerError::Truncated)?;
        let (header_len, content_len) = if len_byte < 0x80 {
            (2usize, len_byte as usize)
        } else {
            let num_len_bytes = (len_byte & 0x7f) as usize;
            if num_len_bytes == 0 || num_len_bytes > 4 {
                return Err(DerError::Unsupported);
            }
            let mut len = 0usize;
            for i in 0..num_len_bytes {
                let b = *buf.get(2 + i).ok_or(DerError::Truncated)?;
                len = (len << 8) | b as usize;
            }
            (2 + num_len_bytes, len)
        };

        if header_len
            .checked_add(content_len)
            .filter(|total| *total <= buf.len())
            .is_none()
        {
            return Err(DerError::Truncated);
        }

        Ok(Self {
            buf,
            tag,
            class,
            constructed,
            header_len,
            content_len,
        })
    }

    /// The tag number (low five bits of the identifier byte).
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// The tag class (universal, application, context, private).
    pub fn class(&self) -> u8 {
        self.class
    }

    /// `true` if the constructed bit is set.
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// The content bytes of this object.
    pub fn content(&self) -> &'a [u8] {
        &self.buf[self.header_len..self.header_len + self.content_len]
    }

    /// Total encoded size of this object, header included.
    pub fn total_len(&self) -> usize {
        self.header_len + self.content_len
    }

    /// Parse the first child of a constructed object.
    pub fn first_child(&self) -> Result<Object<'a>, DerError> {
        Object::parse(self.content())
    }

    /// `true` if more sibling bytes remain after this object.
    pub fn has_next(&self) -> bool {
        self.total_len() < self.buf.len() && self.tag != 0
    }

    /// Parse the next sibling object.
    pub fn next(&self) -> Result<Object<'a>, DerError> {
        if !self.has_next() {
            return Err(DerError::NoNext);
        }
        Object::parse(&self.buf[self.total_len()..])
    }

    /// Read this object as an INTEGER into an arbitrary-precision unsigned
    /// value. Negative values are rejected.
    pub fn read_biguint(&self) -> Result<BigUint, DerError> {
        if self.tag != tag::INTEGER {
            return Err(DerError::TagMismatch);
        }
        let content = self.content();
        if content.is_empty() {
            return Err(DerError::Truncated);
        }
        if content[0] & 0x80 != 0 {
            return Err(DerError::IntegerOutOfRange);
        }
        Ok(BigUint::from_bytes_be(content))
    }

    /// Read this object as an INTEGER into an `i64`.
    pub fn read_i64(&self) -> Result<i64, DerError> {
        if self.tag != tag::INTEGER {
            return Err(DerError::TagMismatch);
        }
        let content = self.content();
        if content.is_empty() || content.len() > 8 {
            return Err(DerError::IntegerOutOfRange);
        }
        let mut value = if content[0] & 0x80 != 0 { -1i64 } else { 0 };
        for &b in content {
            value = (value << 8) | b as i64;
        }
        Ok(value)
    }

    /// Read this object as an OCTET STRING.
    pub fn read_octet_string(&self) -> Result<&'a [u8], DerError> {
        if self.tag != tag::OCTET_STRING {
            return Err(DerError::TagMismatch);
        }
        Ok(self.content())
    }

    /// Read this object as a PrintableString.
    pub fn read_printable_string(&self) -> Result<&'a str, DerError> {
        if self.tag != tag::PRINTABLE_STRING {
            return Err(DerError::TagMismatch);
        }
        std::str::from_utf8(self.content()).map_err(|_| DerError::Unsupported)
    }
}

fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
}

/// DER-encode a non-negative INTEGER.
pub fn encode_integer(value: &BigUint) -> Vec<u8> {
    let mut content = value.to_bytes_be();
    if content == [0] {
        content.clear();
    }
    if content.first().is_some_and(|b| b & 0x80 != 0) {
        content.insert(0, 0);
    }
    if content.is_empty() {
        content.push(0);
    }
    let mut out = vec![tag::INTEGER];
    write_length(&mut out, content.len());
    out.extend_from_slice(&content);
    out
}

/// DER-encode a SEQUENCE from already-encoded member objects.
pub fn encode_sequence(members: &[Vec<u8>]) -> Vec<u8> {
    let content_len = members.iter().map(Vec::len).sum();
    let mut out = vec![0x20 | tag::SEQUENCE];
    write_length(&mut out, content_len);
    for member in members {
        out.extend_from_slice(member);
    }
    out
}
