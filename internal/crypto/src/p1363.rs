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

//! Utilities for converting DER-encoded ECDSA signatures (as found in X.509
//! certificates) into the fixed-size P1363 `r ‖ s` form the validators
//! expect.

use x509_parser::der_parser::{
    der::{parse_der_integer, parse_der_sequence_defined_g},
    error::BerResult,
};

/// Parse an ASN.1 DER object that contains an ECDSA signature into its
/// components.
pub(crate) fn parse_ec_der_sig(data: &[u8]) -> BerResult<'_, EcSigComps<'_>> {
    parse_der_sequence_defined_g(|content: &[u8], _| {
        let (rem1, r) = parse_der_integer(content)?;
        let (_rem2, s) = parse_der_integer(rem1)?;

        Ok((
            data,
            EcSigComps {
                r: r.as_slice()?,
                s: s.as_slice()?,
            },
        ))
    })(data)
}

/// Component data for ECDSA signature components.
pub(crate) struct EcSigComps<'a> {
    pub r: &'a [u8],
    pub s: &'a [u8],
}

/// Convert a DER-encoded ECDSA signature to P1363 `r ‖ s` of `sig_len`
/// bytes.
pub(crate) fn der_to_p1363(data: &[u8], sig_len: usize) -> Option<Vec<u8>> {
    let (_, sig) = parse_ec_der_sig(data).ok()?;

    let component_len = sig_len / 2;
    let mut out = vec![0u8; sig_len];

    let r = sig.r.strip_prefix(&[0u8]).unwrap_or(sig.r);
    let s = sig.s.strip_prefix(&[0u8]).unwrap_or(sig.s);
    if r.len() > component_len || s.len() > component_len {
        return None;
    }

    out[component_len - r.len()..component_len].copy_from_slice(r);
    out[sig_len - s.len()..].copy_from_slice(s);
    Some(out)
}
