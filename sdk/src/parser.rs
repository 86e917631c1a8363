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

//! The format dispatcher.

use std::io::{Cursor, Read};

use hcert_status_tracker::StatusTracker;

use crate::{formats, trust_store, HealthCertificate, TrustStore};

/// ZIP local file header magic.
const ZIP_MAGIC: &[u8] = b"\x50\x4b\x03\x04";

/// Nested archives deeper than this are treated as unrecognized input.
const MAX_ARCHIVE_DEPTH: usize = 4;

/// Parse a scanned barcode payload into a health certificate.
///
/// Tries each known wire format in turn, resolving key material from the
/// bundled trust store. Returns `None` for unrecognized or malformed input;
/// this function never panics on arbitrary bytes.
pub fn parse(data: &[u8]) -> Option<HealthCertificate> {
    parse_with(data, trust_store::bundled())
}

/// Parse a scanned barcode payload, resolving key material from `store`.
pub fn parse_with(data: &[u8], store: &TrustStore) -> Option<HealthCertificate> {
    let mut tracker = StatusTracker::default();
    parse_impl(data, store, &mut tracker, 0)
}

/// Parse a scanned barcode payload, collecting diagnostic findings.
///
/// The tracker receives one entry per noteworthy decoding or verification
/// event, scoped by wire format; the parse result is unaffected.
pub fn parse_with_tracker(
    data: &[u8],
    store: &TrustStore,
    tracker: &mut StatusTracker,
) -> Option<HealthCertificate> {
    parse_impl(data, store, tracker, 0)
}

fn parse_impl(
    data: &[u8],
    store: &TrustStore,
    tracker: &mut StatusTracker,
    depth: usize,
) -> Option<HealthCertificate> {
    type FormatParser =
        fn(&[u8], &TrustStore, &mut StatusTracker) -> Option<HealthCertificate>;
    const FORMATS: &[(&str, FormatParser)] = &[
        ("eu-dgc", formats::eu_dgc::parse),
        ("divoc", formats::divoc::parse),
        ("shc", formats::shc::parse),
        ("vds-nc", formats::icao_vds::parse),
        ("nl-coronacheck", formats::nl_coronacheck::parse),
    ];

    for (name, format_parser) in FORMATS {
        tracker.push_format(*name);
        let result = format_parser(data, store, tracker);
        tracker.pop_format();
        if result.is_some() {
            return result;
        }
    }

    // ZIP unpacking, needed for Indian certificates
    if data.starts_with(ZIP_MAGIC) && depth < MAX_ARCHIVE_DEPTH {
        let mut archive = zip::ZipArchive::new(Cursor::new(data)).ok()?;
        for index in 0..archive.len() {
            let Ok(mut entry) = archive.by_index(index) else {
                continue;
            };
            let mut entry_data = Vec::new();
            if entry.read_to_end(&mut entry_data).is_err() {
                continue;
            }
            drop(entry);
            if let Some(mut certificate) = parse_impl(&entry_data, store, tracker, depth + 1) {
                // audit trails should show the outer container bytes
                certificate.set_raw_data(data.to_vec());
                return Some(certificate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arbitrary_input_is_absent() {
        assert!(parse(b"").is_none());
        assert!(parse(b"hello world").is_none());
        assert!(parse(&[0xff; 64]).is_none());
        assert!(parse(b"{\"unrelated\": true}").is_none());
    }

    #[test]
    fn truncated_prefixes_are_absent() {
        assert!(parse(b"HC1:").is_none());
        assert!(parse(b"HC1:!!!!").is_none());
        assert!(parse(b"shc:/").is_none());
        assert!(parse(b"shc:/12/34").is_none());
        assert!(parse(b"NL2:").is_none());
        assert!(parse(b"NL2:AAAA").is_none());
    }

    #[test]
    fn corrupt_zip_is_absent() {
        let mut data = ZIP_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 32]);
        assert!(parse(&data).is_none());
    }

    #[test]
    fn parsing_is_idempotent() {
        // no hidden state across calls: both calls see the same absence
        let data = b"HC1:NOT A REAL CERTIFICATE";
        assert!(parse(data).is_none());
        assert!(parse(data).is_none());
    }
}
