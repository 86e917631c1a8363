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

//! The per-format parsers.
//!
//! Each parser recognizes its input by a literal prefix or document shape
//! and returns `None` for anything else; only structural corruption after
//! recognition also yields `None`. Cryptographic findings are never control
//! flow: they downgrade the certificate's signature state instead.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

pub(crate) mod divoc;
pub(crate) mod eu_dgc;
pub(crate) mod icao_vds;
pub(crate) mod nl_coronacheck;
pub(crate) mod shc;

/// Parse the date part of an ISO 8601 date or date-time string.
pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parse an ISO 8601 date-time string; a bare date maps to midnight UTC.
pub(crate) fn parse_iso_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // some issuers omit the timezone suffix
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    parse_iso_date(value)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Unix epoch seconds to a UTC timestamp.
pub(crate) fn epoch_seconds(value: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(value, 0).single()
}
