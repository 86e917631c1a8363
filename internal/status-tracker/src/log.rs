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

use std::{borrow::Cow, fmt::Debug};

use crate::StatusTracker;

/// Detailed information about an error or other noteworthy condition found
/// while decoding or verifying a health certificate.
///
/// Use the [`log_item`](crate::log_item) macro to create a `LogItem`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogItem {
    /// Label of the payload element this item refers to (wire format name,
    /// header field, certificate id, ...).
    pub label: Cow<'static, str>,

    /// Description of the condition.
    pub description: Cow<'static, str>,

    /// Source file where the condition was detected.
    pub file: Cow<'static, str>,

    /// Function where the condition was detected.
    pub function: Cow<'static, str>,

    /// Source line number where the condition was detected.
    pub line: u32,

    /// Error value, as a string.
    pub err_val: Option<Cow<'static, str>>,

    /// Validation status code (see [`crate::validation_codes`]).
    pub validation_status: Option<Cow<'static, str>>,

    /// Wire format being parsed when the condition was found, if any.
    pub format: Option<Cow<'static, str>>,
}

impl LogItem {
    /// Captures the description from the value (typically an `Error` enum) as
    /// additional information for this `LogItem`.
    ///
    /// This is implemented via [`Debug`], which any error enum satisfies.
    pub fn error<E: Debug>(self, err: E) -> Self {
        LogItem {
            err_val: Some(format!("{err:?}").into()),
            ..self
        }
    }

    /// Add a validation status code.
    ///
    /// ## Example
    ///
    /// ```
    /// # use hcert_status_tracker::{log_item, validation_codes::SIGNATURE_MISMATCH};
    /// let log = log_item!("COSE_Sign1", "signature bytes do not verify", "parse")
    ///     .validation_status(SIGNATURE_MISMATCH);
    ///
    /// assert_eq!(log.validation_status.as_deref(), Some(SIGNATURE_MISMATCH));
    /// ```
    pub fn validation_status(self, status: &'static str) -> Self {
        LogItem {
            validation_status: Some(status.into()),
            ..self
        }
    }

    /// Record this item as an informational (non-error) finding.
    pub fn informational(self, tracker: &mut StatusTracker) {
        tracker.add_non_error(self);
    }

    /// Record this item as a success.
    pub fn success(self, tracker: &mut StatusTracker) {
        tracker.add_non_error(self);
    }

    /// Record this item as a failure, returning `Err(err)` if the tracker is
    /// configured to stop on the first error.
    pub fn failure<E: Debug>(self, tracker: &mut StatusTracker, err: E) -> Result<(), E> {
        let item = self.error(&err);
        tracker.add_error(item, err)
    }

    /// Record this item as a failure, discarding the stop-on-error outcome.
    ///
    /// Use this when the caller will downgrade a validation state instead of
    /// aborting the parse.
    pub fn failure_no_throw<E: Debug>(self, tracker: &mut StatusTracker, err: E) {
        let item = self.error(&err);
        let _ = tracker.add_error(item, err);
    }
}

/// Creates a [`LogItem`] annotated with the source file and line number where
/// the condition was discovered.
///
/// Takes three parameters, each of which may be a `&'static str` or `String`:
///
/// * `label`: name of the payload element this item references
/// * `description`: human-readable reason for this item to exist
/// * `function`: name of the function generating this item
///
/// ## Example
///
/// ```
/// # use hcert_status_tracker::log_item;
/// let log = log_item!("hcert.v1", "unhandled claim key", "parse_claims");
///
/// assert_eq!(log.label, "hcert.v1");
/// assert_eq!(log.file, file!());
/// ```
#[macro_export]
macro_rules! log_item {
    ($label:expr, $description:expr, $function:expr) => {{
        $crate::LogItem {
            label: $label.into(),
            file: file!().into(),
            function: $function.into(),
            line: line!(),
            description: $description.into(),
            err_val: None,
            validation_status: None,
            format: None,
        }
    }};
}
