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

use thiserror::Error;

/// `Error` enumerates errors returned when configuring the hcert toolkit.
///
/// Parsing itself reports no structured errors: unrecognized or malformed
/// payloads yield an absent result, and cryptographic findings are data (see
/// [`crate::SignatureValidation`]).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Key material handed to the trust store could not be decoded.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A bundled resource table is malformed.
    #[error("malformed resource table: {0}")]
    MalformedResource(String),
}
