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

//! Verification of IRMA/Idemix attribute disclosure proofs, the
//! zero-knowledge credential scheme behind Dutch CoronaCheck certificates.
//!
//! This follows the non-interactive disclosure protocol of the
//! privacybydesign `gabi` library: response size checks, reconstruction of
//! the commitment through chained modular exponentiation, and a Fiat-Shamir
//! challenge comparison.

use thiserror::Error;

mod public_key;
pub use public_key::{IrmaPublicKey, SystemParameters};

mod verify;
pub use verify::{verify, IrmaProof};

/// Describes errors that can occur while handling IRMA keys and proofs.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum IrmaError {
    /// The XML public key document is malformed or incomplete.
    #[error("malformed IRMA public key")]
    MalformedKey,

    /// The modulus size has no defined system parameters.
    ///
    /// The parameter table covers 1024/2048/4096-bit moduli only; anything
    /// else must fail loudly rather than yield zero-length bounds.
    #[error("unsupported IRMA key size ({0} bits)")]
    UnsupportedKeySize(u64),

    /// The proof does not carry enough values for the key's attribute bases.
    #[error("proof structure does not match the public key")]
    ProofStructureMismatch,
}
