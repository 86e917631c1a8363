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

//! Standard status codes recorded while decoding and verifying health
//! certificates.

// -- success codes --

/// The certificate signature validated against the resolved signer key.
pub const SIGNATURE_VALIDATED: &str = "signature.validated";

/// The signer certificate chains to a known issuer certificate.
pub const SIGNER_CHAIN_VALIDATED: &str = "signingCredential.chain.validated";

// -- failure codes --

/// The signature bytes do not verify against the signed content.
pub const SIGNATURE_MISMATCH: &str = "signature.mismatch";

/// The signature uses an algorithm this verifier does not implement.
pub const ALGORITHM_UNSUPPORTED: &str = "signature.algorithm.unsupported";

/// No signer key or certificate was found for the key id in the payload.
pub const SIGNER_NOT_FOUND: &str = "signingCredential.notFound";

/// The signer certificate did not validate against any issuer candidate.
pub const SIGNER_CHAIN_MISMATCH: &str = "signingCredential.chain.mismatch";

/// A container (CBOR/ASN.1/JSON) was recognized but its structure is
/// malformed or missing required fields.
pub const PAYLOAD_MALFORMED: &str = "payload.malformed";

/// The compressed payload failed to decompress.
pub const PAYLOAD_DECOMPRESS_FAILED: &str = "payload.decompress.failed";

/// A zero-knowledge proof failed its challenge comparison.
pub const PROOF_CHALLENGE_MISMATCH: &str = "proof.challenge.mismatch";

/// A zero-knowledge proof carries response values outside the key's size
/// bounds.
pub const PROOF_RESPONSE_OUT_OF_RANGE: &str = "proof.response.outOfRange";
