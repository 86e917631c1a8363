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

use num_bigint::BigUint;
use num_traits::One;
use sha2::{Digest, Sha256};

use crate::{
    der,
    irma::{IrmaError, IrmaPublicKey},
};

/// A non-interactive IRMA disclosure proof.
///
/// All integers are arbitrary precision; consumers must treat a proof that
/// fails structural checks as absent rather than attempting arithmetic on
/// partial values.
#[derive(Clone, Debug, Default)]
pub struct IrmaProof {
    /// Unix timestamp of the disclosure.
    pub disclosure_time: i64,

    /// Challenge value C.
    pub c: BigUint,

    /// Commitment value A.
    pub a: BigUint,

    /// Response for the epsilon exponent.
    pub e_response: BigUint,

    /// Response for the blinding exponent.
    pub v_response: BigUint,

    /// Responses for the undisclosed attributes.
    pub a_responses: Vec<BigUint>,

    /// Disclosed attribute values.
    pub a_disclosed: Vec<BigUint>,
}

// see https://github.com/privacybydesign/gabi/blob/master/proofs.go (checkResponseSize)
fn check_response_size(proof: &IrmaProof, key: &IrmaPublicKey) -> Result<bool, IrmaError> {
    let params = key.params()?;

    if proof
        .a_responses
        .iter()
        .any(|response| response.bits() > params.l_m_commit())
    {
        log::debug!("AResponse entry too large");
        return Ok(false);
    }

    if proof.e_response.bits() > params.l_e_commit() {
        log::debug!("EResponse too large");
        return Ok(false);
    }

    Ok(true)
}

// SHA-256 of the decimal string of the timestamp, truncated to 16 bytes
// see https://github.com/minvws/nl-covid19-coronacheck-idemix (common.CalculateTimeBasedChallenge)
fn time_based_challenge(timestamp: i64) -> BigUint {
    let digest = Sha256::digest(timestamp.to_string().as_bytes());
    BigUint::from_bytes_be(&digest[..16])
}

// SHA-256 over the big-endian bytes of the input number, as a number
fn biguint_sha256(value: &BigUint) -> BigUint {
    BigUint::from_bytes_be(&Sha256::digest(value.to_bytes_be()))
}

// see https://github.com/privacybydesign/gabi/blob/master/proofs.go (reconstructZ)
fn reconstruct_z(proof: &IrmaProof, key: &IrmaPublicKey) -> Result<BigUint, IrmaError> {
    let params = key.params()?;

    if key.r.len() < proof.a_responses.len()
        || key.r.len() < proof.a_disclosed.len() + 1
    {
        return Err(IrmaError::ProofStructureMismatch);
    }

    let exponent = BigUint::one() << (params.l_e - 1) as usize;
    let mut numerator = proof.a.modpow(&exponent, &key.n);

    for (i, disclosed) in proof.a_disclosed.iter().enumerate() {
        let hashed;
        let exp = if disclosed.bits() > params.l_m {
            hashed = biguint_sha256(disclosed);
            &hashed
        } else {
            disclosed
        };
        numerator *= key.r[i + 1].modpow(exp, &key.n);
    }

    let inverse = (&numerator % &key.n)
        .modinv(&key.n)
        .ok_or(IrmaError::ProofStructureMismatch)?;
    let known = &key.z * inverse;

    let known_inverse = (&known % &key.n)
        .modinv(&key.n)
        .ok_or(IrmaError::ProofStructureMismatch)?;
    let known_c = known_inverse.modpow(&proof.c, &key.n);

    let ae = proof.a.modpow(&proof.e_response, &key.n);
    let sv = key.s.modpow(&proof.v_response, &key.n);

    let mut rs = BigUint::one();
    for (i, response) in proof.a_responses.iter().enumerate() {
        rs *= key.r[i].modpow(response, &key.n);
    }

    Ok(known_c * ae * rs * sv % &key.n)
}

/// Verify a disclosure proof against a public key.
///
/// Returns `Ok(false)` for a well-formed proof whose challenge does not
/// match; errors are reserved for structurally unusable key/proof
/// combinations.
// see https://github.com/privacybydesign/gabi/blob/master/prooflist.go (Verify)
pub fn verify(proof: &IrmaProof, key: &IrmaPublicKey) -> Result<bool, IrmaError> {
    if !check_response_size(proof, key)? {
        return Ok(false);
    }

    let context = BigUint::one();
    let time_challenge = time_based_challenge(proof.disclosure_time);
    let z = reconstruct_z(proof, key)?;

    // see https://github.com/privacybydesign/gabi/blob/master/proofs.go (createChallenge)
    let num_elements = BigUint::from(4u32);

    let encoded = der::encode_sequence(&[
        der::encode_integer(&num_elements),
        der::encode_integer(&context),
        der::encode_integer(&proof.a),
        der::encode_integer(&z),
        der::encode_integer(&time_challenge),
    ]);
    let challenge = Sha256::digest(&encoded);

    Ok(challenge.as_slice() == proof.c.to_bytes_be())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use num_bigint::RandBigInt;
    use rand::{rngs::OsRng, Rng};

    use super::*;

    // a 2048-bit modulus is required for the parameter table; primality is
    // irrelevant to the arithmetic under test
    fn test_key() -> IrmaPublicKey {
        let mut rng = OsRng;
        let mut n = rng.gen_biguint(2048);
        n.set_bit(2047, true);
        n.set_bit(0, true); // odd, so inverses exist for almost all values
        IrmaPublicKey {
            z: rng.gen_biguint_below(&n),
            s: rng.gen_biguint_below(&n),
            r: (0..10).map(|_| rng.gen_biguint_below(&n)).collect(),
            n,
        }
    }

    fn test_proof(rng: &mut OsRng, key: &IrmaPublicKey) -> IrmaProof {
        IrmaProof {
            disclosure_time: 1627465200,
            c: rng.gen_biguint(256),
            a: rng.gen_biguint_below(&key.n),
            e_response: rng.gen_biguint(600),
            v_response: rng.gen_biguint(2048),
            a_responses: vec![rng.gen_biguint(500)],
            a_disclosed: (0..4).map(|_| rng.gen_biguint(100)).collect(),
        }
    }

    #[test]
    fn random_proof_fails_challenge() {
        let key = test_key();
        let proof = test_proof(&mut OsRng, &key);
        assert_eq!(verify(&proof, &key), Ok(false));
    }

    #[test]
    fn oversized_responses_are_rejected_before_arithmetic() {
        let key = test_key();
        let mut proof = test_proof(&mut OsRng, &key);
        proof.e_response = BigUint::one() << 1100; // beyond LeCommit = 1029
        assert_eq!(verify(&proof, &key), Ok(false));

        let mut proof = test_proof(&mut OsRng, &key);
        proof.a_responses = vec![BigUint::one() << 700]; // beyond LmCommit = 640
        assert_eq!(verify(&proof, &key), Ok(false));
    }

    #[test]
    fn unsupported_modulus_size_is_an_error() {
        let mut key = test_key();
        key.n = BigUint::one() << 3071;
        let proof = test_proof(&mut OsRng, &key);
        assert_eq!(verify(&proof, &key), Err(IrmaError::UnsupportedKeySize(3072)));
    }

    #[test]
    fn proof_with_too_many_disclosed_values_is_structural() {
        let key = test_key();
        let mut proof = test_proof(&mut OsRng, &key);
        proof.a_disclosed = (0..key.r.len()).map(|i| BigUint::from(i + 1)).collect();
        assert_eq!(verify(&proof, &key), Err(IrmaError::ProofStructureMismatch));
    }

    #[test]
    fn forged_challenge_construction_still_fails() {
        // fix everything, then plant a C derived from the hash of an
        // unrelated Z; the reconstruction depends on C, so the planted value
        // cannot satisfy the equation
        let key = test_key();
        let mut rng = OsRng;
        let mut proof = test_proof(&mut rng, &key);
        let fake_z = rng.gen_biguint_below(&key.n);
        let encoded = der::encode_sequence(&[
            der::encode_integer(&BigUint::from(4u32)),
            der::encode_integer(&BigUint::one()),
            der::encode_integer(&proof.a),
            der::encode_integer(&fake_z),
            der::encode_integer(&time_based_challenge(proof.disclosure_time)),
        ]);
        proof.c = BigUint::from_bytes_be(&Sha256::digest(&encoded));
        assert_eq!(verify(&proof, &key), Ok(false));
    }

    #[test]
    fn bit_flip_in_any_response_changes_the_challenge() {
        let key = test_key();
        let mut rng = OsRng;
        let proof = test_proof(&mut rng, &key);
        let baseline = reconstruct_z(&proof, &key).unwrap();

        let mut flipped = proof.clone();
        let bit: u64 = rng.gen_range(0..256);
        let current = flipped.v_response.bit(bit);
        flipped.v_response.set_bit(bit, !current);
        assert_ne!(reconstruct_z(&flipped, &key).unwrap(), baseline);
    }

    #[test]
    fn time_challenge_is_truncated_to_16_bytes() {
        let challenge = time_based_challenge(1627465200);
        assert!(challenge.bits() <= 128);
        // stable: SHA-256("1627465200")[..16]
        let expected = &Sha256::digest(b"1627465200")[..16];
        assert_eq!(challenge, BigUint::from_bytes_be(expected));
    }
}
