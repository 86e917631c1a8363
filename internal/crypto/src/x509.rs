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

//! X.509 certificate helpers: SPKI and key-identifier extraction plus
//! certificate-of-certificate signature verification for the ICAO
//! chain-of-trust lookup.

use rsa::{pkcs8::DecodePublicKey, Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};
use thiserror::Error;
use x509_parser::{
    oid_registry::{
        OID_PKCS1_SHA256WITHRSA, OID_SIG_ECDSA_WITH_SHA256, OID_SIG_ECDSA_WITH_SHA384,
        OID_SIG_ECDSA_WITH_SHA512,
    },
    prelude::*,
};

use crate::{
    p1363::der_to_p1363,
    raw_signature::{EcdsaValidator, RawSignatureValidationError, RawSignatureValidator},
};

/// Describes errors that can occur while working with DER certificates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificateError {
    /// The certificate could not be parsed.
    #[error("malformed X.509 certificate")]
    Malformed,
}

/// Extract the SubjectPublicKeyInfo DER bytes from a DER certificate.
pub fn public_key_der(cert_der: &[u8]) -> Result<Vec<u8>, CertificateError> {
    let (_, cert) = X509Certificate::from_der(cert_der).map_err(|_| CertificateError::Malformed)?;
    Ok(cert.tbs_certificate.subject_pki.raw.to_vec())
}

/// Extract the authority key identifier extension, hex-encoded.
pub fn authority_key_id(cert_der: &[u8]) -> Option<String> {
    let (_, cert) = X509Certificate::from_der(cert_der).ok()?;
    let result = cert.iter_extensions().find_map(|ext| {
        if let ParsedExtension::AuthorityKeyIdentifier(aki) = ext.parsed_extension() {
            aki.key_identifier
                .as_ref()
                .map(|kid| hex::encode(kid.0))
        } else {
            None
        }
    });
    result
}

/// Extract the subject key identifier extension, hex-encoded.
pub fn subject_key_id(cert_der: &[u8]) -> Option<String> {
    let (_, cert) = X509Certificate::from_der(cert_der).ok()?;
    let result = cert.iter_extensions().find_map(|ext| {
        if let ParsedExtension::SubjectKeyIdentifier(ski) = ext.parsed_extension() {
            Some(hex::encode(ski.0))
        } else {
            None
        }
    });
    result
}

/// Verify the signature on `cert_der` using the issuer's public key (SPKI
/// DER).
///
/// Supports the certificate signature algorithms found in the bundled trust
/// material: ECDSA with SHA-256/384/512 and sha256WithRSAEncryption.
pub fn verify_cert_signature(
    cert_der: &[u8],
    issuer_spki_der: &[u8],
) -> Result<(), RawSignatureValidationError> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

    let tbs = cert.tbs_certificate.as_ref();
    let sig: &[u8] = &cert.signature_value.data;
    let sig_alg = &cert.signature_algorithm.algorithm;

    if *sig_alg == OID_SIG_ECDSA_WITH_SHA256 {
        ecdsa_verify_der_sig(&Sha256::digest(tbs), sig, issuer_spki_der)
    } else if *sig_alg == OID_SIG_ECDSA_WITH_SHA384 {
        ecdsa_verify_der_sig(&Sha384::digest(tbs), sig, issuer_spki_der)
    } else if *sig_alg == OID_SIG_ECDSA_WITH_SHA512 {
        ecdsa_verify_der_sig(&Sha512::digest(tbs), sig, issuer_spki_der)
    } else if *sig_alg == OID_PKCS1_SHA256WITHRSA {
        let vk = RsaPublicKey::from_public_key_der(issuer_spki_der)
            .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;
        vk.verify(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(tbs), sig)
            .map_err(|_| RawSignatureValidationError::SignatureMismatch)
    } else {
        log::warn!("certificate signature algorithm not supported: {sig_alg}");
        Err(RawSignatureValidationError::UnsupportedAlgorithm)
    }
}

/// Verify a DER-encoded ECDSA signature over a prehashed digest, inferring
/// the curve from the issuer key.
fn ecdsa_verify_der_sig(
    digest: &[u8],
    der_sig: &[u8],
    issuer_spki_der: &[u8],
) -> Result<(), RawSignatureValidationError> {
    use ecdsa::signature::hazmat::PrehashVerifier;

    {
        use p256::pkcs8::DecodePublicKey;
        if let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_der(issuer_spki_der) {
            let sig = der_to_p1363(der_sig, 64)
                .ok_or(RawSignatureValidationError::InvalidSignature)?;
            let sig = ecdsa::Signature::from_slice(&sig)
                .map_err(|_| RawSignatureValidationError::InvalidSignature)?;
            return vk
                .verify_prehash(digest, &sig)
                .map_err(|_| RawSignatureValidationError::SignatureMismatch);
        }
    }
    {
        use p384::pkcs8::DecodePublicKey;
        if let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_der(issuer_spki_der) {
            let sig = der_to_p1363(der_sig, 96)
                .ok_or(RawSignatureValidationError::InvalidSignature)?;
            let sig = ecdsa::Signature::from_slice(&sig)
                .map_err(|_| RawSignatureValidationError::InvalidSignature)?;
            return vk
                .verify_prehash(digest, &sig)
                .map_err(|_| RawSignatureValidationError::SignatureMismatch);
        }
    }
    {
        use p521::pkcs8::DecodePublicKey;
        // from_public_key_der is not available for the P-521 VerifyingKey in
        // this version, so load via PublicKey and convert through SEC1.
        if let Ok(vk) = p521::PublicKey::from_public_key_der(issuer_spki_der)
            .ok()
            .and_then(|pk| p521::ecdsa::VerifyingKey::from_sec1_bytes(pk.to_sec1_bytes().as_ref()).ok())
            .ok_or(())
        {
            let sig = der_to_p1363(der_sig, 132)
                .ok_or(RawSignatureValidationError::InvalidSignature)?;
            let sig = ecdsa::Signature::from_slice(&sig)
                .map_err(|_| RawSignatureValidationError::InvalidSignature)?;
            return vk
                .verify_prehash(digest, &sig)
                .map_err(|_| RawSignatureValidationError::SignatureMismatch);
        }
    }

    Err(RawSignatureValidationError::InvalidPublicKey)
}

/// Verify a raw `r ‖ s` ECDSA signature over arbitrary content with a
/// DER certificate's embedded public key, as the ICAO content signature
/// requires.
pub fn verify_content_signature(
    cert_der: &[u8],
    validator: &EcdsaValidator,
    content: &[u8],
    signature: &[u8],
) -> Result<(), RawSignatureValidationError> {
    let spki =
        public_key_der(cert_der).map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;
    validator.validate(signature, content, &spki)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn garbage_cert_is_malformed() {
        assert!(public_key_der(&[0u8; 8]).is_err());
        assert_eq!(authority_key_id(&[0u8; 8]), None);
        assert!(verify_cert_signature(&[0u8; 8], &[0u8; 8]).is_err());
    }
}
