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

//! The keyed store of trust material and display-string tables the parsers
//! resolve against.
//!
//! The bundled instance is loaded at most once per process and is immutable
//! thereafter; tests and embedders construct their own [`TrustStore`] and
//! add key material explicitly.

use std::{collections::HashMap, sync::LazyLock};

use serde_json::Value;

use crate::Error;

/// EU DGC value-set tables, keyed by the claim key they translate.
const EU_DGC_VALUE_SETS: &[(&str, &str)] = &[
    ("tg", include_str!("resources/eu-dgc/tg.json")),
    ("vp", include_str!("resources/eu-dgc/vp.json")),
    ("mp", include_str!("resources/eu-dgc/mp.json")),
    ("ma", include_str!("resources/eu-dgc/ma.json")),
    ("tcTt", include_str!("resources/eu-dgc/tcTt.json")),
    ("tcMa", include_str!("resources/eu-dgc/tcMa.json")),
    ("tcTr", include_str!("resources/eu-dgc/tcTr.json")),
];

const HL7_CVX_CODES: &str = include_str!("resources/shc/hl7-cvx-codes.json");
const ICD11_CODES: &str = include_str!("resources/icao/icd11.json");

static BUNDLED: LazyLock<TrustStore> = LazyLock::new(TrustStore::with_bundled_resources);

/// The bundled trust store, loaded on first use.
pub(crate) fn bundled() -> &'static TrustStore {
    &BUNDLED
}

/// Keyed lookup of signer certificates, verification keys, and display
/// string tables.
///
/// Key material is added per scheme: the schemes use disjoint identifier
/// spaces (COSE key ids, X.509 authority key ids, JWK key ids, IRMA issuer
/// ids, DIVOC key names), so each gets its own directory.
#[derive(Debug, Default)]
pub struct TrustStore {
    eu_dgc_keys: HashMap<String, Vec<Vec<u8>>>,
    icao_issuers: HashMap<String, Vec<Vec<u8>>>,
    shc_keys: HashMap<String, Vec<u8>>,
    irma_keys: HashMap<String, String>,
    divoc_keys: HashMap<String, Vec<u8>>,
    value_sets: HashMap<String, Value>,
}

impl TrustStore {
    /// Create an empty trust store with no value-set tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trust store with the bundled display-string tables.
    pub fn with_bundled_resources() -> Self {
        let mut store = Self::new();
        for (name, table) in EU_DGC_VALUE_SETS {
            match serde_json::from_str(table) {
                Ok(value) => {
                    store.value_sets.insert((*name).to_owned(), value);
                }
                Err(err) => log::error!("malformed value set {name}: {err}"),
            }
        }
        match serde_json::from_str(HL7_CVX_CODES) {
            Ok(value) => {
                store.value_sets.insert("cvx".to_owned(), value);
            }
            Err(err) => log::error!("malformed CVX table: {err}"),
        }
        match serde_json::from_str(ICD11_CODES) {
            Ok(value) => {
                store.value_sets.insert("icd11".to_owned(), value);
            }
            Err(err) => log::error!("malformed ICD-11 table: {err}"),
        }
        store
    }

    /// Register a signer certificate (DER) for an EU DGC key id.
    ///
    /// The certificate's public key is extracted up front, so a corrupt
    /// certificate fails loudly here instead of silently downgrading every
    /// verification later.
    pub fn add_eu_dgc_certificate(
        &mut self,
        key_id_hex: impl Into<String>,
        cert_der: &[u8],
    ) -> Result<(), Error> {
        let spki = hcert_crypto::x509::public_key_der(cert_der)
            .map_err(|err| Error::InvalidKeyMaterial(err.to_string()))?;
        self.add_eu_dgc_key(key_id_hex, spki);
        Ok(())
    }

    /// Register a signer public key (SPKI DER) for an EU DGC key id.
    pub fn add_eu_dgc_key(&mut self, key_id_hex: impl Into<String>, spki_der: Vec<u8>) {
        self.eu_dgc_keys
            .entry(key_id_hex.into())
            .or_default()
            .push(spki_der);
    }

    /// Signer public key candidates (SPKI DER) for an EU DGC key id.
    pub fn eu_dgc_keys(&self, key_id_hex: &str) -> &[Vec<u8>] {
        self.eu_dgc_keys
            .get(key_id_hex)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Register an ICAO CSCA issuer certificate (DER) under its subject key
    /// id.
    ///
    /// Multiple issuers may share a key id; all candidates are tried during
    /// chain verification.
    pub fn add_icao_issuer(&mut self, key_id_hex: impl Into<String>, cert_der: Vec<u8>) {
        self.icao_issuers
            .entry(key_id_hex.into())
            .or_default()
            .push(cert_der);
    }

    /// Issuer certificate candidates (DER) for an authority key id.
    pub fn icao_issuers(&self, key_id_hex: &str) -> &[Vec<u8>] {
        self.icao_issuers
            .get(key_id_hex)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Register a JWK (JSON bytes) for a SMART Health Cards key id.
    pub fn add_shc_key(&mut self, key_id: impl Into<String>, jwk_json: Vec<u8>) {
        self.shc_keys.insert(key_id.into(), jwk_json);
    }

    /// The JWK (JSON bytes) for a SMART Health Cards key id.
    pub fn shc_key(&self, key_id: &str) -> Option<&[u8]> {
        self.shc_keys.get(key_id).map(Vec::as_slice)
    }

    /// Register an IRMA issuer public key (scheme XML).
    pub fn add_irma_key(&mut self, issuer_id: impl Into<String>, xml: String) {
        self.irma_keys.insert(issuer_id.into(), xml);
    }

    /// The XML-encoded public key parameters for an IRMA issuer id.
    pub fn irma_key(&self, issuer_id: &str) -> Option<&str> {
        self.irma_keys.get(issuer_id).map(String::as_str)
    }

    /// Register a DIVOC signing key from an RSA public key PEM document.
    pub fn add_divoc_key_pem(
        &mut self,
        name: impl Into<String>,
        pem_data: &[u8],
    ) -> Result<(), Error> {
        let parsed =
            pem::parse(pem_data).map_err(|err| Error::InvalidKeyMaterial(err.to_string()))?;
        if parsed.tag() != "PUBLIC KEY" {
            return Err(Error::InvalidKeyMaterial(format!(
                "unexpected PEM tag {}",
                parsed.tag()
            )));
        }
        self.divoc_keys
            .insert(name.into(), parsed.contents().to_vec());
        Ok(())
    }

    /// Register a DIVOC signing key as SubjectPublicKeyInfo DER.
    pub fn add_divoc_key_der(&mut self, name: impl Into<String>, spki_der: Vec<u8>) {
        self.divoc_keys.insert(name.into(), spki_der);
    }

    /// The SPKI DER key for a DIVOC key name, or the single bundled key when
    /// no name matches.
    ///
    /// There is only one production DIVOC signing key; resolving the right
    /// key by `verificationMethod` is kept for when that changes.
    pub fn divoc_key(&self, name: &str) -> Option<&[u8]> {
        if let Some(key) = self.divoc_keys.get(name) {
            return Some(key);
        }
        if self.divoc_keys.len() == 1 {
            return self.divoc_keys.values().next().map(Vec::as_slice);
        }
        None
    }

    /// Translate a coded value through a bundled value-set table.
    ///
    /// Returns the code itself when no table entry exists.
    pub fn display_string(&self, value_set: &str, code: &str) -> String {
        self.display_string_localized(value_set, code, None)
    }

    /// Translate a coded value, preferring a `code[lang]` table entry.
    pub fn display_string_localized(
        &self,
        value_set: &str,
        code: &str,
        language: Option<&str>,
    ) -> String {
        let Some(Value::Object(table)) = self.value_sets.get(value_set) else {
            log::warn!("no translation table found for {value_set}");
            return code.to_owned();
        };
        if let Some(language) = language {
            if let Some(Value::String(text)) = table.get(&format!("{code}[{language}]")) {
                return text.clone();
            }
        }
        match table.get(code) {
            Some(Value::String(text)) => text.clone(),
            _ => code.to_owned(),
        }
    }

    /// Look up an HL7 CVX vaccine code entry.
    pub(crate) fn cvx_code(&self, code: &str) -> Option<&Value> {
        self.value_sets.get("cvx")?.get(code)
    }
}
