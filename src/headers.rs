//! Order-preserving JOSE header parameter map.
//!
//! The protected header is covered by the signature (JWS) or used as AAD
//! (JWE), so its serialized form must be reproducible byte for byte. The
//! map keeps insertion order and serializes with no added whitespace;
//! re-setting an existing parameter keeps its original position.

use serde_json::{Map, Value};

use crate::base64url;
use crate::error::{Error, Result};

/// Recognized header parameter names.
pub mod param {
    /// Algorithm
    pub const ALG: &str = "alg";
    /// Content encryption algorithm (JWE only)
    pub const ENC: &str = "enc";
    /// Key ID
    pub const KID: &str = "kid";
    /// Content type
    pub const CTY: &str = "cty";
    /// Type
    pub const TYP: &str = "typ";
    /// Critical header names
    pub const CRIT: &str = "crit";
    /// Compression algorithm (JWE only)
    pub const ZIP: &str = "zip";
    /// Embedded public key
    pub const JWK: &str = "jwk";
    /// JWK Set URL
    pub const JKU: &str = "jku";
    /// X.509 certificate chain
    pub const X5C: &str = "x5c";
    /// X.509 certificate SHA-1 thumbprint
    pub const X5T: &str = "x5t";
    /// X.509 URL
    pub const X5U: &str = "x5u";
    /// Ephemeral public key (ECDH)
    pub const EPK: &str = "epk";
    /// Agreement PartyUInfo
    pub const APU: &str = "apu";
    /// Agreement PartyVInfo
    pub const APV: &str = "apv";
    /// PBES2 salt input
    pub const P2S: &str = "p2s";
    /// PBES2 iteration count
    pub const P2C: &str = "p2c";
    /// Initialization vector (AES-GCM key wrap)
    pub const IV: &str = "iv";
    /// Authentication tag (AES-GCM key wrap)
    pub const TAG: &str = "tag";
}

/// An ordered set of JOSE header parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    map: Map<String, Value>,
}

impl Headers {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a string-valued parameter.
    pub fn set_str(&mut self, name: &str, value: impl Into<String>) {
        self.map.insert(name.to_string(), Value::String(value.into()));
    }

    /// Sets an unsigned integer parameter.
    pub fn set_u64(&mut self, name: &str, value: u64) {
        self.map.insert(name.to_string(), Value::from(value));
    }

    /// Sets an arbitrary JSON-valued parameter.
    pub fn set_value(&mut self, name: &str, value: Value) {
        self.map.insert(name.to_string(), value);
    }

    /// Removes a parameter, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.map.remove(name)
    }

    /// Returns whether the parameter is present.
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Gets a parameter as a string slice, if present and a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.map.get(name).and_then(Value::as_str)
    }

    /// Gets a parameter as a JSON value.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    /// Gets an integer parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NumberOutOfRange`] when the parameter is present
    /// but is not representable as an unsigned 64-bit integer.
    pub fn get_u64(&self, name: &str) -> Result<Option<u64>> {
        match self.map.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| Error::NumberOutOfRange(format!("{name}: {v}"))),
        }
    }

    /// Merges another header set into this one.
    ///
    /// Parameters already present keep their position; new parameters are
    /// appended in the other set's order. The JWE engine uses this to apply
    /// key-management header updates before the protected header becomes
    /// the AAD.
    pub fn merge(&mut self, updates: Headers) {
        for (name, value) in updates.map {
            self.map.insert(name, value);
        }
    }

    /// Returns the names of all parameters in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Returns whether the header set is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Serializes the header set to compact JSON in insertion order.
    pub fn to_json(&self) -> String {
        // Map<String, Value> serialization to a string cannot fail.
        serde_json::to_string(&self.map).unwrap_or_default()
    }

    /// Returns the base64url encoding of the JSON serialization.
    pub fn encoded(&self) -> String {
        base64url::encode(self.to_json())
    }

    /// Parses a header set from a JSON document.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let map: Map<String, Value> = serde_json::from_slice(json)?;
        Ok(Self { map })
    }

    /// Parses a header set from its base64url-encoded JSON form.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let json = base64url::decode(encoded)?;
        Self::from_json(&json)
    }

    /// Names listed in the `crit` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedClaim`] when `crit` is present but is not
    /// an array of strings.
    pub fn critical_names(&self) -> Result<Vec<&str>> {
        match self.map.get(param::CRIT) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .ok_or_else(|| Error::MalformedClaim("crit entries must be strings".into()))
                })
                .collect(),
            Some(_) => Err(Error::MalformedClaim("crit must be an array".into())),
        }
    }
}
