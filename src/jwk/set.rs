//! JWK Sets.

use serde::{Deserialize, Serialize};

use super::{JsonWebKey, PublicKeyUse};
use crate::error::{Error, Result};

/// An ordered collection of JSON Web Keys (RFC 7517 section 5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// The keys, in document order.
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a set from a `{"keys": [...]}` JSON document, validating
    /// each key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedKey`] when the document shape is wrong or
    /// any contained key is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::MalformedKey(e.to_string()))?;
        let keys = value
            .get("keys")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| Error::MalformedKey("missing keys array".to_string()))?;
        let keys = keys
            .iter()
            .cloned()
            .map(JsonWebKey::from_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { keys })
    }

    /// Serializes the set to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Returns the first key satisfying every provided filter.
    ///
    /// Filters left as `None` match any key. A key with no `use` or `alg`
    /// member does not match a filter on that member.
    pub fn find(
        &self,
        kid: Option<&str>,
        key_use: Option<PublicKeyUse>,
        kty: Option<&str>,
        alg: Option<&str>,
    ) -> Option<&JsonWebKey> {
        self.keys.iter().find(|key| {
            kid.map_or(true, |want| key.kid.as_deref() == Some(want))
                && key_use.map_or(true, |want| key.public_key_use == Some(want))
                && kty.map_or(true, |want| key.key_type() == want)
                && alg.map_or(true, |want| key.alg.as_deref() == Some(want))
        })
    }
}
