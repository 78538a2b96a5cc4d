//! One-shot consumer over compact JOSE input.
//!
//! A [`Consumer`] classifies input as JWS or JWE by part count, resolves a
//! key, applies the configured policy, and returns the authenticated
//! payload. Every knob the policy surface recognizes lives in
//! [`ConsumerConfig`].

use std::collections::HashSet;
use std::sync::Arc;

use crate::compact;
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::jwa::{AlgorithmConstraints, AlgorithmRegistry};
use crate::jwe::JsonWebEncryption;
use crate::jwk::JsonWebKey;
use crate::jws::JsonWebSignature;

/// Resolves a verification or decryption key from the received headers.
pub type KeyResolver = dyn Fn(&Headers) -> Result<JsonWebKey> + Send + Sync;

/// Consumer policy configuration.
pub struct ConsumerConfig {
    /// Refuse input that carries no signature. A bare JWE is not a
    /// signature, so decrypt-only consumers set this to `false`.
    pub require_signature: bool,
    /// Exact allow-list of algorithm identifiers; `None` means any
    /// registered algorithm except those disallowed.
    pub allowed_algorithms: Option<HashSet<String>>,
    /// Deny-list applied when no allow-list is set. `none` is always
    /// denied unless explicitly allow-listed.
    pub disallowed_algorithms: HashSet<String>,
    /// Ceiling on the PBES2 `p2c` iteration count.
    pub max_pbkdf_iterations: u64,
    /// Whether detached-payload JWS input is acceptable.
    pub allow_detached_payload: bool,
    /// `crit` parameter names this consumer understands.
    pub known_critical_headers: HashSet<String>,
    /// Key resolution strategy used when no explicit key is supplied.
    pub key_resolver: Option<Box<KeyResolver>>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            require_signature: true,
            allowed_algorithms: None,
            disallowed_algorithms: HashSet::new(),
            max_pbkdf_iterations: crate::jwa::default_max_pbkdf_iterations(),
            allow_detached_payload: false,
            known_critical_headers: HashSet::new(),
            key_resolver: None,
        }
    }
}

impl ConsumerConfig {
    fn constraints(&self) -> AlgorithmConstraints {
        match &self.allowed_algorithms {
            Some(allowed) => AlgorithmConstraints::Allow(allowed.clone()),
            None => {
                let mut denied = self.disallowed_algorithms.clone();
                denied.insert("none".to_string());
                AlgorithmConstraints::Deny(denied)
            }
        }
    }
}

/// A configured consumer of compact JOSE objects.
pub struct Consumer {
    config: ConsumerConfig,
    registry: Option<Arc<AlgorithmRegistry>>,
}

impl Consumer {
    /// Creates a consumer with the given policy.
    pub fn new(config: ConsumerConfig) -> Self {
        Self { config, registry: None }
    }

    /// Injects an algorithm registry; the process-wide default is used
    /// otherwise.
    pub fn with_registry(mut self, registry: Arc<AlgorithmRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Processes a compact JWS or JWE and returns the authenticated
    /// payload.
    ///
    /// The key is either supplied explicitly or resolved through the
    /// configured resolver once the headers are parsed.
    pub fn consume(&self, input: &str, key: Option<&JsonWebKey>) -> Result<Vec<u8>> {
        match compact::part_count(input) {
            compact::JWS_PARTS => self.consume_jws(input, key, None),
            compact::JWE_PARTS => self.consume_jwe(input, key),
            n => Err(Error::MalformedCompact(format!(
                "expected 3 or 5 parts, found {n}"
            ))),
        }
    }

    /// Processes a detached-payload JWS, with the encoded payload supplied
    /// out-of-band.
    pub fn consume_detached(
        &self,
        input: &str,
        encoded_payload: &str,
        key: Option<&JsonWebKey>,
    ) -> Result<Vec<u8>> {
        if !self.config.allow_detached_payload {
            return Err(Error::PolicyViolation(
                "detached payload input is not allowed".to_string(),
            ));
        }
        if compact::part_count(input) != compact::JWS_PARTS {
            return Err(Error::MalformedCompact(
                "detached input must be a three-part JWS".to_string(),
            ));
        }
        self.consume_jws(input, key, Some(encoded_payload))
    }

    fn resolve_key(&self, headers: &Headers, key: Option<&JsonWebKey>) -> Result<JsonWebKey> {
        if let Some(key) = key {
            return Ok(key.clone());
        }
        match &self.config.key_resolver {
            Some(resolver) => resolver(headers),
            None => Err(Error::KeyResolutionFailure(
                "no key supplied and no resolver configured".to_string(),
            )),
        }
    }

    fn consume_jws(
        &self,
        input: &str,
        key: Option<&JsonWebKey>,
        encoded_payload: Option<&str>,
    ) -> Result<Vec<u8>> {
        let mut jws = JsonWebSignature::from_compact_serialization(input)?;
        if jws.encoded_payload().is_none() && encoded_payload.is_none() {
            // Detached form arrived through the non-detached entry point.
            return Err(if self.config.allow_detached_payload {
                Error::MalformedCompact("detached payload was not supplied".to_string())
            } else {
                Error::PolicyViolation("detached payload input is not allowed".to_string())
            });
        }
        if let Some(encoded) = encoded_payload {
            jws.set_encoded_payload(encoded);
        }
        let resolved = self.resolve_key(jws.headers(), key)?;
        jws.set_key(resolved);
        jws.set_constraints(self.config.constraints());
        jws.set_known_critical_headers(self.config.known_critical_headers.iter().cloned());
        if let Some(registry) = &self.registry {
            jws.set_registry(Arc::clone(registry));
        }
        jws.verify()
    }

    fn consume_jwe(&self, input: &str, key: Option<&JsonWebKey>) -> Result<Vec<u8>> {
        if self.config.require_signature {
            return Err(Error::PolicyViolation(
                "input is encrypted but carries no signature".to_string(),
            ));
        }
        let mut jwe = JsonWebEncryption::from_compact_serialization(input)?;
        let resolved = self.resolve_key(jwe.headers(), key)?;
        jwe.set_key(resolved);
        jwe.set_constraints(self.config.constraints());
        jwe.set_known_critical_headers(self.config.known_critical_headers.iter().cloned());
        jwe.set_max_pbkdf_iterations(self.config.max_pbkdf_iterations);
        if let Some(registry) = &self.registry {
            jwe.set_registry(Arc::clone(registry));
        }
        jwe.decrypt()
    }
}
