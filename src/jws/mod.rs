//! JWS engine: producer and consumer of compact signed objects.
//!
//! A producer composes headers, payload, and key, signs, and serializes.
//! A consumer parses, binds a key, and verifies; the payload is released
//! only after verification, with [`JsonWebSignature::unverified_payload`]
//! as the explicit opt-out.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::base64url;
use crate::compact;
use crate::error::{Error, Result};
use crate::headers::{param, Headers};
use crate::jwa::{AlgorithmConstraints, AlgorithmRegistry};
use crate::jwk::JsonWebKey;

/// A JWS in any stage of production or consumption.
pub struct JsonWebSignature {
    headers: Headers,
    /// Encoded header exactly as received or as produced by signing. The
    /// signing input must use these bytes, never a re-serialization.
    encoded_header: Option<String>,
    encoded_payload: Option<String>,
    /// Received form carried an empty payload part.
    detached: bool,
    key: Option<JsonWebKey>,
    signature: Option<Vec<u8>>,
    registry: Option<Arc<AlgorithmRegistry>>,
    constraints: AlgorithmConstraints,
    known_critical: HashSet<String>,
}

impl Default for JsonWebSignature {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonWebSignature {
    /// Creates an empty JWS.
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            encoded_header: None,
            encoded_payload: None,
            detached: false,
            key: None,
            signature: None,
            registry: None,
            constraints: AlgorithmConstraints::default(),
            known_critical: HashSet::new(),
        }
    }

    /// Parses a received compact serialization.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedCompact`] on wrong part count or undecodable
    /// base64url; [`Error::MalformedJson`] when the header is not JSON.
    pub fn from_compact_serialization(input: &str) -> Result<Self> {
        let parts = compact::deserialize(input, compact::JWS_PARTS)?;
        let headers = Headers::from_encoded(parts[0])
            .map_err(structural)?;
        let detached = parts[1].is_empty();
        if !detached {
            // Decode now so malformed payload encoding surfaces as a
            // structural error, not at verification time.
            base64url::decode(parts[1]).map_err(structural)?;
        }
        let signature = base64url::decode(parts[2]).map_err(structural)?;
        Ok(Self {
            headers,
            encoded_header: Some(parts[0].to_string()),
            encoded_payload: if detached { None } else { Some(parts[1].to_string()) },
            detached,
            key: None,
            signature: Some(signature),
            registry: None,
            constraints: AlgorithmConstraints::default(),
            known_critical: HashSet::new(),
        })
    }

    /// The header set.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the header set for additional parameters.
    ///
    /// Mutating headers invalidates any previously computed signature.
    pub fn headers_mut(&mut self) -> &mut Headers {
        self.signature = None;
        self.encoded_header = None;
        &mut self.headers
    }

    /// Sets the `alg` header.
    pub fn set_algorithm(&mut self, alg: &str) {
        self.headers_mut().set_str(param::ALG, alg);
    }

    /// Sets the `kid` header.
    pub fn set_key_id(&mut self, kid: &str) {
        self.headers_mut().set_str(param::KID, kid);
    }

    /// The `alg` header value, if set.
    pub fn algorithm(&self) -> Option<&str> {
        self.headers.get_str(param::ALG)
    }

    /// The `kid` header value, if set.
    pub fn key_id(&self) -> Option<&str> {
        self.headers.get_str(param::KID)
    }

    /// Sets the payload bytes.
    pub fn set_payload(&mut self, payload: &[u8]) {
        self.signature = None;
        self.encoded_payload = Some(base64url::encode(payload));
        self.detached = false;
    }

    /// Sets the payload from a UTF-8 string.
    pub fn set_payload_str(&mut self, payload: &str) {
        self.set_payload(payload.as_bytes());
    }

    /// Supplies the already-encoded payload.
    ///
    /// Required before verifying a detached serialization; also usable by
    /// producers that control the exact encoded form. Unlike
    /// [`JsonWebSignature::set_payload`], a signature parsed from a
    /// received serialization stays bound.
    pub fn set_encoded_payload(&mut self, encoded: &str) {
        self.encoded_payload = Some(encoded.to_string());
    }

    /// The encoded payload, if one is present.
    pub fn encoded_payload(&self) -> Option<&str> {
        self.encoded_payload.as_deref()
    }

    /// Binds the signing or verification key.
    pub fn set_key(&mut self, key: JsonWebKey) {
        self.key = Some(key);
    }

    /// Injects an algorithm registry; the process-wide default is used
    /// otherwise.
    pub fn set_registry(&mut self, registry: Arc<AlgorithmRegistry>) {
        self.registry = Some(registry);
    }

    /// Replaces the algorithm constraints applied before any cryptographic
    /// work.
    pub fn set_constraints(&mut self, constraints: AlgorithmConstraints) {
        self.constraints = constraints;
    }

    /// Declares which `crit` parameter names this consumer understands.
    pub fn set_known_critical_headers<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_critical = names.into_iter().map(Into::into).collect();
    }

    fn registry(&self) -> &AlgorithmRegistry {
        match self.registry.as_deref() {
            Some(r) => r,
            None => AlgorithmRegistry::global(),
        }
    }

    fn algorithm_id(&self) -> Result<&str> {
        match self.headers.get_str(param::ALG) {
            Some(alg) if !alg.is_empty() => Ok(alg),
            _ => Err(Error::MalformedClaim("alg header is missing or empty".to_string())),
        }
    }

    fn signing_input(encoded_header: &str, encoded_payload: &str) -> Vec<u8> {
        let mut input = Vec::with_capacity(encoded_header.len() + 1 + encoded_payload.len());
        input.extend_from_slice(encoded_header.as_bytes());
        input.push(b'.');
        input.extend_from_slice(encoded_payload.as_bytes());
        input
    }

    /// Computes the signature over the signing input.
    ///
    /// # Errors
    ///
    /// Fails when `alg` is unset, constrained out, or unknown; when no key
    /// or payload is bound; or when the key does not fit the algorithm.
    pub fn sign(&mut self) -> Result<()> {
        let alg = self.algorithm_id()?.to_string();
        self.constraints.check(&alg)?;
        let entry = self.registry().signature.get(&alg)?;
        let encoded_payload = self
            .encoded_payload
            .clone()
            .ok_or_else(|| Error::MalformedClaim("no payload set".to_string()))?;
        let encoded_header = self.headers.encoded();
        let input = Self::signing_input(&encoded_header, &encoded_payload);

        let signature = if alg == "none" {
            Vec::new()
        } else {
            let key = self
                .key
                .as_ref()
                .ok_or_else(|| Error::KeyResolutionFailure("no key set".to_string()))?;
            entry.sign(key, &input)?
        };
        debug!(algorithm = %alg, "signed JWS");
        self.encoded_header = Some(encoded_header);
        self.signature = Some(signature);
        Ok(())
    }

    /// Returns the compact serialization, signing first if necessary.
    pub fn compact_serialization(&mut self) -> Result<String> {
        if self.signature.is_none() {
            self.sign()?;
        }
        let header = self
            .encoded_header
            .as_deref()
            .ok_or_else(|| Error::MalformedClaim("not signed".to_string()))?;
        let payload = self.encoded_payload.as_deref().unwrap_or_default();
        let signature = base64url::encode(self.signature.as_deref().unwrap_or_default());
        Ok(compact::serialize(&[header, payload, &signature]))
    }

    /// Returns the detached compact serialization (empty payload part);
    /// the encoded payload travels out-of-band.
    pub fn detached_compact_serialization(&mut self) -> Result<String> {
        if self.signature.is_none() {
            self.sign()?;
        }
        let header = self
            .encoded_header
            .as_deref()
            .ok_or_else(|| Error::MalformedClaim("not signed".to_string()))?;
        let signature = base64url::encode(self.signature.as_deref().unwrap_or_default());
        Ok(compact::serialize(&[header, "", &signature]))
    }

    /// The encoded protected header, available after signing or parsing.
    pub fn encoded_header(&self) -> Option<&str> {
        self.encoded_header.as_deref()
    }

    /// The encoded signature, available after signing or parsing.
    pub fn encoded_signature(&self) -> Option<String> {
        self.signature.as_deref().map(base64url::encode)
    }

    /// Checks `crit` against the consumer's known-parameter set.
    fn check_critical(&self) -> Result<()> {
        for name in self.headers.critical_names()? {
            if !self.known_critical.contains(name) {
                return Err(Error::UnsupportedCriticalParameter(name.to_string()));
            }
        }
        Ok(())
    }

    /// Verifies the signature and returns the payload.
    ///
    /// Constraint and `crit` checks run before any cryptographic work.
    ///
    /// # Errors
    ///
    /// [`Error::SignatureMismatch`] on algebraic failure; structural and
    /// policy failures keep their own kinds.
    pub fn verify(&mut self) -> Result<Vec<u8>> {
        self.check_critical()?;
        let alg = self.algorithm_id()?.to_string();
        self.constraints.check(&alg)?;
        let entry = self.registry().signature.get(&alg)?;

        let encoded_header = self
            .encoded_header
            .clone()
            .unwrap_or_else(|| self.headers.encoded());
        let encoded_payload = self
            .encoded_payload
            .clone()
            .ok_or_else(|| {
                if self.detached {
                    Error::MalformedCompact("detached payload was not supplied".to_string())
                } else {
                    Error::MalformedClaim("no payload set".to_string())
                }
            })?;
        let signature = self
            .signature
            .clone()
            .ok_or_else(|| Error::MalformedCompact("no signature present".to_string()))?;
        let input = Self::signing_input(&encoded_header, &encoded_payload);

        if alg == "none" {
            if !signature.is_empty() {
                return Err(Error::SignatureMismatch);
            }
        } else {
            let key = self
                .key
                .as_ref()
                .ok_or_else(|| Error::KeyResolutionFailure("no key set".to_string()))?;
            entry.verify(key, &input, &signature)?;
        }
        debug!(algorithm = %alg, "verified JWS");
        base64url::decode(&encoded_payload)
    }

    /// The payload without verification.
    ///
    /// The name is deliberate: callers acknowledge they are reading data
    /// whose authenticity has not been established.
    pub fn unverified_payload(&self) -> Result<Vec<u8>> {
        let encoded = self
            .encoded_payload
            .as_deref()
            .ok_or_else(|| Error::MalformedCompact("no payload present".to_string()))?;
        base64url::decode(encoded)
    }
}

/// Maps any parse-stage error onto the structural kind, keeping JSON
/// errors distinct.
fn structural(err: Error) -> Error {
    match err {
        Error::MalformedJson(e) => Error::MalformedJson(e),
        Error::InvalidInputEncoding(msg) | Error::MalformedCompact(msg) => {
            Error::MalformedCompact(msg)
        }
        other => other,
    }
}
