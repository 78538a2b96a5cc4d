//! JWE engine: producer and consumer of compact encrypted objects.
//!
//! The producer sequence is strict: content-encryption choice yields the
//! CEK descriptor, key management yields CEK / encrypted key / header
//! updates, the updates merge into the protected header, and only then is
//! the header encoded and fixed as the AAD. Reordering any of these steps
//! breaks authenticity. On the consumer side, tag verification always
//! precedes plaintext delivery.

use std::collections::HashSet;
use std::sync::Arc;

use rand_core::{OsRng, RngCore};
use tracing::debug;
use zeroize::Zeroizing;

use crate::base64url;
use crate::compact;
use crate::error::{Error, Result};
use crate::headers::{param, Headers};
use crate::jwa::{AlgorithmConstraints, AlgorithmRegistry};
use crate::jwk::JsonWebKey;
use crate::zip;

/// A JWE in any stage of production or consumption.
pub struct JsonWebEncryption {
    headers: Headers,
    /// Encoded header exactly as received; the AAD on the consume path.
    encoded_header: Option<String>,
    plaintext: Option<Zeroizing<Vec<u8>>>,
    key: Option<JsonWebKey>,
    cek_override: Option<Zeroizing<Vec<u8>>>,
    iv_override: Option<Vec<u8>>,
    encrypted_key: Option<Vec<u8>>,
    iv: Option<Vec<u8>>,
    ciphertext: Option<Vec<u8>>,
    tag: Option<Vec<u8>>,
    registry: Option<Arc<AlgorithmRegistry>>,
    constraints: AlgorithmConstraints,
    known_critical: HashSet<String>,
    max_pbkdf_iterations: Option<u64>,
}

impl Default for JsonWebEncryption {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonWebEncryption {
    /// Creates an empty JWE.
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            encoded_header: None,
            plaintext: None,
            key: None,
            cek_override: None,
            iv_override: None,
            encrypted_key: None,
            iv: None,
            ciphertext: None,
            tag: None,
            registry: None,
            constraints: AlgorithmConstraints::default(),
            known_critical: HashSet::new(),
            max_pbkdf_iterations: None,
        }
    }

    /// Parses a received compact serialization.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedCompact`] on wrong part count or undecodable
    /// base64url; [`Error::MalformedJson`] when the header is not JSON.
    pub fn from_compact_serialization(input: &str) -> Result<Self> {
        let parts = compact::deserialize(input, compact::JWE_PARTS)?;
        let headers = Headers::from_encoded(parts[0]).map_err(structural)?;
        let encrypted_key = base64url::decode(parts[1]).map_err(structural)?;
        let iv = base64url::decode(parts[2]).map_err(structural)?;
        let ciphertext = base64url::decode(parts[3]).map_err(structural)?;
        let tag = base64url::decode(parts[4]).map_err(structural)?;
        Ok(Self {
            headers,
            encoded_header: Some(parts[0].to_string()),
            plaintext: None,
            key: None,
            cek_override: None,
            iv_override: None,
            encrypted_key: Some(encrypted_key),
            iv: Some(iv),
            ciphertext: Some(ciphertext),
            tag: Some(tag),
            registry: None,
            constraints: AlgorithmConstraints::default(),
            known_critical: HashSet::new(),
            max_pbkdf_iterations: None,
        })
    }

    /// The header set.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the header set for additional parameters.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Sets the `alg` (key management) header.
    pub fn set_algorithm(&mut self, alg: &str) {
        self.headers.set_str(param::ALG, alg);
    }

    /// Sets the `enc` (content encryption) header.
    pub fn set_encryption_method(&mut self, enc: &str) {
        self.headers.set_str(param::ENC, enc);
    }

    /// Sets the `kid` header.
    pub fn set_key_id(&mut self, kid: &str) {
        self.headers.set_str(param::KID, kid);
    }

    /// Sets the `zip` header.
    pub fn set_compression(&mut self, zip_value: &str) {
        self.headers.set_str(param::ZIP, zip_value);
    }

    /// Sets the plaintext bytes.
    pub fn set_plaintext(&mut self, plaintext: &[u8]) {
        self.plaintext = Some(Zeroizing::new(plaintext.to_vec()));
    }

    /// Sets the plaintext from a UTF-8 string.
    pub fn set_plaintext_str(&mut self, plaintext: &str) {
        self.set_plaintext(plaintext.as_bytes());
    }

    /// Binds the management key (public for encrypt, private for decrypt,
    /// symmetric for both).
    pub fn set_key(&mut self, key: JsonWebKey) {
        self.key = Some(key);
    }

    /// Pins the CEK instead of drawing a fresh one.
    ///
    /// Meant for reproducing fixed vectors; production callers let the
    /// engine generate the CEK.
    pub fn set_cek(&mut self, cek: &[u8]) {
        self.cek_override = Some(Zeroizing::new(cek.to_vec()));
    }

    /// Pins the CEK from its base64url form.
    pub fn set_encoded_cek(&mut self, encoded: &str) -> Result<()> {
        self.cek_override = Some(Zeroizing::new(base64url::decode(encoded)?));
        Ok(())
    }

    /// Pins the IV instead of drawing a fresh one. Reusing an IV with the
    /// same key is a fatal caller error for the GCM family.
    pub fn set_iv(&mut self, iv: &[u8]) {
        self.iv_override = Some(iv.to_vec());
    }

    /// Pins the IV from its base64url form.
    pub fn set_encoded_iv(&mut self, encoded: &str) -> Result<()> {
        self.iv_override = Some(base64url::decode(encoded)?);
        Ok(())
    }

    /// Injects an algorithm registry; the process-wide default is used
    /// otherwise.
    pub fn set_registry(&mut self, registry: Arc<AlgorithmRegistry>) {
        self.registry = Some(registry);
    }

    /// Replaces the algorithm constraints applied before any cryptographic
    /// work (both `alg` and `enc` are checked).
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

    /// Caps the PBES2 iteration count this consumer will run.
    pub fn set_max_pbkdf_iterations(&mut self, max: u64) {
        self.max_pbkdf_iterations = Some(max);
    }

    /// The encrypted-key part, available after parsing or encrypting.
    pub fn encrypted_key(&self) -> Option<&[u8]> {
        self.encrypted_key.as_deref()
    }

    fn registry(&self) -> &AlgorithmRegistry {
        match self.registry.as_deref() {
            Some(r) => r,
            None => AlgorithmRegistry::global(),
        }
    }

    fn required_header<'a>(&'a self, name: &str) -> Result<&'a str> {
        match self.headers.get_str(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(Error::MalformedClaim(format!("{name} header is missing or empty"))),
        }
    }

    /// Encrypts and returns the five-part compact serialization.
    ///
    /// # Errors
    ///
    /// Fails when `alg`/`enc` are unset, constrained out, or unknown; when
    /// no key or plaintext is bound; or when the key does not fit.
    pub fn compact_serialization(&mut self) -> Result<String> {
        let alg = self.required_header(param::ALG)?.to_string();
        let enc = self.required_header(param::ENC)?.to_string();
        self.constraints.check(&alg)?;
        self.constraints.check(&enc)?;

        // Unknown compression must fail before any cryptographic work.
        let compress = match self.headers.get_str(param::ZIP) {
            Some(value) => {
                zip::check(value)?;
                true
            }
            None => false,
        };

        let enc_entry = self.registry().content_encryption.get(&enc)?;
        let km_entry = self.registry().key_management.get(&alg)?;
        let descriptor = enc_entry.key_descriptor();

        let key = self
            .key
            .as_ref()
            .ok_or_else(|| Error::KeyResolutionFailure("no key set".to_string()))?;
        let plaintext = self
            .plaintext
            .as_ref()
            .ok_or_else(|| Error::MalformedClaim("no plaintext set".to_string()))?;

        let managed = km_entry.manage_for_encrypt(
            key,
            &descriptor,
            &self.headers,
            self.cek_override.as_ref().map(|cek| cek.as_slice()),
        )?;

        // Header updates land before the header is fixed as the AAD.
        self.headers.merge(managed.header_updates);
        let encoded_header = self.headers.encoded();
        let aad = encoded_header.as_bytes();

        let iv = match &self.iv_override {
            Some(iv) => iv.clone(),
            None => {
                let mut fresh = vec![0u8; enc_entry.iv_len()];
                OsRng.fill_bytes(&mut fresh);
                fresh
            }
        };

        let content = if compress {
            Zeroizing::new(zip::compress(plaintext))
        } else {
            plaintext.clone()
        };

        let (ciphertext, tag) = enc_entry.encrypt(&managed.cek, &iv, &content, aad)?;
        debug!(algorithm = %alg, encryption = %enc, "encrypted JWE");

        let serialized = compact::serialize(&[
            &encoded_header,
            &base64url::encode(&managed.encrypted_key),
            &base64url::encode(&iv),
            &base64url::encode(&ciphertext),
            &base64url::encode(&tag),
        ]);
        self.encoded_header = Some(encoded_header);
        self.encrypted_key = Some(managed.encrypted_key);
        self.iv = Some(iv);
        self.ciphertext = Some(ciphertext);
        self.tag = Some(tag);
        Ok(serialized)
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

    /// Recovers the CEK through the key-management algorithm without
    /// touching the content. Useful for diagnostics and conformance
    /// checks; ordinary consumers call [`JsonWebEncryption::decrypt`].
    pub fn recover_cek(&self) -> Result<Zeroizing<Vec<u8>>> {
        let alg = self.required_header(param::ALG)?.to_string();
        let enc = self.required_header(param::ENC)?.to_string();
        let enc_entry = self.registry().content_encryption.get(&enc)?;
        let km_entry = self.registry().key_management.get(&alg)?;
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| Error::KeyResolutionFailure("no key set".to_string()))?;
        km_entry.manage_for_decrypt(
            key,
            self.encrypted_key.as_deref().unwrap_or_default(),
            &enc_entry.key_descriptor(),
            &self.headers,
        )
    }

    /// Verifies and decrypts, returning the plaintext.
    ///
    /// Tag verification happens before any plaintext is formed; MAC and
    /// padding failures are indistinguishable.
    pub fn decrypt(&mut self) -> Result<Vec<u8>> {
        self.check_critical()?;
        let alg = self.required_header(param::ALG)?.to_string();
        let enc = self.required_header(param::ENC)?.to_string();
        self.constraints.check(&alg)?;
        self.constraints.check(&enc)?;

        // Consumer-side PBKDF2 work ceiling, applied before derivation.
        if let (Some(max), Some(p2c)) =
            (self.max_pbkdf_iterations, self.headers.get_u64(param::P2C)?)
        {
            if p2c > max {
                return Err(Error::PolicyViolation(format!(
                    "p2c {p2c} exceeds maximum {max}"
                )));
            }
        }

        let decompress = match self.headers.get_str(param::ZIP) {
            Some(value) => {
                zip::check(value)?;
                true
            }
            None => false,
        };

        let enc_entry = self.registry().content_encryption.get(&enc)?;
        let km_entry = self.registry().key_management.get(&alg)?;
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| Error::KeyResolutionFailure("no key set".to_string()))?;
        let encoded_header = self
            .encoded_header
            .clone()
            .unwrap_or_else(|| self.headers.encoded());

        let cek = km_entry.manage_for_decrypt(
            key,
            self.encrypted_key.as_deref().unwrap_or_default(),
            &enc_entry.key_descriptor(),
            &self.headers,
        )?;

        let plaintext = enc_entry.decrypt(
            &cek,
            self.iv.as_deref().unwrap_or_default(),
            self.ciphertext.as_deref().unwrap_or_default(),
            self.tag.as_deref().unwrap_or_default(),
            encoded_header.as_bytes(),
        )?;
        debug!(algorithm = %alg, encryption = %enc, "decrypted JWE");

        let plaintext = if decompress {
            zip::decompress(&plaintext)?
        } else {
            plaintext
        };
        Ok(plaintext)
    }
}

/// Maps parse-stage errors onto the structural kind, keeping JSON errors
/// distinct.
fn structural(err: Error) -> Error {
    match err {
        Error::MalformedJson(e) => Error::MalformedJson(e),
        Error::InvalidInputEncoding(msg) | Error::MalformedCompact(msg) => {
            Error::MalformedCompact(msg)
        }
        other => other,
    }
}
