//! Algorithm registry: three pluggable catalogs of JOSE algorithms.
//!
//! The registry is the only globally shared mutable object in the crate.
//! Registration happens once at process initialization (or explicitly at
//! runtime under a single-writer discipline); lookups hand out `Arc`
//! snapshots so a reader never observes a torn entry. Engines take an
//! injected registry and fall back to the process-wide default, which is
//! pre-populated with every algorithm implemented here.

mod concat_kdf;
mod content_encryption;
mod key_management;
mod sign;

pub use content_encryption::{AesCbcHmacSha2, AesGcmContentEncryption};
pub use key_management::{
    AesGcmKeyWrap, AesKeyWrap, DirectKeyManagement, EcdhEsKeyManagement, Pbes2KeyWrap,
    Rsa15KeyManagement, RsaOaepKeyManagement,
};
pub use sign::{
    EcdsaSignature, EddsaSignature, HmacSignature, NoneSignature, RsaSignature,
};

pub(crate) use concat_kdf::concat_kdf_sha256;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::jwk::{EcCurve, JsonWebKey};

/// Anything registered in a catalog, keyed by its exact identifier string.
pub trait AlgorithmIdentifier {
    /// The registered algorithm identifier, e.g. `RS256` or `A128KW`.
    fn identifier(&self) -> &str;
}

/// A JWS signature algorithm.
///
/// The signing input is always the concatenation of the encoded protected
/// header, a single dot, and the encoded payload.
pub trait SignatureAlgorithm: AlgorithmIdentifier + Send + Sync {
    /// Produces a signature octet string.
    fn sign(&self, key: &JsonWebKey, signing_input: &[u8]) -> Result<Vec<u8>>;

    /// Verifies a signature octet string.
    ///
    /// # Errors
    ///
    /// [`Error::SignatureMismatch`] on algebraic failure,
    /// [`Error::AlgorithmKeyMismatch`] when the key type does not fit.
    fn verify(&self, key: &JsonWebKey, signing_input: &[u8], signature: &[u8]) -> Result<()>;
}

/// Contract between a content-encryption algorithm and the key-management
/// step that must supply its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentEncryptionKeyDescriptor {
    /// Required CEK length in bits.
    pub bit_length: usize,
    /// Symmetric algorithm family the CEK feeds, e.g. `AES`.
    pub family: &'static str,
}

impl ContentEncryptionKeyDescriptor {
    /// Required CEK length in octets.
    pub fn byte_length(&self) -> usize {
        self.bit_length / 8
    }
}

/// Result of the encrypt-side key-management step.
pub struct ManagedCek {
    /// The content encryption key the payload will be encrypted under.
    pub cek: Zeroizing<Vec<u8>>,
    /// The encrypted-key part of the serialization (may be empty).
    pub encrypted_key: Vec<u8>,
    /// Header parameters the engine must merge into the protected header
    /// before it becomes the AAD.
    pub header_updates: Headers,
}

/// A JWE key-management algorithm.
pub trait KeyManagementAlgorithm: AlgorithmIdentifier + Send + Sync {
    /// Establishes the CEK on the encrypt side.
    ///
    /// `cek_override` lets a caller pin the CEK (deterministic test
    /// vectors); algorithms that derive the CEK rather than transport it
    /// ignore the override.
    fn manage_for_encrypt(
        &self,
        key: &JsonWebKey,
        descriptor: &ContentEncryptionKeyDescriptor,
        headers: &Headers,
        cek_override: Option<&[u8]>,
    ) -> Result<ManagedCek>;

    /// Recovers the CEK on the decrypt side.
    fn manage_for_decrypt(
        &self,
        key: &JsonWebKey,
        encrypted_key: &[u8],
        descriptor: &ContentEncryptionKeyDescriptor,
        headers: &Headers,
    ) -> Result<Zeroizing<Vec<u8>>>;
}

/// A JWE content-encryption algorithm (AEAD over CEK, IV, plaintext, AAD).
pub trait ContentEncryptionAlgorithm: AlgorithmIdentifier + Send + Sync {
    /// The CEK contract this algorithm imposes on key management.
    fn key_descriptor(&self) -> ContentEncryptionKeyDescriptor;

    /// Required IV length in octets.
    fn iv_len(&self) -> usize;

    /// Encrypts, returning `(ciphertext, tag)`.
    fn encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Verifies the tag and decrypts.
    ///
    /// # Errors
    ///
    /// Always [`Error::DecryptionFailure`] for any authenticity or padding
    /// failure; the two are indistinguishable by design.
    fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>>;
}

/// Constraint predicate filtering which algorithm identifiers a consumer
/// will accept, evaluated before key binding.
#[derive(Debug, Clone)]
pub enum AlgorithmConstraints {
    /// Accept every identifier.
    PermitAll,
    /// Accept only the listed identifiers.
    Allow(HashSet<String>),
    /// Accept everything except the listed identifiers.
    Deny(HashSet<String>),
}

impl AlgorithmConstraints {
    /// Checks an identifier against the constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlgorithmConstraintViolation`] when rejected.
    pub fn check(&self, id: &str) -> Result<()> {
        let permitted = match self {
            Self::PermitAll => true,
            Self::Allow(allowed) => allowed.contains(id),
            Self::Deny(denied) => !denied.contains(id),
        };
        if permitted {
            Ok(())
        } else {
            Err(Error::AlgorithmConstraintViolation(id.to_string()))
        }
    }

    /// Builds an allow-list from identifiers.
    pub fn allow_only<I: IntoIterator<Item = S>, S: Into<String>>(ids: I) -> Self {
        Self::Allow(ids.into_iter().map(Into::into).collect())
    }

    /// Builds a deny-list from identifiers.
    pub fn deny<I: IntoIterator<Item = S>, S: Into<String>>(ids: I) -> Self {
        Self::Deny(ids.into_iter().map(Into::into).collect())
    }
}

impl Default for AlgorithmConstraints {
    /// The default constraint refuses the `none` algorithm and nothing
    /// else. Accepting unsecured objects requires an explicit allow-list.
    fn default() -> Self {
        Self::deny(["none"])
    }
}

/// One catalog of algorithm entries.
pub struct Catalog<T: ?Sized> {
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T: AlgorithmIdentifier + ?Sized> Catalog<T> {
    fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<T>>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<T>>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Registers an entry under its own identifier, replacing any previous
    /// entry with the same identifier.
    pub fn register(&self, entry: Arc<T>) {
        let id = entry.identifier().to_string();
        debug!(algorithm = %id, "registering algorithm");
        self.write().insert(id, entry);
    }

    /// Removes an entry; returns whether one was present.
    pub fn unregister(&self, id: &str) -> bool {
        debug!(algorithm = %id, "unregistering algorithm");
        self.write().remove(id).is_some()
    }

    /// Looks up an entry by exact identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAlgorithm`] when absent. An algorithm whose
    /// backend is unavailable is simply never registered, so a missing
    /// backend surfaces here rather than as a linkage failure.
    pub fn get(&self, id: &str) -> Result<Arc<T>> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownAlgorithm(id.to_string()))
    }

    /// Whether an entry with this identifier is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// All registered identifiers, unordered.
    pub fn identifiers(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }
}

/// The three catalogs a JOSE deployment draws algorithms from.
pub struct AlgorithmRegistry {
    /// JWS signature algorithms.
    pub signature: Catalog<dyn SignatureAlgorithm>,
    /// JWE key-management algorithms.
    pub key_management: Catalog<dyn KeyManagementAlgorithm>,
    /// JWE content-encryption algorithms.
    pub content_encryption: Catalog<dyn ContentEncryptionAlgorithm>,
}

impl AlgorithmRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            signature: Catalog::new(),
            key_management: Catalog::new(),
            content_encryption: Catalog::new(),
        }
    }

    /// Creates a registry pre-populated with every built-in algorithm.
    pub fn with_default_entries() -> Self {
        let registry = Self::new();

        for entry in sign::default_entries() {
            registry.signature.register(entry);
        }
        for entry in key_management::default_entries() {
            registry.key_management.register(entry);
        }
        for entry in content_encryption::default_entries() {
            registry.content_encryption.register(entry);
        }
        registry
    }

    /// The process-wide default registry.
    ///
    /// Engines use this instance unless another registry is injected; it
    /// exists for ergonomics, not as a structural dependency.
    pub fn global() -> &'static AlgorithmRegistry {
        static GLOBAL: Lazy<AlgorithmRegistry> = Lazy::new(AlgorithmRegistry::with_default_entries);
        &GLOBAL
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_default_entries()
    }
}

/// SHA-2 variant shared by the HMAC, RSA, and PBES2 families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sha2 {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl Sha2 {
    /// Digest output length in octets.
    pub(crate) fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// One-shot digest.
    pub(crate) fn digest(self, data: &[u8]) -> Vec<u8> {
        use sha2::Digest;
        match self {
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }

    /// One-shot HMAC over multiple input segments.
    pub(crate) fn hmac(self, key: &[u8], segments: &[&[u8]]) -> Result<Vec<u8>> {
        use hmac::{Hmac, Mac};
        macro_rules! run {
            ($hash:ty) => {{
                let mut mac = Hmac::<$hash>::new_from_slice(key)
                    .map_err(|_| Error::MalformedKey("empty HMAC key".to_string()))?;
                for segment in segments {
                    mac.update(segment);
                }
                Ok(mac.finalize().into_bytes().to_vec())
            }};
        }
        match self {
            Self::Sha256 => run!(sha2::Sha256),
            Self::Sha384 => run!(sha2::Sha384),
            Self::Sha512 => run!(sha2::Sha512),
        }
    }
}

/// The default ceiling on PBES2 iteration counts a consumer will run.
pub fn default_max_pbkdf_iterations() -> u64 {
    key_management::PBES2_DEFAULT_MAX_ITERATIONS
}

/// Maps a curve to its registered ECDSA identifier.
pub(crate) fn ecdsa_identifier(curve: EcCurve) -> &'static str {
    match curve {
        EcCurve::P256 => "ES256",
        EcCurve::P384 => "ES384",
        EcCurve::P521 => "ES512",
    }
}
