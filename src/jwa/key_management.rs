//! JWE key-management algorithm entries.
//!
//! Each entry establishes the CEK in both directions. On the encrypt side
//! an entry may also emit header updates (`epk`, `p2s`, `p2c`, `iv`,
//! `tag`); the engine merges those into the protected header before the
//! header becomes the AAD. Entries honor parameters the caller already
//! authored instead of generating fresh ones, which keeps reproduction
//! against fixed vectors byte-exact.

use rand_core::{OsRng, RngCore};
use tracing::trace;
use zeroize::Zeroizing;

use super::content_encryption::{aes_gcm_decrypt, aes_gcm_encrypt};
use super::{
    concat_kdf_sha256, AlgorithmIdentifier, ContentEncryptionKeyDescriptor,
    KeyManagementAlgorithm, ManagedCek, Sha2,
};
use crate::base64url;
use crate::error::{Error, Result};
use crate::headers::{param, Headers};
use crate::jwk::{EcCurve, JsonWebKey, KeyParams, OkpCurve};

/// Producer-side default PBES2 iteration count.
const PBES2_DEFAULT_ITERATIONS: u64 = 8192;

/// Producer-side default PBES2 salt input length in octets.
const PBES2_DEFAULT_SALT_LEN: usize = 12;

/// Default ceiling on the PBES2 iteration count a consumer will run.
pub(crate) const PBES2_DEFAULT_MAX_ITERATIONS: u64 = 2_500_000;

fn random_bytes(len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    OsRng.fill_bytes(&mut out);
    out
}

fn cek_or_random(
    descriptor: &ContentEncryptionKeyDescriptor,
    cek_override: Option<&[u8]>,
) -> Zeroizing<Vec<u8>> {
    match cek_override {
        Some(cek) => Zeroizing::new(cek.to_vec()),
        None => random_bytes(descriptor.byte_length()),
    }
}

/// RFC 3394 AES key wrap, keyed by KEK length.
fn aes_wrap(kek: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut out = vec![0u8; data.len() + 8];
    let result = match kek.len() {
        16 => {
            let key: [u8; 16] = kek.try_into().map_err(|_| Error::DecryptionFailure)?;
            aes_kw::KekAes128::from(key).wrap(data, &mut out)
        }
        24 => {
            let key: [u8; 24] = kek.try_into().map_err(|_| Error::DecryptionFailure)?;
            aes_kw::KekAes192::from(key).wrap(data, &mut out)
        }
        32 => {
            let key: [u8; 32] = kek.try_into().map_err(|_| Error::DecryptionFailure)?;
            aes_kw::KekAes256::from(key).wrap(data, &mut out)
        }
        _ => return Err(Error::MalformedKey("bad KEK length".to_string())),
    };
    result.map_err(|_| Error::DecryptionFailure)?;
    Ok(out)
}

/// RFC 3394 AES key unwrap. Any failure is a plain decryption failure.
fn aes_unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if wrapped.len() < 16 || wrapped.len() % 8 != 0 {
        return Err(Error::DecryptionFailure);
    }
    let mut out = Zeroizing::new(vec![0u8; wrapped.len() - 8]);
    let result = match kek.len() {
        16 => {
            let key: [u8; 16] = kek.try_into().map_err(|_| Error::DecryptionFailure)?;
            aes_kw::KekAes128::from(key).unwrap(wrapped, &mut out)
        }
        24 => {
            let key: [u8; 24] = kek.try_into().map_err(|_| Error::DecryptionFailure)?;
            aes_kw::KekAes192::from(key).unwrap(wrapped, &mut out)
        }
        32 => {
            let key: [u8; 32] = kek.try_into().map_err(|_| Error::DecryptionFailure)?;
            aes_kw::KekAes256::from(key).unwrap(wrapped, &mut out)
        }
        _ => return Err(Error::MalformedKey("bad KEK length".to_string())),
    };
    result.map_err(|_| Error::DecryptionFailure)?;
    Ok(out)
}

/// Direct use of a shared symmetric key (`dir`).
pub struct DirectKeyManagement;

impl AlgorithmIdentifier for DirectKeyManagement {
    fn identifier(&self) -> &str {
        "dir"
    }
}

impl KeyManagementAlgorithm for DirectKeyManagement {
    fn manage_for_encrypt(
        &self,
        key: &JsonWebKey,
        descriptor: &ContentEncryptionKeyDescriptor,
        _headers: &Headers,
        _cek_override: Option<&[u8]>,
    ) -> Result<ManagedCek> {
        let cek = key
            .oct_key()
            .map_err(|_| Error::AlgorithmKeyMismatch("dir".to_string()))?;
        if cek.len() != descriptor.byte_length() {
            return Err(Error::AlgorithmKeyMismatch("dir".to_string()));
        }
        Ok(ManagedCek { cek, encrypted_key: Vec::new(), header_updates: Headers::new() })
    }

    fn manage_for_decrypt(
        &self,
        key: &JsonWebKey,
        encrypted_key: &[u8],
        descriptor: &ContentEncryptionKeyDescriptor,
        _headers: &Headers,
    ) -> Result<Zeroizing<Vec<u8>>> {
        if !encrypted_key.is_empty() {
            return Err(Error::MalformedCompact(
                "encrypted key must be empty for dir".to_string(),
            ));
        }
        let cek = key
            .oct_key()
            .map_err(|_| Error::AlgorithmKeyMismatch("dir".to_string()))?;
        if cek.len() != descriptor.byte_length() {
            return Err(Error::AlgorithmKeyMismatch("dir".to_string()));
        }
        Ok(cek)
    }
}

/// AES key wrap of a generated CEK (A128KW, A192KW, A256KW).
pub struct AesKeyWrap {
    id: &'static str,
    kek_len: usize,
}

impl AesKeyWrap {
    /// A128KW
    pub fn a128() -> Self {
        Self { id: "A128KW", kek_len: 16 }
    }

    /// A192KW
    pub fn a192() -> Self {
        Self { id: "A192KW", kek_len: 24 }
    }

    /// A256KW
    pub fn a256() -> Self {
        Self { id: "A256KW", kek_len: 32 }
    }

    fn kek(&self, key: &JsonWebKey) -> Result<Zeroizing<Vec<u8>>> {
        let kek = key
            .oct_key()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;
        if kek.len() != self.kek_len {
            return Err(Error::AlgorithmKeyMismatch(self.id.to_string()));
        }
        Ok(kek)
    }
}

impl AlgorithmIdentifier for AesKeyWrap {
    fn identifier(&self) -> &str {
        self.id
    }
}

impl KeyManagementAlgorithm for AesKeyWrap {
    fn manage_for_encrypt(
        &self,
        key: &JsonWebKey,
        descriptor: &ContentEncryptionKeyDescriptor,
        _headers: &Headers,
        cek_override: Option<&[u8]>,
    ) -> Result<ManagedCek> {
        let kek = self.kek(key)?;
        let cek = cek_or_random(descriptor, cek_override);
        let encrypted_key = aes_wrap(&kek, &cek)?;
        Ok(ManagedCek { cek, encrypted_key, header_updates: Headers::new() })
    }

    fn manage_for_decrypt(
        &self,
        key: &JsonWebKey,
        encrypted_key: &[u8],
        _descriptor: &ContentEncryptionKeyDescriptor,
        _headers: &Headers,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let kek = self.kek(key)?;
        aes_unwrap(&kek, encrypted_key)
    }
}

/// RSAES-PKCS1-v1_5 key transport (`RSA1_5`).
pub struct Rsa15KeyManagement;

impl AlgorithmIdentifier for Rsa15KeyManagement {
    fn identifier(&self) -> &str {
        "RSA1_5"
    }
}

impl KeyManagementAlgorithm for Rsa15KeyManagement {
    fn manage_for_encrypt(
        &self,
        key: &JsonWebKey,
        descriptor: &ContentEncryptionKeyDescriptor,
        _headers: &Headers,
        cek_override: Option<&[u8]>,
    ) -> Result<ManagedCek> {
        let public = key
            .rsa_public_key()
            .map_err(|_| Error::AlgorithmKeyMismatch("RSA1_5".to_string()))?;
        let cek = cek_or_random(descriptor, cek_override);
        let encrypted_key = public
            .encrypt(&mut OsRng, rsa::Pkcs1v15Encrypt, &cek)
            .map_err(|e| Error::MalformedKey(e.to_string()))?;
        Ok(ManagedCek { cek, encrypted_key, header_updates: Headers::new() })
    }

    fn manage_for_decrypt(
        &self,
        key: &JsonWebKey,
        encrypted_key: &[u8],
        descriptor: &ContentEncryptionKeyDescriptor,
        _headers: &Headers,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let private = key
            .rsa_private_key()
            .map_err(|_| Error::AlgorithmKeyMismatch("RSA1_5".to_string()))?;
        // A padding failure yields a pseudo-random CEK of the right length
        // instead of an error, so the eventual authentication failure is
        // indistinguishable from a padding failure (Bleichenbacher).
        match private.decrypt(rsa::Pkcs1v15Encrypt, encrypted_key) {
            Ok(cek) if cek.len() == descriptor.byte_length() => Ok(Zeroizing::new(cek)),
            _ => Ok(random_bytes(descriptor.byte_length())),
        }
    }
}

/// RSAES-OAEP key transport (`RSA-OAEP` with SHA-1, `RSA-OAEP-256`).
pub struct RsaOaepKeyManagement {
    id: &'static str,
    sha256: bool,
}

impl RsaOaepKeyManagement {
    /// RSA-OAEP (SHA-1 / MGF1-SHA-1, empty label)
    pub fn sha1() -> Self {
        Self { id: "RSA-OAEP", sha256: false }
    }

    /// RSA-OAEP-256 (SHA-256 / MGF1-SHA-256, empty label)
    pub fn sha256() -> Self {
        Self { id: "RSA-OAEP-256", sha256: true }
    }

    fn padding(&self) -> rsa::Oaep {
        if self.sha256 {
            rsa::Oaep::new::<sha2::Sha256>()
        } else {
            rsa::Oaep::new::<sha1::Sha1>()
        }
    }
}

impl AlgorithmIdentifier for RsaOaepKeyManagement {
    fn identifier(&self) -> &str {
        self.id
    }
}

impl KeyManagementAlgorithm for RsaOaepKeyManagement {
    fn manage_for_encrypt(
        &self,
        key: &JsonWebKey,
        descriptor: &ContentEncryptionKeyDescriptor,
        _headers: &Headers,
        cek_override: Option<&[u8]>,
    ) -> Result<ManagedCek> {
        let public = key
            .rsa_public_key()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;
        let cek = cek_or_random(descriptor, cek_override);
        let encrypted_key = public
            .encrypt(&mut OsRng, self.padding(), &cek)
            .map_err(|e| Error::MalformedKey(e.to_string()))?;
        Ok(ManagedCek { cek, encrypted_key, header_updates: Headers::new() })
    }

    fn manage_for_decrypt(
        &self,
        key: &JsonWebKey,
        encrypted_key: &[u8],
        _descriptor: &ContentEncryptionKeyDescriptor,
        _headers: &Headers,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let private = key
            .rsa_private_key()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;
        private
            .decrypt(self.padding(), encrypted_key)
            .map(Zeroizing::new)
            .map_err(|_| Error::DecryptionFailure)
    }
}

/// PBES2 password-based key wrap (PBES2-HS256+A128KW family).
///
/// The PBKDF2 salt is `alg-identifier || 0x00 || p2s`; the derived KEK
/// feeds the inner AES key wrap. The consumer-side iteration ceiling
/// defends against hostile `p2c` values.
pub struct Pbes2KeyWrap {
    id: &'static str,
    hash: Sha2,
    kek_len: usize,
    max_iterations: u64,
}

impl Pbes2KeyWrap {
    /// PBES2-HS256+A128KW
    pub fn hs256_a128kw() -> Self {
        Self {
            id: "PBES2-HS256+A128KW",
            hash: Sha2::Sha256,
            kek_len: 16,
            max_iterations: PBES2_DEFAULT_MAX_ITERATIONS,
        }
    }

    /// PBES2-HS384+A192KW
    pub fn hs384_a192kw() -> Self {
        Self {
            id: "PBES2-HS384+A192KW",
            hash: Sha2::Sha384,
            kek_len: 24,
            max_iterations: PBES2_DEFAULT_MAX_ITERATIONS,
        }
    }

    /// PBES2-HS512+A256KW
    pub fn hs512_a256kw() -> Self {
        Self {
            id: "PBES2-HS512+A256KW",
            hash: Sha2::Sha512,
            kek_len: 32,
            max_iterations: PBES2_DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Replaces the consumer-side iteration ceiling.
    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = max;
        self
    }

    fn derive_kek(&self, password: &[u8], p2s: &[u8], p2c: u64) -> Result<Zeroizing<Vec<u8>>> {
        let mut salt = Vec::with_capacity(self.id.len() + 1 + p2s.len());
        salt.extend_from_slice(self.id.as_bytes());
        salt.push(0);
        salt.extend_from_slice(p2s);

        let rounds = u32::try_from(p2c)
            .map_err(|_| Error::PolicyViolation(format!("p2c {p2c} out of range")))?;
        let mut kek = Zeroizing::new(vec![0u8; self.kek_len]);
        match self.hash {
            Sha2::Sha256 => pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, &salt, rounds, &mut kek),
            Sha2::Sha384 => pbkdf2::pbkdf2_hmac::<sha2::Sha384>(password, &salt, rounds, &mut kek),
            Sha2::Sha512 => pbkdf2::pbkdf2_hmac::<sha2::Sha512>(password, &salt, rounds, &mut kek),
        }
        Ok(kek)
    }

    fn salt_input(&self, headers: &Headers) -> Result<Option<Vec<u8>>> {
        match headers.get_str(param::P2S) {
            None => Ok(None),
            Some(p2s) => {
                let decoded = base64url::decode(p2s)?;
                if decoded.len() < 8 {
                    return Err(Error::MalformedClaim(
                        "p2s must be at least 8 octets".to_string(),
                    ));
                }
                Ok(Some(decoded))
            }
        }
    }
}

impl AlgorithmIdentifier for Pbes2KeyWrap {
    fn identifier(&self) -> &str {
        self.id
    }
}

impl KeyManagementAlgorithm for Pbes2KeyWrap {
    fn manage_for_encrypt(
        &self,
        key: &JsonWebKey,
        descriptor: &ContentEncryptionKeyDescriptor,
        headers: &Headers,
        cek_override: Option<&[u8]>,
    ) -> Result<ManagedCek> {
        let password = key
            .oct_key()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;

        let mut header_updates = Headers::new();
        let p2s = match self.salt_input(headers)? {
            Some(p2s) => p2s,
            None => {
                let fresh = random_bytes(PBES2_DEFAULT_SALT_LEN);
                header_updates.set_str(param::P2S, base64url::encode(fresh.as_slice()));
                fresh.to_vec()
            }
        };
        let p2c = match headers.get_u64(param::P2C)? {
            Some(0) => {
                return Err(Error::MalformedClaim("p2c must be positive".to_string()));
            }
            Some(p2c) => p2c,
            None => {
                header_updates.set_u64(param::P2C, PBES2_DEFAULT_ITERATIONS);
                PBES2_DEFAULT_ITERATIONS
            }
        };

        let kek = self.derive_kek(&password, &p2s, p2c)?;
        let cek = cek_or_random(descriptor, cek_override);
        let encrypted_key = aes_wrap(&kek, &cek)?;
        Ok(ManagedCek { cek, encrypted_key, header_updates })
    }

    fn manage_for_decrypt(
        &self,
        key: &JsonWebKey,
        encrypted_key: &[u8],
        _descriptor: &ContentEncryptionKeyDescriptor,
        headers: &Headers,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let password = key
            .oct_key()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;
        let p2s = self
            .salt_input(headers)?
            .ok_or_else(|| Error::MalformedClaim("missing p2s".to_string()))?;
        let p2c = headers
            .get_u64(param::P2C)?
            .ok_or_else(|| Error::MalformedClaim("missing p2c".to_string()))?;
        if p2c == 0 {
            return Err(Error::MalformedClaim("p2c must be positive".to_string()));
        }
        if p2c > self.max_iterations {
            return Err(Error::PolicyViolation(format!(
                "p2c {p2c} exceeds maximum {}",
                self.max_iterations
            )));
        }
        let kek = self.derive_kek(&password, &p2s, p2c)?;
        aes_unwrap(&kek, encrypted_key)
    }
}

/// ECDH-ES key agreement, direct or with an inner AES key wrap.
///
/// Supports the NIST curves and X25519. The encrypt side generates an
/// ephemeral key on the static key's curve and publishes it as `epk`.
pub struct EcdhEsKeyManagement {
    id: &'static str,
    /// KEK length for wrap mode; `None` is direct key agreement.
    wrap_kek_len: Option<usize>,
}

impl EcdhEsKeyManagement {
    /// ECDH-ES (direct key agreement)
    pub fn direct() -> Self {
        Self { id: "ECDH-ES", wrap_kek_len: None }
    }

    /// ECDH-ES+A128KW
    pub fn a128kw() -> Self {
        Self { id: "ECDH-ES+A128KW", wrap_kek_len: Some(16) }
    }

    /// ECDH-ES+A192KW
    pub fn a192kw() -> Self {
        Self { id: "ECDH-ES+A192KW", wrap_kek_len: Some(24) }
    }

    /// ECDH-ES+A256KW
    pub fn a256kw() -> Self {
        Self { id: "ECDH-ES+A256KW", wrap_kek_len: Some(32) }
    }

    /// Concat KDF parameters: (AlgorithmID, key length in bits).
    fn kdf_params<'a>(
        &'a self,
        descriptor: &ContentEncryptionKeyDescriptor,
        headers: &'a Headers,
    ) -> Result<(&'a str, usize)> {
        match self.wrap_kek_len {
            // Direct mode binds the derived key to the content encryption
            // algorithm named by `enc`.
            None => {
                let enc = headers
                    .get_str(param::ENC)
                    .ok_or_else(|| Error::MalformedClaim("missing enc".to_string()))?;
                Ok((enc, descriptor.bit_length))
            }
            Some(kek_len) => Ok((self.id, kek_len * 8)),
        }
    }

    fn party_info(headers: &Headers) -> Result<(Vec<u8>, Vec<u8>)> {
        let apu = match headers.get_str(param::APU) {
            Some(apu) => base64url::decode(apu)?,
            None => Vec::new(),
        };
        let apv = match headers.get_str(param::APV) {
            Some(apv) => base64url::decode(apv)?,
            None => Vec::new(),
        };
        Ok((apu, apv))
    }

    fn derive(
        &self,
        z: &[u8],
        descriptor: &ContentEncryptionKeyDescriptor,
        headers: &Headers,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let (algorithm_id, key_bits) = self.kdf_params(descriptor, headers)?;
        let (apu, apv) = Self::party_info(headers)?;
        Ok(concat_kdf_sha256(z, algorithm_id, &apu, &apv, key_bits))
    }
}

impl AlgorithmIdentifier for EcdhEsKeyManagement {
    fn identifier(&self) -> &str {
        self.id
    }
}

impl KeyManagementAlgorithm for EcdhEsKeyManagement {
    fn manage_for_encrypt(
        &self,
        key: &JsonWebKey,
        descriptor: &ContentEncryptionKeyDescriptor,
        headers: &Headers,
        cek_override: Option<&[u8]>,
    ) -> Result<ManagedCek> {
        let (z, epk) = agree_with_fresh_ephemeral(key)
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;
        let derived = self.derive(&z, descriptor, headers)?;

        let mut header_updates = Headers::new();
        header_updates.set_value(
            param::EPK,
            serde_json::to_value(&epk).map_err(Error::MalformedJson)?,
        );

        trace!(algorithm = self.id, "derived ECDH-ES shared key");
        match self.wrap_kek_len {
            None => Ok(ManagedCek { cek: derived, encrypted_key: Vec::new(), header_updates }),
            Some(_) => {
                let cek = cek_or_random(descriptor, cek_override);
                let encrypted_key = aes_wrap(&derived, &cek)?;
                Ok(ManagedCek { cek, encrypted_key, header_updates })
            }
        }
    }

    fn manage_for_decrypt(
        &self,
        key: &JsonWebKey,
        encrypted_key: &[u8],
        descriptor: &ContentEncryptionKeyDescriptor,
        headers: &Headers,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let epk_value = headers
            .get_value(param::EPK)
            .ok_or_else(|| Error::MalformedClaim("missing epk".to_string()))?;
        let epk = JsonWebKey::from_value(epk_value.clone())?;
        let z = agree_with_static(key, &epk)?;
        let derived = self.derive(&z, descriptor, headers)?;
        match self.wrap_kek_len {
            None => {
                if !encrypted_key.is_empty() {
                    return Err(Error::MalformedCompact(
                        "encrypted key must be empty for ECDH-ES".to_string(),
                    ));
                }
                Ok(derived)
            }
            Some(_) => aes_unwrap(&derived, encrypted_key),
        }
    }
}

/// Generates an ephemeral key pair matching the static key's curve and
/// runs the agreement, returning the shared secret and the public
/// ephemeral JWK.
fn agree_with_fresh_ephemeral(static_key: &JsonWebKey) -> Result<(Zeroizing<Vec<u8>>, JsonWebKey)> {
    let ephemeral = match &static_key.params {
        KeyParams::Ec { crv, .. } => JsonWebKey::generate_ec(*crv)?,
        KeyParams::Okp { crv: OkpCurve::X25519, .. } => JsonWebKey::generate_x25519()?,
        _ => {
            return Err(Error::MalformedKey(
                "ECDH requires an EC or X25519 key".to_string(),
            ))
        }
    };
    let z = agree_with_static(&ephemeral, static_key)?;
    let public = ephemeral
        .public_only()
        .ok_or_else(|| Error::MalformedKey("ephemeral key has no public form".to_string()))?;
    Ok((z, public))
}

/// ECDH between `private_side`'s private part and `public_side`'s public
/// part; both must live on the same curve.
fn agree_with_static(private_side: &JsonWebKey, public_side: &JsonWebKey) -> Result<Zeroizing<Vec<u8>>> {
    match (&private_side.params, &public_side.params) {
        (KeyParams::Ec { crv: a, .. }, KeyParams::Ec { crv: b, .. }) if a == b => {
            let d = private_side.ec_private_scalar()?;
            let peer = public_side.ec_public_sec1()?;
            ec_diffie_hellman(*a, &d, &peer)
        }
        (
            KeyParams::Okp { crv: OkpCurve::X25519, .. },
            KeyParams::Okp { crv: OkpCurve::X25519, .. },
        ) => {
            let d = private_side.okp_private()?;
            let peer = public_side.okp_public()?;
            let d: [u8; 32] = d
                .as_slice()
                .try_into()
                .map_err(|_| Error::MalformedKey("bad X25519 private key".to_string()))?;
            let peer: [u8; 32] = peer
                .as_slice()
                .try_into()
                .map_err(|_| Error::MalformedKey("bad X25519 public key".to_string()))?;
            let secret = x25519_dalek::StaticSecret::from(d);
            let public = x25519_dalek::PublicKey::from(peer);
            Ok(Zeroizing::new(secret.diffie_hellman(&public).as_bytes().to_vec()))
        }
        _ => Err(Error::MalformedKey(
            "key agreement requires matching curves".to_string(),
        )),
    }
}

fn ec_diffie_hellman(crv: EcCurve, d: &[u8], peer_sec1: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    match crv {
        EcCurve::P256 => {
            let secret = p256::SecretKey::from_slice(d)
                .map_err(|e| Error::MalformedKey(format!("invalid P-256 private key: {e}")))?;
            let public = p256::PublicKey::from_sec1_bytes(peer_sec1)
                .map_err(|e| Error::MalformedKey(format!("invalid P-256 public key: {e}")))?;
            let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
        EcCurve::P384 => {
            let secret = p384::SecretKey::from_slice(d)
                .map_err(|e| Error::MalformedKey(format!("invalid P-384 private key: {e}")))?;
            let public = p384::PublicKey::from_sec1_bytes(peer_sec1)
                .map_err(|e| Error::MalformedKey(format!("invalid P-384 public key: {e}")))?;
            let shared = p384::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
        EcCurve::P521 => {
            let secret = p521::SecretKey::from_slice(d)
                .map_err(|e| Error::MalformedKey(format!("invalid P-521 private key: {e}")))?;
            let public = p521::PublicKey::from_sec1_bytes(peer_sec1)
                .map_err(|e| Error::MalformedKey(format!("invalid P-521 public key: {e}")))?;
            let shared = p521::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
    }
}

/// AES-GCM key wrap (A128GCMKW, A192GCMKW, A256GCMKW).
///
/// Encrypts the CEK under the KEK with a fresh 96-bit IV; the IV and the
/// 128-bit tag travel in the `iv` and `tag` header parameters.
pub struct AesGcmKeyWrap {
    id: &'static str,
    kek_len: usize,
}

impl AesGcmKeyWrap {
    /// A128GCMKW
    pub fn a128() -> Self {
        Self { id: "A128GCMKW", kek_len: 16 }
    }

    /// A192GCMKW
    pub fn a192() -> Self {
        Self { id: "A192GCMKW", kek_len: 24 }
    }

    /// A256GCMKW
    pub fn a256() -> Self {
        Self { id: "A256GCMKW", kek_len: 32 }
    }

    fn kek(&self, key: &JsonWebKey) -> Result<Zeroizing<Vec<u8>>> {
        let kek = key
            .oct_key()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;
        if kek.len() != self.kek_len {
            return Err(Error::AlgorithmKeyMismatch(self.id.to_string()));
        }
        Ok(kek)
    }
}

impl AlgorithmIdentifier for AesGcmKeyWrap {
    fn identifier(&self) -> &str {
        self.id
    }
}

impl KeyManagementAlgorithm for AesGcmKeyWrap {
    fn manage_for_encrypt(
        &self,
        key: &JsonWebKey,
        descriptor: &ContentEncryptionKeyDescriptor,
        headers: &Headers,
        cek_override: Option<&[u8]>,
    ) -> Result<ManagedCek> {
        let kek = self.kek(key)?;
        let cek = cek_or_random(descriptor, cek_override);

        let mut header_updates = Headers::new();
        let iv = match headers.get_str(param::IV) {
            Some(iv) => base64url::decode(iv)?,
            None => {
                let fresh = random_bytes(12);
                header_updates.set_str(param::IV, base64url::encode(fresh.as_slice()));
                fresh.to_vec()
            }
        };

        let (encrypted_key, tag) = aes_gcm_encrypt(&kek, &iv, &cek, &[])?;
        header_updates.set_str(param::TAG, base64url::encode(tag));
        Ok(ManagedCek { cek, encrypted_key, header_updates })
    }

    fn manage_for_decrypt(
        &self,
        key: &JsonWebKey,
        encrypted_key: &[u8],
        _descriptor: &ContentEncryptionKeyDescriptor,
        headers: &Headers,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let kek = self.kek(key)?;
        let iv = headers
            .get_str(param::IV)
            .ok_or_else(|| Error::MalformedClaim("missing iv".to_string()))
            .and_then(base64url::decode)?;
        let tag = headers
            .get_str(param::TAG)
            .ok_or_else(|| Error::MalformedClaim("missing tag".to_string()))
            .and_then(base64url::decode)?;
        aes_gcm_decrypt(&kek, &iv, encrypted_key, &tag, &[]).map(Zeroizing::new)
    }
}

/// Every built-in key-management entry, for default registry population.
pub(crate) fn default_entries() -> Vec<std::sync::Arc<dyn KeyManagementAlgorithm>> {
    vec![
        std::sync::Arc::new(DirectKeyManagement),
        std::sync::Arc::new(AesKeyWrap::a128()),
        std::sync::Arc::new(AesKeyWrap::a192()),
        std::sync::Arc::new(AesKeyWrap::a256()),
        std::sync::Arc::new(Rsa15KeyManagement),
        std::sync::Arc::new(RsaOaepKeyManagement::sha1()),
        std::sync::Arc::new(RsaOaepKeyManagement::sha256()),
        std::sync::Arc::new(Pbes2KeyWrap::hs256_a128kw()),
        std::sync::Arc::new(Pbes2KeyWrap::hs384_a192kw()),
        std::sync::Arc::new(Pbes2KeyWrap::hs512_a256kw()),
        std::sync::Arc::new(EcdhEsKeyManagement::direct()),
        std::sync::Arc::new(EcdhEsKeyManagement::a128kw()),
        std::sync::Arc::new(EcdhEsKeyManagement::a192kw()),
        std::sync::Arc::new(EcdhEsKeyManagement::a256kw()),
        std::sync::Arc::new(AesGcmKeyWrap::a128()),
        std::sync::Arc::new(AesGcmKeyWrap::a192()),
        std::sync::Arc::new(AesGcmKeyWrap::a256()),
    ]
}
