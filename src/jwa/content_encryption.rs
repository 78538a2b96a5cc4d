//! JWE content-encryption algorithm entries.
//!
//! Two families: AES-CBC composed with HMAC-SHA-2 into an AEAD (RFC 7518
//! section 5.2) and AES-GCM (section 5.3). The AAD is always the ASCII
//! octets of the encoded protected header; tag comparison is constant
//! time.

use aes::cipher::consts::U12;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{AesGcm, Nonce};
use subtle::ConstantTimeEq;

use super::{AlgorithmIdentifier, ContentEncryptionAlgorithm, ContentEncryptionKeyDescriptor, Sha2};
use crate::error::{Error, Result};

/// AES block width in octets.
const BLOCK: usize = 16;

/// GCM tag width in octets.
const GCM_TAG: usize = 16;

type Aes128Gcm = AesGcm<aes::Aes128, U12>;
type Aes192Gcm = AesGcm<aes::Aes192, U12>;
type Aes256Gcm = AesGcm<aes::Aes256, U12>;

/// AES-CBC with HMAC-SHA-2 (A128CBC-HS256, A192CBC-HS384, A256CBC-HS512).
///
/// The CEK is split in half: the first half keys the MAC, the second half
/// keys the cipher. The tag is the first half of
/// `HMAC(mac_key, AAD || IV || ciphertext || AL)` where AL is the 64-bit
/// big-endian bit length of the AAD.
pub struct AesCbcHmacSha2 {
    id: &'static str,
    cek_len: usize,
    hash: Sha2,
}

impl AesCbcHmacSha2 {
    /// A128CBC-HS256
    pub fn a128() -> Self {
        Self { id: "A128CBC-HS256", cek_len: 32, hash: Sha2::Sha256 }
    }

    /// A192CBC-HS384
    pub fn a192() -> Self {
        Self { id: "A192CBC-HS384", cek_len: 48, hash: Sha2::Sha384 }
    }

    /// A256CBC-HS512
    pub fn a256() -> Self {
        Self { id: "A256CBC-HS512", cek_len: 64, hash: Sha2::Sha512 }
    }

    fn tag_len(&self) -> usize {
        self.cek_len / 2
    }

    fn compute_tag(&self, mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let al = ((aad.len() as u64) * 8).to_be_bytes();
        let mut full = self.hash.hmac(mac_key, &[aad, iv, ciphertext, &al])?;
        full.truncate(self.tag_len());
        Ok(full)
    }

    fn check_cek(&self, cek: &[u8]) -> Result<()> {
        if cek.len() != self.cek_len {
            return Err(Error::AlgorithmKeyMismatch(self.id.to_string()));
        }
        Ok(())
    }
}

impl AlgorithmIdentifier for AesCbcHmacSha2 {
    fn identifier(&self) -> &str {
        self.id
    }
}

impl ContentEncryptionAlgorithm for AesCbcHmacSha2 {
    fn key_descriptor(&self) -> ContentEncryptionKeyDescriptor {
        ContentEncryptionKeyDescriptor { bit_length: self.cek_len * 8, family: "AES" }
    }

    fn iv_len(&self) -> usize {
        BLOCK
    }

    fn encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        self.check_cek(cek)?;
        if iv.len() != BLOCK {
            return Err(Error::MalformedClaim("IV must be 16 octets".to_string()));
        }
        let (mac_key, enc_key) = cek.split_at(self.cek_len / 2);

        // PKCS#7: always pad, 1 to 16 octets.
        let pad = BLOCK - plaintext.len() % BLOCK;
        let mut padded = Vec::with_capacity(plaintext.len() + pad);
        padded.extend_from_slice(plaintext);
        padded.resize(plaintext.len() + pad, pad as u8);

        let ciphertext = cbc_encrypt(enc_key, iv, &padded)?;
        let tag = self.compute_tag(mac_key, aad, iv, &ciphertext)?;
        Ok((ciphertext, tag))
    }

    fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_cek(cek)?;
        if iv.len() != BLOCK || ciphertext.is_empty() || ciphertext.len() % BLOCK != 0 {
            return Err(Error::DecryptionFailure);
        }
        let (mac_key, enc_key) = cek.split_at(self.cek_len / 2);

        // Tag verification happens before any decryption.
        let expected = self.compute_tag(mac_key, aad, iv, ciphertext)?;
        if !bool::from(expected.ct_eq(tag)) {
            return Err(Error::DecryptionFailure);
        }

        let mut plaintext = cbc_decrypt(enc_key, iv, ciphertext)?;

        // Padding failure maps to the same error as tag failure so the two
        // are indistinguishable at the boundary.
        let pad = *plaintext.last().ok_or(Error::DecryptionFailure)? as usize;
        if pad == 0 || pad > BLOCK || pad > plaintext.len() {
            return Err(Error::DecryptionFailure);
        }
        if plaintext[plaintext.len() - pad..].iter().any(|&b| b != pad as u8) {
            return Err(Error::DecryptionFailure);
        }
        plaintext.truncate(plaintext.len() - pad);
        Ok(plaintext)
    }
}

/// AES-GCM (A128GCM, A192GCM, A256GCM): 96-bit IV, 128-bit tag.
pub struct AesGcmContentEncryption {
    id: &'static str,
    cek_len: usize,
}

impl AesGcmContentEncryption {
    /// A128GCM
    pub fn a128() -> Self {
        Self { id: "A128GCM", cek_len: 16 }
    }

    /// A192GCM
    pub fn a192() -> Self {
        Self { id: "A192GCM", cek_len: 24 }
    }

    /// A256GCM
    pub fn a256() -> Self {
        Self { id: "A256GCM", cek_len: 32 }
    }
}

impl AlgorithmIdentifier for AesGcmContentEncryption {
    fn identifier(&self) -> &str {
        self.id
    }
}

impl ContentEncryptionAlgorithm for AesGcmContentEncryption {
    fn key_descriptor(&self) -> ContentEncryptionKeyDescriptor {
        ContentEncryptionKeyDescriptor { bit_length: self.cek_len * 8, family: "AES" }
    }

    fn iv_len(&self) -> usize {
        12
    }

    fn encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        if cek.len() != self.cek_len {
            return Err(Error::AlgorithmKeyMismatch(self.id.to_string()));
        }
        aes_gcm_encrypt(cek, iv, plaintext, aad)
    }

    fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        if cek.len() != self.cek_len {
            return Err(Error::AlgorithmKeyMismatch(self.id.to_string()));
        }
        aes_gcm_decrypt(cek, iv, ciphertext, tag, aad)
    }
}

/// AES-GCM seal, keyed by slice length. Shared with A*GCMKW key wrapping.
pub(super) fn aes_gcm_encrypt(
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    if iv.len() != 12 {
        return Err(Error::MalformedClaim("GCM IV must be 12 octets".to_string()));
    }
    let nonce = Nonce::from_slice(iv);
    let payload = Payload { msg: plaintext, aad };
    let sealed = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|_| Error::DecryptionFailure)?
            .encrypt(nonce, payload),
        24 => Aes192Gcm::new_from_slice(key)
            .map_err(|_| Error::DecryptionFailure)?
            .encrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::DecryptionFailure)?
            .encrypt(nonce, payload),
        _ => return Err(Error::MalformedKey("bad AES key length".to_string())),
    }
    .map_err(|_| Error::DecryptionFailure)?;
    let split = sealed.len() - GCM_TAG;
    let tag = sealed[split..].to_vec();
    let mut ciphertext = sealed;
    ciphertext.truncate(split);
    Ok((ciphertext, tag))
}

/// AES-GCM open. Shared with A*GCMKW key unwrapping.
pub(super) fn aes_gcm_decrypt(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    if iv.len() != 12 || tag.len() != GCM_TAG {
        return Err(Error::DecryptionFailure);
    }
    let nonce = Nonce::from_slice(iv);
    let mut sealed = Vec::with_capacity(ciphertext.len() + GCM_TAG);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);
    let payload = Payload { msg: &sealed, aad };
    let opened = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|_| Error::DecryptionFailure)?
            .decrypt(nonce, payload),
        24 => Aes192Gcm::new_from_slice(key)
            .map_err(|_| Error::DecryptionFailure)?
            .decrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::DecryptionFailure)?
            .decrypt(nonce, payload),
        _ => return Err(Error::MalformedKey("bad AES key length".to_string())),
    };
    opened.map_err(|_| Error::DecryptionFailure)
}

fn cbc_encrypt(key: &[u8], iv: &[u8], padded: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => cbc_encrypt_with::<aes::Aes128>(key, iv, padded),
        24 => cbc_encrypt_with::<aes::Aes192>(key, iv, padded),
        32 => cbc_encrypt_with::<aes::Aes256>(key, iv, padded),
        _ => Err(Error::MalformedKey("bad AES key length".to_string())),
    }
}

fn cbc_encrypt_with<C: BlockEncrypt + KeyInit>(key: &[u8], iv: &[u8], padded: &[u8]) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key).map_err(|_| Error::MalformedKey("bad AES key".to_string()))?;
    let mut ciphertext = Vec::with_capacity(padded.len());
    let mut prev = [0u8; BLOCK];
    prev.copy_from_slice(iv);
    for chunk in padded.chunks(BLOCK) {
        let mut block = [0u8; BLOCK];
        block.copy_from_slice(chunk);
        for (b, p) in block.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        let ga = GenericArray::from_mut_slice(&mut block);
        cipher.encrypt_block(ga);
        ciphertext.extend_from_slice(&block);
        prev = block;
    }
    Ok(ciphertext)
}

fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => cbc_decrypt_with::<aes::Aes128>(key, iv, ciphertext),
        24 => cbc_decrypt_with::<aes::Aes192>(key, iv, ciphertext),
        32 => cbc_decrypt_with::<aes::Aes256>(key, iv, ciphertext),
        _ => Err(Error::MalformedKey("bad AES key length".to_string())),
    }
}

fn cbc_decrypt_with<C: BlockDecrypt + KeyInit>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key).map_err(|_| Error::MalformedKey("bad AES key".to_string()))?;
    let mut plaintext = Vec::with_capacity(ciphertext.len());
    let mut prev = [0u8; BLOCK];
    prev.copy_from_slice(iv);
    for chunk in ciphertext.chunks(BLOCK) {
        let mut block = [0u8; BLOCK];
        block.copy_from_slice(chunk);
        let encrypted = block;
        let ga = GenericArray::from_mut_slice(&mut block);
        cipher.decrypt_block(ga);
        for (b, p) in block.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        plaintext.extend_from_slice(&block);
        prev = encrypted;
    }
    Ok(plaintext)
}

/// Every built-in content-encryption entry, for default registry
/// population.
pub(crate) fn default_entries() -> Vec<std::sync::Arc<dyn ContentEncryptionAlgorithm>> {
    vec![
        std::sync::Arc::new(AesCbcHmacSha2::a128()),
        std::sync::Arc::new(AesCbcHmacSha2::a192()),
        std::sync::Arc::new(AesCbcHmacSha2::a256()),
        std::sync::Arc::new(AesGcmContentEncryption::a128()),
        std::sync::Arc::new(AesGcmContentEncryption::a192()),
        std::sync::Arc::new(AesGcmContentEncryption::a256()),
    ]
}
