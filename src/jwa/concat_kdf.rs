//! Concat KDF (NIST SP 800-56A single-step, SHA-256) used by ECDH-ES.
//!
//! OtherInfo is `AlgorithmID || PartyUInfo || PartyVInfo || SuppPubInfo`
//! where the first three are 32-bit-length-prefixed octet strings and
//! SuppPubInfo is the derived key length in bits as a 32-bit big-endian
//! integer (RFC 7518 section 4.6.2).

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Derives `key_bits / 8` octets from the shared secret `z`.
pub(crate) fn concat_kdf_sha256(
    z: &[u8],
    algorithm_id: &str,
    apu: &[u8],
    apv: &[u8],
    key_bits: usize,
) -> Zeroizing<Vec<u8>> {
    let mut other_info = Vec::with_capacity(algorithm_id.len() + apu.len() + apv.len() + 16);
    for field in [algorithm_id.as_bytes(), apu, apv] {
        other_info.extend_from_slice(&(field.len() as u32).to_be_bytes());
        other_info.extend_from_slice(field);
    }
    other_info.extend_from_slice(&(key_bits as u32).to_be_bytes());

    let key_len = key_bits / 8;
    let mut derived = Zeroizing::new(Vec::with_capacity(key_len));
    let mut counter: u32 = 1;
    while derived.len() < key_len {
        let mut hasher = Sha256::new();
        hasher.update(counter.to_be_bytes());
        hasher.update(z);
        hasher.update(&other_info);
        let round = hasher.finalize();
        let take = usize::min(key_len - derived.len(), round.len());
        derived.extend_from_slice(&round[..take]);
        counter += 1;
    }
    derived
}
