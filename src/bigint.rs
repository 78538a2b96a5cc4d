//! Octet-string I/O for arbitrary-precision unsigned integers.
//!
//! The JOSE wire form for big integers is the minimal-length unsigned
//! big-endian octet string; elliptic-curve coordinates and ECDSA signature
//! components instead use a fixed width derived from the curve size. Both
//! forms are produced here over [`rsa::BigUint`].

use rsa::BigUint;

use crate::error::{Error, Result};

/// Converts an unsigned integer to its minimal-length big-endian octets.
///
/// Zero is represented as a single `0x00` octet.
pub fn to_octets(n: &BigUint) -> Vec<u8> {
    n.to_bytes_be()
}

/// Converts an unsigned integer to a fixed-width big-endian octet string,
/// left-padding with zeroes.
///
/// # Errors
///
/// Returns [`Error::IntegerTooLarge`] when the value does not fit in
/// `target_len` octets.
pub fn to_octets_fixed(n: &BigUint, target_len: usize) -> Result<Vec<u8>> {
    let minimal = n.to_bytes_be();
    if minimal.len() > target_len {
        return Err(Error::IntegerTooLarge(target_len));
    }
    let mut out = vec![0u8; target_len - minimal.len()];
    out.extend_from_slice(&minimal);
    Ok(out)
}

/// Interprets octets as an unsigned big-endian integer.
pub fn from_octets(octets: &[u8]) -> BigUint {
    BigUint::from_bytes_be(octets)
}

/// Left-pads raw octets to a fixed width.
///
/// Used where a decoded JWK member may carry a shorter-than-field-width
/// value (for instance a P-521 coordinate with leading zero octets
/// stripped by a non-conforming producer).
pub fn left_pad(octets: &[u8], target_len: usize) -> Result<Vec<u8>> {
    if octets.len() > target_len {
        return Err(Error::IntegerTooLarge(target_len));
    }
    let mut out = vec![0u8; target_len - octets.len()];
    out.extend_from_slice(octets);
    Ok(out)
}
