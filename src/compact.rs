//! Compact serialization part handling.
//!
//! A compact JOSE object is a dot-separated sequence of base64url parts:
//! three for JWS, five for JWE. Empty parts are legal where the algorithm
//! dictates (detached payload, direct key management) and are preserved
//! exactly on both paths.

use crate::error::{Error, Result};

/// Number of parts in a compact JWS.
pub const JWS_PARTS: usize = 3;

/// Number of parts in a compact JWE.
pub const JWE_PARTS: usize = 5;

/// Joins already-encoded parts with dots.
pub fn serialize(parts: &[&str]) -> String {
    parts.join(".")
}

/// Splits a compact serialization into exactly `expected` parts.
///
/// # Errors
///
/// Returns [`Error::MalformedCompact`] when the dot count does not match.
pub fn deserialize(input: &str, expected: usize) -> Result<Vec<&str>> {
    let parts: Vec<&str> = input.split('.').collect();
    if parts.len() != expected {
        return Err(Error::MalformedCompact(format!(
            "expected {expected} parts, found {}",
            parts.len()
        )));
    }
    Ok(parts)
}

/// Counts the parts of a compact serialization without decoding it.
///
/// Used by the consumer front door to classify input as JWS or JWE.
pub fn part_count(input: &str) -> usize {
    input.split('.').count()
}
