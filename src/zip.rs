//! Payload compression for the JWE `zip` header.
//!
//! Only the registered `DEF` (RFC 1951 raw DEFLATE) value is supported;
//! anything else fails before any cryptographic work happens.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// The only registered compression algorithm identifier.
pub const DEFLATE: &str = "DEF";

/// Validates a `zip` header value.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCompression`] for anything other than `DEF`.
pub fn check(zip: &str) -> Result<()> {
    if zip == DEFLATE {
        Ok(())
    } else {
        Err(Error::UnsupportedCompression(zip.to_string()))
    }
}

/// Compresses plaintext with raw DEFLATE.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    // Writing to a Vec cannot fail.
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

/// Decompresses raw DEFLATE data.
///
/// # Errors
///
/// Returns [`Error::DecryptionFailure`] on malformed compressed data: the
/// data was already authenticated, but a caller must not be able to
/// distinguish this from any other post-authentication failure.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|_| Error::DecryptionFailure)?;
    Ok(out)
}
