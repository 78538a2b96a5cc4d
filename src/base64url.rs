//! Base64url codec used by every wire-facing part of the crate.
//!
//! Encoding always produces the unpadded URL-safe form required by RFC 7515.
//! Decoding accepts padded and unpadded input but no other deviation; any
//! out-of-alphabet character is an error.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use base64::Engine;

use crate::error::{Error, Result};

const CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);

/// URL-safe engine without padding on encode, indifferent on decode.
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, CONFIG);

/// Encodes octets as unpadded base64url.
pub fn encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE.encode(data)
}

/// Decodes base64url input, tolerating trailing `=` padding.
///
/// # Errors
///
/// Returns [`Error::InvalidInputEncoding`] on any character outside the
/// URL-safe alphabet.
pub fn decode(input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    URL_SAFE
        .decode(input)
        .map_err(|e| Error::InvalidInputEncoding(e.to_string()))
}

/// Decodes base64url input after stripping ASCII whitespace.
///
/// JWK members are commonly reformatted across multiple lines in documents
/// and configuration files; parsing tolerates that even though produced
/// output never contains whitespace.
pub fn decode_lenient_whitespace(input: &str) -> Result<Vec<u8>> {
    if input.bytes().any(|b| b.is_ascii_whitespace()) {
        let stripped: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        decode(stripped)
    } else {
        decode(input)
    }
}

/// Decodes a UTF-8 string from base64url input.
pub fn decode_to_string(input: &str) -> Result<String> {
    let bytes = decode(input)?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidInputEncoding(e.to_string()))
}
