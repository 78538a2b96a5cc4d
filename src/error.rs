//! Error types for the jose-core crate.

use thiserror::Error;

/// Error type covering every failure the JOSE core can report.
///
/// Authenticity failures are deliberately coarse: MAC failure and padding
/// failure during decryption both surface as [`Error::DecryptionFailure`]
/// so that callers cannot be used as a padding oracle.
#[derive(Debug, Error)]
pub enum Error {
    /// Compact serialization had the wrong part count or undecodable parts
    #[error("malformed compact serialization: {0}")]
    MalformedCompact(String),
    /// A JSON document could not be parsed
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    /// A header parameter was missing or had the wrong shape
    #[error("malformed header parameter: {0}")]
    MalformedClaim(String),
    /// A JWK was structurally invalid
    #[error("malformed key: {0}")]
    MalformedKey(String),
    /// No algorithm with the given identifier is registered
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    /// An algorithm identifier was rejected by the consumer's constraints
    #[error("algorithm constraint violation: {0}")]
    AlgorithmConstraintViolation(String),
    /// The key type is incompatible with the named algorithm
    #[error("key is not usable with algorithm {0}")]
    AlgorithmKeyMismatch(String),
    /// A `crit` header named a parameter the consumer does not recognize
    #[error("unsupported critical header parameter: {0}")]
    UnsupportedCriticalParameter(String),
    /// A `zip` header named a compression scheme other than DEF
    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),
    /// Signature verification failed
    #[error("signature verification failed")]
    SignatureMismatch,
    /// Decryption failed (covers both tag and padding failures)
    #[error("decryption failed")]
    DecryptionFailure,
    /// No key could be resolved for the received headers
    #[error("key resolution failed: {0}")]
    KeyResolutionFailure(String),
    /// Input contained characters outside the base64url alphabet
    #[error("invalid input encoding: {0}")]
    InvalidInputEncoding(String),
    /// An integer did not fit the requested octet-string width
    #[error("integer too large for {0}-octet field")]
    IntegerTooLarge(usize),
    /// A JSON number was outside the representable integer range
    #[error("number out of range: {0}")]
    NumberOutOfRange(String),
    /// A consumer policy bound was exceeded
    #[error("policy violation: {0}")]
    PolicyViolation(String),
}

/// Result type for the jose-core crate.
pub type Result<T> = std::result::Result<T, Error>;
