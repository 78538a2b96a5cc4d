//! Core JOSE (JSON Object Signing and Encryption) implementation.
//!
//! This crate produces and consumes compact-serialized JWS and JWE
//! objects and models the JWK key material that drives them. Three
//! subsystems carry the weight: the pluggable [`jwa`] algorithm registry,
//! the [`jws`] and [`jwe`] engines with their strict ordering invariants,
//! and the [`jwk`] wire format with bit-exact base64url encoding of key
//! parameters.
//!
//! # Examples
//!
//! ```
//! use jose_core::jwk::JsonWebKey;
//! use jose_core::jws::JsonWebSignature;
//!
//! # fn main() -> jose_core::Result<()> {
//! let key = JsonWebKey::generate_oct(256);
//!
//! let mut jws = JsonWebSignature::new();
//! jws.set_algorithm("HS256");
//! jws.set_payload_str("It\u{2019}s a dangerous business, Frodo");
//! jws.set_key(key.clone());
//! let compact = jws.compact_serialization()?;
//!
//! let mut received = JsonWebSignature::from_compact_serialization(&compact)?;
//! received.set_key(key);
//! let payload = received.verify()?;
//! # assert!(!payload.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Security Considerations
//!
//! - Tag and MAC comparisons are constant time
//! - MAC and padding failures share one error kind to avoid oracles
//! - CEKs, KEKs, and derived secrets are zeroized on release
//! - The payload of a JWS and the plaintext of a JWE are released only
//!   after verification; reading earlier requires the explicitly named
//!   escape hatch

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod base64url;
pub mod bigint;
pub mod compact;
mod consumer;
pub mod error;
pub mod headers;
pub mod jwa;
pub mod jwe;
pub mod jwk;
pub mod jws;
pub mod zip;

#[cfg(test)]
mod tests;

pub use consumer::{Consumer, ConsumerConfig, KeyResolver};
pub use error::{Error, Result};
pub use headers::Headers;
pub use jwa::{AlgorithmConstraints, AlgorithmRegistry, ContentEncryptionKeyDescriptor};
pub use jwe::JsonWebEncryption;
pub use jwk::{JsonWebKey, JsonWebKeySet};
pub use jws::JsonWebSignature;
