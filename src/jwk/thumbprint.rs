//! RFC 7638 JWK thumbprints.
//!
//! The thumbprint is a hash over the JSON encoding of the key's required
//! members, with member names in lexicographic order and no whitespace.
//! It is invariant under whitespace, member reordering, and any optional
//! members in the input JSON.

use serde_json::{Map, Value};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::{JsonWebKey, KeyParams};
use crate::base64url;

impl JsonWebKey {
    /// The canonical JSON subset hashed for the thumbprint.
    fn thumbprint_input(&self) -> String {
        let mut members = Map::new();
        // Member names inserted in lexicographic order per kty.
        match &self.params {
            KeyParams::Ec { crv, x, y, .. } => {
                members.insert("crv".into(), Value::String(crv.name().into()));
                members.insert("kty".into(), Value::String("EC".into()));
                members.insert("x".into(), Value::String(x.clone()));
                members.insert("y".into(), Value::String(y.clone()));
            }
            KeyParams::Okp { crv, x, .. } => {
                members.insert("crv".into(), Value::String(crv.name().into()));
                members.insert("kty".into(), Value::String("OKP".into()));
                members.insert("x".into(), Value::String(x.clone()));
            }
            KeyParams::Rsa { n, e, .. } => {
                members.insert("e".into(), Value::String(e.clone()));
                members.insert("kty".into(), Value::String("RSA".into()));
                members.insert("n".into(), Value::String(n.clone()));
            }
            KeyParams::Oct { k } => {
                members.insert("k".into(), Value::String(k.clone()));
                members.insert("kty".into(), Value::String("oct".into()));
            }
        }
        serde_json::to_string(&members).unwrap_or_default()
    }

    /// SHA-256 thumbprint octets.
    pub fn thumbprint_sha256(&self) -> [u8; 32] {
        Sha256::digest(self.thumbprint_input()).into()
    }

    /// SHA-1 thumbprint octets, for `x5t`-style interop.
    pub fn thumbprint_sha1(&self) -> [u8; 20] {
        Sha1::digest(self.thumbprint_input()).into()
    }

    /// Base64url-encoded SHA-256 thumbprint, the usual `kid` material.
    pub fn thumbprint(&self) -> String {
        base64url::encode(self.thumbprint_sha256())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7638 section 3.1 example key and expected thumbprint.
    const RFC7638_KEY: &str = r#"{
      "kty": "RSA",
      "n": "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw",
      "e": "AQAB",
      "alg": "RS256",
      "kid": "2011-04-29"
    }"#;

    #[test]
    fn rfc7638_vector() {
        let jwk = JsonWebKey::from_json(RFC7638_KEY).unwrap();
        assert_eq!(jwk.thumbprint(), "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs");
    }

    #[test]
    fn invariant_under_reordering_and_whitespace() {
        let reordered = r#"{
          "kid": "2011-04-29",
          "e": "AQAB",
          "kty"
            : "RSA",
          "n": "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw"
        }"#;
        let a = JsonWebKey::from_json(RFC7638_KEY).unwrap();
        let b = JsonWebKey::from_json(reordered).unwrap();
        assert_eq!(a.thumbprint_sha256(), b.thumbprint_sha256());
        assert_eq!(a.thumbprint_sha1(), b.thumbprint_sha1());
    }

    #[test]
    fn distinct_keys_distinct_thumbprints() {
        let a = JsonWebKey::from_oct(&[1u8; 32]);
        let b = JsonWebKey::from_oct(&[2u8; 32]);
        assert_ne!(a.thumbprint(), b.thumbprint());
    }
}
