//! JWS signature algorithm entries.
//!
//! Every entry signs and verifies over the JWS signing input (encoded
//! header, dot, encoded payload). ECDSA signatures are the fixed-width
//! `R || S` concatenation; DER never appears on the wire.

use rand_core::OsRng;
use subtle::ConstantTimeEq;
use tracing::trace;

use super::{ecdsa_identifier, AlgorithmIdentifier, Sha2, SignatureAlgorithm};
use crate::error::{Error, Result};
use crate::jwk::{EcCurve, JsonWebKey, OkpCurve};

/// Minimum RSA modulus accepted for RS* and PS*, in bits.
const MIN_RSA_MODULUS_BITS: usize = 2048;

/// HMAC with SHA-2 (HS256, HS384, HS512).
pub struct HmacSignature {
    id: &'static str,
    hash: Sha2,
}

impl HmacSignature {
    /// HS256
    pub fn hs256() -> Self {
        Self { id: "HS256", hash: Sha2::Sha256 }
    }

    /// HS384
    pub fn hs384() -> Self {
        Self { id: "HS384", hash: Sha2::Sha384 }
    }

    /// HS512
    pub fn hs512() -> Self {
        Self { id: "HS512", hash: Sha2::Sha512 }
    }

    fn key_octets(&self, key: &JsonWebKey) -> Result<zeroize::Zeroizing<Vec<u8>>> {
        let octets = key
            .oct_key()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;
        // RFC 7518: the key must be at least as long as the hash output.
        if octets.len() < self.hash.output_len() {
            return Err(Error::AlgorithmKeyMismatch(self.id.to_string()));
        }
        Ok(octets)
    }
}

impl AlgorithmIdentifier for HmacSignature {
    fn identifier(&self) -> &str {
        self.id
    }
}

impl SignatureAlgorithm for HmacSignature {
    fn sign(&self, key: &JsonWebKey, signing_input: &[u8]) -> Result<Vec<u8>> {
        let octets = self.key_octets(key)?;
        self.hash.hmac(&octets, &[signing_input])
    }

    fn verify(&self, key: &JsonWebKey, signing_input: &[u8], signature: &[u8]) -> Result<()> {
        let octets = self.key_octets(key)?;
        let expected = self.hash.hmac(&octets, &[signing_input])?;
        if expected.ct_eq(signature).into() {
            Ok(())
        } else {
            Err(Error::SignatureMismatch)
        }
    }
}

/// RSASSA-PKCS1-v1_5 and RSASSA-PSS (RS256..RS512, PS256..PS512).
pub struct RsaSignature {
    id: &'static str,
    hash: Sha2,
    pss: bool,
}

impl RsaSignature {
    /// RS256
    pub fn rs256() -> Self {
        Self { id: "RS256", hash: Sha2::Sha256, pss: false }
    }

    /// RS384
    pub fn rs384() -> Self {
        Self { id: "RS384", hash: Sha2::Sha384, pss: false }
    }

    /// RS512
    pub fn rs512() -> Self {
        Self { id: "RS512", hash: Sha2::Sha512, pss: false }
    }

    /// PS256
    pub fn ps256() -> Self {
        Self { id: "PS256", hash: Sha2::Sha256, pss: true }
    }

    /// PS384
    pub fn ps384() -> Self {
        Self { id: "PS384", hash: Sha2::Sha384, pss: true }
    }

    /// PS512
    pub fn ps512() -> Self {
        Self { id: "PS512", hash: Sha2::Sha512, pss: true }
    }

    fn check_modulus(&self, bits: usize) -> Result<()> {
        if bits < MIN_RSA_MODULUS_BITS {
            return Err(Error::AlgorithmKeyMismatch(self.id.to_string()));
        }
        Ok(())
    }

    fn sign_digest(&self, key: &rsa::RsaPrivateKey, digest: &[u8]) -> Result<Vec<u8>> {
        let result = if self.pss {
            // Salt length equals the hash output length; fresh salt per
            // signature makes PSS probabilistic.
            let padding = match self.hash {
                Sha2::Sha256 => rsa::Pss::new_with_salt::<sha2::Sha256>(32),
                Sha2::Sha384 => rsa::Pss::new_with_salt::<sha2::Sha384>(48),
                Sha2::Sha512 => rsa::Pss::new_with_salt::<sha2::Sha512>(64),
            };
            key.sign_with_rng(&mut OsRng, padding, digest)
        } else {
            let padding = match self.hash {
                Sha2::Sha256 => rsa::Pkcs1v15Sign::new::<sha2::Sha256>(),
                Sha2::Sha384 => rsa::Pkcs1v15Sign::new::<sha2::Sha384>(),
                Sha2::Sha512 => rsa::Pkcs1v15Sign::new::<sha2::Sha512>(),
            };
            key.sign(padding, digest)
        };
        result.map_err(|e| Error::MalformedKey(e.to_string()))
    }

    fn verify_digest(&self, key: &rsa::RsaPublicKey, digest: &[u8], signature: &[u8]) -> Result<()> {
        let result = if self.pss {
            let padding = match self.hash {
                Sha2::Sha256 => rsa::Pss::new::<sha2::Sha256>(),
                Sha2::Sha384 => rsa::Pss::new::<sha2::Sha384>(),
                Sha2::Sha512 => rsa::Pss::new::<sha2::Sha512>(),
            };
            key.verify(padding, digest, signature)
        } else {
            let padding = match self.hash {
                Sha2::Sha256 => rsa::Pkcs1v15Sign::new::<sha2::Sha256>(),
                Sha2::Sha384 => rsa::Pkcs1v15Sign::new::<sha2::Sha384>(),
                Sha2::Sha512 => rsa::Pkcs1v15Sign::new::<sha2::Sha512>(),
            };
            key.verify(padding, digest, signature)
        };
        result.map_err(|_| Error::SignatureMismatch)
    }
}

impl AlgorithmIdentifier for RsaSignature {
    fn identifier(&self) -> &str {
        self.id
    }
}

impl SignatureAlgorithm for RsaSignature {
    fn sign(&self, key: &JsonWebKey, signing_input: &[u8]) -> Result<Vec<u8>> {
        use rsa::traits::PublicKeyParts;
        let private = key
            .rsa_private_key()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;
        self.check_modulus(private.size() * 8)?;
        let digest = self.hash.digest(signing_input);
        self.sign_digest(&private, &digest)
    }

    fn verify(&self, key: &JsonWebKey, signing_input: &[u8], signature: &[u8]) -> Result<()> {
        use rsa::traits::PublicKeyParts;
        let public = key
            .rsa_public_key()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.id.to_string()))?;
        self.check_modulus(public.size() * 8)?;
        let digest = self.hash.digest(signing_input);
        self.verify_digest(&public, &digest, signature)
    }
}

/// ECDSA over the NIST curves (ES256, ES384, ES512).
pub struct EcdsaSignature {
    curve: EcCurve,
}

impl EcdsaSignature {
    /// ES256 (P-256 with SHA-256)
    pub fn es256() -> Self {
        Self { curve: EcCurve::P256 }
    }

    /// ES384 (P-384 with SHA-384)
    pub fn es384() -> Self {
        Self { curve: EcCurve::P384 }
    }

    /// ES512 (P-521 with SHA-512)
    pub fn es512() -> Self {
        Self { curve: EcCurve::P521 }
    }

    fn check_curve(&self, key: &JsonWebKey) -> Result<()> {
        let curve = key
            .ec_curve()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.identifier().to_string()))?;
        if curve != self.curve {
            return Err(Error::AlgorithmKeyMismatch(self.identifier().to_string()));
        }
        Ok(())
    }
}

impl AlgorithmIdentifier for EcdsaSignature {
    fn identifier(&self) -> &str {
        ecdsa_identifier(self.curve)
    }
}

impl SignatureAlgorithm for EcdsaSignature {
    fn sign(&self, key: &JsonWebKey, signing_input: &[u8]) -> Result<Vec<u8>> {
        use p256::ecdsa::signature::RandomizedSigner;

        self.check_curve(key)?;
        let d = key
            .ec_private_scalar()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.identifier().to_string()))?;
        let map_key = |_| Error::AlgorithmKeyMismatch(self.identifier().to_string());
        let signature = match self.curve {
            EcCurve::P256 => {
                let sk = p256::ecdsa::SigningKey::from_slice(&d).map_err(map_key)?;
                let sig: p256::ecdsa::Signature = sk
                    .try_sign_with_rng(&mut OsRng, signing_input)
                    .map_err(|_| Error::SignatureMismatch)?;
                sig.to_bytes().to_vec()
            }
            EcCurve::P384 => {
                let sk = p384::ecdsa::SigningKey::from_slice(&d).map_err(map_key)?;
                let sig: p384::ecdsa::Signature = sk
                    .try_sign_with_rng(&mut OsRng, signing_input)
                    .map_err(|_| Error::SignatureMismatch)?;
                sig.to_bytes().to_vec()
            }
            EcCurve::P521 => {
                let sk = p521::ecdsa::SigningKey::from_slice(&d).map_err(map_key)?;
                let sig: p521::ecdsa::Signature = sk
                    .try_sign_with_rng(&mut OsRng, signing_input)
                    .map_err(|_| Error::SignatureMismatch)?;
                sig.to_bytes().to_vec()
            }
        };
        trace!(algorithm = self.identifier(), len = signature.len(), "produced ECDSA signature");
        Ok(signature)
    }

    fn verify(&self, key: &JsonWebKey, signing_input: &[u8], signature: &[u8]) -> Result<()> {
        use p256::ecdsa::signature::Verifier;

        self.check_curve(key)?;
        // The wire form is R || S, each exactly one coordinate wide.
        if signature.len() != 2 * self.curve.coordinate_len() {
            return Err(Error::SignatureMismatch);
        }
        let sec1 = key
            .ec_public_sec1()
            .map_err(|_| Error::AlgorithmKeyMismatch(self.identifier().to_string()))?;
        let map_key = |_| Error::AlgorithmKeyMismatch(self.identifier().to_string());
        let ok = match self.curve {
            EcCurve::P256 => {
                let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).map_err(map_key)?;
                // from_slice rejects R or S of zero or beyond the order.
                p256::ecdsa::Signature::from_slice(signature)
                    .map(|sig| vk.verify(signing_input, &sig).is_ok())
                    .unwrap_or(false)
            }
            EcCurve::P384 => {
                let vk = p384::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).map_err(map_key)?;
                p384::ecdsa::Signature::from_slice(signature)
                    .map(|sig| vk.verify(signing_input, &sig).is_ok())
                    .unwrap_or(false)
            }
            EcCurve::P521 => {
                let vk = p521::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).map_err(map_key)?;
                p521::ecdsa::Signature::from_slice(signature)
                    .map(|sig| vk.verify(signing_input, &sig).is_ok())
                    .unwrap_or(false)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(Error::SignatureMismatch)
        }
    }
}

/// EdDSA over Ed25519.
///
/// Ed448 keys are representable in JWK form but have no backend here, so
/// they fail with a key mismatch rather than producing a bad signature.
pub struct EddsaSignature;

impl AlgorithmIdentifier for EddsaSignature {
    fn identifier(&self) -> &str {
        "EdDSA"
    }
}

impl SignatureAlgorithm for EddsaSignature {
    fn sign(&self, key: &JsonWebKey, signing_input: &[u8]) -> Result<Vec<u8>> {
        use ed25519_dalek::Signer;

        if key.okp_curve().map_err(|_| Error::AlgorithmKeyMismatch("EdDSA".to_string()))?
            != OkpCurve::Ed25519
        {
            return Err(Error::AlgorithmKeyMismatch("EdDSA".to_string()));
        }
        let d = key.okp_private()?;
        let seed: [u8; 32] = d
            .as_slice()
            .try_into()
            .map_err(|_| Error::AlgorithmKeyMismatch("EdDSA".to_string()))?;
        let sk = ed25519_dalek::SigningKey::from_bytes(&seed);
        Ok(sk.sign(signing_input).to_bytes().to_vec())
    }

    fn verify(&self, key: &JsonWebKey, signing_input: &[u8], signature: &[u8]) -> Result<()> {
        use ed25519_dalek::Verifier;

        if key.okp_curve().map_err(|_| Error::AlgorithmKeyMismatch("EdDSA".to_string()))?
            != OkpCurve::Ed25519
        {
            return Err(Error::AlgorithmKeyMismatch("EdDSA".to_string()));
        }
        let x = key.okp_public()?;
        let point: [u8; 32] = x
            .as_slice()
            .try_into()
            .map_err(|_| Error::AlgorithmKeyMismatch("EdDSA".to_string()))?;
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&point)
            .map_err(|_| Error::AlgorithmKeyMismatch("EdDSA".to_string()))?;
        let sig = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|_| Error::SignatureMismatch)?;
        vk.verify(signing_input, &sig)
            .map_err(|_| Error::SignatureMismatch)
    }
}

/// The unsecured `none` algorithm.
///
/// Registered so that the identifier is known, but the default
/// [`AlgorithmConstraints`](super::AlgorithmConstraints) refuse it; a
/// consumer must opt in explicitly.
pub struct NoneSignature;

impl AlgorithmIdentifier for NoneSignature {
    fn identifier(&self) -> &str {
        "none"
    }
}

impl SignatureAlgorithm for NoneSignature {
    fn sign(&self, _key: &JsonWebKey, _signing_input: &[u8]) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn verify(&self, _key: &JsonWebKey, _signing_input: &[u8], signature: &[u8]) -> Result<()> {
        if signature.is_empty() {
            Ok(())
        } else {
            Err(Error::SignatureMismatch)
        }
    }
}

/// Every built-in signature entry, for default registry population.
pub(crate) fn default_entries() -> Vec<std::sync::Arc<dyn SignatureAlgorithm>> {
    vec![
        std::sync::Arc::new(HmacSignature::hs256()),
        std::sync::Arc::new(HmacSignature::hs384()),
        std::sync::Arc::new(HmacSignature::hs512()),
        std::sync::Arc::new(RsaSignature::rs256()),
        std::sync::Arc::new(RsaSignature::rs384()),
        std::sync::Arc::new(RsaSignature::rs512()),
        std::sync::Arc::new(RsaSignature::ps256()),
        std::sync::Arc::new(RsaSignature::ps384()),
        std::sync::Arc::new(RsaSignature::ps512()),
        std::sync::Arc::new(EcdsaSignature::es256()),
        std::sync::Arc::new(EcdsaSignature::es384()),
        std::sync::Arc::new(EcdsaSignature::es512()),
        std::sync::Arc::new(EddsaSignature),
        std::sync::Arc::new(NoneSignature),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwk::EcCurve;

    #[test]
    fn hmac_round_trip_and_determinism() {
        let key = JsonWebKey::generate_oct(256);
        let alg = HmacSignature::hs256();
        let a = alg.sign(&key, b"input").unwrap();
        let b = alg.sign(&key, b"input").unwrap();
        assert_eq!(a, b, "HMAC must be deterministic");
        assert_eq!(a.len(), 32);
        alg.verify(&key, b"input", &a).unwrap();
        assert!(matches!(
            alg.verify(&key, b"other", &a),
            Err(Error::SignatureMismatch)
        ));
    }

    #[test]
    fn hmac_short_key_rejected() {
        let key = JsonWebKey::generate_oct(128);
        let alg = HmacSignature::hs256();
        assert!(matches!(
            alg.sign(&key, b"input"),
            Err(Error::AlgorithmKeyMismatch(_))
        ));
    }

    #[test]
    fn hmac_wrong_key_type() {
        let key = JsonWebKey::generate_ec(EcCurve::P256).unwrap();
        let alg = HmacSignature::hs256();
        assert!(matches!(
            alg.verify(&key, b"x", &[0; 32]),
            Err(Error::AlgorithmKeyMismatch(_))
        ));
    }

    #[test]
    fn ecdsa_round_trip_fixed_width() {
        for (alg, width) in [
            (EcdsaSignature::es256(), 64),
            (EcdsaSignature::es384(), 96),
            (EcdsaSignature::es512(), 132),
        ] {
            let key = JsonWebKey::generate_ec(alg.curve).unwrap();
            let sig = alg.sign(&key, b"payload").unwrap();
            assert_eq!(sig.len(), width);
            alg.verify(&key, b"payload", &sig).unwrap();

            let mut tampered = sig.clone();
            tampered[0] ^= 1;
            assert!(alg.verify(&key, b"payload", &tampered).is_err());
        }
    }

    #[test]
    fn ecdsa_probabilistic() {
        let alg = EcdsaSignature::es256();
        let key = JsonWebKey::generate_ec(EcCurve::P256).unwrap();
        let a = alg.sign(&key, b"payload").unwrap();
        let b = alg.sign(&key, b"payload").unwrap();
        assert_ne!(a, b, "randomized ECDSA should differ between runs");
        alg.verify(&key, b"payload", &a).unwrap();
        alg.verify(&key, b"payload", &b).unwrap();
    }

    #[test]
    fn ecdsa_rejects_zero_components() {
        let alg = EcdsaSignature::es256();
        let key = JsonWebKey::generate_ec(EcCurve::P256).unwrap();
        let zeros = vec![0u8; 64];
        assert!(matches!(
            alg.verify(&key, b"payload", &zeros),
            Err(Error::SignatureMismatch)
        ));
    }

    #[test]
    fn ecdsa_curve_mismatch() {
        let alg = EcdsaSignature::es384();
        let key = JsonWebKey::generate_ec(EcCurve::P256).unwrap();
        assert!(matches!(
            alg.sign(&key, b"payload"),
            Err(Error::AlgorithmKeyMismatch(_))
        ));
    }

    #[test]
    fn eddsa_round_trip() {
        let key = JsonWebKey::generate_ed25519().unwrap();
        let alg = EddsaSignature;
        let sig = alg.sign(&key, b"payload").unwrap();
        assert_eq!(sig.len(), 64);
        alg.verify(&key, b"payload", &sig).unwrap();
        assert!(alg.verify(&key, b"tampered", &sig).is_err());
    }

    #[test]
    fn eddsa_rejects_x25519_key() {
        let key = JsonWebKey::generate_x25519().unwrap();
        let alg = EddsaSignature;
        assert!(matches!(
            alg.sign(&key, b"payload"),
            Err(Error::AlgorithmKeyMismatch(_))
        ));
    }

    #[test]
    fn none_signs_empty() {
        let key = JsonWebKey::generate_oct(256);
        let alg = NoneSignature;
        let sig = alg.sign(&key, b"payload").unwrap();
        assert!(sig.is_empty());
        alg.verify(&key, b"payload", &sig).unwrap();
        assert!(alg.verify(&key, b"payload", &[1]).is_err());
    }
}
