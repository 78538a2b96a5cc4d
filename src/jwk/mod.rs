//! JSON Web Key model.
//!
//! A [`JsonWebKey`] carries the wire form dictated by RFC 7517 (base64url
//! members keyed by `kty`) while exposing operable cryptographic material
//! to the algorithm implementations. Keys are immutable once constructed;
//! the public projection is a pure function.

mod set;
mod thumbprint;

pub use set::JsonWebKeySet;

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::base64url;
use crate::bigint;
use crate::error::{Error, Result};

/// Elliptic curves usable for `EC` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EcCurve {
    /// NIST P-256
    #[serde(rename = "P-256")]
    P256,
    /// NIST P-384
    #[serde(rename = "P-384")]
    P384,
    /// NIST P-521
    #[serde(rename = "P-521")]
    P521,
}

impl EcCurve {
    /// Field element width in octets: ceil(bits(curve) / 8).
    pub fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// The curve's registered `crv` value.
    pub fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }
}

/// Curves usable for `OKP` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OkpCurve {
    /// Ed25519 signing curve
    Ed25519,
    /// Ed448 signing curve
    Ed448,
    /// X25519 key-agreement curve
    X25519,
    /// X448 key-agreement curve
    X448,
}

impl OkpCurve {
    /// Public key width in octets.
    pub fn public_len(self) -> usize {
        match self {
            Self::Ed25519 | Self::X25519 => 32,
            Self::Ed448 => 57,
            Self::X448 => 56,
        }
    }

    /// The curve's registered `crv` value.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519",
            Self::Ed448 => "Ed448",
            Self::X25519 => "X25519",
            Self::X448 => "X448",
        }
    }
}

/// Intended use of a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicKeyUse {
    /// Signature
    #[serde(rename = "sig")]
    Signature,
    /// Encryption
    #[serde(rename = "enc")]
    Encryption,
}

/// Key-type-specific parameters, tagged by `kty`.
///
/// All octet-valued members hold unpadded base64url text exactly as it
/// appears on the wire; validation normalizes whitespace and padding away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum KeyParams {
    /// Symmetric octet sequence
    #[serde(rename = "oct")]
    Oct {
        /// Key value
        k: String,
    },
    /// RSA key pair
    #[serde(rename = "RSA")]
    Rsa {
        /// Modulus
        n: String,
        /// Public exponent
        e: String,
        /// Private exponent
        #[serde(skip_serializing_if = "Option::is_none")]
        d: Option<String>,
        /// First prime factor
        #[serde(skip_serializing_if = "Option::is_none")]
        p: Option<String>,
        /// Second prime factor
        #[serde(skip_serializing_if = "Option::is_none")]
        q: Option<String>,
        /// First CRT exponent
        #[serde(skip_serializing_if = "Option::is_none")]
        dp: Option<String>,
        /// Second CRT exponent
        #[serde(skip_serializing_if = "Option::is_none")]
        dq: Option<String>,
        /// CRT coefficient
        #[serde(skip_serializing_if = "Option::is_none")]
        qi: Option<String>,
    },
    /// Elliptic-curve key pair
    #[serde(rename = "EC")]
    Ec {
        /// Curve
        crv: EcCurve,
        /// X coordinate
        x: String,
        /// Y coordinate
        y: String,
        /// Private scalar
        #[serde(skip_serializing_if = "Option::is_none")]
        d: Option<String>,
    },
    /// Octet key pair (Edwards / Montgomery curves)
    #[serde(rename = "OKP")]
    Okp {
        /// Curve
        crv: OkpCurve,
        /// Public key
        x: String,
        /// Private key
        #[serde(skip_serializing_if = "Option::is_none")]
        d: Option<String>,
    },
}

/// A JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key-type-specific parameters
    #[serde(flatten)]
    pub params: KeyParams,
    /// Key ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Intended use
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub public_key_use: Option<PublicKeyUse>,
    /// Permitted operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,
    /// Intended algorithm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// X.509 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5u: Option<String>,
    /// X.509 certificate chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    /// X.509 certificate SHA-1 thumbprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
    /// X.509 certificate SHA-256 thumbprint
    #[serde(rename = "x5t#S256", skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
}

/// Shared JWK member names, used by strict-mode parsing.
const COMMON_MEMBERS: &[&str] = &[
    "kty", "kid", "use", "key_ops", "alg", "x5u", "x5c", "x5t", "x5t#S256",
];

impl JsonWebKey {
    /// Builds a key from parameters alone, with no shared fields set.
    pub fn from_params(params: KeyParams) -> Result<Self> {
        let mut jwk = Self {
            params,
            kid: None,
            public_key_use: None,
            key_ops: None,
            alg: None,
            x5u: None,
            x5c: None,
            x5t: None,
            x5t_s256: None,
        };
        jwk.validate()?;
        Ok(jwk)
    }

    /// Parses a key from a JSON document.
    ///
    /// Unknown members are ignored; use [`JsonWebKey::from_json_strict`] to
    /// reject them. Base64url members may contain embedded whitespace,
    /// which is stripped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedKey`] when required members are missing,
    /// malformed, or mutually inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::MalformedKey(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parses a key, rejecting members outside the RFC 7517/7518 registry
    /// for the key's `kty`.
    pub fn from_json_strict(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::MalformedKey(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| Error::MalformedKey("JWK must be a JSON object".to_string()))?;
        let kty = obj
            .get("kty")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedKey("missing kty".to_string()))?;
        let specific: &[&str] = match kty {
            "oct" => &["k"],
            "RSA" => &["n", "e", "d", "p", "q", "dp", "dq", "qi"],
            "EC" => &["crv", "x", "y", "d"],
            "OKP" => &["crv", "x", "d"],
            other => return Err(Error::MalformedKey(format!("unknown kty {other}"))),
        };
        for name in obj.keys() {
            if !COMMON_MEMBERS.contains(&name.as_str()) && !specific.contains(&name.as_str()) {
                return Err(Error::MalformedKey(format!("unknown member {name}")));
            }
        }
        Self::from_value(value)
    }

    /// Parses a key from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut jwk: JsonWebKey =
            serde_json::from_value(value).map_err(|e| Error::MalformedKey(e.to_string()))?;
        jwk.validate()?;
        Ok(jwk)
    }

    /// Serializes the key to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// The key's `kty` value.
    pub fn key_type(&self) -> &'static str {
        match self.params {
            KeyParams::Oct { .. } => "oct",
            KeyParams::Rsa { .. } => "RSA",
            KeyParams::Ec { .. } => "EC",
            KeyParams::Okp { .. } => "OKP",
        }
    }

    /// Whether the key carries private parameters.
    ///
    /// `oct` keys are considered private: the octet sequence is the secret.
    pub fn is_private(&self) -> bool {
        match &self.params {
            KeyParams::Oct { .. } => true,
            KeyParams::Rsa { d, .. } => d.is_some(),
            KeyParams::Ec { d, .. } | KeyParams::Okp { d, .. } => d.is_some(),
        }
    }

    /// The public projection of the key: every private parameter dropped,
    /// shared fields preserved.
    ///
    /// Returns `None` for `oct` keys, which have no public form.
    pub fn public_only(&self) -> Option<JsonWebKey> {
        let params = match &self.params {
            KeyParams::Oct { .. } => return None,
            KeyParams::Rsa { n, e, .. } => KeyParams::Rsa {
                n: n.clone(),
                e: e.clone(),
                d: None,
                p: None,
                q: None,
                dp: None,
                dq: None,
                qi: None,
            },
            KeyParams::Ec { crv, x, y, .. } => KeyParams::Ec {
                crv: *crv,
                x: x.clone(),
                y: y.clone(),
                d: None,
            },
            KeyParams::Okp { crv, x, .. } => KeyParams::Okp {
                crv: *crv,
                x: x.clone(),
                d: None,
            },
        };
        Some(JsonWebKey { params, ..self.clone() })
    }

    /// Validates parameters and normalizes base64url members to their
    /// canonical unpadded, whitespace-free form.
    fn validate(&mut self) -> Result<()> {
        match &mut self.params {
            KeyParams::Oct { k } => {
                normalize(k)?;
            }
            KeyParams::Rsa { n, e, d, p, q, dp, dq, qi } => {
                normalize(n)?;
                normalize(e)?;
                for member in [d.as_mut(), p.as_mut(), q.as_mut(), dp.as_mut(), dq.as_mut(), qi.as_mut()]
                    .into_iter()
                    .flatten()
                {
                    normalize(member)?;
                }
                let has_crt = p.is_some() || q.is_some() || dp.is_some() || dq.is_some() || qi.is_some();
                if has_crt && d.is_none() {
                    return Err(Error::MalformedKey(
                        "RSA CRT parameters present without private exponent".to_string(),
                    ));
                }
            }
            KeyParams::Ec { crv, x, y, d } => {
                normalize(x)?;
                normalize(y)?;
                if let Some(d) = d.as_mut() {
                    normalize(d)?;
                }
                let crv = *crv;
                let xb = decode_member(x, crv.coordinate_len())?;
                let yb = decode_member(y, crv.coordinate_len())?;
                check_on_curve(crv, &xb, &yb)?;
                if let Some(d) = d {
                    let db = Zeroizing::new(decode_member(d, crv.coordinate_len())?);
                    check_ec_scalar(crv, &db)?;
                }
            }
            KeyParams::Okp { crv, x, d } => {
                normalize(x)?;
                if let Some(d) = d.as_mut() {
                    normalize(d)?;
                }
                let crv = *crv;
                let xb = base64url::decode(x.as_str())?;
                if xb.len() != crv.public_len() {
                    return Err(Error::MalformedKey(format!(
                        "{} public key must be {} octets",
                        crv.name(),
                        crv.public_len()
                    )));
                }
                if crv == OkpCurve::Ed25519 {
                    let arr: [u8; 32] = xb
                        .as_slice()
                        .try_into()
                        .map_err(|_| Error::MalformedKey("bad Ed25519 key length".to_string()))?;
                    ed25519_dalek::VerifyingKey::from_bytes(&arr)
                        .map_err(|e| Error::MalformedKey(format!("invalid Ed25519 point: {e}")))?;
                }
                if let Some(d) = d {
                    let db = Zeroizing::new(base64url::decode(d.as_str())?);
                    let expected = match crv {
                        OkpCurve::Ed25519 | OkpCurve::X25519 => 32,
                        OkpCurve::Ed448 => 57,
                        OkpCurve::X448 => 56,
                    };
                    if db.len() != expected {
                        return Err(Error::MalformedKey(format!(
                            "{} private key must be {expected} octets",
                            crv.name()
                        )));
                    }
                }
            }
        }
        // RSA private material is cross-checked after normalization so the
        // error points at the inconsistency rather than the encoding.
        if let KeyParams::Rsa { d: Some(_), .. } = &self.params {
            self.rsa_private_key()?;
        }
        Ok(())
    }

    // --- operable material ---

    /// The symmetric key octets of an `oct` key.
    pub(crate) fn oct_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        match &self.params {
            KeyParams::Oct { k } => Ok(Zeroizing::new(base64url::decode(k.as_str())?)),
            _ => Err(Error::MalformedKey(format!(
                "expected an oct key, found {}",
                self.key_type()
            ))),
        }
    }

    /// The RSA public key.
    pub(crate) fn rsa_public_key(&self) -> Result<rsa::RsaPublicKey> {
        match &self.params {
            KeyParams::Rsa { n, e, .. } => {
                let n = bigint::from_octets(&base64url::decode(n.as_str())?);
                let e = bigint::from_octets(&base64url::decode(e.as_str())?);
                rsa::RsaPublicKey::new(n, e).map_err(|e| Error::MalformedKey(e.to_string()))
            }
            _ => Err(Error::MalformedKey(format!(
                "expected an RSA key, found {}",
                self.key_type()
            ))),
        }
    }

    /// The RSA private key, checking CRT consistency when primes are present.
    pub(crate) fn rsa_private_key(&self) -> Result<rsa::RsaPrivateKey> {
        match &self.params {
            KeyParams::Rsa { n, e, d: Some(d), p, q, .. } => {
                let n = bigint::from_octets(&base64url::decode(n.as_str())?);
                let e = bigint::from_octets(&base64url::decode(e.as_str())?);
                let d = bigint::from_octets(&base64url::decode(d.as_str())?);
                let mut primes = Vec::new();
                if let (Some(p), Some(q)) = (p, q) {
                    primes.push(bigint::from_octets(&base64url::decode(p.as_str())?));
                    primes.push(bigint::from_octets(&base64url::decode(q.as_str())?));
                }
                let key = rsa::RsaPrivateKey::from_components(n, e, d, primes)
                    .map_err(|e| Error::MalformedKey(e.to_string()))?;
                key.validate().map_err(|e| Error::MalformedKey(e.to_string()))?;
                Ok(key)
            }
            KeyParams::Rsa { d: None, .. } => Err(Error::MalformedKey(
                "RSA key has no private exponent".to_string(),
            )),
            _ => Err(Error::MalformedKey(format!(
                "expected an RSA key, found {}",
                self.key_type()
            ))),
        }
    }

    /// The EC curve of an `EC` key.
    pub(crate) fn ec_curve(&self) -> Result<EcCurve> {
        match &self.params {
            KeyParams::Ec { crv, .. } => Ok(*crv),
            _ => Err(Error::MalformedKey(format!(
                "expected an EC key, found {}",
                self.key_type()
            ))),
        }
    }

    /// SEC1 uncompressed point (`0x04 || x || y`) of an `EC` key.
    pub(crate) fn ec_public_sec1(&self) -> Result<Vec<u8>> {
        match &self.params {
            KeyParams::Ec { crv, x, y, .. } => {
                let len = crv.coordinate_len();
                let xb = decode_member(x, len)?;
                let yb = decode_member(y, len)?;
                let mut out = Vec::with_capacity(1 + 2 * len);
                out.push(0x04);
                out.extend_from_slice(&xb);
                out.extend_from_slice(&yb);
                Ok(out)
            }
            _ => Err(Error::MalformedKey(format!(
                "expected an EC key, found {}",
                self.key_type()
            ))),
        }
    }

    /// Fixed-width private scalar of an `EC` key.
    pub(crate) fn ec_private_scalar(&self) -> Result<Zeroizing<Vec<u8>>> {
        match &self.params {
            KeyParams::Ec { crv, d: Some(d), .. } => Ok(Zeroizing::new(decode_member(
                d,
                crv.coordinate_len(),
            )?)),
            KeyParams::Ec { d: None, .. } => Err(Error::MalformedKey(
                "EC key has no private scalar".to_string(),
            )),
            _ => Err(Error::MalformedKey(format!(
                "expected an EC key, found {}",
                self.key_type()
            ))),
        }
    }

    /// The OKP curve of an `OKP` key.
    pub(crate) fn okp_curve(&self) -> Result<OkpCurve> {
        match &self.params {
            KeyParams::Okp { crv, .. } => Ok(*crv),
            _ => Err(Error::MalformedKey(format!(
                "expected an OKP key, found {}",
                self.key_type()
            ))),
        }
    }

    /// Raw public key octets of an `OKP` key.
    pub(crate) fn okp_public(&self) -> Result<Vec<u8>> {
        match &self.params {
            KeyParams::Okp { x, .. } => base64url::decode(x.as_str()),
            _ => Err(Error::MalformedKey(format!(
                "expected an OKP key, found {}",
                self.key_type()
            ))),
        }
    }

    /// Raw private key octets of an `OKP` key.
    pub(crate) fn okp_private(&self) -> Result<Zeroizing<Vec<u8>>> {
        match &self.params {
            KeyParams::Okp { d: Some(d), .. } => {
                Ok(Zeroizing::new(base64url::decode(d.as_str())?))
            }
            KeyParams::Okp { d: None, .. } => Err(Error::MalformedKey(
                "OKP key has no private part".to_string(),
            )),
            _ => Err(Error::MalformedKey(format!(
                "expected an OKP key, found {}",
                self.key_type()
            ))),
        }
    }

    // --- construction from native material ---

    /// Builds an `oct` key from raw octets.
    pub fn from_oct(key: &[u8]) -> Self {
        JsonWebKey {
            params: KeyParams::Oct { k: base64url::encode(key) },
            kid: None,
            public_key_use: None,
            key_ops: None,
            alg: None,
            x5u: None,
            x5c: None,
            x5t: None,
            x5t_s256: None,
        }
    }

    /// Builds an `EC` key from a SEC1 uncompressed point and an optional
    /// private scalar, both fixed-width for the curve.
    pub fn from_ec_sec1(crv: EcCurve, sec1: &[u8], d: Option<&[u8]>) -> Result<Self> {
        let len = crv.coordinate_len();
        if sec1.len() != 1 + 2 * len || sec1[0] != 0x04 {
            return Err(Error::MalformedKey(
                "expected an uncompressed SEC1 point".to_string(),
            ));
        }
        let params = KeyParams::Ec {
            crv,
            x: base64url::encode(&sec1[1..=len]),
            y: base64url::encode(&sec1[1 + len..]),
            d: d.map(base64url::encode),
        };
        Self::from_params(params)
    }

    /// Builds an `OKP` key from raw public octets and an optional private
    /// part.
    pub fn from_okp(crv: OkpCurve, x: &[u8], d: Option<&[u8]>) -> Result<Self> {
        let params = KeyParams::Okp {
            crv,
            x: base64url::encode(x),
            d: d.map(base64url::encode),
        };
        Self::from_params(params)
    }

    // --- generation ---

    /// Generates a fresh symmetric key of the given bit length.
    pub fn generate_oct(bits: usize) -> Self {
        let mut key = Zeroizing::new(vec![0u8; bits / 8]);
        OsRng.fill_bytes(&mut key);
        Self::from_oct(&key)
    }

    /// Generates a fresh EC key pair on the given curve.
    pub fn generate_ec(crv: EcCurve) -> Result<Self> {
        use elliptic_curve::sec1::ToEncodedPoint;

        let (sec1, d) = match crv {
            EcCurve::P256 => {
                let sk = p256::SecretKey::random(&mut OsRng);
                let pt = sk.public_key().to_encoded_point(false).as_bytes().to_vec();
                (pt, Zeroizing::new(sk.to_bytes().to_vec()))
            }
            EcCurve::P384 => {
                let sk = p384::SecretKey::random(&mut OsRng);
                let pt = sk.public_key().to_encoded_point(false).as_bytes().to_vec();
                (pt, Zeroizing::new(sk.to_bytes().to_vec()))
            }
            EcCurve::P521 => {
                let sk = p521::SecretKey::random(&mut OsRng);
                let pt = sk.public_key().to_encoded_point(false).as_bytes().to_vec();
                (pt, Zeroizing::new(sk.to_bytes().to_vec()))
            }
        };
        Self::from_ec_sec1(crv, &sec1, Some(&d))
    }

    /// Generates a fresh Ed25519 key pair.
    pub fn generate_ed25519() -> Result<Self> {
        let sk = ed25519_dalek::SigningKey::generate(&mut OsRng);
        Self::from_okp(
            OkpCurve::Ed25519,
            sk.verifying_key().as_bytes(),
            Some(sk.as_bytes()),
        )
    }

    /// Generates a fresh X25519 key pair.
    pub fn generate_x25519() -> Result<Self> {
        let sk = x25519_dalek::StaticSecret::random_from_rng(OsRng);
        let pk = x25519_dalek::PublicKey::from(&sk);
        Self::from_okp(OkpCurve::X25519, pk.as_bytes(), Some(&sk.to_bytes()))
    }
}

/// Normalizes a base64url member in place: strips whitespace and padding.
fn normalize(member: &mut String) -> Result<()> {
    let decoded = base64url::decode_lenient_whitespace(member)?;
    *member = base64url::encode(decoded);
    Ok(())
}

/// Decodes a coordinate-width member, left-padding short values.
fn decode_member(member: &str, width: usize) -> Result<Vec<u8>> {
    let decoded = base64url::decode(member)?;
    bigint::left_pad(&decoded, width)
        .map_err(|_| Error::MalformedKey(format!("member wider than {width} octets")))
}

/// Checks that (x, y) lies on the named curve.
fn check_on_curve(crv: EcCurve, x: &[u8], y: &[u8]) -> Result<()> {
    use elliptic_curve::sec1::FromEncodedPoint;

    let on_curve = match crv {
        EcCurve::P256 => {
            let pt = p256::EncodedPoint::from_affine_coordinates(
                p256::FieldBytes::from_slice(x),
                p256::FieldBytes::from_slice(y),
                false,
            );
            Option::<p256::PublicKey>::from(p256::PublicKey::from_encoded_point(&pt)).is_some()
        }
        EcCurve::P384 => {
            let pt = p384::EncodedPoint::from_affine_coordinates(
                p384::FieldBytes::from_slice(x),
                p384::FieldBytes::from_slice(y),
                false,
            );
            Option::<p384::PublicKey>::from(p384::PublicKey::from_encoded_point(&pt)).is_some()
        }
        EcCurve::P521 => {
            let pt = p521::EncodedPoint::from_affine_coordinates(
                p521::FieldBytes::from_slice(x),
                p521::FieldBytes::from_slice(y),
                false,
            );
            Option::<p521::PublicKey>::from(p521::PublicKey::from_encoded_point(&pt)).is_some()
        }
    };
    if on_curve {
        Ok(())
    } else {
        Err(Error::MalformedKey(format!(
            "point is not on {}",
            crv.name()
        )))
    }
}

/// Checks that d is a valid non-zero scalar for the curve.
fn check_ec_scalar(crv: EcCurve, d: &[u8]) -> Result<()> {
    let valid = match crv {
        EcCurve::P256 => p256::SecretKey::from_slice(d).is_ok(),
        EcCurve::P384 => p384::SecretKey::from_slice(d).is_ok(),
        EcCurve::P521 => p521::SecretKey::from_slice(d).is_ok(),
    };
    if valid {
        Ok(())
    } else {
        Err(Error::MalformedKey(format!(
            "invalid private scalar for {}",
            crv.name()
        )))
    }
}
