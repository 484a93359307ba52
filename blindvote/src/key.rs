use crate::*;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use num_integer::Integer;
use num_traits::One;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use std::path::Path;

/// The signing authority's RSA public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Modulus. The client never learns its factors.
    pub n: BigUint,

    /// Public exponent
    pub e: BigUint,
}

impl PublicKey {
    /// Build a public key from raw parameters, checking `1 < e < n`.
    pub fn new(n: BigUint, e: BigUint) -> Result<Self, Error> {
        if n <= BigUint::from(3u8) || n.is_even() {
            return Err(Error::KeyDecode(format!("invalid modulus {}", n)));
        }
        if e <= BigUint::one() || e >= n {
            return Err(Error::KeyDecode(format!("invalid public exponent {}", e)));
        }
        Ok(PublicKey { n, e })
    }

    /// Decode a served key artifact, either PEM (SPKI or PKCS#1) or an RSA JWK.
    pub fn decode(artifact: &str) -> Result<Self, Error> {
        let trimmed = artifact.trim();
        if trimmed.starts_with("-----BEGIN") {
            Self::from_pem(trimmed)
        } else if trimmed.starts_with('{') {
            Self::from_jwk(trimmed)
        } else {
            Err(Error::KeyDecode(
                "key artifact is neither PEM nor JWK".to_owned(),
            ))
        }
    }

    /// Decode a PEM encoded key. Accepts `PUBLIC KEY` (SPKI) and
    /// `RSA PUBLIC KEY` (PKCS#1) labels.
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let key = if pem.contains("BEGIN RSA PUBLIC KEY") {
            RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| Error::KeyDecode(e.to_string()))?
        } else {
            RsaPublicKey::from_public_key_pem(pem).map_err(|e| Error::KeyDecode(e.to_string()))?
        };
        Self::from_rsa(&key)
    }

    /// Decode an RSA JSON Web Key (`kty`, `n`, `e`, base64url members).
    pub fn from_jwk(json: &str) -> Result<Self, Error> {
        let jwk: Jwk = serde_json::from_str(json).map_err(|e| Error::KeyDecode(e.to_string()))?;
        if jwk.kty != "RSA" {
            return Err(Error::KeyDecode(format!("unsupported key type {}", jwk.kty)));
        }
        let n = BigUint::from_bytes_be(&decode_b64url(&jwk.n)?);
        let e = BigUint::from_bytes_be(&decode_b64url(&jwk.e)?);
        Self::new(n, e)
    }

    /// Load a key from a local file, e.g. a `public.pem` shipped alongside the client.
    pub fn from_pem_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::KeyDecode(format!("cannot read {}: {}", path.display(), e)))?;
        Self::decode(&contents)
    }

    pub fn from_rsa(key: &RsaPublicKey) -> Result<Self, Error> {
        Self::new(key.n().clone(), key.e().clone())
    }

    /// Size of the modulus in bits
    pub fn bits(&self) -> usize {
        self.n.bits()
    }
}

#[derive(Deserialize)]
struct Jwk {
    kty: String,
    n: String,
    e: String,
}

fn decode_b64url(value: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| Error::KeyDecode(format!("invalid base64url: {}", e)))
}
