//! RSA blind signatures.
//!
//! The voter blinds a message with a fresh random factor `r`, the authority
//! signs the blinded value without learning the message, and the voter removes
//! `r` to obtain an ordinary RSA signature over the original message:
//!
//! ```text
//! blinded   = m * r^e        mod n
//! blind_sig = blinded^d      mod n   (authority)
//! signature = blind_sig / r  mod n   == m^d mod n
//! ```

use crate::*;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use rsa::traits::PrivateKeyParts;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};
use std::fmt;
use zeroize::Zeroize;

/// The per-run blinding factor `r`.
///
/// Not `Clone` and not serializable: a factor belongs to exactly one protocol
/// run and is wiped from memory when dropped.
pub struct BlindingFactor(BigUint);

impl BlindingFactor {
    /// Wrap an explicit factor, checking that it is invertible modulo `n`.
    pub fn new(public_key: &PublicKey, r: BigUint) -> Result<Self, Error> {
        if r < BigUint::from(2u8) || r >= public_key.n {
            return Err(Error::NoInverse);
        }
        if !gcd(&r, &public_key.n).is_one() {
            return Err(Error::NoInverse);
        }
        Ok(BlindingFactor(r))
    }

    pub fn value(&self) -> &BigUint {
        &self.0
    }
}

impl Drop for BlindingFactor {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("BlindingFactor(..)")
    }
}

/// Blind `message` for signing under `public_key`.
///
/// Returns the blinded message to send to the authority and the factor needed
/// to unblind the authority's answer.
pub fn blind<R: RngCore + CryptoRng>(
    public_key: &PublicKey,
    message: &BigUint,
    rng: &mut R,
) -> Result<(BigUint, BlindingFactor), Error> {
    if *message >= public_key.n {
        return Err(Error::MessageOutOfRange);
    }

    let r = loop {
        let candidate = random_residue(&public_key.n, rng)?;
        if gcd(&candidate, &public_key.n).is_one() {
            break BlindingFactor(candidate);
        }
    };

    let blinded = blind_with(public_key, message, &r)?;
    Ok((blinded, r))
}

/// Blind with a caller-chosen factor. Deterministic counterpart of [`blind`].
pub fn blind_with(
    public_key: &PublicKey,
    message: &BigUint,
    r: &BlindingFactor,
) -> Result<BigUint, Error> {
    if *message >= public_key.n {
        return Err(Error::MessageOutOfRange);
    }
    let r_e = mod_pow(r.value(), &public_key.e, &public_key.n)?;
    Ok((message * r_e) % &public_key.n)
}

/// Remove the blinding factor from the authority's signature.
pub fn unblind(
    public_key: &PublicKey,
    blind_signature: &BigUint,
    r: &BlindingFactor,
) -> Result<BigUint, Error> {
    let r_inv = mod_inv(r.value(), &public_key.n)?;
    Ok((blind_signature % &public_key.n) * r_inv % &public_key.n)
}

/// Check `signature^e mod n == message`.
pub fn verify(public_key: &PublicKey, message: &BigUint, signature: &BigUint) -> bool {
    match mod_pow(signature, &public_key.e, &public_key.n) {
        Ok(recovered) => recovered == *message,
        Err(_) => false,
    }
}

/// The authority's private signing exponent.
///
/// Signing happens on the authority. This type backs authorities built on this
/// crate and the test authorities.
pub struct SecretKey {
    n: BigUint,
    d: BigUint,
}

impl SecretKey {
    pub fn new(n: BigUint, d: BigUint) -> Self {
        SecretKey { n, d }
    }

    pub fn from_rsa(key: &RsaPrivateKey) -> Self {
        SecretKey {
            n: key.n().clone(),
            d: key.d().clone(),
        }
    }

    /// Sign a blinded message: `blinded^d mod n`
    pub fn sign_blinded(&self, blinded: &BigUint) -> Result<BigUint, Error> {
        mod_pow(blinded, &self.d, &self.n)
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.d.zeroize();
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("n", &self.n)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::OsRng;

    fn textbook() -> (PublicKey, SecretKey) {
        let n = BigUint::from(3233u32);
        let public = PublicKey::new(n.clone(), BigUint::from(17u32)).unwrap();
        let secret = SecretKey::new(n, BigUint::from(2753u32));
        (public, secret)
    }

    #[test]
    fn textbook_round_trip() {
        let (public, secret) = textbook();
        let message = BigUint::from(65u32);

        let (blinded, r) = blind(&public, &message, &mut OsRng).unwrap();
        let blind_sig = secret.sign_blinded(&blinded).unwrap();
        let signature = unblind(&public, &blind_sig, &r).unwrap();

        assert_eq!(signature, BigUint::from(588u32));
        assert!(verify(&public, &message, &signature));

        // Corrupt the blind signature by adding one mod n
        let corrupted = (blind_sig + 1u32) % &public.n;
        let bad_signature = unblind(&public, &corrupted, &r).unwrap();
        assert!(!verify(&public, &message, &bad_signature));
    }

    #[test]
    fn fixed_factor() {
        let (public, secret) = textbook();
        let message = BigUint::from(65u32);
        let r = BlindingFactor::new(&public, BigUint::from(7u32)).unwrap();

        // 65 * 7^17 mod 3233
        let blinded = blind_with(&public, &message, &r).unwrap();
        assert_eq!(blinded, BigUint::from(2034u32));

        let signature = unblind(&public, &secret.sign_blinded(&blinded).unwrap(), &r).unwrap();
        assert_eq!(signature, secret.sign_blinded(&message).unwrap());
    }

    #[test]
    fn factor_must_be_invertible() {
        let (public, _) = textbook();
        // 3233 = 53 * 61
        assert!(BlindingFactor::new(&public, BigUint::from(53u32)).is_err());
        assert!(BlindingFactor::new(&public, BigUint::from(122u32)).is_err());
        assert!(BlindingFactor::new(&public, BigUint::from(1u32)).is_err());
        assert!(BlindingFactor::new(&public, BigUint::from(3233u32)).is_err());
    }

    #[test]
    fn message_out_of_range() {
        let (public, _) = textbook();
        assert!(matches!(
            blind(&public, &BigUint::from(3233u32), &mut OsRng),
            Err(Error::MessageOutOfRange)
        ));
        assert!(blind(&public, &BigUint::from(3232u32), &mut OsRng).is_ok());
    }

    #[test]
    fn fresh_factor_every_time() {
        let rsa_key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let public = PublicKey::from_rsa(&rsa_key.to_public_key()).unwrap();
        let message = commit(&Identity::new("Alice", "42"));

        let (blinded_1, r_1) = blind(&public, &message, &mut OsRng).unwrap();
        let (blinded_2, r_2) = blind(&public, &message, &mut OsRng).unwrap();
        assert_ne!(r_1.value(), r_2.value());
        assert_ne!(blinded_1, blinded_2);
        assert_ne!(blinded_1, message);
    }

    #[test]
    fn real_key_round_trip_and_tampering() {
        let rsa_key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let public = PublicKey::from_rsa(&rsa_key.to_public_key()).unwrap();
        let secret = SecretKey::from_rsa(&rsa_key);
        let message = commit(&Identity::new("Alice", "42"));

        let (blinded, r) = blind(&public, &message, &mut OsRng).unwrap();
        let blind_sig = secret.sign_blinded(&blinded).unwrap();
        let signature = unblind(&public, &blind_sig, &r).unwrap();
        assert!(verify(&public, &message, &signature));
        assert_eq!(signature, secret.sign_blinded(&message).unwrap());

        for bit in &[0usize, 1, 100, 511, 1000] {
            let tampered = blind_sig.clone() ^ &(BigUint::one() << *bit);
            let tampered_sig = unblind(&public, &tampered, &r).unwrap();
            assert!(!verify(&public, &message, &tampered_sig), "bit {}", bit);
        }
    }

    #[test]
    fn debug_does_not_leak() {
        let (public, secret) = textbook();
        let r = BlindingFactor::new(&public, BigUint::from(7u32)).unwrap();
        assert_eq!(format!("{:?}", r), "BlindingFactor(..)");
        assert!(!format!("{:?}", secret).contains("2753"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_textbook_blind_unblind_verifies(m in 0u32..3233) {
            let (public, secret) = textbook();
            let message = BigUint::from(m);

            let (blinded, r) = blind(&public, &message, &mut OsRng).unwrap();
            let signature = unblind(&public, &secret.sign_blinded(&blinded).unwrap(), &r).unwrap();

            prop_assert_eq!(&signature, &secret.sign_blinded(&message).unwrap());
            prop_assert!(verify(&public, &message, &signature));
        }
    }
}
