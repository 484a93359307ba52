//! Arbitrary-precision modular arithmetic used by the blind signature scheme.

use crate::*;
use num_bigint_dig::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use rsa::BigUint;

/// Compute `base^exp mod modulus` by square-and-multiply.
///
/// The exponent is consumed one bit per iteration, least-significant bit first.
/// Every iteration computes both the product and the square, so the sequence of
/// big-integer operations depends only on the bit length of `exp`.
pub fn mod_pow(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> Result<BigUint, Error> {
    if modulus.is_zero() {
        return Err(Error::DivisionByZero);
    }
    if modulus.is_one() {
        return Ok(BigUint::zero());
    }

    let mut result = BigUint::one();
    let mut b = base % modulus;
    let mut e = exp.clone();

    while !e.is_zero() {
        let product = (&result * &b) % modulus;
        if e.is_odd() {
            result = product;
        }
        b = (&b * &b) % modulus;
        e = e >> 1usize;
    }

    Ok(result)
}

/// Greatest common divisor by the Euclidean algorithm.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    let mut x = a.clone();
    let mut y = b.clone();
    while !y.is_zero() {
        let r = &x % &y;
        x = y;
        y = r;
    }
    x
}

/// Extended Euclidean algorithm.
///
/// Returns `(g, x, y)` such that `a*x + b*y == g`. When both inputs are
/// non-negative, `g == gcd(a, b)`.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = &old_r / &r;

        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);

        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);

        let next_t = &old_t - &q * &t;
        old_t = std::mem::replace(&mut t, next_t);
    }

    (old_r, old_s, old_t)
}

/// Modular inverse of `a` modulo `m`, normalized into `[0, m)`.
pub fn mod_inv(a: &BigUint, m: &BigUint) -> Result<BigUint, Error> {
    if m.is_zero() {
        return Err(Error::DivisionByZero);
    }

    let a = BigInt::from_biguint(Sign::Plus, a % m);
    let m_int = BigInt::from_biguint(Sign::Plus, m.clone());
    let (g, x, _) = extended_gcd(&a, &m_int);
    if !g.is_one() {
        return Err(Error::NoInverse);
    }

    let normalized = ((x % &m_int) + &m_int) % &m_int;
    normalized.to_biguint().ok_or(Error::NoInverse)
}

/// Sample uniformly from `[2, max - 1]`.
///
/// Draws `ceil(bits(max) / 8)` bytes per attempt and rejects values outside the
/// range, so no residue class is favoured.
pub fn random_residue<R: RngCore + CryptoRng>(
    max: &BigUint,
    rng: &mut R,
) -> Result<BigUint, Error> {
    let two = BigUint::from(2u8);
    if *max <= two {
        return Err(Error::EmptyRange(max.clone()));
    }

    let bits = max.bits();
    let byte_len = (bits + 7) / 8;
    // Mask off the unused high bits of the leading byte. This keeps every
    // candidate below 2^bits without changing the distribution inside it.
    let excess_bits = byte_len * 8 - bits;
    let top_mask = 0xffu8 >> excess_bits;

    let mut buf = vec![0u8; byte_len];
    loop {
        rng.fill_bytes(&mut buf);
        buf[0] &= top_mask;
        let candidate = BigUint::from_bytes_be(&buf);
        if candidate >= two && candidate < *max {
            return Ok(candidate);
        }
    }
}
