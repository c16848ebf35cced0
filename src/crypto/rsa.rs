//! RSA key generation
//!
//! # Algorithm
//!
//! 1. Draw odd candidates of `⌊bits/2⌋` and `⌈bits/2⌉` bits (top bit set),
//!    reject those with a small factor, then run Miller-Rabin with
//!    `miller_rabin_rounds` random witnesses.
//! 2. Keep the pair when `p ≠ q`, `n = p·q` has exactly `bits` bits and the
//!    public exponent is invertible modulo `φ = (p - 1)(q - 1)`.
//! 3. `d = e⁻¹ mod φ` from the extended Euclidean algorithm.
//!
//! Every candidate drawn counts against `max_attempts`.

use crate::config::KeyGenConfig;
use crate::error::{NumericError, Result};
use num::bigint::{BigInt, BigUint};
use num::{Integer, One, Zero};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SMALL_PRIMES: [u32; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub n: BigUint,
    pub e: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub n: BigUint,
    pub d: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl RsaKeyPair {
    /// Bit length of the modulus
    pub fn bit_length(&self) -> u64 {
        self.public.n.bits()
    }
}

fn check_message(operation: &'static str, m: &BigUint, n: &BigUint) -> Result<()> {
    if m >= n {
        return Err(NumericError::domain(
            operation,
            format!("message of {} bits does not fit below the {}-bit modulus", m.bits(), n.bits()),
        ));
    }
    Ok(())
}

impl PublicKey {
    /// `m^e mod n`
    ///
    /// # Errors
    ///
    /// `Domain` when `m >= n`.
    pub fn encrypt(&self, m: &BigUint) -> Result<BigUint> {
        check_message("encrypt", m, &self.n)?;
        Ok(m.modpow(&self.e, &self.n))
    }
}

impl PrivateKey {
    /// `c^d mod n`
    ///
    /// # Errors
    ///
    /// `Domain` when `c >= n`.
    pub fn decrypt(&self, c: &BigUint) -> Result<BigUint> {
        check_message("decrypt", c, &self.n)?;
        Ok(c.modpow(&self.d, &self.n))
    }
}

/// Generate a key pair with a `bit_length`-bit modulus
///
/// # Errors
///
/// - `Domain` when `bit_length < 8`
/// - `KeyGeneration` when more than `max_attempts` candidates are drawn
/// - `InvalidConfiguration` for an even or too small public exponent
///
/// # Example
///
/// ```rust
/// use num::BigUint;
/// use numerix::config::KeyGenConfig;
/// use numerix::crypto::generate_rsa_keys;
///
/// let keys = generate_rsa_keys(128, &KeyGenConfig::seeded(1)).unwrap();
/// assert_eq!(keys.bit_length(), 128);
///
/// let m = BigUint::from(42u32);
/// let c = keys.public.encrypt(&m).unwrap();
/// assert_eq!(keys.private.decrypt(&c).unwrap(), m);
/// ```
pub fn generate_rsa_keys(bit_length: u64, config: &KeyGenConfig) -> Result<RsaKeyPair> {
    config.validate()?;
    if bit_length < 8 {
        return Err(NumericError::domain(
            "generate_rsa_keys",
            format!("modulus of {bit_length} bits is too small, need at least 8"),
        ));
    }

    let e = BigUint::from(config.public_exponent);
    let p_bits = bit_length / 2;
    let q_bits = bit_length - p_bits;
    let mut search = PrimeSearch {
        rng: StdRng::seed_from_u64(config.seed),
        attempts: 0,
        config,
        bit_length,
    };

    loop {
        let p = search.next_prime(p_bits)?;
        let q = search.next_prime(q_bits)?;
        if p == q {
            continue;
        }
        let n = &p * &q;
        if n.bits() != bit_length {
            continue;
        }
        let phi = (&p - 1u32) * (&q - 1u32);
        let Some(d) = mod_inverse(&e, &phi) else {
            log::trace!("public exponent shares a factor with φ, redrawing");
            continue;
        };

        log::debug!(
            "generated {bit_length}-bit RSA key after {} candidates",
            search.attempts
        );
        return Ok(RsaKeyPair {
            public: PublicKey { n: n.clone(), e },
            private: PrivateKey { n, d },
        });
    }
}

/// Miller-Rabin with `rounds` witnesses drawn from a `StdRng` seeded with
/// `seed`
///
/// Never wrong for primes; a composite passes with probability at most
/// `4^-rounds`.
pub fn is_probable_prime(n: &BigUint, rounds: usize, seed: u64) -> bool {
    probable_prime(n, rounds, &mut StdRng::seed_from_u64(seed))
}

struct PrimeSearch<'a> {
    rng: StdRng,
    attempts: usize,
    config: &'a KeyGenConfig,
    bit_length: u64,
}

impl PrimeSearch<'_> {
    fn next_prime(&mut self, bits: u64) -> Result<BigUint> {
        loop {
            if self.attempts >= self.config.max_attempts {
                log::warn!(
                    "no {}-bit key after {} prime candidates",
                    self.bit_length,
                    self.attempts
                );
                return Err(NumericError::KeyGeneration {
                    bit_length: self.bit_length,
                    attempts: self.attempts,
                });
            }
            self.attempts += 1;

            let candidate = random_odd(bits, &mut self.rng);
            if probable_prime(&candidate, self.config.miller_rabin_rounds, &mut self.rng) {
                return Ok(candidate);
            }
        }
    }
}

/// Uniform `bits`-bit odd number with the top bit set
fn random_odd(bits: u64, rng: &mut StdRng) -> BigUint {
    let mut bytes = random_bytes(bits, rng);
    let top = ((bits - 1) % 8) as u32;
    bytes[0] |= 1 << top;
    if let Some(last) = bytes.last_mut() {
        *last |= 1;
    }
    BigUint::from_bytes_be(&bytes)
}

/// `bits` random bits, big-endian, excess high bits cleared
fn random_bytes(bits: u64, rng: &mut StdRng) -> Vec<u8> {
    let len = bits.div_ceil(8) as usize;
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    let excess = (len as u64 * 8 - bits) as u32;
    bytes[0] &= 0xFF >> excess;
    bytes
}

/// Uniform in `[0, bound)` by rejection
fn random_below(bound: &BigUint, rng: &mut StdRng) -> BigUint {
    let bits = bound.bits();
    loop {
        let candidate = BigUint::from_bytes_be(&random_bytes(bits, rng));
        if &candidate < bound {
            return candidate;
        }
    }
}

fn probable_prime(n: &BigUint, rounds: usize, rng: &mut StdRng) -> bool {
    for p in SMALL_PRIMES {
        if *n == BigUint::from(p) {
            return true;
        }
        if (n % p).is_zero() {
            return false;
        }
    }
    if *n < BigUint::from(2u32) {
        return false;
    }

    // n - 1 = d · 2^s with d odd
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let n_minus_1 = n - 1u32;
    let s = n_minus_1.trailing_zeros().unwrap_or(0);
    let d = &n_minus_1 >> s;
    let span = n - 3u32;

    'witness: for _ in 0..rounds {
        let a = random_below(&span, rng) + 2u32;
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_1 {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// `a⁻¹ mod m`, when `gcd(a, m) = 1`
fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let a = BigInt::from(a.clone());
    let m = BigInt::from(m.clone());
    let egcd = a.extended_gcd(&m);
    if !egcd.gcd.is_one() {
        return None;
    }
    egcd.x.mod_floor(&m).to_biguint()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let keys = generate_rsa_keys(64, &KeyGenConfig::seeded(11)).unwrap();
        assert_eq!(keys.bit_length(), 64);
        assert_eq!(keys.public.n, keys.private.n);
        for m in [0u64, 1, 2, 65_537, 123_456_789, 0xDEAD_BEEF] {
            let m = BigUint::from(m);
            let c = keys.public.encrypt(&m).unwrap();
            assert_eq!(keys.private.decrypt(&c).unwrap(), m);
        }
    }

    #[test]
    fn test_smallest_modulus() {
        let keys = generate_rsa_keys(8, &KeyGenConfig::seeded(3)).unwrap();
        assert_eq!(keys.bit_length(), 8);
        let m = BigUint::from(42u32);
        let c = keys.public.encrypt(&m).unwrap();
        assert_eq!(keys.private.decrypt(&c).unwrap(), m);
    }

    #[test]
    fn test_same_seed_same_keys() {
        let cfg = KeyGenConfig::seeded(2024);
        assert_eq!(generate_rsa_keys(96, &cfg).unwrap(), generate_rsa_keys(96, &cfg).unwrap());
        assert_ne!(
            generate_rsa_keys(96, &cfg).unwrap(),
            generate_rsa_keys(96, &KeyGenConfig::seeded(2025)).unwrap()
        );
    }

    #[test]
    fn test_attempt_budget() {
        let cfg = KeyGenConfig {
            max_attempts: 0,
            ..KeyGenConfig::default()
        };
        assert_eq!(
            generate_rsa_keys(64, &cfg).unwrap_err(),
            NumericError::KeyGeneration {
                bit_length: 64,
                attempts: 0
            }
        );
    }

    #[test]
    fn test_too_short() {
        let err = generate_rsa_keys(7, &KeyGenConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "DomainError");
    }

    #[test]
    fn test_message_must_fit() {
        let keys = generate_rsa_keys(32, &KeyGenConfig::default()).unwrap();
        let too_big = keys.public.n.clone();
        assert_eq!(keys.public.encrypt(&too_big).unwrap_err().kind(), "DomainError");
    }

    #[test]
    fn test_primality() {
        let mersenne = BigUint::from(2_305_843_009_213_693_951u64);
        assert!(is_probable_prime(&mersenne, 20, 0));
        assert!(is_probable_prime(&BigUint::from(2u32), 20, 0));
        assert!(is_probable_prime(&BigUint::from(7919u32), 20, 0));
        assert!(!is_probable_prime(&BigUint::from(561u32), 20, 0));
        assert!(!is_probable_prime(&BigUint::from(1u32), 20, 0));
        assert!(!is_probable_prime(&BigUint::from(0u32), 20, 0));
        assert!(!is_probable_prime(&(&mersenne * &mersenne), 20, 0));
    }

    #[test]
    fn test_mod_inverse() {
        let inv = mod_inverse(&BigUint::from(3u32), &BigUint::from(11u32)).unwrap();
        assert_eq!(inv, BigUint::from(4u32));
        assert!(mod_inverse(&BigUint::from(6u32), &BigUint::from(9u32)).is_none());
    }
}
