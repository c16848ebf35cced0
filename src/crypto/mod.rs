//! Toy public-key cryptography
//!
//! [`generate_rsa_keys`] searches for two probable primes with Miller-Rabin
//! and derives the private exponent with the extended Euclidean algorithm.
//! Everything is driven by a seeded `StdRng`, so a seed reproduces a key
//! pair. The `encrypt` / `decrypt` methods are textbook RSA without padding:
//! suitable for exercising the number theory, not for protecting data.

mod rsa;

pub use rsa::{PrivateKey, PublicKey, RsaKeyPair, generate_rsa_keys, is_probable_prime};
