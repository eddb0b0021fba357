//! Injected secure randomness
//!
//! Every nonce, salt, random key, and generated password is drawn through
//! `SecureRandomSource`, so callers decide where entropy comes from
//! (`rand::rngs::OsRng` in production, seeded generators in tests).

use rand::{CryptoRng, RngCore};

use crate::error::CryptoError;

/// A cryptographically secure source of random bytes.
pub trait SecureRandomSource {
    /// Fill `dest` entirely with random bytes, or fail with `RandomUnavailable`.
    fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

impl<R: RngCore + CryptoRng + ?Sized> SecureRandomSource for R {
    fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), CryptoError> {
        self.try_fill_bytes(dest)
            .map_err(|e| CryptoError::RandomUnavailable(e.to_string()))
    }
}

/// Uniform index in `0..bound` without modulo bias.
pub(crate) fn random_below<R: SecureRandomSource + ?Sized>(
    rng: &mut R,
    bound: usize,
) -> Result<usize, CryptoError> {
    debug_assert!(bound > 0 && bound <= u32::MAX as usize);
    let bound = bound as u32;
    // Largest multiple of `bound` that fits in u32; draws above it are rejected.
    let zone = u32::MAX - (u32::MAX % bound);
    loop {
        let mut buf = [0u8; 4];
        rng.try_fill(&mut buf)?;
        let v = u32::from_be_bytes(buf);
        if v < zone {
            return Ok((v % bound) as usize);
        }
    }
}
