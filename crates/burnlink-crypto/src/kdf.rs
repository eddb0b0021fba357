//! Key derivation: optional password → public component
//!
//! Without a password the public component is 256 random bits. With a
//! password it is Argon2id(password, salt), where the salt is random per
//! secret and stored in the envelope. Anyone holding the password and the
//! envelope can therefore re-derive the public component, which is what lets
//! a recipient open a bare link (no fragment) with the password alone.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::random::SecureRandomSource;
use crate::{KEY_SIZE, SALT_SIZE};

pub type Salt = [u8; SALT_SIZE];

/// The key half carried in the share link fragment.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct PublicComponent {
    bytes: [u8; KEY_SIZE],
}

impl PublicComponent {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// URL-safe base64 without padding (43 characters).
    pub fn to_encoded(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.bytes)
    }

    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| CryptoError::Encoding(format!("base64: {e}")))?;

        if decoded.len() != KEY_SIZE {
            let len = decoded.len();
            decoded.zeroize();
            return Err(CryptoError::Encoding(format!(
                "public component has {len} bytes (expected {KEY_SIZE})"
            )));
        }

        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { bytes })
    }
}

impl Drop for PublicComponent {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for PublicComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicComponent")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for KDF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Highest Argon2id memory cost a recipient will honor (1 GiB)
pub const MAX_KDF_MEM_KIB: u32 = 1024 * 1024;
/// Highest Argon2id time cost a recipient will honor
pub const MAX_KDF_TIME_COST: u32 = 16;
/// Highest Argon2id parallelism a recipient will honor
pub const MAX_KDF_PARALLELISM: u32 = 16;

impl KdfParams {
    /// Reject costs above the recipient ceilings.
    ///
    /// KDF headers arrive from the server, so every field is bounded before
    /// Argon2id runs.
    pub fn check_limits(&self) -> Result<(), CryptoError> {
        let checks = [
            ("memory cost", self.mem_cost_kib, MAX_KDF_MEM_KIB),
            ("time cost", self.time_cost, MAX_KDF_TIME_COST),
            ("parallelism", self.parallelism, MAX_KDF_PARALLELISM),
        ];
        for (name, value, max) in checks {
            if value > max {
                return Err(CryptoError::Kdf(format!("Argon2id {name} {value} exceeds {max}")));
            }
        }
        Ok(())
    }
}

/// Produce the public component for a new secret.
///
/// An absent or empty password yields random key material; a non-empty one
/// is stretched with Argon2id under `salt`.
pub fn derive_key<R: SecureRandomSource + ?Sized>(
    password: Option<&SecretString>,
    salt: &Salt,
    params: &KdfParams,
    rng: &mut R,
) -> Result<PublicComponent, CryptoError> {
    match password.filter(|p| !p.expose_secret().is_empty()) {
        Some(password) => derive_from_password(password, salt, params),
        None => {
            let mut bytes = [0u8; KEY_SIZE];
            rng.try_fill(&mut bytes)?;
            tracing::debug!("generated random public component");
            Ok(PublicComponent::from_bytes(bytes))
        }
    }
}

/// Derive a public component from a password and salt using Argon2id.
///
/// Deterministic for a fixed (password, salt, params) triple.
pub fn derive_from_password(
    password: &SecretString,
    salt: &Salt,
    params: &KdfParams,
) -> Result<PublicComponent, CryptoError> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::Kdf(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::Kdf(format!("Argon2id failed: {e}")))?;

    tracing::debug!(
        mem_cost_kib = params.mem_cost_kib,
        time_cost = params.time_cost,
        "derived public component from password"
    );
    Ok(PublicComponent::from_bytes(key))
}

/// Draw a fresh per-secret salt.
pub fn generate_salt<R: SecureRandomSource + ?Sized>(rng: &mut R) -> Result<Salt, CryptoError> {
    let mut salt = [0u8; SALT_SIZE];
    rng.try_fill(&mut salt)?;
    Ok(salt)
}
