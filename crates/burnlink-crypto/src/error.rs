use thiserror::Error;

/// Failure to open a ciphertext.
///
/// Never carries partial plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// Wrong key, wrong password, or tampered ciphertext.
    #[error("authentication failed: wrong key or tampered ciphertext")]
    AuthenticationFailed,

    /// Input cannot be a ciphertext of this scheme at all.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    /// The secure randomness source failed. Not recoverable.
    #[error("secure random source unavailable: {0}")]
    RandomUnavailable(String),

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("invalid key encoding: {0}")]
    Encoding(String),

    #[error("invalid password rules: {0}")]
    PasswordRules(String),
}
