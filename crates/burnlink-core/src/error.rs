use burnlink_crypto::{CryptoError, DecryptError};
use thiserror::Error;

use crate::policy::PolicyViolation;

pub type BurnlinkResult<T> = Result<T, BurnlinkError>;

/// Failures reported by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("secret is too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("rejected by storage: {0}")]
    Rejected(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("secret not found, expired, or already burned")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum BurnlinkError {
    #[error("policy violation: {0}")]
    Policy(#[from] PolicyViolation),

    #[error("decryption failed: {0}")]
    Decrypt(#[from] DecryptError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The secure random source is gone. Secret creation must abort.
    #[error("fatal configuration error: {0}")]
    ConfigurationFatal(String),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("this secret is password protected; a password is required")]
    PasswordRequired,

    #[error("invalid share link: {0}")]
    Locator(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<CryptoError> for BurnlinkError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::RandomUnavailable(msg) => BurnlinkError::ConfigurationFatal(msg),
            CryptoError::Encoding(msg) => BurnlinkError::Locator(msg),
            other => BurnlinkError::Crypto(other),
        }
    }
}

impl BurnlinkError {
    /// Short message suitable for showing to the person at the keyboard.
    ///
    /// Keeps "wrong password" distinct from "network error".
    pub fn user_message(&self) -> &'static str {
        match self {
            BurnlinkError::Policy(PolicyViolation::FileNameTooLong { .. }) => {
                "A file name is too long. Please rename the file."
            }
            BurnlinkError::Policy(_) => "The secret settings are not allowed. Please adjust them.",
            BurnlinkError::Decrypt(DecryptError::AuthenticationFailed) => {
                "Wrong password or key, or the secret was tampered with."
            }
            BurnlinkError::Decrypt(DecryptError::Malformed(_)) => {
                "The secret cannot be decrypted with this link."
            }
            BurnlinkError::PasswordRequired => "This secret requires a password.",
            BurnlinkError::Storage(StorageError::TooLarge { .. }) => "The file size is too large.",
            BurnlinkError::Storage(StorageError::Rejected(_)) => "The server refused this secret.",
            BurnlinkError::Storage(StorageError::NotFound) => {
                "The secret does not exist, has expired, or was already burned."
            }
            BurnlinkError::Storage(StorageError::Unavailable(_)) | BurnlinkError::Io(_) => {
                "The secret store is unreachable. Please try again."
            }
            BurnlinkError::Locator(_) => "The share link is not valid.",
            BurnlinkError::ConfigurationFatal(_)
            | BurnlinkError::Crypto(_)
            | BurnlinkError::Config(_)
            | BurnlinkError::Other(_) => "Something went wrong creating or opening the secret.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_unavailable_is_fatal() {
        let err: BurnlinkError = CryptoError::RandomUnavailable("offline".into()).into();
        assert!(matches!(err, BurnlinkError::ConfigurationFatal(_)));
    }

    #[test]
    fn test_wrong_password_distinct_from_transport() {
        let auth: BurnlinkError = DecryptError::AuthenticationFailed.into();
        let transport: BurnlinkError = StorageError::Unavailable("timeout".into()).into();

        assert_ne!(auth.user_message(), transport.user_message());
        assert!(auth.user_message().contains("Wrong password"));
    }

    #[test]
    fn test_long_file_name_is_user_correctable() {
        let err: BurnlinkError = PolicyViolation::FileNameTooLong {
            len: 5000,
            limit: 4096,
        }
        .into();
        let generic: BurnlinkError = anyhow::anyhow!("boom").into();

        assert!(err.user_message().contains("file name"));
        assert_ne!(err.user_message(), generic.user_message());
    }

    #[test]
    fn test_encoding_error_is_locator() {
        let err: BurnlinkError = CryptoError::Encoding("bad base64".into()).into();
        assert!(matches!(err, BurnlinkError::Locator(_)));
    }
}
