//! Per-payload XChaCha20-Poly1305 encryption/decryption
//!
//! Encrypted payload format (binary):
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! AAD = "burnlink:" || slot name
//! ```
//!
//! Text, title, and file archive share one key but each gets a fresh nonce.
//! The AAD binds each ciphertext to its slot so an envelope's payloads cannot
//! be swapped with one another.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use zeroize::Zeroizing;

use crate::error::{CryptoError, DecryptError};
use crate::keys::FullKey;
use crate::random::SecureRandomSource;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Which envelope slot a payload occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Title,
    Files,
}

impl PayloadKind {
    fn aad(self) -> &'static [u8] {
        match self {
            PayloadKind::Text => b"burnlink:text",
            PayloadKind::Title => b"burnlink:title",
            PayloadKind::Files => b"burnlink:files",
        }
    }
}

/// Encrypt one payload.
///
/// Returns: `[24-byte nonce][ciphertext][16-byte tag]`. Empty plaintext still
/// yields nonce + tag.
pub fn encrypt_payload<R: SecureRandomSource + ?Sized>(
    key: &FullKey,
    kind: PayloadKind,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let payload_key = key.payload_key()?;
    let cipher = XChaCha20Poly1305::new(payload_key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rng.try_fill(&mut nonce_bytes)?;
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: kind.aad(),
            },
        )
        .map_err(|e| CryptoError::Encrypt(format!("{kind:?} payload: {e}")))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    tracing::debug!(?kind, bytes = plaintext.len(), "encrypted payload");
    Ok(result)
}

/// Decrypt one payload.
///
/// - `Malformed` when the input cannot hold a nonce and a tag
/// - `AuthenticationFailed` for a wrong key, a tampered byte, or a payload
///   taken from a different slot
pub fn decrypt_payload(
    key: &FullKey,
    kind: PayloadKind,
    encrypted: &[u8],
) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
    if encrypted.len() < NONCE_SIZE + TAG_SIZE {
        return Err(DecryptError::Malformed(format!(
            "{kind:?} payload too short: {} bytes (minimum {})",
            encrypted.len(),
            NONCE_SIZE + TAG_SIZE
        )));
    }

    let payload_key = key
        .payload_key()
        .map_err(|e| DecryptError::Malformed(e.to_string()))?;
    let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(payload_key.as_bytes().into());

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: kind.aad(),
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| DecryptError::AuthenticationFailed)
}
