//! Full key assembly and payload key derivation

use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;
use crate::kdf::PublicComponent;
use crate::KEY_SIZE;

const PAYLOAD_INFO: &[u8] = b"burnlink-payload-v1";

/// `PublicComponent || password bytes`. Zeroized on drop.
///
/// When no password is set the password half is empty and the full key is
/// the public component alone.
pub struct FullKey {
    bytes: Zeroizing<Vec<u8>>,
    password_len: usize,
}

impl FullKey {
    /// Concatenate the two halves. Empty passwords count as absent.
    pub fn compose(public: &PublicComponent, password: Option<&SecretString>) -> Self {
        let password = password
            .map(|p| p.expose_secret().as_bytes())
            .unwrap_or_default();

        let mut bytes = Zeroizing::new(Vec::with_capacity(KEY_SIZE + password.len()));
        bytes.extend_from_slice(public.as_bytes());
        bytes.extend_from_slice(password);

        Self {
            bytes,
            password_len: password.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether a password half is present.
    pub fn has_password(&self) -> bool {
        self.password_len > 0
    }

    /// Derive the AEAD key via HKDF-SHA256.
    pub fn payload_key(&self) -> Result<PayloadKey, CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(None, &self.bytes);
        let mut okm = [0u8; KEY_SIZE];
        hkdf.expand(PAYLOAD_INFO, &mut okm)
            .map_err(|e| CryptoError::Kdf(format!("HKDF expand failed: {e}")))?;
        Ok(PayloadKey { bytes: okm })
    }
}

impl std::fmt::Debug for FullKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullKey")
            .field("bytes", &"[REDACTED]")
            .field("has_password", &self.has_password())
            .finish()
    }
}

/// The 256-bit XChaCha20-Poly1305 key. Zeroized on drop.
pub struct PayloadKey {
    bytes: [u8; KEY_SIZE],
}

impl PayloadKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for PayloadKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for PayloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public() -> PublicComponent {
        PublicComponent::from_bytes([42u8; KEY_SIZE])
    }

    #[test]
    fn test_compose_without_password() {
        let key = FullKey::compose(&public(), None);
        assert_eq!(key.as_bytes(), &[42u8; KEY_SIZE][..]);
        assert!(!key.has_password());
    }

    #[test]
    fn test_compose_order_is_public_then_password() {
        let password = SecretString::from("hunter2");
        let key = FullKey::compose(&public(), Some(&password));

        assert_eq!(&key.as_bytes()[..KEY_SIZE], &[42u8; KEY_SIZE][..]);
        assert_eq!(&key.as_bytes()[KEY_SIZE..], b"hunter2");
        assert!(key.has_password());
    }

    #[test]
    fn test_empty_password_is_absent() {
        let empty = SecretString::from("");
        let key = FullKey::compose(&public(), Some(&empty));
        assert!(!key.has_password());
        assert_eq!(key.as_bytes().len(), KEY_SIZE);
    }

    #[test]
    fn test_payload_key_depends_on_password() {
        let a = FullKey::compose(&public(), Some(&SecretString::from("a")));
        let b = FullKey::compose(&public(), Some(&SecretString::from("b")));

        assert_ne!(
            a.payload_key().unwrap().as_bytes(),
            b.payload_key().unwrap().as_bytes()
        );
    }

    #[test]
    fn test_payload_key_deterministic() {
        let k1 = FullKey::compose(&public(), None).payload_key().unwrap();
        let k2 = FullKey::compose(&public(), None).payload_key().unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }
}
