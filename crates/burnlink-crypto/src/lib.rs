//! burnlink-crypto: client-side encryption for one-time secrets
//!
//! Everything a secret carries is encrypted here before it leaves the client.
//!
//! Key layout:
//! ```text
//! PublicComponent (256-bit)
//!   ├── random, when no password is set
//!   └── Argon2id(password, per-secret salt), when a password is set
//!
//! FullKey = PublicComponent || password bytes
//!   └── Payload key = HKDF-SHA256(FullKey, info="burnlink-payload-v1")
//!       └── Payload AEAD: XChaCha20-Poly1305 (nonce=random_192bit, AAD=slot tag)
//! ```
//!
//! The public component travels in the share link fragment. The password
//! travels out of band. Neither is ever sent to the storage server.

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod password;
pub mod random;

pub use cipher::{decrypt_payload, encrypt_payload, PayloadKind};
pub use error::{CryptoError, DecryptError};
pub use kdf::{
    derive_key, derive_from_password, generate_salt, KdfParams, PublicComponent, Salt,
    MAX_KDF_MEM_KIB, MAX_KDF_PARALLELISM, MAX_KDF_TIME_COST,
};
pub use keys::{FullKey, PayloadKey};
pub use password::{generate_password, PasswordRules};
pub use random::SecureRandomSource;

/// Size of a public component and of the derived payload key (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of the Argon2id salt carried in the envelope
pub const SALT_SIZE: usize = 16;
