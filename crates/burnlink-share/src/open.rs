//! Recipient side: share locator + optional password → plaintext

use burnlink_core::{BurnlinkError, BurnlinkResult};
use burnlink_crypto::{
    decrypt_payload, derive_from_password, DecryptError, FullKey, PayloadKind, PublicComponent,
    Salt, SALT_SIZE,
};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::bundle::{unbundle, BundledFile};
use crate::envelope::{KdfHeader, SecretEnvelope, BUNDLE_CONTENT_TYPE};
use crate::locator::ShareLocator;

/// Decrypted contents of a secret. Zeroized on drop.
pub struct OpenedSecret {
    pub text: Zeroizing<String>,
    pub title: Zeroizing<String>,
    pub files: Vec<BundledFile>,
}

impl std::fmt::Debug for OpenedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedSecret")
            .field("text", &"[REDACTED]")
            .field("title", &"[REDACTED]")
            .field("files", &self.files)
            .finish()
    }
}

/// Decrypt `envelope` with the key material from `locator` and `password`.
///
/// - link key present: used directly, combined with the password if the
///   secret is protected
/// - link key absent, secret protected: the key is re-derived from the
///   password and the envelope's KDF header
/// - link key absent, secret not protected: nothing can open it (`Malformed`)
pub fn open(
    envelope: &SecretEnvelope,
    locator: &ShareLocator,
    password: Option<&SecretString>,
) -> BurnlinkResult<OpenedSecret> {
    let protected = envelope.policy.password_protected;
    let password = password.filter(|p| !p.expose_secret().is_empty());

    if protected && password.is_none() {
        return Err(BurnlinkError::PasswordRequired);
    }

    let public = match (&locator.public_component, password) {
        (Some(public), _) => public.clone(),
        (None, Some(password)) if protected => rederive(envelope.kdf.as_ref(), password)?,
        _ => {
            return Err(DecryptError::Malformed("share link carries no key material".into()).into())
        }
    };

    let full_key = FullKey::compose(&public, password.filter(|_| protected));
    let result = decrypt_all(envelope, &full_key);

    match &result {
        Ok(opened) => tracing::info!(id = ?envelope.id, files = opened.files.len(), "opened secret"),
        Err(e) => tracing::warn!(id = ?envelope.id, error = %e, "failed to open secret"),
    }
    result
}

fn rederive(header: Option<&KdfHeader>, password: &SecretString) -> BurnlinkResult<PublicComponent> {
    let header = header
        .ok_or_else(|| DecryptError::Malformed("protected secret has no KDF header".into()))?;

    let salt: Salt = header.salt.as_slice().try_into().map_err(|_| {
        DecryptError::Malformed(format!(
            "KDF salt has {} bytes (expected {SALT_SIZE})",
            header.salt.len()
        ))
    })?;

    // The header comes from the server; bound its cost before Argon2id runs.
    header
        .params
        .check_limits()
        .map_err(|e| DecryptError::Malformed(e.to_string()))?;

    derive_from_password(password, &salt, &header.params)
        .map_err(|e| DecryptError::Malformed(e.to_string()).into())
}

fn decrypt_all(envelope: &SecretEnvelope, key: &FullKey) -> BurnlinkResult<OpenedSecret> {
    let text = decrypt_text(key, PayloadKind::Text, &envelope.text)?;
    let title = decrypt_text(key, PayloadKind::Title, &envelope.title)?;

    let mut files = Vec::new();
    for attachment in &envelope.files {
        if attachment.content_type != BUNDLE_CONTENT_TYPE {
            return Err(DecryptError::Malformed(format!(
                "unsupported attachment type {:?}",
                attachment.content_type
            ))
            .into());
        }
        let archive = decrypt_payload(key, PayloadKind::Files, &attachment.content)?;
        let unpacked =
            unbundle(&archive).map_err(|e| DecryptError::Malformed(format!("file bundle: {e}")))?;
        files.extend(unpacked);
    }

    Ok(OpenedSecret { text, title, files })
}

fn decrypt_text(
    key: &FullKey,
    kind: PayloadKind,
    encrypted: &[u8],
) -> Result<Zeroizing<String>, DecryptError> {
    let bytes = decrypt_payload(key, kind, encrypted)?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|_| DecryptError::Malformed(format!("{kind:?} is not UTF-8")))?;
    Ok(Zeroizing::new(text.to_owned()))
}
