//! Secret envelope assembly
//!
//! An envelope is what the storage collaborator persists: three ciphertext
//! slots plus the plaintext policy the server needs to enforce the secret's
//! lifecycle. Wire shape (JSON, camelCase):
//!
//! ```text
//! { "text": b64, "title": b64, "files": [{ "type", "ext", "content": b64 }],
//!   "ttl", "maxViews", "preventBurn", "allowedIp"?, "passwordProtected",
//!   "kdf"?: { "salt": b64, "memCostKib", "timeCost", "parallelism" } }
//! ```
//!
//! The password itself never enters the envelope.

use burnlink_core::{
    BurnlinkError, BurnlinkResult, Creator, PolicyLimits, PolicyViolation, SecretId, SecretPolicy,
};
use burnlink_crypto::{
    derive_key, encrypt_payload, generate_salt, FullKey, KdfParams, PayloadKind, PublicComponent,
    SecureRandomSource,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::bundle::{bundle, BundleError, BundledFile, MAX_NAME_LEN};

/// Content type of the encrypted archive produced by [`bundle`]
pub const BUNDLE_CONTENT_TYPE: &str = "application/x-burnlink-bundle";
pub const BUNDLE_EXT: &str = ".blb";

/// Everything the creator typed or picked.
pub struct SecretRequest {
    pub text: SecretString,
    pub title: SecretString,
    pub files: Vec<BundledFile>,
    pub policy: SecretPolicy,
    pub password: Option<SecretString>,
    pub creator: Creator,
}

impl SecretRequest {
    /// A request with the given body text and default policy.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: SecretString::from(text.into()),
            title: SecretString::from(String::new()),
            files: Vec::new(),
            policy: SecretPolicy::default(),
            password: None,
            creator: Creator::Anonymous,
        }
    }

    fn effective_password(&self) -> Option<&SecretString> {
        self.password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty())
    }
}

/// An encrypted attachment slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    #[serde(rename = "type")]
    pub content_type: String,
    pub ext: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
}

/// Parameters a recipient needs to re-derive the public component from the
/// password when the link carries no key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfHeader {
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    #[serde(flatten)]
    pub params: KdfParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretEnvelope {
    /// Assigned by the storage collaborator; `None` until then
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SecretId>,
    #[serde(with = "base64_bytes")]
    pub text: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub title: Vec<u8>,
    #[serde(default)]
    pub files: Vec<FileAttachment>,
    #[serde(flatten)]
    pub policy: SecretPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf: Option<KdfHeader>,
}

impl SecretEnvelope {
    pub fn with_id(mut self, id: SecretId) -> Self {
        self.id = Some(id);
        self
    }

    /// Serialized size in bytes, as a storage collaborator would see it.
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

/// A freshly built envelope and the key half destined for the link fragment.
#[derive(Debug)]
pub struct SealedSecret {
    pub envelope: SecretEnvelope,
    pub public_component: PublicComponent,
}

/// Validate, derive keys, and encrypt a request into an envelope.
///
/// Policy is checked and files are bundled before any randomness is drawn.
/// Nothing here touches the network or storage, and `request` is only
/// borrowed, so a failed storage call can simply be retried with the same
/// request.
pub fn build<R: SecureRandomSource + ?Sized>(
    request: &SecretRequest,
    limits: &PolicyLimits,
    kdf: &KdfParams,
    rng: &mut R,
) -> BurnlinkResult<SealedSecret> {
    if request.text.expose_secret().is_empty() {
        return Err(PolicyViolation::EmptyText.into());
    }

    let password = request.effective_password();
    let mut policy = request.policy.clone();
    policy.password_protected = password.is_some();

    if let Err(violation) = limits.validate(&policy, request.creator) {
        tracing::warn!(%violation, creator = %request.creator, "rejected secret policy");
        return Err(BurnlinkError::Policy(violation));
    }

    let archive = bundle(&request.files).map_err(|e| match e {
        BundleError::NameTooLong(len) => BurnlinkError::Policy(PolicyViolation::FileNameTooLong {
            len,
            limit: MAX_NAME_LEN,
        }),
        other => BurnlinkError::Other(other.into()),
    })?;

    let salt = generate_salt(rng)?;
    let public_component = derive_key(password, &salt, kdf, rng)?;
    let full_key = FullKey::compose(&public_component, password);

    let text = encrypt_payload(
        &full_key,
        PayloadKind::Text,
        request.text.expose_secret().as_bytes(),
        rng,
    )?;
    let title = encrypt_payload(
        &full_key,
        PayloadKind::Title,
        request.title.expose_secret().as_bytes(),
        rng,
    )?;

    let mut files = Vec::new();
    if let Some(archive) = archive {
        files.push(FileAttachment {
            content_type: BUNDLE_CONTENT_TYPE.to_string(),
            ext: BUNDLE_EXT.to_string(),
            content: encrypt_payload(&full_key, PayloadKind::Files, &archive, rng)?,
        });
    }

    let kdf = password.map(|_| KdfHeader {
        salt: salt.to_vec(),
        params: *kdf,
    });

    tracing::info!(
        ttl = policy.ttl,
        max_views = policy.max_views,
        prevent_burn = policy.prevent_burn,
        password_protected = policy.password_protected,
        files = request.files.len(),
        "sealed secret"
    );

    Ok(SealedSecret {
        envelope: SecretEnvelope {
            id: None,
            text,
            title,
            files,
            policy,
            kdf,
        },
        public_component,
    })
}

/// Standard base64 for byte fields.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map_err(|e| serde::de::Error::custom(format!("base64 decode: {e}")))
    }
}
