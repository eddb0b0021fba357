//! burnlink-share: sealing, sharing, and opening one-time secrets
//!
//! ```text
//! SecretRequest ──build──▶ SecretEnvelope ──SecretStore::create──▶ SecretId
//!                               │                                     │
//!                        PublicComponent ──────ShareLinkCodec────────▶ share link
//!
//! share link ──decode──▶ ShareLocator ──SecretStore::fetch──▶ SecretEnvelope
//!                                      ──open(+ password)───▶ OpenedSecret
//! ```

pub mod bundle;
pub mod envelope;
pub mod locator;
pub mod open;
pub mod storage;

pub use bundle::{bundle, unbundle, BundleError, BundledFile};
pub use envelope::{build, FileAttachment, KdfHeader, SealedSecret, SecretEnvelope, SecretRequest};
pub use locator::{ShareLinkCodec, ShareLocator};
pub use open::{open, OpenedSecret};
pub use storage::{Clock, DirStore, MemoryStore, SecretStore, StoreLimits, SystemClock};

use burnlink_core::{BurnlinkResult, PolicyLimits, SecretId};
use burnlink_crypto::{KdfParams, PublicComponent, SecureRandomSource};
use secrecy::SecretString;
use std::net::IpAddr;
use url::Url;

/// A stored secret and the two links that lead to it.
#[derive(Debug)]
pub struct CreatedSecret {
    pub id: SecretId,
    /// Link with the public component in the fragment
    pub full_link: Url,
    /// Link without key material, for sharing alongside a password
    pub bare_link: Url,
    pub public_component: PublicComponent,
}

/// Seal `request` and hand the envelope to `store`.
///
/// Storage failures leave `request` untouched, so the caller can retry.
pub async fn create_secret<R: SecureRandomSource + ?Sized>(
    store: &dyn SecretStore,
    codec: &ShareLinkCodec,
    request: &SecretRequest,
    limits: &PolicyLimits,
    kdf: &KdfParams,
    rng: &mut R,
) -> BurnlinkResult<CreatedSecret> {
    let sealed = build(request, limits, kdf, rng)?;
    let id = store.create(&sealed.envelope).await.map_err(|e| {
        tracing::warn!(error = %e, "storage refused secret");
        e
    })?;

    Ok(CreatedSecret {
        full_link: codec.encode_full(&id, &sealed.public_component),
        bare_link: codec.encode_bare(&id),
        id,
        public_component: sealed.public_component,
    })
}

/// Fetch the envelope behind `locator` and decrypt it.
///
/// The fetch counts as a view even if decryption then fails. Callers that
/// want to prompt for a password and retry should call [`SecretStore::fetch`]
/// once and [`open()`] as many times as needed.
pub async fn retrieve(
    store: &dyn SecretStore,
    locator: &ShareLocator,
    password: Option<&SecretString>,
    client_ip: Option<IpAddr>,
) -> BurnlinkResult<OpenedSecret> {
    let envelope = store.fetch(&locator.id, client_ip).await?;
    open(&envelope, locator, password)
}
