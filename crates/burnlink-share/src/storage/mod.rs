//! Storage collaborator boundary
//!
//! `SecretStore` is the interface the client core needs from whatever
//! persists envelopes. The reference stores here enforce the same policy the
//! client validated: size cap, TTL and view allow-lists, IP restriction, and
//! burn-after-reading versus capped views.

pub mod dir;
pub mod memory;

use async_trait::async_trait;
use burnlink_core::{Creator, PolicyLimits, SecretId, StorageError, ViewOutcome};
use burnlink_crypto::{NONCE_SIZE, TAG_SIZE};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::envelope::SecretEnvelope;

pub use dir::DirStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Persist an envelope and return the id the store assigned.
    async fn create(&self, envelope: &SecretEnvelope) -> Result<SecretId, StorageError>;

    /// Retrieve an envelope on behalf of `client_ip`. Counts as a view.
    async fn fetch(
        &self,
        id: &SecretId,
        client_ip: Option<IpAddr>,
    ) -> Result<SecretEnvelope, StorageError>;

    /// Destroy a secret immediately. Unknown ids are not an error.
    async fn burn(&self, id: &SecretId) -> Result<(), StorageError>;

    /// Destroy every secret whose TTL has elapsed, fetched or not.
    /// Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, StorageError>;
}

/// Source of "now" in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Server-side admission rules.
#[derive(Debug, Clone)]
pub struct StoreLimits {
    pub policy: PolicyLimits,
    pub max_envelope_bytes: usize,
    /// The session the store is serving; gates the extended TTLs
    pub creator: Creator,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            policy: PolicyLimits::default(),
            max_envelope_bytes: 10 * 1024 * 1024,
            creator: Creator::Anonymous,
        }
    }
}

/// A persisted envelope plus its lifecycle bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSecret {
    pub envelope: SecretEnvelope,
    /// Unix seconds
    pub created_at: u64,
    pub views: u32,
}

impl StoredSecret {
    /// Check an incoming envelope and stamp it with `id`.
    pub fn admit(
        envelope: &SecretEnvelope,
        id: SecretId,
        limits: &StoreLimits,
        now: u64,
    ) -> Result<Self, StorageError> {
        let size = envelope.encoded_len();
        if size > limits.max_envelope_bytes {
            return Err(StorageError::TooLarge {
                size,
                limit: limits.max_envelope_bytes,
            });
        }

        limits
            .policy
            .validate(&envelope.policy, limits.creator)
            .map_err(|v| StorageError::Rejected(v.to_string()))?;

        let min = NONCE_SIZE + TAG_SIZE;
        if envelope.text.len() < min || envelope.title.len() < min {
            return Err(StorageError::Rejected("text and title must be encrypted".into()));
        }
        if envelope.policy.password_protected != envelope.kdf.is_some() {
            return Err(StorageError::Rejected(
                "password-protected secrets must carry a KDF header".into(),
            ));
        }

        Ok(Self {
            envelope: envelope.clone().with_id(id),
            created_at: now,
            views: 0,
        })
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.envelope.policy.is_expired(self.created_at, now)
    }

    /// Serve one retrieval. The caller must destroy the record on
    /// `ViewOutcome::Destroy` and on `Err(StorageError::NotFound)`.
    pub fn serve(
        &mut self,
        now: u64,
        client_ip: Option<IpAddr>,
    ) -> Result<(SecretEnvelope, ViewOutcome), StorageError> {
        if self.is_expired(now) {
            return Err(StorageError::NotFound);
        }
        if !self.envelope.policy.allows_ip(client_ip) {
            return Err(StorageError::Rejected("client IP is not allowed".into()));
        }

        self.views = self.views.saturating_add(1);
        let outcome = self.envelope.policy.after_view(self.views);
        Ok((self.envelope.clone(), outcome))
    }
}

pub(crate) fn new_id() -> Result<SecretId, StorageError> {
    SecretId::parse(&uuid::Uuid::new_v4().to_string())
        .map_err(|e| StorageError::Unavailable(e.to_string()))
}
