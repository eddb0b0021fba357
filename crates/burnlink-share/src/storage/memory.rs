//! In-process secret store

use async_trait::async_trait;
use burnlink_core::{SecretId, StorageError, ViewOutcome};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{new_id, Clock, SecretStore, StoreLimits, StoredSecret, SystemClock};
use crate::envelope::SecretEnvelope;

pub struct MemoryStore {
    secrets: Mutex<HashMap<SecretId, StoredSecret>>,
    limits: StoreLimits,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    pub fn with_clock(limits: StoreLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            secrets: Mutex::new(HashMap::new()),
            limits,
            clock,
        }
    }

    /// Number of live (not yet destroyed) secrets, expired ones included.
    pub async fn len(&self) -> usize {
        self.secrets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn sweep(&self, secrets: &mut HashMap<SecretId, StoredSecret>) -> usize {
        let now = self.clock.now();
        let before = secrets.len();
        secrets.retain(|_, stored| !stored.is_expired(now));
        before - secrets.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn create(&self, envelope: &SecretEnvelope) -> Result<SecretId, StorageError> {
        let id = new_id()?;
        let stored = StoredSecret::admit(envelope, id.clone(), &self.limits, self.clock.now())?;

        let mut secrets = self.secrets.lock().await;
        let purged = self.sweep(&mut secrets);
        if purged > 0 {
            tracing::info!(purged, "purged expired secrets");
        }
        secrets.insert(id.clone(), stored);
        tracing::info!(%id, "stored secret");
        Ok(id)
    }

    async fn fetch(
        &self,
        id: &SecretId,
        client_ip: Option<IpAddr>,
    ) -> Result<SecretEnvelope, StorageError> {
        let mut secrets = self.secrets.lock().await;
        let stored = secrets.get_mut(id).ok_or(StorageError::NotFound)?;

        match stored.serve(self.clock.now(), client_ip) {
            Ok((envelope, ViewOutcome::Destroy)) => {
                secrets.remove(id);
                tracing::info!(%id, "secret burned after reading");
                Ok(envelope)
            }
            Ok((envelope, ViewOutcome::Retain { remaining })) => {
                tracing::debug!(%id, remaining, "secret retained");
                Ok(envelope)
            }
            Err(StorageError::NotFound) => {
                secrets.remove(id);
                tracing::info!(%id, "secret expired");
                Err(StorageError::NotFound)
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "secret retrieval denied");
                Err(e)
            }
        }
    }

    async fn burn(&self, id: &SecretId) -> Result<(), StorageError> {
        if self.secrets.lock().await.remove(id).is_some() {
            tracing::info!(%id, "secret burned");
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StorageError> {
        let purged = self.sweep(&mut *self.secrets.lock().await);
        tracing::debug!(purged, "expiry sweep");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{build, SecretRequest};
    use burnlink_core::PolicyLimits;
    use burnlink_crypto::KdfParams;
    use crate::storage::testing::ManualClock;
    use rand::rngs::OsRng;

    fn envelope(request: &SecretRequest) -> SecretEnvelope {
        let kdf = KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        };
        build(request, &PolicyLimits::default(), &kdf, &mut OsRng)
            .unwrap()
            .envelope
    }

    #[tokio::test]
    async fn test_create_fetch_burns() {
        let store = MemoryStore::default();
        let id = store.create(&envelope(&SecretRequest::new("x"))).await.unwrap();

        let fetched = store.fetch(&id, None).await.unwrap();
        assert_eq!(fetched.id, Some(id.clone()));
        assert_eq!(store.fetch(&id, None).await.unwrap_err(), StorageError::NotFound);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = MemoryStore::default();
        let env = envelope(&SecretRequest::new("x"));
        let a = store.create(&env).await.unwrap();
        let b = store.create(&env).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let clock = Arc::new(ManualClock::at(10_000));
        let store = MemoryStore::with_clock(StoreLimits::default(), clock.clone());

        let mut request = SecretRequest::new("x");
        request.policy.ttl = 300;
        request.policy.prevent_burn = true;
        request.policy.max_views = 5;
        let id = store.create(&envelope(&request)).await.unwrap();

        assert!(store.fetch(&id, None).await.is_ok());
        clock.set(10_300);
        assert_eq!(store.fetch(&id, None).await.unwrap_err(), StorageError::NotFound);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unfetched_expired_secrets_are_purged() {
        let clock = Arc::new(ManualClock::at(10_000));
        let store = MemoryStore::with_clock(StoreLimits::default(), clock.clone());

        let mut short = SecretRequest::new("short lived");
        short.policy.ttl = 300;
        let expired = store.create(&envelope(&short)).await.unwrap();
        let kept = store.create(&envelope(&SecretRequest::new("default ttl"))).await.unwrap();

        clock.set(10_000 + 300);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.fetch(&expired, None).await.unwrap_err(), StorageError::NotFound);
        assert!(store.fetch(&kept, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_sweeps_expired() {
        let clock = Arc::new(ManualClock::at(0));
        let store = MemoryStore::with_clock(StoreLimits::default(), clock.clone());

        let mut short = SecretRequest::new("never fetched");
        short.policy.ttl = 300;
        store.create(&envelope(&short)).await.unwrap();

        clock.set(10_000_000);
        store.create(&envelope(&SecretRequest::new("fresh"))).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_burn_is_best_effort() {
        let store = MemoryStore::default();
        let id = store.create(&envelope(&SecretRequest::new("x"))).await.unwrap();

        store.burn(&id).await.unwrap();
        store.burn(&id).await.unwrap();
        assert_eq!(store.fetch(&id, None).await.unwrap_err(), StorageError::NotFound);
    }
}
