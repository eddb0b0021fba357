//! Directory-backed secret store: one JSON record per secret
//!
//! Records are written atomically (temp file + rename). Operations are
//! serialized within a process; concurrent processes sharing a directory are
//! not coordinated.

use async_trait::async_trait;
use burnlink_core::{SecretId, StorageError, ViewOutcome};
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{new_id, Clock, SecretStore, StoreLimits, StoredSecret, SystemClock};
use crate::envelope::SecretEnvelope;

pub struct DirStore {
    dir: PathBuf,
    limits: StoreLimits,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>, limits: StoreLimits) -> Self {
        Self::with_clock(dir, limits, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, limits: StoreLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            limits,
            clock,
            lock: Mutex::new(()),
        }
    }

    fn record_path(&self, id: &SecretId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, id: &SecretId) -> Result<StoredSecret, StorageError> {
        let path = self.record_path(id);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound),
            Err(e) => return Err(unavailable(&path, e)),
        };
        serde_json::from_slice(&content).map_err(|e| {
            StorageError::Unavailable(format!("corrupt record {}: {e}", path.display()))
        })
    }

    async fn write(&self, id: &SecretId, stored: &StoredSecret) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| unavailable(&self.dir, e))?;

        let json = serde_json::to_vec(stored)
            .map_err(|e| StorageError::Unavailable(format!("serializing record: {e}")))?;

        // Atomic write: write to temp file, then rename
        let path = self.record_path(id);
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| unavailable(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| unavailable(&path, e))
    }

    async fn remove(&self, id: &SecretId) -> Result<bool, StorageError> {
        let path = self.record_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(unavailable(&path, e)),
        }
    }

    /// Remove expired records. The caller holds `lock`.
    ///
    /// Unreadable records are left for `fetch` to report.
    async fn sweep(&self) -> Result<usize, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(unavailable(&self.dir, e)),
        };

        let now = self.clock.now();
        let mut purged = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| SecretId::parse(s).ok())
            else {
                continue;
            };

            match self.read(&id).await {
                Ok(stored) if stored.is_expired(now) => {
                    if self.remove(&id).await? {
                        purged += 1;
                    }
                }
                Ok(_) | Err(StorageError::NotFound) => {}
                Err(e) => tracing::warn!(%id, error = %e, "skipping unreadable record"),
            }
        }
        Ok(purged)
    }
}

fn unavailable(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Unavailable(format!("{}: {e}", path.display()))
}

#[async_trait]
impl SecretStore for DirStore {
    async fn create(&self, envelope: &SecretEnvelope) -> Result<SecretId, StorageError> {
        let _guard = self.lock.lock().await;
        let id = new_id()?;
        let stored = StoredSecret::admit(envelope, id.clone(), &self.limits, self.clock.now())?;

        match self.sweep().await {
            Ok(0) => {}
            Ok(purged) => tracing::info!(purged, "purged expired secrets"),
            Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
        }
        self.write(&id, &stored).await?;
        tracing::info!(%id, dir = %self.dir.display(), "stored secret");
        Ok(id)
    }

    async fn fetch(
        &self,
        id: &SecretId,
        client_ip: Option<IpAddr>,
    ) -> Result<SecretEnvelope, StorageError> {
        let _guard = self.lock.lock().await;
        let mut stored = self.read(id).await?;

        match stored.serve(self.clock.now(), client_ip) {
            Ok((envelope, ViewOutcome::Destroy)) => {
                self.remove(id).await?;
                tracing::info!(%id, "secret burned after reading");
                Ok(envelope)
            }
            Ok((envelope, ViewOutcome::Retain { remaining })) => {
                self.write(id, &stored).await?;
                tracing::debug!(%id, remaining, "secret retained");
                Ok(envelope)
            }
            Err(StorageError::NotFound) => {
                self.remove(id).await?;
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
        let _guard = self.lock.lock().await;
        if self.remove(id).await? {
            tracing::info!(%id, "secret burned");
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StorageError> {
        let _guard = self.lock.lock().await;
        let purged = self.sweep().await?;
        tracing::debug!(purged, dir = %self.dir.display(), "expiry sweep");
        Ok(purged)
    }
}
