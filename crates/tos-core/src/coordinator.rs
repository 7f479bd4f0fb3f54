use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use tos_store::{CreateStatus, KvStore};
use tos_types::{BlobKey, Entity, EntityCodec};

use crate::error::CoreResult;

/// Result of a write. None of these is an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The key was absent and now holds the entity.
    Created,
    /// The key already holds exactly these bytes; nothing was written.
    AlreadyExists,
    /// The key is bound to different content, which was left untouched.
    Conflict,
}

impl WriteOutcome {
    /// `true` for outcomes a retrying client should treat as success.
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Created | Self::AlreadyExists)
    }
}

/// Create-if-absent with conflict detection.
///
/// Relies on the backend's atomic `create_if_absent`, so two concurrent first
/// writers for one key cannot both win. A repeat of the winning write is
/// recognised by byte equality of the encoded entity, which the codec keeps
/// deterministic.
pub struct WriteCoordinator {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl WriteCoordinator {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Bind `entity` to `key` unless the key is already bound.
    pub async fn create(&self, key: &BlobKey, entity: &Entity) -> CoreResult<WriteOutcome> {
        let encoded = EntityCodec::encode(entity)?;
        self.create_encoded(key, &encoded).await
    }

    /// Same as [`create`](Self::create) for an already encoded entity.
    pub async fn create_encoded(&self, key: &BlobKey, encoded: &[u8]) -> CoreResult<WriteOutcome> {
        let status = self
            .store
            .create_if_absent(key.as_str(), encoded, self.ttl)
            .await?;
        let outcome = match status {
            CreateStatus::Created => {
                self.announce(key).await;
                WriteOutcome::Created
            }
            CreateStatus::AlreadyPresent(existing) if existing == encoded => {
                WriteOutcome::AlreadyExists
            }
            CreateStatus::AlreadyPresent(_) => WriteOutcome::Conflict,
        };
        debug!(%key, ?outcome, size = encoded.len(), "write resolved");
        Ok(outcome)
    }

    /// Wake readers waiting on `key`. The value is already stored, so a
    /// failed publish only delays them to their next poll slice.
    async fn announce(&self, key: &BlobKey) {
        let Some(notifier) = self.store.notifier() else {
            return;
        };
        if let Err(e) = notifier.publish(key.as_str()).await {
            warn!(%key, error = %e, "failed to publish wake-up");
        }
    }
}
