use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tos_store::KvStore;
use tos_types::{BlobKey, Entity, EntityCodec};

use crate::config::CoreConfig;
use crate::coordinator::{WriteCoordinator, WriteOutcome};
use crate::error::CoreResult;
use crate::reader::{BoundedWaitReader, Lookup};

/// Entity-level front of the write and read paths.
pub struct BlobService {
    backend: &'static str,
    writer: WriteCoordinator,
    reader: BoundedWaitReader,
}

impl BlobService {
    /// Build the service over `store`, rejecting an invalid `config`.
    pub fn new(store: Arc<dyn KvStore>, config: CoreConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            backend: store.backend_name(),
            writer: WriteCoordinator::new(Arc::clone(&store), config.entry_ttl),
            reader: BoundedWaitReader::new(store, config.wait),
        })
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    /// Store `entity` under `key` unless the key is already bound.
    pub async fn put(&self, key: &BlobKey, entity: &Entity) -> CoreResult<WriteOutcome> {
        self.writer.create(key, entity).await
    }

    /// Fetch the entity under `key`, optionally waiting for it to appear.
    pub async fn get(&self, key: &BlobKey, wait: bool) -> CoreResult<Option<Entity>> {
        self.get_cancellable(key, wait, &CancellationToken::new())
            .await
    }

    /// Like [`get`](Self::get), aborted when `cancel` fires.
    pub async fn get_cancellable(
        &self,
        key: &BlobKey,
        wait: bool,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<Entity>> {
        match self.reader.read_cancellable(key, wait, cancel).await? {
            Lookup::Present(bytes) => Ok(Some(EntityCodec::decode(&bytes)?)),
            Lookup::Absent => Ok(None),
        }
    }
}
