use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{ErrorKind, RedisError};
use tos_store::{
    CreateStatus, KvStore, MemoryKvStore, MemoryNotifier, Notifier, StoreError, StoreResult,
    Subscription,
};

pub(crate) fn io_error() -> StoreError {
    StoreError::Redis(RedisError::from((ErrorKind::IoError, "connection refused")))
}

/// Wraps a polling memory store; every operation after the first
/// `healthy_ops` fails with an I/O error.
pub(crate) struct FlakyStore {
    inner: MemoryKvStore,
    healthy_ops: usize,
    ops: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new(healthy_ops: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKvStore::polling(),
            healthy_ops,
            ops: AtomicUsize::new(0),
        })
    }

    pub(crate) fn ops(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    fn tick(&self) -> StoreResult<()> {
        if self.ops.fetch_add(1, Ordering::SeqCst) >= self.healthy_ops {
            return Err(io_error());
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.tick()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        self.tick()?;
        self.inner.set(key, value, ttl).await
    }

    async fn create_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> StoreResult<CreateStatus> {
        self.tick()?;
        self.inner.create_if_absent(key, value, ttl).await
    }
}

/// Memory store whose notifier takes `delay` to hand out a subscription,
/// like a pub/sub connect to an unresponsive server.
pub(crate) struct StalledNotifierStore {
    inner: MemoryKvStore,
    notifier: StalledNotifier,
}

struct StalledNotifier {
    inner: MemoryNotifier,
    delay: Duration,
}

impl StalledNotifierStore {
    pub(crate) fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKvStore::polling(),
            notifier: StalledNotifier {
                inner: MemoryNotifier::new(),
                delay,
            },
        })
    }
}

#[async_trait]
impl Notifier for StalledNotifier {
    async fn publish(&self, key: &str) -> StoreResult<()> {
        self.inner.publish(key).await
    }

    async fn subscribe(&self, key: &str) -> StoreResult<Box<dyn Subscription>> {
        tokio::time::sleep(self.delay).await;
        self.inner.subscribe(key).await
    }
}

#[async_trait]
impl KvStore for StalledNotifierStore {
    fn backend_name(&self) -> &'static str {
        "stalled"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn create_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> StoreResult<CreateStatus> {
        self.inner.create_if_absent(key, value, ttl).await
    }

    fn notifier(&self) -> Option<&dyn Notifier> {
        Some(&self.notifier)
    }
}
