use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::notify::Notifier;

/// Result of an atomic create-if-absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateStatus {
    /// The value was stored; the key was absent before.
    Created,
    /// The key already held a value, returned unchanged. Nothing was written.
    AlreadyPresent(Vec<u8>),
}

/// Capability interface of a key-value backend.
///
/// All implementations must satisfy these invariants:
/// - `get` returns `Ok(None)` for a missing or expired key and never
///   `Ok(Some(vec![]))`.
/// - `create_if_absent` is atomic: two concurrent calls for the same absent
///   key yield exactly one `Created`.
/// - Values are opaque; the store never interprets them.
/// - All I/O errors are propagated, never reported as absence.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Short name of the backend, for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key` unconditionally, expiring after `ttl`.
    ///
    /// Overwrites any existing value. The write-once path does not use this;
    /// it exists for tooling and tests.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Store `value` under `key` only if the key is absent.
    async fn create_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> StoreResult<CreateStatus>;

    /// The pub/sub extension, if this backend supports it.
    ///
    /// Readers fall back to polling when this returns `None`.
    fn notifier(&self) -> Option<&dyn Notifier> {
        None
    }
}
