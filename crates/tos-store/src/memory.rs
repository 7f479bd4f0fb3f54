use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::notify::{Notifier, Subscription, Wake};
use crate::traits::{CreateStatus, KvStore};

/// Capacity of each per-key wake-up channel. Wake-ups carry no data, so a
/// lagging receiver loses nothing it needs.
const WAKE_CHANNEL_CAPACITY: usize = 16;

struct Slot {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Slot {
    /// Expiry `ttl` from `now`, saturating far in the future instead of
    /// overflowing the clock.
    fn expiry(now: Instant, ttl: Duration) -> Instant {
        now.checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 24 * 60 * 60))
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process key-value store with per-entry expiry.
///
/// The map is owned exclusively by the store and guarded by one `RwLock`;
/// `create_if_absent` runs its check and insert inside a single write-lock
/// critical section. Expired entries read as absent immediately and are
/// reclaimed by [`purge_expired`](Self::purge_expired), either on demand or
/// from the task started by [`spawn_sweeper`](Self::spawn_sweeper).
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Slot>>,
    notifier: Option<MemoryNotifier>,
}

impl MemoryKvStore {
    /// Create an empty store with an in-process notifier.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            notifier: Some(MemoryNotifier::new()),
        }
    }

    /// Create an empty store without pub/sub; readers will poll.
    pub fn polling() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            notifier: None,
        }
    }

    /// Number of entries held, expired-but-unswept ones included.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Number of keys with at least one live subscription.
    pub fn subscribed_keys(&self) -> usize {
        self.notifier
            .as_ref()
            .map_or(0, MemoryNotifier::subscribed_keys)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.entries.write().expect("lock poisoned");
        let before = map.len();
        map.retain(|_, slot| slot.is_live(now));
        before - map.len()
    }

    /// Purge expired entries every `every` until the returned task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.purge_expired();
                if removed > 0 {
                    debug!(removed, "swept expired entries");
                }
            }
        })
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let map = self.entries.read().expect("lock poisoned");
        Ok(map
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        if value.is_empty() {
            return Err(StoreError::EmptyValue(key.to_string()));
        }
        let slot = Slot {
            value: value.to_vec(),
            expires_at: Slot::expiry(Instant::now(), ttl),
        };
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), slot);
        Ok(())
    }

    async fn create_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> StoreResult<CreateStatus> {
        if value.is_empty() {
            return Err(StoreError::EmptyValue(key.to_string()));
        }
        let now = Instant::now();
        let mut map = self.entries.write().expect("lock poisoned");
        if let Some(slot) = map.get(key).filter(|slot| slot.is_live(now)) {
            return Ok(CreateStatus::AlreadyPresent(slot.value.clone()));
        }
        map.insert(
            key.to_string(),
            Slot {
                value: value.to_vec(),
                expires_at: Slot::expiry(now, ttl),
            },
        );
        Ok(CreateStatus::Created)
    }

    fn notifier(&self) -> Option<&dyn Notifier> {
        self.notifier.as_ref().map(|n| n as &dyn Notifier)
    }
}

impl std::fmt::Debug for MemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKvStore")
            .field("entry_count", &self.len())
            .field("notify", &self.notifier.is_some())
            .finish()
    }
}

type WakeChannels = Arc<Mutex<HashMap<String, broadcast::Sender<()>>>>;

/// In-process notifier: one broadcast channel per subscribed key.
///
/// A key's channel exists only while somebody is subscribed to it. Publishing
/// to a key nobody waits on is a no-op.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    channels: WakeChannels,
}

impl MemoryNotifier {
    /// Create a notifier with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that currently have at least one subscriber.
    pub fn subscribed_keys(&self) -> usize {
        self.channels.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish(&self, key: &str) -> StoreResult<()> {
        let channels = self.channels.lock().expect("lock poisoned");
        if let Some(tx) = channels.get(key) {
            // Err only means every receiver is gone; nothing to wake.
            let _ = tx.send(());
        }
        Ok(())
    }

    async fn subscribe(&self, key: &str) -> StoreResult<Box<dyn Subscription>> {
        let rx = self
            .channels
            .lock()
            .expect("lock poisoned")
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(WAKE_CHANNEL_CAPACITY).0)
            .subscribe();
        Ok(Box::new(MemorySubscription {
            key: key.to_string(),
            rx,
            channels: Arc::clone(&self.channels),
        }))
    }
}

struct MemorySubscription {
    key: String,
    rx: broadcast::Receiver<()>,
    channels: WakeChannels,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn wait(&mut self, timeout: Duration) -> StoreResult<Wake> {
        let deadline = Instant::now() + timeout;
        match tokio::time::timeout_at(deadline, self.rx.recv()).await {
            Ok(Ok(())) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => Ok(Wake::Notified),
            Ok(Err(broadcast::error::RecvError::Closed)) => {
                // Cannot happen while the registry holds the sender; behave
                // like a poll tick rather than spin.
                tokio::time::sleep_until(deadline).await;
                Ok(Wake::TimedOut)
            }
            Err(_) => Ok(Wake::TimedOut),
        }
    }
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        let Ok(mut channels) = self.channels.lock() else {
            return;
        };
        // `self.rx` is still alive here, so the last subscriber sees 1.
        if channels
            .get(&self.key)
            .is_some_and(|tx| tx.receiver_count() <= 1)
        {
            channels.remove(&self.key);
        }
    }
}
