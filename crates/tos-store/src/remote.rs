use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::notify::{Notifier, Subscription, Wake};
use crate::traits::{CreateStatus, KvStore};

/// Prefix of the pub/sub channel a key's wake-ups travel on.
pub const CHANNEL_PREFIX: &str = "tos:ready:";

/// How many `SET NX` / `GET` rounds a create may take when the existing value
/// expires between the two commands.
const CREATE_ATTEMPTS: usize = 3;

/// Pub/sub channel name for a key.
pub fn channel_for(key: &str) -> String {
    format!("{CHANNEL_PREFIX}{key}")
}

/// Redis expresses expiry in whole milliseconds and rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Key-value store backed by a Redis-compatible server.
///
/// Commands share one auto-reconnecting [`ConnectionManager`]. Each waiter
/// gets its own pub/sub connection from [`RedisNotifier::subscribe`].
/// `create_if_absent` is a single `SET key value NX PX ttl`, so the server
/// serializes concurrent first writers.
pub struct RedisKvStore {
    conn: ConnectionManager,
    notifier: RedisNotifier,
}

impl RedisKvStore {
    /// Connect to `url` (`redis://[:password@]host[:port][/db]`) and verify
    /// the server answers `PING`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_connection_manager().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(%pong, "redis connection established");
        Ok(Self {
            notifier: RedisNotifier {
                client,
                conn: conn.clone(),
            },
            conn,
        })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        if value.is_empty() {
            return Err(StoreError::EmptyValue(key.to_string()));
        }
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
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
        let mut conn = self.conn.clone();
        for _ in 0..CREATE_ATTEMPTS {
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async(&mut conn)
                .await?;
            if reply.is_some() {
                return Ok(CreateStatus::Created);
            }
            let existing: Option<Vec<u8>> = conn.get(key).await?;
            if let Some(existing) = existing.filter(|v| !v.is_empty()) {
                return Ok(CreateStatus::AlreadyPresent(existing));
            }
            // Expired between SET NX and GET; try again.
        }
        Err(StoreError::Contended {
            key: key.to_string(),
            attempts: CREATE_ATTEMPTS,
        })
    }

    fn notifier(&self) -> Option<&dyn Notifier> {
        Some(&self.notifier)
    }
}

impl std::fmt::Debug for RedisKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKvStore").finish_non_exhaustive()
    }
}

/// Redis `PUBLISH`/`SUBSCRIBE` notifier.
#[derive(Clone)]
pub struct RedisNotifier {
    client: redis::Client,
    conn: ConnectionManager,
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn publish(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(channel_for(key), 1).await?;
        debug!(key, receivers, "published wake-up");
        Ok(())
    }

    async fn subscribe(&self, key: &str) -> StoreResult<Box<dyn Subscription>> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        // Returns once the server has acknowledged the subscription.
        pubsub.subscribe(channel_for(key)).await?;
        Ok(Box::new(RedisSubscription {
            key: key.to_string(),
            pubsub,
        }))
    }
}

/// Dropping this closes the dedicated connection, which unsubscribes.
struct RedisSubscription {
    key: String,
    pubsub: PubSub,
}

#[async_trait]
impl Subscription for RedisSubscription {
    async fn wait(&mut self, timeout: Duration) -> StoreResult<Wake> {
        let messages = self.pubsub.on_message();
        futures_util::pin_mut!(messages);
        match tokio::time::timeout(timeout, messages.next()).await {
            Ok(Some(_)) => Ok(Wake::Notified),
            Ok(None) => Err(StoreError::ChannelClosed(channel_for(&self.key))),
            Err(_) => Ok(Wake::TimedOut),
        }
    }
}
