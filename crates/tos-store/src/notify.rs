use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Why a [`Subscription::wait`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    /// A publish for the subscribed key was observed (possibly spurious).
    Notified,
    /// The timeout elapsed without a publish.
    TimedOut,
}

/// Pub/sub extension of a backend: "key has been written" wake-ups.
///
/// Delivery is at-least-once and carries no data. A woken subscriber must
/// re-read the key.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Wake every current subscriber of `key`.
    async fn publish(&self, key: &str) -> StoreResult<()>;

    /// Start listening for publishes on `key`.
    ///
    /// The subscription is live when this returns: any publish issued after
    /// that point is observed by the handle. It is released on drop.
    async fn subscribe(&self, key: &str) -> StoreResult<Box<dyn Subscription>>;
}

/// A live subscription to one key, owned by a single waiter.
#[async_trait]
pub trait Subscription: Send {
    /// Block until a publish is observed or `timeout` elapses.
    async fn wait(&mut self, timeout: Duration) -> StoreResult<Wake>;
}
