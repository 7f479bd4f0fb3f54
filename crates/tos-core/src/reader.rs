use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use tos_store::{KvStore, Subscription, Wake};
use tos_types::BlobKey;

use crate::error::{CoreError, CoreResult};
use crate::policy::WaitPolicy;

/// Result of a read. All or nothing: no partial value is ever returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Present(Vec<u8>),
    Absent,
}

impl Lookup {
    pub fn into_option(self) -> Option<Vec<u8>> {
        match self {
            Self::Present(bytes) => Some(bytes),
            Self::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl From<Option<Vec<u8>>> for Lookup {
    fn from(value: Option<Vec<u8>>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

/// Immediate or long-poll reads with a hard deadline.
///
/// A long-poll read checks once, then subscribes to the key's wake-ups (when
/// the backend has a notifier) and checks again before blocking, so a write
/// landing between the first check and the subscribe is not missed. Each
/// iteration then waits one slice of at most `poll_interval` and re-checks.
/// Without a notifier the slice is a plain sleep.
///
/// The deadline bounds the whole wait, subscribe and re-check included.
/// Backend errors abort the wait. Cancellation through the token returns
/// [`CoreError::Cancelled`]; dropping the future also ends the wait. Either
/// way the subscription is released.
pub struct BoundedWaitReader {
    store: Arc<dyn KvStore>,
    policy: WaitPolicy,
}

impl BoundedWaitReader {
    pub fn new(store: Arc<dyn KvStore>, policy: WaitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Read `key`, waiting up to the policy deadline when `wait` is set.
    pub async fn read(&self, key: &BlobKey, wait: bool) -> CoreResult<Lookup> {
        self.read_cancellable(key, wait, &CancellationToken::new())
            .await
    }

    /// Like [`read`](Self::read), aborted with [`CoreError::Cancelled`] as
    /// soon as `cancel` fires.
    pub async fn read_cancellable(
        &self,
        key: &BlobKey,
        wait: bool,
        cancel: &CancellationToken,
    ) -> CoreResult<Lookup> {
        let first = self.check(key).await?;
        if first.is_present() || !wait {
            return Ok(first);
        }

        let started = Instant::now();
        let deadline = started + self.policy.deadline;
        let lookup = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%key, waited = ?started.elapsed(), "wait cancelled");
                return Err(CoreError::Cancelled);
            }
            // Subscribing opens a connection on some backends, so the
            // deadline covers it along with the slices.
            result = tokio::time::timeout_at(deadline, self.wait_until(key, deadline)) => {
                result.unwrap_or(Ok(Lookup::Absent))?
            }
        };
        debug!(
            %key,
            found = lookup.is_present(),
            waited = ?started.elapsed(),
            "wait finished"
        );
        Ok(lookup)
    }

    async fn wait_until(&self, key: &BlobKey, deadline: Instant) -> CoreResult<Lookup> {
        let mut subscription: Option<Box<dyn Subscription>> = match self.store.notifier() {
            Some(notifier) => {
                let sub = notifier.subscribe(key.as_str()).await?;
                let lookup = self.check(key).await?;
                if lookup.is_present() {
                    return Ok(lookup);
                }
                Some(sub)
            }
            None => None,
        };

        let max_iterations = self.policy.max_iterations();
        let mut timed_out = 0;
        while timed_out < max_iterations {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let slice = (deadline - now).min(self.policy.poll_interval);

            let wake = match subscription.as_mut() {
                Some(sub) => sub.wait(slice).await?,
                None => {
                    tokio::time::sleep(slice).await;
                    Wake::TimedOut
                }
            };
            trace!(%key, ?wake, "wait slice ended");

            let lookup = self.check(key).await?;
            if lookup.is_present() {
                return Ok(lookup);
            }
            // A notification that finds nothing is spurious and does not
            // use up an iteration; the deadline still bounds the loop.
            if wake == Wake::TimedOut {
                timed_out += 1;
            }
        }
        Ok(Lookup::Absent)
    }

    async fn check(&self, key: &BlobKey) -> CoreResult<Lookup> {
        Ok(self.store.get(key.as_str()).await?.into())
    }
}
