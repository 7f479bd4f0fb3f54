use std::time::Duration;

use crate::error::{CoreError, CoreResult};

/// Bounds of a long-poll read.
///
/// A waiting reader re-checks the backend once per `poll_interval` slice (or
/// earlier, when woken by a notification) and gives up at `deadline`. The
/// number of timed-out slices is capped at [`max_iterations`], so
/// `max_iterations × poll_interval` covers the deadline.
///
/// [`max_iterations`]: WaitPolicy::max_iterations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Total time a reader may wait for a value.
    pub deadline: Duration,
    /// Length of one wait slice: the poll period without a notifier, and the
    /// per-iteration notification timeout with one.
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(15);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(deadline: Duration, poll_interval: Duration) -> Self {
        Self {
            deadline,
            poll_interval,
        }
    }

    /// Upper bound on timed-out wait slices before the reader gives up.
    pub fn max_iterations(&self) -> u32 {
        if self.poll_interval.is_zero() {
            return 0;
        }
        let slices = self.deadline.as_nanos().div_ceil(self.poll_interval.as_nanos());
        u32::try_from(slices).unwrap_or(u32::MAX)
    }

    /// Reject policies that would wait forever or spin.
    pub fn validate(&self) -> CoreResult<()> {
        if self.deadline.is_zero() {
            return Err(CoreError::Config("wait deadline must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config("poll interval must be positive".into()));
        }
        if self.poll_interval > self.deadline {
            return Err(CoreError::Config(format!(
                "poll interval {:?} exceeds deadline {:?}",
                self.poll_interval, self.deadline
            )));
        }
        Ok(())
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEADLINE, Self::DEFAULT_POLL_INTERVAL)
    }
}
