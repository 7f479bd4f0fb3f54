use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::policy::WaitPolicy;

/// Settings of the write and read paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    /// Time-to-live given to every entry at creation.
    pub entry_ttl: Duration,
    /// Long-poll bounds for waiting readers.
    pub wait: WaitPolicy,
}

impl CoreConfig {
    pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(10 * 60);
    /// Longest accepted entry lifetime: one year.
    pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    pub fn validate(&self) -> CoreResult<()> {
        if self.entry_ttl.is_zero() {
            return Err(CoreError::Config("entry ttl must be positive".into()));
        }
        if self.entry_ttl > Self::MAX_ENTRY_TTL {
            return Err(CoreError::Config(format!(
                "entry ttl {:?} exceeds the maximum of {:?}",
                self.entry_ttl,
                Self::MAX_ENTRY_TTL
            )));
        }
        self.wait.validate()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            entry_ttl: Self::DEFAULT_ENTRY_TTL,
            wait: WaitPolicy::default(),
        }
    }
}
