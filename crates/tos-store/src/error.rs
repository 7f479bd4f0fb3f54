/// Errors from key-value backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The remote cache returned an error or the connection failed.
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Attempted to store a zero-length value, which reads back as absence.
    #[error("refusing to store empty value under {0:?}")]
    EmptyValue(String),

    /// A create-if-absent kept racing with expiry and never settled.
    #[error("create-if-absent for {key:?} did not settle after {attempts} attempts")]
    Contended { key: String, attempts: usize },

    /// The notification connection went away while a subscriber waited.
    #[error("notification channel closed: {0}")]
    ChannelClosed(String),

    /// The backend cannot be constructed from the given configuration.
    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
