use thiserror::Error;

use tos_store::StoreError;
use tos_types::CodecError;

/// Errors surfaced by the write and read paths.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Stored bytes are not a valid entity, or the entity cannot be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("backend error: {0}")]
    Backend(#[from] StoreError),

    /// The caller cancelled a wait before the deadline.
    #[error("wait cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
