use thiserror::Error;

/// Errors produced while encoding or decoding an [`Entity`](crate::Entity).
///
/// A decode failure means the backend holds bytes under the key that are not
/// a valid entity (corruption or foreign data). It is a server-side fault and
/// must never be treated as absence.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty input")]
    Empty,

    #[error("unknown format tag: {0:#04x}")]
    UnknownFormat(u8),

    #[error("encoded entity too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors produced when validating a [`BlobKey`](crate::BlobKey).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("key must not be empty")]
    Empty,

    #[error("key too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("key contains a control character")]
    ControlCharacter,
}
