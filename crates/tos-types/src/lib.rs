//! Foundation types for tos, a write-once blob store.
//!
//! Every other tos crate depends on `tos-types`.
//!
//! # Key Types
//!
//! - [`Entity`] -- the `(content, content_type, origin)` tuple a client stores
//! - [`BlobKey`] -- validated, caller-chosen identifier an entity is bound to
//! - [`EntityCodec`] -- stable byte encoding of an entity for the backend

pub mod codec;
pub mod entity;
pub mod error;
pub mod key;

pub use codec::{EntityCodec, FORMAT_TAG, MAX_ENCODED_SIZE};
pub use entity::Entity;
pub use error::{CodecError, CodecResult, KeyError};
pub use key::{BlobKey, MAX_KEY_LEN};
