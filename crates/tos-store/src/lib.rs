//! Key-value backends for tos.
//!
//! The write-once core never talks to a concrete store. It depends on the
//! [`KvStore`] capability and, when present, the [`Notifier`] pub/sub
//! extension a backend exposes through [`KvStore::notifier`].
//!
//! # Backends
//!
//! - [`MemoryKvStore`] -- in-process cache with per-entry TTL and an
//!   in-process broadcast notifier (or none, for polling)
//! - [`RedisKvStore`] -- remote cache reached through a Redis connection
//!   manager, with `PUBLISH`/`SUBSCRIBE` wake-ups
//!
//! The backend is picked explicitly from a [`StoreConfig`] by [`open`].
//!
//! # Design Rules
//!
//! 1. `create_if_absent` is atomic in every backend; there is no
//!    check-then-act split above this crate.
//! 2. Absence is `None`. Backends never hand out zero-length values.
//! 3. All I/O errors are propagated, never reported as absence.
//! 4. Subscriptions are released when dropped.

pub mod config;
pub mod error;
pub mod memory;
pub mod notify;
pub mod remote;
pub mod traits;

pub use config::{open, OpenedStore, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryKvStore, MemoryNotifier};
pub use notify::{Notifier, Subscription, Wake};
pub use remote::{RedisKvStore, RedisNotifier};
pub use traits::{CreateStatus, KvStore};
