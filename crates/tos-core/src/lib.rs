//! Write-once coordination and bounded-wait retrieval.
//!
//! This crate decides whether a write is accepted and how a reader waits for
//! a value that has not been written yet. It sees storage only through the
//! [`tos_store::KvStore`] capability.
//!
//! # Components
//!
//! - [`WriteCoordinator`] -- idempotent create-if-absent with conflict
//!   detection, plus the wake-up publish after a successful create
//! - [`BoundedWaitReader`] -- immediate read, or long-poll read bounded by a
//!   [`WaitPolicy`] deadline, woken by the backend notifier when there is one
//! - [`BlobService`] -- the two above plus the entity codec, as used by the
//!   HTTP layer
//!
//! # Outcomes vs. errors
//!
//! `Conflict`, `AlreadyExists` and `Absent` are ordinary results
//! ([`WriteOutcome`], [`Lookup`]). Backend failures, undecodable stored bytes
//! and cancelled waits are [`CoreError`]s and are never folded into absence.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod policy;
pub mod reader;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::CoreConfig;
pub use coordinator::{WriteCoordinator, WriteOutcome};
pub use error::{CoreError, CoreResult};
pub use policy::WaitPolicy;
pub use reader::{BoundedWaitReader, Lookup};
pub use service::BlobService;
pub use tokio_util::sync::CancellationToken;
