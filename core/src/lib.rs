//! Lodgetrack core: the branch/room data-synchronization layer of the
//! hotel-maintenance tracker.
//!
//! One authenticated connection to the remote document store, offline
//! persistence with version-mismatch recovery, and chunked bulk writes of
//! hierarchical hotel data (branches → rooms → audits) with retry and
//! error-classification policy. UI collaborators consume this layer only
//! through [`BranchRepository`] and the [`Notifier`] port.

#![warn(
	clippy::all,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod batch;
pub mod connection;
pub mod domain;
pub mod error;
pub mod notifications;
pub mod preferences;
pub mod repository;
pub mod retry;
pub mod store;

pub use batch::{BatchWriter, DEFAULT_CHUNK_SIZE};
pub use connection::{ConnectionManager, Session};
pub use domain::{Audit, Branch, Room};
pub use error::{Error, WriteFailure};
pub use notifications::{LogNotifier, NoopNotifier, Notifier, Severity};
pub use preferences::Preferences;
pub use repository::BranchRepository;
pub use retry::with_retry;
