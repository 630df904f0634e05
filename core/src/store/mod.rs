//! Storage port for the remote document store.
//!
//! The sync layer depends only on this interface; backend SDK semantics
//! (server timestamps, snapshot existence checks, batch commit objects)
//! stay behind implementations of [`StoreBackend`].

mod memory;

pub use memory::{CommittedChunk, MemoryStore, PersistenceBehavior};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Backend error sub-codes, as reported by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
	PermissionDenied,
	Unavailable,
	ResourceExhausted,
	NotFound,
	Other,
}

#[derive(Error, Debug)]
#[error("store error ({code:?}): {message}")]
pub struct StoreError {
	pub code: StoreErrorCode,
	pub message: String,
}

impl StoreError {
	pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}

	pub fn unavailable(message: impl Into<String>) -> Self {
		Self::new(StoreErrorCode::Unavailable, message)
	}
}

/// Why enabling the offline cache failed. All of these are recoverable;
/// the connection continues without persistence.
#[derive(Error, Debug)]
pub enum PersistenceError {
	#[error("offline persistence is already active in another tab")]
	AlreadyActiveElsewhere,
	#[error("the runtime does not support offline persistence")]
	Unsupported,
	#[error("locally cached data is incompatible with the current schema version")]
	SchemaMismatch,
	#[error("failed to enable offline persistence: {0}")]
	Other(String),
}

/// Session credential obtained without user-supplied credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
	pub uid: Uuid,
}

impl Identity {
	#[must_use]
	pub fn new() -> Self {
		Self {
			uid: Uuid::new_v4(),
		}
	}
}

impl Default for Identity {
	fn default() -> Self {
		Self::new()
	}
}

/// A stored document together with its collection key, so callers can
/// annotate loaded records with their ids without a second lookup.
#[derive(Debug, Clone)]
pub struct Document {
	pub id: String,
	pub value: Value,
}

/// Minimal surface the sync layer needs from a document store.
///
/// `commit_batch` must apply all entries of one call atomically; the hard
/// cap on entries per call is [`MAX_BATCH_OPERATIONS`].
#[async_trait]
pub trait StoreBackend: Send + Sync {
	/// Enable the local offline cache, configured without a size bound.
	async fn enable_persistence(&self) -> Result<(), PersistenceError>;

	/// Drop the local offline cache. Called before re-enabling persistence
	/// when a schema-mismatch reset was requested on a previous run.
	async fn clear_persistence(&self) -> Result<(), PersistenceError>;

	async fn sign_in_anonymously(&self) -> Result<Identity, StoreError>;

	async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

	/// All documents in `collection`.
	async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

	/// All documents in `collection` whose `field` equals `value`.
	async fn query(
		&self,
		collection: &str,
		field: &str,
		value: &Value,
	) -> Result<Vec<Document>, StoreError>;

	async fn put(&self, collection: &str, id: &str, value: Value) -> Result<(), StoreError>;

	async fn commit_batch(
		&self,
		collection: &str,
		entries: Vec<(String, Value)>,
	) -> Result<(), StoreError>;
}

/// The store's hard cap on operations per atomic batch.
pub const MAX_BATCH_OPERATIONS: usize = 500;
