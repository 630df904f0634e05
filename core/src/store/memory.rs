//! In-memory [`StoreBackend`] with call counters and failure injection.
//!
//! Backs the test suites and doubles as the no-network default backend.

use std::{
	collections::{BTreeMap, HashMap},
	sync::{
		atomic::{AtomicBool, AtomicUsize, Ordering},
		Mutex,
	},
};

use async_trait::async_trait;
use serde_json::Value;

use super::{Document, Identity, PersistenceError, StoreBackend, StoreError, StoreErrorCode};

/// How [`MemoryStore::enable_persistence`] should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceBehavior {
	#[default]
	Enabled,
	AlreadyActiveElsewhere,
	Unsupported,
	SchemaMismatch,
}

/// One atomically committed chunk, in commit order.
#[derive(Debug, Clone)]
pub struct CommittedChunk {
	pub collection: String,
	pub ids: Vec<String>,
}

#[derive(Default)]
struct Inner {
	collections: HashMap<String, BTreeMap<String, Value>>,
	commit_log: Vec<CommittedChunk>,
	// fail the nth commit_batch call (1-based) with this code
	fail_commit: Option<(usize, StoreErrorCode)>,
	fail_put: Option<StoreErrorCode>,
	persistence: PersistenceBehavior,
}

#[derive(Default)]
pub struct MemoryStore {
	inner: Mutex<Inner>,
	sign_in_attempts: AtomicUsize,
	sign_in_failures: AtomicUsize,
	persistence_cleared: AtomicBool,
	put_calls: AtomicUsize,
	commit_calls: AtomicUsize,
	get_calls: AtomicUsize,
}

impl MemoryStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
	}

	pub fn set_persistence_behavior(&self, behavior: PersistenceBehavior) {
		self.lock().persistence = behavior;
	}

	/// Make the next `n` sign-in attempts fail before succeeding.
	pub fn fail_next_sign_ins(&self, n: usize) {
		self.sign_in_failures.store(n, Ordering::SeqCst);
	}

	/// Fail the `nth` (1-based) batch commit with `code`.
	pub fn fail_commit(&self, nth: usize, code: StoreErrorCode) {
		self.lock().fail_commit = Some((nth, code));
	}

	/// Fail every single-document write with `code`.
	pub fn fail_puts(&self, code: StoreErrorCode) {
		self.lock().fail_put = Some(code);
	}

	pub fn sign_in_attempts(&self) -> usize {
		self.sign_in_attempts.load(Ordering::SeqCst)
	}

	pub fn persistence_cleared(&self) -> bool {
		self.persistence_cleared.load(Ordering::SeqCst)
	}

	/// Total write calls issued, single puts and batch commits combined.
	pub fn write_calls(&self) -> usize {
		self.put_calls.load(Ordering::SeqCst) + self.commit_calls.load(Ordering::SeqCst)
	}

	pub fn read_calls(&self) -> usize {
		self.get_calls.load(Ordering::SeqCst)
	}

	pub fn committed_chunks(&self) -> Vec<CommittedChunk> {
		self.lock().commit_log.clone()
	}

	pub fn document_count(&self, collection: &str) -> usize {
		self.lock()
			.collections
			.get(collection)
			.map_or(0, BTreeMap::len)
	}
}

#[async_trait]
impl StoreBackend for MemoryStore {
	async fn enable_persistence(&self) -> Result<(), PersistenceError> {
		match self.lock().persistence {
			PersistenceBehavior::Enabled => Ok(()),
			PersistenceBehavior::AlreadyActiveElsewhere => {
				Err(PersistenceError::AlreadyActiveElsewhere)
			}
			PersistenceBehavior::Unsupported => Err(PersistenceError::Unsupported),
			PersistenceBehavior::SchemaMismatch => Err(PersistenceError::SchemaMismatch),
		}
	}

	async fn clear_persistence(&self) -> Result<(), PersistenceError> {
		self.persistence_cleared.store(true, Ordering::SeqCst);
		Ok(())
	}

	async fn sign_in_anonymously(&self) -> Result<Identity, StoreError> {
		self.sign_in_attempts.fetch_add(1, Ordering::SeqCst);

		let failures = self.sign_in_failures.load(Ordering::SeqCst);
		if failures > 0 {
			self.sign_in_failures.store(failures - 1, Ordering::SeqCst);
			return Err(StoreError::unavailable("identity service unreachable"));
		}

		Ok(Identity::new())
	}

	async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
		self.get_calls.fetch_add(1, Ordering::SeqCst);

		Ok(self
			.lock()
			.collections
			.get(collection)
			.and_then(|docs| docs.get(id))
			.map(|value| Document {
				id: id.to_string(),
				value: value.clone(),
			}))
	}

	async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
		self.get_calls.fetch_add(1, Ordering::SeqCst);

		Ok(self
			.lock()
			.collections
			.get(collection)
			.map(|docs| {
				docs.iter()
					.map(|(id, doc)| Document {
						id: id.clone(),
						value: doc.clone(),
					})
					.collect()
			})
			.unwrap_or_default())
	}

	async fn query(
		&self,
		collection: &str,
		field: &str,
		value: &Value,
	) -> Result<Vec<Document>, StoreError> {
		self.get_calls.fetch_add(1, Ordering::SeqCst);

		Ok(self
			.lock()
			.collections
			.get(collection)
			.map(|docs| {
				docs.iter()
					.filter(|(_, doc)| doc.get(field) == Some(value))
					.map(|(id, doc)| Document {
						id: id.clone(),
						value: doc.clone(),
					})
					.collect()
			})
			.unwrap_or_default())
	}

	async fn put(&self, collection: &str, id: &str, value: Value) -> Result<(), StoreError> {
		self.put_calls.fetch_add(1, Ordering::SeqCst);

		let mut inner = self.lock();
		if let Some(code) = inner.fail_put {
			return Err(StoreError::new(code, "write rejected by backend"));
		}

		inner
			.collections
			.entry(collection.to_string())
			.or_default()
			.insert(id.to_string(), value);

		Ok(())
	}

	async fn commit_batch(
		&self,
		collection: &str,
		entries: Vec<(String, Value)>,
	) -> Result<(), StoreError> {
		let call = self.commit_calls.fetch_add(1, Ordering::SeqCst) + 1;

		let mut inner = self.lock();
		if let Some((nth, code)) = inner.fail_commit {
			if call == nth {
				return Err(StoreError::new(code, "batch commit rejected by backend"));
			}
		}

		inner.commit_log.push(CommittedChunk {
			collection: collection.to_string(),
			ids: entries.iter().map(|(id, _)| id.clone()).collect(),
		});

		let docs = inner.collections.entry(collection.to_string()).or_default();
		for (id, value) in entries {
			docs.insert(id, value);
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[tokio::test]
	async fn query_matches_field_equality() {
		let store = MemoryStore::new();

		store
			.put("rooms", "b1_101", json!({"branch_id": "b1", "floor": 1}))
			.await
			.unwrap();
		store
			.put("rooms", "b2_101", json!({"branch_id": "b2", "floor": 1}))
			.await
			.unwrap();

		let docs = store.query("rooms", "branch_id", &json!("b1")).await.unwrap();
		assert_eq!(docs.len(), 1);
		assert_eq!(docs[0].id, "b1_101");
	}

	#[tokio::test]
	async fn failed_commit_leaves_no_trace() {
		let store = MemoryStore::new();
		store.fail_commit(1, StoreErrorCode::Unavailable);

		let err = store
			.commit_batch("rooms", vec![("b1_101".to_string(), json!({}))])
			.await
			.unwrap_err();
		assert_eq!(err.code, StoreErrorCode::Unavailable);

		assert_eq!(store.document_count("rooms"), 0);
		assert!(store.committed_chunks().is_empty());
	}
}
