//! Batched Writer: chunked, sequential, atomic multi-record commits.
//!
//! A later chunk is not started until the prior chunk's commit resolves,
//! so a mid-sequence failure leaves a deterministic prefix committed.
//! Already-committed chunks are not rolled back.
//!
//! Callers must not run two writers against the same branch concurrently;
//! the sequential-commit rule is the only ordering guarantee provided.

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
	domain::composite_id,
	store::{StoreBackend, MAX_BATCH_OPERATIONS},
	Error,
};

/// Records per chunk. Kept well under the store's hard cap of
/// [`MAX_BATCH_OPERATIONS`] operations per atomic commit.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

pub struct BatchWriter {
	backend: Arc<dyn StoreBackend>,
	chunk_size: usize,
}

impl BatchWriter {
	pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
		Self {
			backend,
			chunk_size: DEFAULT_CHUNK_SIZE,
		}
	}

	#[must_use]
	pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
		self.chunk_size = chunk_size.clamp(1, MAX_BATCH_OPERATIONS);
		self
	}

	/// Writes every record of `records` to `collection`, in key order,
	/// as a sequence of atomic chunks.
	///
	/// Each record is stored under the id `{owner_id}_{key}` and receives
	/// the owning id, its own key (under `key_field`) and fresh
	/// create/update timestamps before commit. The first failing chunk
	/// aborts the sequence; its predecessors stay committed.
	pub async fn write_all<V: Serialize>(
		&self,
		collection: &str,
		owner_id: &str,
		key_field: &str,
		records: &BTreeMap<String, V>,
	) -> Result<(), Error> {
		if records.is_empty() {
			return Ok(());
		}

		let now = Utc::now();
		let timestamp = serde_json::to_value(now)?;

		let entries = records
			.iter()
			.map(|(key, record)| {
				let mut value = serde_json::to_value(record)?;

				if let Value::Object(fields) = &mut value {
					fields.insert("branch_id".to_string(), Value::String(owner_id.to_string()));
					fields.insert(key_field.to_string(), Value::String(key.clone()));
					fields.insert("created_at".to_string(), timestamp.clone());
					fields.insert("updated_at".to_string(), timestamp.clone());
				}

				Ok((composite_id(owner_id, key), value))
			})
			.collect::<Result<Vec<_>, Error>>()?;

		let total_chunks = entries.len().div_ceil(self.chunk_size);

		for (index, chunk) in entries.chunks(self.chunk_size).enumerate() {
			debug!(
				collection,
				chunk = index + 1,
				total_chunks,
				records = chunk.len(),
				"committing chunk;"
			);

			self.backend
				.commit_batch(collection, chunk.to_vec())
				.await?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use crate::store::{CommittedChunk, MemoryStore, StoreErrorCode};

	use super::*;

	fn rooms(n: usize) -> BTreeMap<String, Value> {
		(0..n)
			.map(|i| (format!("{:03}", 100 + i), json!({ "floor": i / 10 })))
			.collect()
	}

	fn chunk_sizes(chunks: &[CommittedChunk]) -> Vec<usize> {
		chunks.iter().map(|c| c.ids.len()).collect()
	}

	#[tokio::test]
	async fn issues_ceil_m_over_c_chunks_in_input_order() {
		let store = Arc::new(MemoryStore::new());
		let writer = BatchWriter::new(store.clone() as Arc<dyn StoreBackend>).with_chunk_size(4);

		writer
			.write_all("rooms", "b1", "room_number", &rooms(10))
			.await
			.unwrap();

		let chunks = store.committed_chunks();
		assert_eq!(chunk_sizes(&chunks), vec![4, 4, 2]);

		let all_ids = chunks
			.iter()
			.flat_map(|c| c.ids.clone())
			.collect::<Vec<_>>();
		let mut sorted = all_ids.clone();
		sorted.sort();
		assert_eq!(all_ids, sorted, "chunks must preserve input order");
	}

	#[tokio::test]
	async fn single_chunk_when_under_limit() {
		let store = Arc::new(MemoryStore::new());
		let writer = BatchWriter::new(store.clone() as Arc<dyn StoreBackend>);

		writer
			.write_all("rooms", "b1", "room_number", &rooms(10))
			.await
			.unwrap();

		assert_eq!(chunk_sizes(&store.committed_chunks()), vec![10]);
	}

	#[tokio::test]
	async fn failing_chunk_stops_the_sequence() {
		let store = Arc::new(MemoryStore::new());
		store.fail_commit(2, StoreErrorCode::Unavailable);

		let writer = BatchWriter::new(store.clone() as Arc<dyn StoreBackend>).with_chunk_size(3);

		let err = writer
			.write_all("rooms", "b1", "room_number", &rooms(9))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Write(_)));

		// only chunk 1 landed; chunk 3 was never attempted
		assert_eq!(chunk_sizes(&store.committed_chunks()), vec![3]);
		assert_eq!(store.document_count("rooms"), 3);
	}

	#[tokio::test]
	async fn injects_owner_key_and_timestamps() {
		let store = Arc::new(MemoryStore::new());
		let writer = BatchWriter::new(store.clone() as Arc<dyn StoreBackend>);

		let mut records = BTreeMap::new();
		records.insert("101".to_string(), json!({ "floor": 1 }));

		writer
			.write_all("rooms", "b1", "room_number", &records)
			.await
			.unwrap();

		let doc = store.get("rooms", "b1_101").await.unwrap().unwrap();
		assert_eq!(doc.value["branch_id"], "b1");
		assert_eq!(doc.value["room_number"], "101");
		assert_eq!(doc.value["floor"], 1);
		assert!(doc.value.get("created_at").is_some());
		assert!(doc.value.get("updated_at").is_some());
	}

	#[tokio::test]
	async fn empty_input_issues_no_commits() {
		let store = Arc::new(MemoryStore::new());
		let writer = BatchWriter::new(store.clone() as Arc<dyn StoreBackend>);

		writer
			.write_all("rooms", "b1", "room_number", &BTreeMap::<_, Value>::new())
			.await
			.unwrap();

		assert_eq!(store.write_calls(), 0);
	}
}
