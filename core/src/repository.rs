//! Branch Repository: CRUD façade over branches, rooms and audits.
//!
//! Built on the Connection Manager and the Batched Writer; the only entry
//! points the branch-selection and hotel-editor UIs call.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{
	batch::BatchWriter,
	connection::ConnectionManager,
	domain::{Audit, Branch, RoomRecord},
	preferences::Preferences,
	Error,
};

pub const BRANCHES_COLLECTION: &str = "branches";
pub const ROOMS_COLLECTION: &str = "rooms";
pub const AUDITS_COLLECTION: &str = "audits";

const ROOM_KEY_FIELD: &str = "room_number";

pub struct BranchRepository {
	connection: Arc<ConnectionManager>,
	writer: BatchWriter,
	preferences: Arc<Preferences>,
	current_branch: RwLock<Option<Branch>>,
}

impl BranchRepository {
	pub fn new(connection: Arc<ConnectionManager>, preferences: Arc<Preferences>) -> Self {
		let writer = BatchWriter::new(Arc::clone(connection.backend()));

		Self {
			connection,
			writer,
			preferences,
			current_branch: RwLock::new(None),
		}
	}

	/// Overrides the writer, e.g. to tune the chunk size.
	#[must_use]
	pub fn with_writer(mut self, writer: BatchWriter) -> Self {
		self.writer = writer;
		self
	}

	/// The branch id audits operate against. Persisted across restarts.
	pub async fn selected_branch(&self) -> Option<String> {
		self.preferences.selected_branch().await
	}

	/// The last loaded or saved branch aggregate, without a round trip.
	pub async fn current_branch(&self) -> Option<Branch> {
		self.current_branch.read().await.clone()
	}

	/// Loads a branch and all of its rooms, and selects it.
	pub async fn load_branch(&self, branch_id: &str) -> Result<Branch, Error> {
		self.connection.connect().await?;
		let backend = self.connection.backend();

		let doc = backend
			.get(BRANCHES_COLLECTION, branch_id)
			.await?
			.ok_or_else(|| Error::NotFound(branch_id.to_string()))?;

		let mut branch: Branch = serde_json::from_value(doc.value)?;
		branch.id = doc.id;

		for room_doc in backend
			.query(ROOMS_COLLECTION, "branch_id", &json!(branch_id))
			.await?
		{
			let record: RoomRecord = serde_json::from_value(room_doc.value)?;
			branch.rooms.insert(record.room_number, record.room);
		}

		debug!(branch_id, rooms = branch.rooms.len(), "loaded branch;");

		self.preferences.set_selected_branch(branch_id).await?;
		*self.current_branch.write().await = Some(branch.clone());

		Ok(branch)
	}

	/// Writes the branch document (full replace, fresh timestamps) and
	/// persists its rooms through the Batched Writer, then selects it.
	pub async fn save_branch_setup(&self, branch: Branch) -> Result<(), Error> {
		if branch.id.is_empty() {
			return Err(Error::Validation("branch is missing an id".to_string()));
		}

		self.connection.connect().await?;
		let backend = self.connection.backend();

		let mut branch = branch;
		let now = Utc::now();
		branch.created_at = now;
		branch.updated_at = now;

		backend
			.put(
				BRANCHES_COLLECTION,
				&branch.id,
				serde_json::to_value(&branch)?,
			)
			.await?;

		if !branch.rooms.is_empty() {
			self.writer
				.write_all(ROOMS_COLLECTION, &branch.id, ROOM_KEY_FIELD, &branch.rooms)
				.await?;
		}

		debug!(branch_id = %branch.id, rooms = branch.rooms.len(), "saved branch setup;");

		self.preferences.set_selected_branch(&branch.id).await?;
		*self.current_branch.write().await = Some(branch);

		Ok(())
	}

	/// All branch records, each annotated with its id.
	pub async fn list_branches(&self) -> Result<Vec<Branch>, Error> {
		self.connection.connect().await?;

		self.connection
			.backend()
			.list(BRANCHES_COLLECTION)
			.await?
			.into_iter()
			.map(|doc| {
				let mut branch: Branch = serde_json::from_value(doc.value)?;
				branch.id = doc.id;
				Ok(branch)
			})
			.collect()
	}

	/// Appends a new immutable audit for a room of the selected branch.
	pub async fn save_audit(
		&self,
		room_number: &str,
		data: serde_json::Value,
	) -> Result<Audit, Error> {
		let branch_id = self
			.selected_branch()
			.await
			.ok_or(Error::NoBranchSelected)?;

		self.connection.connect().await?;

		let now = Utc::now();
		let audit = Audit {
			id: Uuid::new_v4(),
			branch_id,
			room_number: room_number.to_string(),
			data,
			created_at: now,
			updated_at: now,
		};

		self.connection
			.backend()
			.put(
				AUDITS_COLLECTION,
				&audit.id.to_string(),
				serde_json::to_value(&audit)?,
			)
			.await?;

		debug!(audit_id = %audit.id, room_number, "saved audit;");

		Ok(audit)
	}

	/// Up to `limit` audits for a room of the selected branch, newest
	/// first by creation time.
	pub async fn get_audits(&self, room_number: &str, limit: usize) -> Result<Vec<Audit>, Error> {
		let branch_id = self
			.selected_branch()
			.await
			.ok_or(Error::NoBranchSelected)?;

		self.connection.connect().await?;

		let mut audits = self
			.connection
			.backend()
			.query(AUDITS_COLLECTION, "branch_id", &json!(branch_id))
			.await?
			.into_iter()
			.map(|doc| serde_json::from_value::<Audit>(doc.value))
			.collect::<Result<Vec<_>, _>>()?
			.into_iter()
			.filter(|audit| audit.room_number == room_number)
			.collect::<Vec<_>>();

		audits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		audits.truncate(limit);

		Ok(audits)
	}
}
