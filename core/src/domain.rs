use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A hotel location, the top-level partition of all other data.
///
/// The `rooms` map is never stored inside the branch document itself;
/// rooms live in their own collection, foreign-keyed by branch id, and
/// are attached when the aggregate is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
	#[serde(default)]
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub address: String,
	#[serde(default)]
	pub total_floors: u32,
	#[serde(default = "Utc::now")]
	pub created_at: DateTime<Utc>,
	#[serde(default = "Utc::now")]
	pub updated_at: DateTime<Utc>,
	#[serde(skip)]
	pub rooms: BTreeMap<String, Room>,
}

impl Branch {
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id: id.into(),
			name: name.into(),
			address: String::new(),
			total_floors: 0,
			created_at: now,
			updated_at: now,
			rooms: BTreeMap::new(),
		}
	}
}

/// Room attributes are caller supplied; anything beyond the well-known
/// fields lands in `metadata` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Room {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub floor: Option<u32>,
	#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
	pub room_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	#[serde(flatten)]
	pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Room {
	pub fn on_floor(floor: u32) -> Self {
		Self {
			floor: Some(floor),
			..Default::default()
		}
	}
}

/// Stored shape of a room document: the room's own attributes plus the
/// fields the batch writer injects before commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecord {
	pub branch_id: String,
	pub room_number: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(flatten)]
	pub room: Room,
}

/// A timestamped inspection record. Append-only; never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
	pub id: Uuid,
	pub branch_id: String,
	pub room_number: String,
	pub data: serde_json::Value,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Document id for a keyed record owned by `owner_id`.
///
/// Deterministic so that writing the same (branch, room number) pair twice
/// overwrites instead of duplicating.
#[must_use]
pub fn composite_id(owner_id: &str, key: &str) -> String {
	format!("{owner_id}_{key}")
}
