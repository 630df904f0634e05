//! Durable client-side key-value storage.
//!
//! Holds the last selected branch id and the persistence-reset flag as a
//! JSON file on disk, read once at startup and rewritten on every change.

use std::path::{Path, PathBuf};

use lt_utils::FileIOError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{fs, sync::RwLock};
use tracing::debug;

/// PREFERENCES_FILE_NAME is the name of the file which stores the
/// durable preferences.
pub const PREFERENCES_FILE_NAME: &str = "preferences.json";

fn skip_if_false(value: &bool) -> bool {
	!*value
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PreferencesData {
	#[serde(
		default,
		rename = "selectedBranch",
		skip_serializing_if = "Option::is_none"
	)]
	selected_branch: Option<String>,
	#[serde(default, skip_serializing_if = "skip_if_false")]
	persistence_reset_requested: bool,
}

#[derive(Error, Debug)]
pub enum PreferencesError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("error serializing or deserializing the JSON in the preferences file: {0}")]
	Json(#[from] serde_json::Error),
}

pub struct Preferences {
	path: PathBuf,
	data: RwLock<PreferencesData>,
}

impl Preferences {
	/// Loads preferences from `data_dir`, creating the directory and an
	/// empty preference set if nothing is stored yet.
	pub async fn load(data_dir: impl AsRef<Path>) -> Result<Self, PreferencesError> {
		let data_dir = data_dir.as_ref();
		fs::create_dir_all(data_dir)
			.await
			.map_err(|e| FileIOError::from((data_dir, e)))?;

		let path = data_dir.join(PREFERENCES_FILE_NAME);

		let data = match fs::read(&path).await {
			Ok(bytes) => serde_json::from_slice(&bytes)?,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => PreferencesData::default(),
			Err(e) => return Err(FileIOError::from((&path, e)).into()),
		};

		Ok(Self {
			path,
			data: RwLock::new(data),
		})
	}

	pub async fn selected_branch(&self) -> Option<String> {
		self.data.read().await.selected_branch.clone()
	}

	pub async fn set_selected_branch(&self, branch_id: &str) -> Result<(), PreferencesError> {
		let mut data = self.data.write().await;
		data.selected_branch = Some(branch_id.to_string());
		self.save(&data).await
	}

	pub async fn forget_selected_branch(&self) -> Result<(), PreferencesError> {
		let mut data = self.data.write().await;
		data.selected_branch = None;
		self.save(&data).await
	}

	pub async fn persistence_reset_requested(&self) -> bool {
		self.data.read().await.persistence_reset_requested
	}

	pub async fn set_persistence_reset_requested(
		&self,
		requested: bool,
	) -> Result<(), PreferencesError> {
		let mut data = self.data.write().await;
		data.persistence_reset_requested = requested;
		self.save(&data).await
	}

	async fn save(&self, data: &PreferencesData) -> Result<(), PreferencesError> {
		debug!(path = %self.path.display(), "writing preferences;");

		fs::write(&self.path, serde_json::to_vec_pretty(data)?)
			.await
			.map_err(|e| FileIOError::from((&self.path, e, "failed to write preferences")).into())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn selected_branch_survives_reload() {
		let dir = tempfile::tempdir().unwrap();

		{
			let prefs = Preferences::load(dir.path()).await.unwrap();
			assert_eq!(prefs.selected_branch().await, None);
			prefs.set_selected_branch("b1").await.unwrap();
		}

		let prefs = Preferences::load(dir.path()).await.unwrap();
		assert_eq!(prefs.selected_branch().await.as_deref(), Some("b1"));

		prefs.forget_selected_branch().await.unwrap();
		let prefs = Preferences::load(dir.path()).await.unwrap();
		assert_eq!(prefs.selected_branch().await, None);
	}

	#[tokio::test]
	async fn reset_flag_round_trips() {
		let dir = tempfile::tempdir().unwrap();

		let prefs = Preferences::load(dir.path()).await.unwrap();
		assert!(!prefs.persistence_reset_requested().await);
		prefs.set_persistence_reset_requested(true).await.unwrap();

		let prefs = Preferences::load(dir.path()).await.unwrap();
		assert!(prefs.persistence_reset_requested().await);
	}
}
