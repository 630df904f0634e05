//! Saves a small branch into the in-memory backend and reads it back.
//!
//! Run with `cargo run --example sync_demo` (set `RUST_LOG=debug` to see
//! the chunk commits).

use std::sync::Arc;

use lt_core::{
	store::MemoryStore, Branch, BranchRepository, ConnectionManager, LogNotifier, Preferences,
	Room,
};

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let data_dir = tempfile::tempdir()?;

	let store = Arc::new(MemoryStore::new());
	let preferences = Arc::new(Preferences::load(data_dir.path()).await?);
	let connection = Arc::new(ConnectionManager::new(
		store,
		preferences.clone(),
		Arc::new(LogNotifier),
	));
	let repository = BranchRepository::new(connection, preferences);

	let mut branch = Branch::new("downtown", "Downtown Lodge");
	branch.total_floors = 2;
	branch.rooms.insert("101".to_string(), Room::on_floor(1));
	branch.rooms.insert("102".to_string(), Room::on_floor(1));
	branch.rooms.insert("201".to_string(), Room::on_floor(2));

	repository.save_branch_setup(branch).await?;

	let loaded = repository.load_branch("downtown").await?;
	println!("{} has {} rooms", loaded.name, loaded.rooms.len());

	repository
		.save_audit("101", serde_json::json!({ "clean": true }))
		.await?;
	let audits = repository.get_audits("101", 5).await?;
	println!("room 101 has {} audit(s)", audits.len());

	Ok(())
}
