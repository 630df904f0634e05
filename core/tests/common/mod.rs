use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lt_core::{
	notifications::{Notifier, Severity},
	store::MemoryStore,
	BranchRepository, ConnectionManager, Preferences,
};
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Notifier that records every `(message, severity)` pair it receives.
#[derive(Default)]
pub struct RecordingNotifier {
	notifications: Mutex<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
	pub async fn received(&self) -> Vec<(String, Severity)> {
		self.notifications.lock().await.clone()
	}
}

#[async_trait]
impl Notifier for RecordingNotifier {
	async fn notify(&self, message: &str, severity: Severity) {
		self.notifications
			.lock()
			.await
			.push((message.to_string(), severity));
	}
}

pub struct TestContext {
	pub store: Arc<MemoryStore>,
	pub connection: Arc<ConnectionManager>,
	pub repository: BranchRepository,
	pub preferences: Arc<Preferences>,
	pub notifier: Arc<RecordingNotifier>,
	// owns the preferences directory for the duration of the test
	pub data_dir: TempDir,
}

pub async fn setup() -> TestContext {
	let data_dir = tempfile::tempdir().expect("failed to create temp dir");

	let store = Arc::new(MemoryStore::new());
	let preferences = Arc::new(
		Preferences::load(data_dir.path())
			.await
			.expect("failed to load preferences"),
	);
	let notifier = Arc::new(RecordingNotifier::default());

	let connection = Arc::new(
		ConnectionManager::new(
			store.clone(),
			preferences.clone(),
			notifier.clone(),
		)
		.with_retry_policy(3, Duration::from_millis(1)),
	);

	let repository = BranchRepository::new(connection.clone(), preferences.clone());

	TestContext {
		store,
		connection,
		repository,
		preferences,
		notifier,
		data_dir,
	}
}

/// Rebuilds the context on the same preferences directory, simulating a
/// process restart with fresh connection state.
pub async fn restart(ctx: TestContext) -> TestContext {
	let TestContext {
		store, data_dir, ..
	} = ctx;

	let preferences = Arc::new(
		Preferences::load(data_dir.path())
			.await
			.expect("failed to reload preferences"),
	);
	let notifier = Arc::new(RecordingNotifier::default());

	let connection = Arc::new(
		ConnectionManager::new(
			store.clone(),
			preferences.clone(),
			notifier.clone(),
		)
		.with_retry_policy(3, Duration::from_millis(1)),
	);

	let repository = BranchRepository::new(connection.clone(), preferences.clone());

	TestContext {
		store,
		connection,
		repository,
		preferences,
		notifier,
		data_dir,
	}
}
