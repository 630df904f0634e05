//! Connection Manager: owns the single session against the remote store.
//!
//! `connect` is idempotent. Concurrent callers share one initialization
//! attempt; a failed attempt is discarded so the next call starts fresh.

use std::{sync::Arc, time::Duration};

use lt_utils::report_error;
use tracing::{debug, error, warn};

use crate::{
	notifications::{Notifier, Severity},
	preferences::Preferences,
	retry::{with_retry, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS},
	store::{Identity, PersistenceError, StoreBackend},
	Error,
};

/// Live connection state: the anonymous identity plus whether the offline
/// cache could be enabled. The store handle itself stays on the manager.
#[derive(Debug, Clone)]
pub struct Session {
	pub identity: Identity,
	pub persistence_enabled: bool,
}

pub struct ConnectionManager {
	backend: Arc<dyn StoreBackend>,
	preferences: Arc<Preferences>,
	notifier: Arc<dyn Notifier>,
	// Held across the whole initialization attempt, so N concurrent
	// connect callers observe exactly one sign-in sequence.
	session: tokio::sync::Mutex<Option<Arc<Session>>>,
	retry_attempts: u32,
	retry_base_delay: Duration,
}

impl ConnectionManager {
	pub fn new(
		backend: Arc<dyn StoreBackend>,
		preferences: Arc<Preferences>,
		notifier: Arc<dyn Notifier>,
	) -> Self {
		Self {
			backend,
			preferences,
			notifier,
			session: tokio::sync::Mutex::new(None),
			retry_attempts: DEFAULT_MAX_ATTEMPTS,
			retry_base_delay: DEFAULT_BASE_DELAY,
		}
	}

	#[must_use]
	pub fn with_retry_policy(mut self, max_attempts: u32, base_delay: Duration) -> Self {
		self.retry_attempts = max_attempts;
		self.retry_base_delay = base_delay;
		self
	}

	/// Handle to the underlying store.
	pub fn backend(&self) -> &Arc<dyn StoreBackend> {
		&self.backend
	}

	pub async fn is_connected(&self) -> bool {
		self.session.lock().await.is_some()
	}

	pub async fn session(&self) -> Option<Arc<Session>> {
		self.session.lock().await.clone()
	}

	/// Establishes the session on first call and returns the cached one
	/// afterwards. Initialization failures are not cached.
	pub async fn connect(&self) -> Result<Arc<Session>, Error> {
		let mut slot = self.session.lock().await;

		if let Some(session) = &*slot {
			return Ok(Arc::clone(session));
		}

		let session = Arc::new(self.initialize().await?);
		*slot = Some(Arc::clone(&session));

		Ok(session)
	}

	async fn initialize(&self) -> Result<Session, Error> {
		if self.preferences.persistence_reset_requested().await {
			debug!("persistence reset was requested on a previous run, clearing local cache;");

			if let Err(e) = self.backend.clear_persistence().await {
				warn!("failed to clear local persistence: {e}");
			}

			report_error(
				&self
					.preferences
					.set_persistence_reset_requested(false)
					.await,
			);
		}

		let persistence_enabled = match self.backend.enable_persistence().await {
			Ok(()) => true,
			Err(e) => {
				self.handle_persistence_failure(e).await;
				false
			}
		};

		let identity = with_retry(
			|| self.backend.sign_in_anonymously(),
			self.retry_attempts,
			self.retry_base_delay,
		)
		.await
		.map_err(|e| {
			error!("anonymous sign-in exhausted all {} attempts", e.attempts);
			Error::Connection {
				attempts: e.attempts,
				source: e.last,
			}
		})?;

		debug!(uid = %identity.uid, persistence_enabled, "connection established;");

		Ok(Session {
			identity,
			persistence_enabled,
		})
	}

	// Persistence failures are never fatal; the connection continues
	// without an offline cache.
	async fn handle_persistence_failure(&self, e: PersistenceError) {
		match e {
			PersistenceError::AlreadyActiveElsewhere => {
				debug!("offline persistence already active in another tab, continuing without it;");
			}
			PersistenceError::Unsupported => {
				warn!("runtime does not support offline persistence, continuing without it;");
			}
			PersistenceError::SchemaMismatch => {
				warn!("locally cached data has an incompatible schema, requesting reset;");

				report_error(&self.preferences.set_persistence_reset_requested(true).await);

				self.notifier
					.notify(
						"Offline data is out of date and will be rebuilt on the next launch.",
						Severity::Warning,
					)
					.await;
			}
			other => error!("failed to enable offline persistence: {other}"),
		}
	}
}
