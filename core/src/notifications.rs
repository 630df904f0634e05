//! Notification capability consumed by the sync layer.
//!
//! UI collaborators provide a real implementation; headless contexts pick
//! [`LogNotifier`] or [`NoopNotifier`] explicitly at construction time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
	Info,
	Success,
	Error,
	Warning,
}

#[async_trait]
pub trait Notifier: Send + Sync {
	async fn notify(&self, message: &str, severity: Severity);
}

/// Routes notifications to tracing.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
	async fn notify(&self, message: &str, severity: Severity) {
		match severity {
			Severity::Info | Severity::Success => info!("{message}"),
			Severity::Warning => warn!("{message}"),
			Severity::Error => error!("{message}"),
		}
	}
}

#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
	async fn notify(&self, _message: &str, _severity: Severity) {}
}
