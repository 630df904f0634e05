//! Domain error taxonomy and the backend error classifier.

use thiserror::Error;

use crate::{
	preferences::PreferencesError,
	store::{StoreError, StoreErrorCode},
};

#[derive(Error, Debug)]
pub enum Error {
	#[error("failed to connect to the remote store after {attempts} attempts: {source}")]
	Connection {
		attempts: u32,
		#[source]
		source: StoreError,
	},
	#[error("branch not found: {0}")]
	NotFound(String),
	#[error("invalid input: {0}")]
	Validation(String),
	#[error("no branch is currently selected")]
	NoBranchSelected,
	#[error(transparent)]
	Write(#[from] WriteFailure),
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
	#[error("preferences error: {0}")]
	Preferences(#[from] PreferencesError),
}

/// A backend write (or read) rejected by the remote store, carrying the
/// classified sub-code and the user-facing message for it.
#[derive(Error, Debug)]
#[error("{}", .code.user_message())]
pub struct WriteFailure {
	pub code: StoreErrorCode,
	pub detail: String,
}

impl WriteFailure {
	#[must_use]
	pub fn user_message(&self) -> &'static str {
		self.code.user_message()
	}
}

impl StoreErrorCode {
	/// Human-readable message per sub-code. Callers present this directly
	/// instead of inspecting backend codes.
	#[must_use]
	pub fn user_message(self) -> &'static str {
		match self {
			Self::PermissionDenied => "You don't have permission to save changes for this branch.",
			Self::Unavailable => {
				"The service is temporarily unavailable. Please try again in a moment."
			}
			Self::ResourceExhausted => "Storage quota exceeded. Please contact your administrator.",
			Self::NotFound => "The record being updated no longer exists.",
			Self::Other => "Something went wrong while saving data. Please try again.",
		}
	}
}

// The single place backend errors are translated into the domain taxonomy.
impl From<StoreError> for Error {
	fn from(e: StoreError) -> Self {
		Self::Write(WriteFailure {
			code: e.code,
			detail: e.message,
		})
	}
}

impl Error {
	/// Message suitable for showing to the user as-is.
	#[must_use]
	pub fn user_message(&self) -> String {
		match self {
			Self::Write(failure) => failure.user_message().to_string(),
			Self::Connection { .. } => {
				"Couldn't reach the server. Check your connection and try again.".to_string()
			}
			other => other.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn store_errors_classify_by_sub_code() {
		let err: Error =
			StoreError::new(StoreErrorCode::ResourceExhausted, "quota exceeded").into();

		let Error::Write(failure) = &err else {
			panic!("expected a write failure");
		};
		assert_eq!(failure.code, StoreErrorCode::ResourceExhausted);
		assert!(err.user_message().contains("quota"));
	}

	#[test]
	fn connection_error_names_attempt_count() {
		let err = Error::Connection {
			attempts: 3,
			source: StoreError::unavailable("identity service unreachable"),
		};
		assert!(err.to_string().contains("3 attempts"));
	}
}
