//! Bounded retry with linear backoff.
//!
//! The delay grows linearly with the attempt number rather than
//! exponentially, matching the observed recovery behavior of the
//! identity service.

use std::{fmt::Display, future::Future, time::Duration};

use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
#[error("operation failed after {attempts} attempts: {last}")]
pub struct RetryError<E: Display + std::fmt::Debug> {
	pub attempts: u32,
	pub last: E,
}

/// Invokes `op` up to `max_attempts` times, sleeping
/// `base_delay * attempt_number` between attempts.
pub async fn with_retry<T, E, F, Fut>(
	mut op: F,
	max_attempts: u32,
	base_delay: Duration,
) -> Result<T, RetryError<E>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: Display + std::fmt::Debug,
{
	let max_attempts = max_attempts.max(1);
	let mut attempt = 1;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(e) if attempt >= max_attempts => {
				return Err(RetryError {
					attempts: max_attempts,
					last: e,
				});
			}
			Err(e) => {
				warn!(attempt, max_attempts, "operation failed, will retry; {e}");
				sleep(base_delay * attempt).await;
				attempt += 1;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;

	#[tokio::test(start_paused = true)]
	async fn succeeds_without_retrying() {
		let calls = AtomicU32::new(0);

		let out = with_retry(
			|| async {
				calls.fetch_add(1, Ordering::SeqCst);
				Ok::<_, std::io::Error>(42)
			},
			3,
			Duration::from_millis(500),
		)
		.await
		.unwrap();

		assert_eq!(out, 42);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn retries_until_success() {
		let calls = AtomicU32::new(0);

		let out = with_retry(
			|| async {
				let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
				if n < 3 {
					Err("still broken")
				} else {
					Ok(n)
				}
			},
			3,
			Duration::from_millis(500),
		)
		.await
		.unwrap();

		assert_eq!(out, 3);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn exhaustion_names_the_attempt_count() {
		let calls = AtomicU32::new(0);

		let err = with_retry(
			|| async {
				calls.fetch_add(1, Ordering::SeqCst);
				Err::<(), _>("permanently broken")
			},
			3,
			Duration::from_millis(500),
		)
		.await
		.unwrap_err();

		assert_eq!(calls.load(Ordering::SeqCst), 3);
		assert_eq!(err.attempts, 3);
		assert!(err.to_string().contains("after 3 attempts"));
	}

	#[tokio::test(start_paused = true)]
	async fn backoff_scales_linearly_with_attempts() {
		let calls = AtomicU32::new(0);
		let start = tokio::time::Instant::now();

		let _ = with_retry(
			|| async {
				calls.fetch_add(1, Ordering::SeqCst);
				Err::<(), _>("nope")
			},
			3,
			Duration::from_millis(100),
		)
		.await;

		// 100ms after attempt 1, 200ms after attempt 2
		assert_eq!(start.elapsed(), Duration::from_millis(300));
	}
}
