//! Cooperative cancellation shared by every suspension point in the crate.
//!
//! Dropping a future already cancels it; [`CancelToken`] exists so a caller can abort a
//! call from elsewhere and still receive [`Error::Cancelled`] instead of silence.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use tokio::sync::Notify;
// self
use crate::_prelude::*;

#[derive(Debug, Default)]
struct CancelState {
	cancelled: AtomicBool,
	notify: Notify,
}

/// Cloneable cancellation signal; all clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<CancelState>);
impl CancelToken {
	/// Creates a token that has not been cancelled.
	pub fn new() -> Self {
		Self::default()
	}

	/// Signals cancellation to every clone of this token.
	pub fn cancel(&self) {
		self.0.cancelled.store(true, Ordering::SeqCst);
		self.0.notify.notify_waiters();
	}

	/// Returns `true` once [`cancel`](Self::cancel) has been called.
	pub fn is_cancelled(&self) -> bool {
		self.0.cancelled.load(Ordering::SeqCst)
	}

	/// Resolves once the token is cancelled.
	pub async fn cancelled(&self) {
		loop {
			let notified = self.0.notify.notified();

			tokio::pin!(notified);
			notified.as_mut().enable();

			if self.is_cancelled() {
				return;
			}

			notified.await;
		}
	}

	/// Drives `fut` to completion unless the token is cancelled first.
	pub async fn run<F>(&self, fut: F) -> Result<F::Output>
	where
		F: Future,
	{
		if self.is_cancelled() {
			return Err(Error::Cancelled);
		}

		tokio::select! {
			biased;
			_ = self.cancelled() => Err(Error::Cancelled),
			output = fut => Ok(output),
		}
	}

	/// Sleeps for `duration` unless cancelled first. Non-positive durations only check the
	/// token.
	pub async fn sleep(&self, duration: Duration) -> Result<()> {
		let duration = std::time::Duration::try_from(duration).unwrap_or_default();

		if duration.is_zero() {
			return if self.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) };
		}

		self.run(tokio::time::sleep(duration)).await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn run_completes_when_not_cancelled() {
		let token = CancelToken::new();
		let value = token.run(async { 7 }).await.expect("Uncancelled future should complete.");

		assert_eq!(value, 7);
	}

	#[tokio::test]
	async fn precancelled_token_short_circuits() {
		let token = CancelToken::new();

		token.cancel();

		let err = token.run(async { 7 }).await.expect_err("Cancelled token must abort.");

		assert!(err.is_cancelled());
		assert!(token.sleep(Duration::ZERO).await.is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_interrupts_sleep() {
		let token = CancelToken::new();
		let canceller = token.clone();
		let started = tokio::time::Instant::now();

		tokio::spawn(async move {
			tokio::time::sleep(std::time::Duration::from_secs(1)).await;
			canceller.cancel();
		});

		let err = token
			.sleep(Duration::seconds(60))
			.await
			.expect_err("Sleep should be interrupted by cancellation.");

		assert!(err.is_cancelled());
		assert!(started.elapsed() < std::time::Duration::from_secs(60));
	}
}
