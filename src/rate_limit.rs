//! Quota-aware pacing and opt-in retries for outgoing calls.
//!
//! [`RateLimiter::wait`] runs before every request. It blocks until the short quota window
//! resets when the last observed usage reached the ceiling, then enforces a global minimum
//! spacing. [`RateLimiter::update`] absorbs the quota headers of every response, and
//! [`RateLimiter::retry_with_backoff`] re-runs an operation after rate-limited failures.

mod backoff;
mod headers;
mod state;

pub use backoff::*;
pub use headers::*;
pub use state::*;

// self
use crate::{_prelude::*, cancel::CancelToken, config::RateLimitConfig, obs};

/// Shared limiter; one instance serves every caller of a dispatcher.
#[derive(Debug)]
pub struct RateLimiter {
	config: RateLimitConfig,
	quota: Mutex<QuotaWindow>,
	// Serializes waiters so spacing applies across concurrent callers.
	pacing: AsyncMutex<()>,
}
impl RateLimiter {
	/// Creates a limiter with an empty quota window.
	pub fn new(config: RateLimitConfig) -> Self {
		Self { config, quota: Mutex::new(QuotaWindow::default()), pacing: AsyncMutex::new(()) }
	}

	/// Returns the policy the limiter was built with.
	pub fn config(&self) -> &RateLimitConfig {
		&self.config
	}

	/// Suspends the caller until the next request may be sent.
	///
	/// Returns [`Error::Cancelled`] if `cancel` fires first; the stored usage is only
	/// cleared after a completed reset wait.
	pub async fn wait(&self, cancel: &CancelToken) -> Result<()> {
		if !self.config.enabled {
			return Ok(());
		}

		let _pacing = cancel.run(self.pacing.lock()).await?;
		let now = OffsetDateTime::now_utc();
		let decision = self.quota.lock().decide(now);

		if let ThrottleDecision::WaitUntil { reset, limit, usage } = decision {
			let wait = reset - now;

			obs::quota_wait(limit, usage, wait);
			obs::record_throttle();
			cancel.sleep(wait).await?;

			self.quota.lock().usage = 0;
		}

		cancel.sleep(self.config.min_delay).await
	}

	/// Records quota telemetry from a response. Absent and zero fields are ignored.
	pub fn update(&self, info: &QuotaInfo) {
		if !self.config.enabled {
			return;
		}

		self.quota.lock().apply(info);
	}

	/// Returns a copy of the current quota and policy.
	pub fn snapshot(&self) -> RateState {
		let quota = *self.quota.lock();

		RateState {
			limit: quota.limit,
			usage: quota.usage,
			reset: quota.reset,
			enabled: self.config.enabled,
			min_delay: self.config.min_delay,
			max_retries: self.config.max_retries,
		}
	}

	/// Runs `operation`, retrying rate-limited failures with exponential backoff.
	///
	/// Other errors return immediately. After `max_retries` retries the last error is
	/// returned. When the limiter is disabled the operation runs exactly once.
	pub async fn retry_with_backoff<T, F, Fut>(
		&self,
		cancel: &CancelToken,
		mut operation: F,
	) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		if !self.config.enabled {
			return operation().await;
		}

		let mut delays = Backoff::default();
		let mut attempt = 0;

		loop {
			match operation().await {
				Err(e) if e.is_rate_limited() && attempt < self.config.max_retries => {
					let delay = delays.next().unwrap_or(MAX_BACKOFF);

					attempt += 1;

					obs::retry_scheduled(attempt, delay);
					cancel.sleep(delay).await?;
				},
				result => return result,
			}
		}
	}
}
impl Default for RateLimiter {
	fn default() -> Self {
		Self::new(RateLimitConfig::default())
	}
}
