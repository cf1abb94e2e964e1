// self
use crate::{_prelude::*, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by dispatched calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("strava_dispatch.call", call = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event when the limiter blocks until the quota window resets.
pub(crate) fn quota_wait(limit: u32, usage: u32, wait: Duration) {
	#[cfg(feature = "tracing")]
	tracing::debug!(
		limit,
		usage,
		wait_ms = wait.whole_milliseconds() as u64,
		"quota exhausted; waiting for reset"
	);

	#[cfg(not(feature = "tracing"))]
	let _ = (limit, usage, wait);
}

/// Emits a warn event before a rate-limited call is retried.
pub(crate) fn retry_scheduled(attempt: u32, delay: Duration) {
	#[cfg(feature = "tracing")]
	tracing::warn!(attempt, delay_ms = delay.whole_milliseconds() as u64, "rate limited; retrying");

	#[cfg(not(feature = "tracing"))]
	let _ = (attempt, delay);
}

/// Emits a debug event once the token manager stores a refreshed credential.
pub(crate) fn token_refreshed(expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::debug!(expires_at = %expires_at, "access token refreshed");

	#[cfg(not(feature = "tracing"))]
	let _ = expires_at;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn call_span_noop_without_tracing() {
		let span = CallSpan::new(CallKind::Api, "test");

		quota_wait(100, 100, Duration::seconds(1));
		retry_scheduled(1, Duration::seconds(1));
		drop(span);
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CallSpan::new(CallKind::TokenRefresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
