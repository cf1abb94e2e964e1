// self
use crate::{_prelude::*, rate_limit::QuotaInfo};

/// Point-in-time copy of the limiter's quota and policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateState {
	/// Short-window ceiling (`0` when unknown).
	pub limit: u32,
	/// Short-window usage.
	pub usage: u32,
	/// Short-window reset instant, if known.
	#[serde(with = "time::serde::timestamp::option")]
	pub reset: Option<OffsetDateTime>,
	/// Whether pacing and retries are active.
	pub enabled: bool,
	/// Minimum spacing between consecutive requests.
	#[serde(with = "crate::config::duration_ms")]
	pub min_delay: Duration,
	/// Retry budget for rate-limited calls.
	pub max_retries: u32,
}

/// Result of checking the quota window before a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
	/// The request may proceed after the usual spacing.
	Proceed,
	/// The quota is exhausted; wait until `reset` before proceeding.
	WaitUntil {
		/// Instant when the window resets.
		reset: OffsetDateTime,
		/// Ceiling observed when the decision was made.
		limit: u32,
		/// Usage observed when the decision was made.
		usage: u32,
	},
}

/// Mutable quota window guarded by the limiter's lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct QuotaWindow {
	pub(crate) limit: u32,
	pub(crate) usage: u32,
	pub(crate) reset: Option<OffsetDateTime>,
}
impl QuotaWindow {
	pub(crate) fn decide(&self, now: OffsetDateTime) -> ThrottleDecision {
		match self.reset {
			Some(reset) if self.limit > 0 && self.usage >= self.limit && reset > now =>
				ThrottleDecision::WaitUntil { reset, limit: self.limit, usage: self.usage },
			_ => ThrottleDecision::Proceed,
		}
	}

	/// Absent or zero fields keep the stored value.
	pub(crate) fn apply(&mut self, info: &QuotaInfo) {
		if let Some(limit) = info.limit.filter(|v| *v > 0) {
			self.limit = limit;
		}
		if let Some(usage) = info.usage.filter(|v| *v > 0) {
			self.usage = usage;
		}
		if let Some(reset) = info.reset {
			self.reset = Some(reset);
		}
	}
}
