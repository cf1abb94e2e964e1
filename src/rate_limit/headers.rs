//! Quota header parsing.
//!
//! The service reports two windows in each header as `"<short>,<daily>"`, e.g.
//! `X-RateLimit-Limit: 600,30000` and `X-RateLimit-Usage: 14,1220`. The short (15 minute)
//! window drives throttling; the daily pair is surfaced for callers.

// self
use crate::{
	_prelude::*,
	config::duration_ms,
	error::ConfigError,
	http::ResponseHeaders,
};

/// Default header carrying quota ceilings.
pub const DEFAULT_LIMIT_HEADER: &str = "X-RateLimit-Limit";
/// Default header carrying quota usage.
pub const DEFAULT_USAGE_HEADER: &str = "X-RateLimit-Usage";
/// Default header carrying the window reset as epoch seconds.
pub const DEFAULT_RESET_HEADER: &str = "X-RateLimit-Reset";
/// Default length of the short quota window.
pub const DEFAULT_QUOTA_WINDOW: Duration = Duration::minutes(15);

/// Header names (and reset fallback) used to read quota telemetry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaHeaders {
	/// Ceiling header.
	pub limit: String,
	/// Usage header.
	pub usage: String,
	/// Optional reset header in epoch seconds.
	pub reset: Option<String>,
	/// Aligned window used to derive a reset instant when no reset header is present.
	/// `None` leaves the reset unknown.
	#[serde(with = "duration_ms::option")]
	pub window: Option<Duration>,
}
impl QuotaHeaders {
	/// Overrides the reset header name; `None` disables reading it.
	pub fn with_reset(mut self, reset: Option<String>) -> Self {
		self.reset = reset;

		self
	}

	/// Overrides the derived-reset window; `None` disables derivation.
	pub fn with_window(mut self, window: Option<Duration>) -> Self {
		self.window = window;

		self
	}

	/// Rejects blank header names.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.limit.trim().is_empty() {
			return Err(ConfigError::EmptyHeaderName { field: "limit" });
		}
		if self.usage.trim().is_empty() {
			return Err(ConfigError::EmptyHeaderName { field: "usage" });
		}
		if self.reset.as_deref().is_some_and(|reset| reset.trim().is_empty()) {
			return Err(ConfigError::EmptyHeaderName { field: "reset" });
		}

		Ok(())
	}

	/// Parses quota telemetry out of `headers`, observed at `now`.
	pub fn parse(&self, headers: &ResponseHeaders, now: OffsetDateTime) -> QuotaInfo {
		let (limit, daily_limit) =
			headers.get(&self.limit).map(parse_pair).unwrap_or_default();
		let (usage, daily_usage) =
			headers.get(&self.usage).map(parse_pair).unwrap_or_default();
		let mut reset = self
			.reset
			.as_deref()
			.and_then(|name| headers.get(name))
			.and_then(|raw| raw.trim().parse::<i64>().ok())
			.filter(|secs| *secs > 0)
			.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok());

		if reset.is_none() && (limit.is_some() || usage.is_some()) {
			reset = self.window.and_then(|window| next_boundary(now, window));
		}

		QuotaInfo { limit, usage, reset, daily_limit, daily_usage }
	}
}
impl Default for QuotaHeaders {
	fn default() -> Self {
		Self {
			limit: DEFAULT_LIMIT_HEADER.into(),
			usage: DEFAULT_USAGE_HEADER.into(),
			reset: Some(DEFAULT_RESET_HEADER.into()),
			window: Some(DEFAULT_QUOTA_WINDOW),
		}
	}
}

/// Quota telemetry read from one response. Every field is optional.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaInfo {
	/// Short-window ceiling.
	pub limit: Option<u32>,
	/// Short-window usage.
	pub usage: Option<u32>,
	/// Short-window reset instant.
	#[serde(with = "time::serde::timestamp::option")]
	pub reset: Option<OffsetDateTime>,
	/// Daily ceiling.
	pub daily_limit: Option<u32>,
	/// Daily usage.
	pub daily_usage: Option<u32>,
}
impl QuotaInfo {
	/// Returns `true` when no field was present.
	pub fn is_empty(&self) -> bool {
		self.limit.is_none()
			&& self.usage.is_none()
			&& self.reset.is_none()
			&& self.daily_limit.is_none()
			&& self.daily_usage.is_none()
	}
}

fn parse_pair(raw: &str) -> (Option<u32>, Option<u32>) {
	let mut parts = raw.split(',').map(|part| part.trim().parse::<u32>().ok());

	(parts.next().flatten(), parts.next().flatten())
}

fn next_boundary(now: OffsetDateTime, window: Duration) -> Option<OffsetDateTime> {
	let window = window.whole_seconds();

	if window <= 0 {
		return None;
	}

	let ts = now.unix_timestamp();

	OffsetDateTime::from_unix_timestamp(ts - ts.rem_euclid(window) + window).ok()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn parses_short_and_daily_windows() {
		let headers = [("x-ratelimit-limit", "600,30000"), ("x-ratelimit-usage", "14, 1220")]
			.into_iter()
			.collect::<ResponseHeaders>();
		let info = QuotaHeaders::default().parse(&headers, datetime!(2025-01-01 10:07:30 UTC));

		assert_eq!(info.limit, Some(600));
		assert_eq!(info.usage, Some(14));
		assert_eq!(info.daily_limit, Some(30000));
		assert_eq!(info.daily_usage, Some(1220));
		assert_eq!(info.reset, Some(datetime!(2025-01-01 10:15:00 UTC)));
	}

	#[test]
	fn explicit_reset_header_wins() {
		let headers = [
			("X-RateLimit-Limit", "100"),
			("X-RateLimit-Usage", "100"),
			("X-RateLimit-Reset", "1735725600"),
		]
		.into_iter()
		.collect::<ResponseHeaders>();
		let info = QuotaHeaders::default().parse(&headers, datetime!(2025-01-01 09:58:00 UTC));

		assert_eq!(info.limit, Some(100));
		assert_eq!(info.daily_limit, None);
		assert_eq!(info.reset, Some(datetime!(2025-01-01 10:00:00 UTC)));
	}

	#[test]
	fn missing_headers_yield_empty_info() {
		let info = QuotaHeaders::default().parse(&ResponseHeaders::default(), OffsetDateTime::now_utc());

		assert!(info.is_empty());
	}

	#[test]
	fn malformed_values_are_ignored() {
		let headers = [("X-RateLimit-Limit", "lots"), ("X-RateLimit-Usage", "7")]
			.into_iter()
			.collect::<ResponseHeaders>();
		let info = QuotaHeaders::default()
			.with_window(None)
			.parse(&headers, OffsetDateTime::now_utc());

		assert_eq!(info.limit, None);
		assert_eq!(info.usage, Some(7));
		assert_eq!(info.reset, None);
	}

	#[test]
	fn blank_header_names_fail_validation() {
		let headers = QuotaHeaders { limit: " ".into(), ..QuotaHeaders::default() };

		assert!(matches!(headers.validate(), Err(ConfigError::EmptyHeaderName { field: "limit" })));
	}
}
