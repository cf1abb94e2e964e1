//! Client configuration consumed by the dispatcher and the rate limiter.
//!
//! Every struct deserializes with `#[serde(default)]`, so a config file only needs to name
//! the values it overrides. Durations are expressed in milliseconds on the wire.

// self
use crate::{_prelude::*, error::ConfigError};

pub use crate::rate_limit::QuotaHeaders;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.strava.com/api/v3";
/// Default transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(30);
/// Default spacing between consecutive requests.
pub const DEFAULT_MIN_DELAY: Duration = Duration::milliseconds(100);
/// Default number of retries for rate-limited calls.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Top-level client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// API base URL; request paths are appended verbatim.
	pub base_url: String,
	/// Transport timeout applied by the default reqwest transport.
	#[serde(with = "duration_ms")]
	pub timeout: Duration,
	/// Pacing and retry policy.
	pub rate_limit: RateLimitConfig,
	/// Names of the quota headers read from every response.
	pub quota_headers: QuotaHeaders,
}
impl ClientConfig {
	/// Overrides the API base URL.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();

		self
	}

	/// Overrides the transport timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the pacing and retry policy.
	pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
		self.rate_limit = rate_limit;

		self
	}

	/// Overrides the quota header names.
	pub fn with_quota_headers(mut self, quota_headers: QuotaHeaders) -> Self {
		self.quota_headers = quota_headers;

		self
	}

	/// Parses the base URL, rejecting values that cannot carry a path.
	pub fn base_url(&self) -> Result<Url, ConfigError> {
		let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
			base_url: self.base_url.clone(),
			source: Some(e),
		})?;

		if url.cannot_be_a_base() || url.query().is_some() {
			return Err(ConfigError::InvalidBaseUrl { base_url: self.base_url.clone(), source: None });
		}

		Ok(url)
	}

	/// Validates every field that can be checked without network access.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.base_url()?;
		self.quota_headers.validate()
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.into(),
			timeout: DEFAULT_TIMEOUT,
			rate_limit: RateLimitConfig::default(),
			quota_headers: QuotaHeaders::default(),
		}
	}
}

/// Pacing and retry policy for the rate limiter.
///
/// Zero values are honored as-is: a zero `min_delay` disables spacing and zero
/// `max_retries` makes [`retry_with_backoff`](crate::rate_limit::RateLimiter::retry_with_backoff)
/// run the operation once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
	/// Master switch; when `false` the limiter never waits and never retries.
	pub enabled: bool,
	/// Minimum spacing between consecutive requests.
	#[serde(with = "duration_ms")]
	pub min_delay: Duration,
	/// Maximum number of retries after rate-limited responses.
	pub max_retries: u32,
}
impl RateLimitConfig {
	/// Returns a config with pacing and retries turned off.
	pub fn disabled() -> Self {
		Self { enabled: false, ..Self::default() }
	}

	/// Overrides the minimum spacing.
	pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
		self.min_delay = min_delay;

		self
	}

	/// Overrides the retry budget.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self { enabled: true, min_delay: DEFAULT_MIN_DELAY, max_retries: DEFAULT_MAX_RETRIES }
	}
}

pub(crate) mod duration_ms {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_milliseconds() as i64)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::milliseconds)
	}

	pub mod option {
		// crates.io
		use serde::{Deserializer, Serializer};
		// self
		use crate::_prelude::*;

		pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			match value {
				Some(value) => serializer.serialize_some(&(value.whole_milliseconds() as i64)),
				None => serializer.serialize_none(),
			}
		}

		pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
		where
			D: Deserializer<'de>,
		{
			Ok(<Option<i64>>::deserialize(deserializer)?.map(Duration::milliseconds))
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_service_conventions() {
		let config = ClientConfig::default();

		assert_eq!(config.base_url, "https://www.strava.com/api/v3");
		assert_eq!(config.timeout, Duration::seconds(30));
		assert!(config.rate_limit.enabled);
		assert_eq!(config.rate_limit.min_delay, Duration::milliseconds(100));
		assert_eq!(config.rate_limit.max_retries, 3);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn partial_json_keeps_defaults() {
		let config: ClientConfig =
			serde_json::from_str(r#"{"rate_limit":{"min_delay":0,"max_retries":0}}"#)
				.expect("Partial config should deserialize.");

		assert_eq!(config.base_url, DEFAULT_BASE_URL);
		assert!(config.rate_limit.enabled);
		assert_eq!(config.rate_limit.min_delay, Duration::ZERO);
		assert_eq!(config.rate_limit.max_retries, 0);
	}

	#[test]
	fn invalid_base_urls_are_rejected() {
		let err = ClientConfig::default()
			.with_base_url("not a url")
			.validate()
			.expect_err("Unparseable base URL must be rejected.");

		assert!(matches!(err, ConfigError::InvalidBaseUrl { source: Some(_), .. }));

		let err = ClientConfig::default()
			.with_base_url("mailto:athlete@example.com")
			.validate()
			.expect_err("Base URL that cannot carry a path must be rejected.");

		assert!(matches!(err, ConfigError::InvalidBaseUrl { source: None, .. }));
	}
}
