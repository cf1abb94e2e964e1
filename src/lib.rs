//! Request-dispatch core for the Strava API v3: quota-aware pacing, opt-in backoff retries,
//! classified API errors, and a single-flight OAuth token manager behind one narrow
//! `perform` contract.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cancel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fault;
pub mod http;
pub mod obs;
pub mod rate_limit;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Credential, OAuthConfig, OAuthEndpoints, TokenManager},
		config::{ClientConfig, RateLimitConfig},
		dispatch::{Dispatcher, StaticToken, TokenSource},
		http::{ReqwestTransport, Transport},
	};

	/// Client identifier used by fixtures.
	pub const TEST_CLIENT_ID: &str = "test-client";
	/// Client secret used by fixtures.
	pub const TEST_CLIENT_SECRET: &str = "test-secret";

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_transport() -> Arc<dyn Transport> {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		Arc::new(ReqwestTransport::with_client(client))
	}

	/// Builds an [`OAuthConfig`] whose endpoints point at `base` (typically an `httpmock`
	/// server URL).
	pub fn test_oauth_config(base: &str) -> OAuthConfig {
		let endpoints = OAuthEndpoints::new(
			Url::parse(&format!("{base}/oauth/authorize"))
				.expect("Mock authorize endpoint should parse."),
			Url::parse(&format!("{base}/oauth/token")).expect("Mock token endpoint should parse."),
		);

		OAuthConfig::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET, "http://localhost:8080/callback")
			.expect("Fixture OAuth config should be valid.")
			.with_endpoints(endpoints)
	}

	/// Builds a credential that expires `expires_in` from now.
	pub fn credential_expiring_in(
		access: &str,
		refresh: Option<&str>,
		expires_in: Duration,
	) -> Credential {
		let mut builder = Credential::builder()
			.access_token(access)
			.expires_at(OffsetDateTime::now_utc() + expires_in);

		if let Some(refresh) = refresh {
			builder = builder.refresh_token(refresh);
		}

		builder.build().expect("Fixture credential should build.")
	}

	/// Builds a token manager wired to the mock token endpoint under `base`.
	pub fn test_token_manager(base: &str, credential: Option<Credential>) -> Arc<TokenManager> {
		Arc::new(TokenManager::new(test_oauth_config(base), test_transport(), credential))
	}

	/// Builds a dispatcher against `base` with the provided pacing config and token source.
	pub fn test_dispatcher(
		base: &str,
		rate_limit: RateLimitConfig,
		tokens: Arc<dyn TokenSource>,
	) -> Dispatcher {
		let config = ClientConfig::default().with_base_url(base).with_rate_limit(rate_limit);

		Dispatcher::new(&config, test_transport(), tokens).expect("Fixture dispatcher should build.")
	}

	/// Builds a dispatcher authenticated with a fixed bearer token.
	pub fn test_static_dispatcher(base: &str, rate_limit: RateLimitConfig) -> Dispatcher {
		test_dispatcher(base, rate_limit, Arc::new(StaticToken::new("static-token")))
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
