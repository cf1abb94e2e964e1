#![cfg(all(feature = "reqwest", feature = "test"))]

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use httpmock::prelude::*;
// self
use strava_dispatch::{
	_preludet::*,
	auth::{Credential, TokenSecret},
	cancel::CancelToken,
	config::RateLimitConfig,
	dispatch::RequestSpec,
	error::TokenError,
};

const REFRESHED_BODY: &str = "{\"token_type\":\"Bearer\",\"access_token\":\"access-new\",\"refresh_token\":\"refresh-new\",\"expires_in\":21600}";

#[tokio::test]
async fn refresh_singleflight_hits_token_endpoint_once() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "refresh-old")
				.form_urlencoded_tuple("client_id", TEST_CLIENT_ID)
				.form_urlencoded_tuple("client_secret", TEST_CLIENT_SECRET);
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body(REFRESHED_BODY);
		})
		.await;
	let manager = test_token_manager(
		&server.base_url(),
		Some(credential_expiring_in("access-old", Some("refresh-old"), Duration::seconds(30))),
	);
	let cancel = CancelToken::new();
	let (a, b, c, d) = tokio::join!(
		manager.access_token(&cancel),
		manager.access_token(&cancel),
		manager.access_token(&cancel),
		manager.access_token(&cancel),
	);

	mock.assert_calls_async(1).await;

	for token in [a, b, c, d] {
		assert_eq!(token.expect("Every caller should receive a token.").expose(), "access-new");
	}

	let counts = manager.refresh_metrics().counts();

	assert_eq!((counts.attempts, counts.successes, counts.failures), (1, 1, 0));

	let current = manager.credential().expect("Credential should be present.");

	assert_eq!(current.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-new"));
	assert!(!current.expires_within(Duration::hours(5), OffsetDateTime::now_utc()));
}

#[tokio::test]
async fn refresh_singleflight_across_tasks() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body(REFRESHED_BODY);
		})
		.await;
	let manager = test_token_manager(
		&server.base_url(),
		Some(credential_expiring_in("access-old", Some("refresh-old"), Duration::seconds(-10))),
	);
	let handles = (0..8)
		.map(|_| {
			let manager = manager.clone();

			tokio::spawn(async move { manager.access_token(&CancelToken::new()).await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let token = handle
			.await
			.expect("Token task should not panic.")
			.expect("Every task should receive a token.");

		assert_eq!(token.expose(), "access-new");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_share_a_failed_refresh() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(503).delay(std::time::Duration::from_millis(200)).body("Service Unavailable");
		})
		.await;
	let manager = test_token_manager(
		&server.base_url(),
		Some(credential_expiring_in("access-old", Some("refresh-old"), Duration::seconds(30))),
	);
	let cancel = CancelToken::new();
	let (a, b, c, d) = tokio::join!(
		manager.access_token(&cancel),
		manager.access_token(&cancel),
		manager.access_token(&cancel),
		manager.access_token(&cancel),
	);

	mock.assert_calls_async(1).await;

	for result in [a, b, c, d] {
		let err = result.expect_err("Every caller should receive the refresh failure.");

		assert!(matches!(err, Error::Token(TokenError::RefreshFailed { .. })));
		assert_eq!(err.as_api().map(|api| api.status()), Some(503));
	}

	let counts = manager.refresh_metrics().counts();

	assert_eq!((counts.attempts, counts.successes, counts.failures), (1, 0, 1));
	assert_eq!(
		manager.credential().expect("Credential should remain.").access_token.expose(),
		"access-old"
	);
}

#[tokio::test]
async fn concurrent_callers_share_a_short_lived_token() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body("{\"access_token\":\"access-brief\",\"refresh_token\":\"refresh-new\",\"expires_in\":120}");
		})
		.await;
	let manager = test_token_manager(
		&server.base_url(),
		Some(credential_expiring_in("access-old", Some("refresh-old"), Duration::seconds(30))),
	);
	let cancel = CancelToken::new();
	let (a, b, c, d) = tokio::join!(
		manager.access_token(&cancel),
		manager.access_token(&cancel),
		manager.access_token(&cancel),
		manager.access_token(&cancel),
	);

	mock.assert_calls_async(1).await;

	// The new token is already inside the refresh window, yet nobody refreshes it again.
	for result in [a, b, c, d] {
		assert_eq!(result.expect("Every caller should receive a token.").expose(), "access-brief");
	}
}

#[tokio::test]
async fn dispatcher_uses_refreshed_token() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(REFRESHED_BODY);
		})
		.await;
	let api = server
		.mock_async(|when, then| {
			when.method(GET).path("/athlete").header("authorization", "Bearer access-new");
			then.status(200).header("content-type", "application/json").body("{\"id\":42}");
		})
		.await;
	let manager = test_token_manager(
		&server.base_url(),
		Some(credential_expiring_in("access-old", Some("refresh-old"), Duration::minutes(1))),
	);
	let dispatcher = test_dispatcher(
		&server.base_url(),
		RateLimitConfig::default().with_min_delay(Duration::ZERO),
		manager.clone(),
	);
	let athlete = dispatcher
		.perform::<serde_json::Value>(&CancelToken::new(), RequestSpec::get("/athlete"))
		.await
		.expect("Call with refreshed token should succeed.");

	refresh.assert_async().await;
	api.assert_async().await;

	assert_eq!(athlete["id"], 42);
}

#[tokio::test]
async fn observer_receives_each_refreshed_credential() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(REFRESHED_BODY);
		})
		.await;
	let manager = test_token_manager(
		&server.base_url(),
		Some(credential_expiring_in("access-old", Some("refresh-old"), Duration::seconds(1))),
	);
	let seen = Arc::new(Mutex::new(Vec::<Credential>::new()));
	let calls = Arc::new(AtomicUsize::new(0));

	manager.set_observer({
		let seen = seen.clone();
		let calls = calls.clone();

		move |credential: &Credential| {
			calls.fetch_add(1, Ordering::SeqCst);
			seen.lock().push(credential.clone());
		}
	});
	manager.access_token(&CancelToken::new()).await.expect("Refresh should succeed.");
	manager.access_token(&CancelToken::new()).await.expect("Fresh token should be reused.");

	assert_eq!(calls.load(Ordering::SeqCst), 1);

	let seen = seen.lock();

	assert_eq!(seen[0].access_token.expose(), "access-new");
	assert_eq!(seen[0].refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-new"));
}

#[tokio::test]
async fn refresh_without_new_refresh_token_keeps_the_old_one() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-new\",\"refresh_token\":\"\",\"expires_in\":3600}");
		})
		.await;
	let manager = test_token_manager(
		&server.base_url(),
		Some(credential_expiring_in("access-old", Some("refresh-old"), Duration::seconds(1))),
	);
	let token = manager.access_token(&CancelToken::new()).await.expect("Refresh should succeed.");
	let current = manager.credential().expect("Credential should be present.");

	assert_eq!(token.expose(), "access-new");
	assert_eq!(current.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-old"));
	assert_eq!(current.token_type, "Bearer");
}

#[tokio::test]
async fn rejected_refresh_is_classified_and_keeps_credential() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(
					"{\"message\":\"Bad Request\",\"errors\":[{\"resource\":\"RefreshToken\",\"field\":\"refresh_token\",\"code\":\"invalid\"}]}",
				);
		})
		.await;
	let manager = test_token_manager(
		&server.base_url(),
		Some(credential_expiring_in("access-old", Some("refresh-revoked"), Duration::seconds(1))),
	);
	let err = manager
		.access_token(&CancelToken::new())
		.await
		.expect_err("Revoked refresh token must fail.");

	mock.assert_async().await;

	assert!(matches!(err, Error::Token(TokenError::RefreshFailed { .. })));

	let api = err.as_api().expect("Refresh failure should expose the API error.");

	assert_eq!(api.status(), 400);
	assert_eq!(api.errors()[0].resource, "RefreshToken");

	let current = manager.credential().expect("Credential should remain.");

	assert_eq!(current.access_token.expose(), "access-old");
	assert_eq!(manager.refresh_metrics().counts().failures, 1);
}

#[tokio::test]
async fn expiring_credential_without_refresh_token_never_calls_out() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(REFRESHED_BODY);
		})
		.await;
	let manager = test_token_manager(
		&server.base_url(),
		Some(credential_expiring_in("access-old", None, Duration::seconds(30))),
	);
	let err = manager
		.access_token(&CancelToken::new())
		.await
		.expect_err("Expiring credential without refresh token must fail.");

	mock.assert_calls_async(0).await;

	assert!(matches!(err, Error::Token(TokenError::ExpiredWithoutRefresh)));
}
