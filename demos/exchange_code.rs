//! Exchanges an authorization code, then lists the athlete's recent activities through a
//! dispatcher backed by a refreshing token manager.
//!
//! Requires `STRAVA_CLIENT_ID`, `STRAVA_CLIENT_SECRET`, and `STRAVA_CODE` (the `code` query
//! parameter from the consent redirect).

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use time::OffsetDateTime;
// self
use strava_dispatch::{
	auth::{Credential, OAuthConfig, TokenManager},
	cancel::CancelToken,
	config::ClientConfig,
	dispatch::{Dispatcher, Pagination, RequestSpec},
	http::ReqwestTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::default();
	let oauth = OAuthConfig::new(
		env::var("STRAVA_CLIENT_ID")?,
		env::var("STRAVA_CLIENT_SECRET")?,
		"http://localhost:8080/callback",
	)?;
	let transport = Arc::new(ReqwestTransport::with_timeout(config.timeout)?);
	let cancel = CancelToken::new();
	let credential = oauth.exchange_code(&*transport, &cancel, &env::var("STRAVA_CODE")?).await?;

	if let Some(athlete) = &credential.athlete {
		println!("Authorized athlete {} ({:?}).", athlete.id, athlete.username);
	}

	println!(
		"Access token valid for another {} minutes.",
		credential.time_until_expiry(OffsetDateTime::now_utc()).whole_minutes()
	);

	let manager = Arc::new(TokenManager::new(oauth, transport.clone(), Some(credential)));

	manager.set_observer(|credential: &Credential| {
		println!("Persist the refreshed credential expiring at {}.", credential.expires_at);
	});

	let dispatcher = Dispatcher::new(&config, transport, manager)?;
	let page = Pagination { page: 1, per_page: 5, ..Default::default() };
	let activities = dispatcher
		.perform_with_retry::<Vec<serde_json::Value>>(
			&cancel,
			RequestSpec::get("/athlete/activities").with_queries(page.to_query()),
		)
		.await?;

	for activity in &activities {
		println!("{} - {}", activity["id"], activity["name"]);
	}

	let state = dispatcher.rate_state();

	println!("Quota used: {}/{}.", state.usage, state.limit);

	Ok(())
}
