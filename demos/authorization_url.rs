//! Builds the consent URL for an application and reads the redirect an athlete comes back
//! with.
//!
//! Set `STRAVA_CLIENT_ID` to use a real application identifier; the demo never performs I/O.

// std
use std::env;
// crates.io
use color_eyre::{Result, eyre::eyre};
use url::Url;
// self
use strava_dispatch::auth::{
	ApprovalPrompt, AuthorizationParams, AuthorizationRequest, OAuthConfig, Scope, ScopeSet,
};

fn main() -> Result<()> {
	color_eyre::install()?;

	let client_id = env::var("STRAVA_CLIENT_ID").unwrap_or_else(|_| "12345".into());
	let config = OAuthConfig::new(client_id, "unused-secret", "http://localhost:8080/callback")?
		.with_scopes([Scope::Read, Scope::ActivityReadAll].into_iter().collect());
	let params = AuthorizationParams::default()
		.with_approval_prompt(ApprovalPrompt::Force)
		.with_random_state();
	let url = config.authorization_url(&params);

	println!("Send the athlete to {url}.");

	let echoed = AuthorizationRequest::parse(&url)?;

	println!("Requested scopes: {}.", echoed.scopes.normalized());

	// Simulate the redirect the service issues after consent.
	let expected_state = params.state.clone().ok_or_else(|| eyre!("State was not generated."))?;
	let redirect = Url::parse(&format!(
		"http://localhost:8080/callback?state={expected_state}&code=example-code&scope=read,activity:read_all"
	))?;
	let query = redirect.query_pairs().collect::<Vec<_>>();
	let lookup = |name: &str| {
		query.iter().find(|(key, _)| key == name).map(|(_, value)| value.to_string())
	};

	if lookup("state").as_deref() != Some(expected_state.as_str()) {
		return Err(eyre!("Redirect state does not match the issued state."));
	}

	let granted = ScopeSet::parse(&lookup("scope").unwrap_or_default())?;
	let code = lookup("code").ok_or_else(|| eyre!("Redirect carries no code."))?;

	println!("Granted scopes: {}.", granted.normalized());
	println!("Exchange code `{code}` with `OAuthConfig::exchange_code` next.");

	Ok(())
}
