//! OAuth application settings and token endpoint exchanges.

// self
use crate::{
	_prelude::*,
	auth::{AuthorizationParams, AuthorizationRequest, Credential, ScopeSet, TokenResponse, TokenSecret},
	cancel::CancelToken,
	dispatch::{Body, decode_json},
	error::ConfigError,
	fault,
	http::{HttpRequest, Method, Transport},
	obs::{self, CallKind, CallOutcome, CallSpan},
};

/// Default authorize endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";
/// Default token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Authorize and token endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthEndpoints {
	/// Browser-facing authorize endpoint.
	pub authorize: Url,
	/// Token endpoint used for code exchange and refresh.
	pub token: Url,
}
impl OAuthEndpoints {
	/// Creates endpoints from parsed URLs.
	pub fn new(authorize: Url, token: Url) -> Self {
		Self { authorize, token }
	}

	/// Returns the service's public endpoints.
	pub fn strava() -> Result<Self, ConfigError> {
		Self::parse(DEFAULT_AUTHORIZE_URL, DEFAULT_TOKEN_URL)
	}

	/// Parses both endpoints.
	pub fn parse(authorize: &str, token: &str) -> Result<Self, ConfigError> {
		Ok(Self {
			authorize: Url::parse(authorize)
				.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "authorize", source })?,
			token: Url::parse(token)
				.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "token", source })?,
		})
	}
}

/// Registered application settings.
#[derive(Clone, Debug)]
pub struct OAuthConfig {
	client_id: String,
	client_secret: TokenSecret,
	redirect_uri: String,
	scopes: ScopeSet,
	endpoints: OAuthEndpoints,
}
impl OAuthConfig {
	/// Creates a config; `redirect_uri` must be an absolute URL.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		redirect_uri: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let redirect_uri = redirect_uri.into();

		Url::parse(&redirect_uri).map_err(|source| ConfigError::InvalidRedirect { source })?;

		Ok(Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			redirect_uri,
			scopes: ScopeSet::default(),
			endpoints: OAuthEndpoints::strava()?,
		})
	}

	/// Sets the scopes requested by [`authorization_url`](Self::authorization_url).
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Overrides the authorize and token endpoints.
	pub fn with_endpoints(mut self, endpoints: OAuthEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Application identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Redirect URI sent with authorization requests.
	pub fn redirect_uri(&self) -> &str {
		&self.redirect_uri
	}

	/// Requested scopes.
	pub fn scopes(&self) -> &ScopeSet {
		&self.scopes
	}

	/// Configured endpoints.
	pub fn endpoints(&self) -> &OAuthEndpoints {
		&self.endpoints
	}

	/// Builds the authorization request described by this config and `params`.
	pub fn authorization_request(&self, params: &AuthorizationParams) -> AuthorizationRequest {
		AuthorizationRequest {
			client_id: self.client_id.clone(),
			redirect_uri: self.redirect_uri.clone(),
			scopes: self.scopes.clone(),
			approval_prompt: params.approval_prompt,
			state: params.state.clone(),
		}
	}

	/// Renders the URL athletes are sent to for consent. Pure; no I/O.
	pub fn authorization_url(&self, params: &AuthorizationParams) -> Url {
		self.authorization_request(params).to_url(&self.endpoints.authorize)
	}

	/// Exchanges an authorization code for a credential.
	pub async fn exchange_code(
		&self,
		transport: &dyn Transport,
		cancel: &CancelToken,
		code: &str,
	) -> Result<Credential> {
		const KIND: CallKind = CallKind::TokenExchange;

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let span = CallSpan::new(KIND, "exchange_code");
		let result = span
			.instrument(self.token_request(transport, cancel, [
				("code", code),
				("grant_type", "authorization_code"),
			]))
			.await;

		obs::observe(KIND, result)
	}

	/// Exchanges a refresh token for a new credential.
	pub async fn refresh_token(
		&self,
		transport: &dyn Transport,
		cancel: &CancelToken,
		refresh_token: &TokenSecret,
	) -> Result<Credential> {
		const KIND: CallKind = CallKind::TokenRefresh;

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let span = CallSpan::new(KIND, "refresh_token");
		let result = span
			.instrument(self.token_request(transport, cancel, [
				("refresh_token", refresh_token.expose()),
				("grant_type", "refresh_token"),
			]))
			.await;

		obs::observe(KIND, result)
	}

	async fn token_request(
		&self,
		transport: &dyn Transport,
		cancel: &CancelToken,
		grant: [(&str, &str); 2],
	) -> Result<Credential> {
		let body = Body::form(
			[("client_id", self.client_id.as_str()), ("client_secret", self.client_secret.expose())]
				.into_iter()
				.chain(grant),
		);
		let mut request = HttpRequest::new(Method::Post, self.endpoints.token.clone())
			.with_header("Accept", "application/json");

		if let Some((content_type, bytes)) = body.encode() {
			request = request.with_header("Content-Type", content_type).with_body(bytes);
		}

		let response = cancel.run(transport.execute(request)).await??;
		let received_at = OffsetDateTime::now_utc();

		if !response.is_success() {
			return Err(fault::classify(response.status, &response.body).into());
		}

		let token = decode_json::<TokenResponse>(response.status, &response.body)?;

		Ok(token.into_credential(received_at)?)
	}
}
