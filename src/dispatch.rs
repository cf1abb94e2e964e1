//! Request dispatch: URL resolution, bearer auth, pacing, transport, and response handling.
//!
//! Resource modules call into the [`Dispatcher`] through `get`/`post`/`put`/`delete` or the
//! general [`Dispatcher::perform`]. Each call obtains a token from the configured
//! [`TokenSource`], waits on the shared [`RateLimiter`], sends the request, feeds the quota
//! headers back into the limiter, and either classifies the failure or decodes the body.
//! Dispatch never retries on its own; wrap a call in [`Dispatcher::perform_with_retry`] or
//! [`RateLimiter::retry_with_backoff`] to opt in.

mod decode;
mod request;
mod source;

pub use decode::*;
pub use request::*;
pub use source::*;

// self
use crate::{
	_prelude::*,
	cancel::CancelToken,
	config::{ClientConfig, QuotaHeaders},
	error::ConfigError,
	fault,
	http::{HttpRequest, HttpResponse, Transport},
	obs::{self, CallKind, CallOutcome, CallSpan},
	rate_limit::{QuotaInfo, RateLimiter, RateState},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Decoded value plus response metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse<T> {
	/// Decoded body.
	pub value: T,
	/// HTTP status.
	pub status: u16,
	/// Quota telemetry read from the response headers.
	pub quota: QuotaInfo,
}

/// Shared request dispatcher; clone the surrounding `Arc` to share it between tasks.
pub struct Dispatcher {
	base_url: String,
	transport: Arc<dyn Transport>,
	tokens: Arc<dyn TokenSource>,
	limiter: Arc<RateLimiter>,
	quota_headers: QuotaHeaders,
}
impl Dispatcher {
	/// Builds a dispatcher from a validated config.
	pub fn new(
		config: &ClientConfig,
		transport: Arc<dyn Transport>,
		tokens: Arc<dyn TokenSource>,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self {
			base_url: config.base_url.trim_end_matches('/').to_owned(),
			transport,
			tokens,
			limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
			quota_headers: config.quota_headers.clone(),
		})
	}

	/// Builds a dispatcher backed by reqwest with the configured timeout.
	#[cfg(feature = "reqwest")]
	pub fn with_reqwest(
		config: &ClientConfig,
		tokens: Arc<dyn TokenSource>,
	) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::with_timeout(config.timeout)?;

		Self::new(config, Arc::new(transport), tokens)
	}

	/// Shared rate limiter.
	pub fn limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Snapshot of the limiter's quota state.
	pub fn rate_state(&self) -> RateState {
		self.limiter.snapshot()
	}

	/// Sends `spec` and decodes a 2xx body into `T`.
	pub async fn perform<T>(&self, cancel: &CancelToken, spec: RequestSpec) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.perform_with_meta(cancel, spec).await.map(|response| response.value)
	}

	/// Like [`perform`](Self::perform) but also returns the status and quota telemetry.
	pub async fn perform_with_meta<T>(
		&self,
		cancel: &CancelToken,
		spec: RequestSpec,
	) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		let (response, quota) = self.dispatch(cancel, spec, "perform").await?;
		let value = decode_json(response.status, &response.body)?;

		Ok(ApiResponse { value, status: response.status, quota })
	}

	/// Sends `spec` and ignores any 2xx body.
	pub async fn perform_discard(&self, cancel: &CancelToken, spec: RequestSpec) -> Result<()> {
		self.dispatch(cancel, spec, "perform_discard").await.map(|_| ())
	}

	/// Sends `spec`, retrying rate-limited responses with the limiter's backoff policy.
	pub async fn perform_with_retry<T>(&self, cancel: &CancelToken, spec: RequestSpec) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.limiter.retry_with_backoff(cancel, || self.perform(cancel, spec.clone())).await
	}

	/// `GET path?query`.
	pub async fn get<T, I, K, V>(&self, cancel: &CancelToken, path: &str, query: I) -> Result<T>
	where
		T: DeserializeOwned,
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.perform(cancel, RequestSpec::get(path).with_queries(query)).await
	}

	/// `POST path` with `body`.
	pub async fn post<T>(&self, cancel: &CancelToken, path: &str, body: Body) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.perform(cancel, RequestSpec::post(path).with_body(body)).await
	}

	/// `PUT path` with `body`.
	pub async fn put<T>(&self, cancel: &CancelToken, path: &str, body: Body) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.perform(cancel, RequestSpec::put(path).with_body(body)).await
	}

	/// `DELETE path`; the response body is ignored.
	pub async fn delete(&self, cancel: &CancelToken, path: &str) -> Result<()> {
		self.perform_discard(cancel, RequestSpec::delete(path)).await
	}

	async fn dispatch(
		&self,
		cancel: &CancelToken,
		spec: RequestSpec,
		stage: &'static str,
	) -> Result<(HttpResponse, QuotaInfo)> {
		const KIND: CallKind = CallKind::Api;

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let span = CallSpan::new(KIND, stage);
		let result = span.instrument(self.send(cancel, spec)).await;

		obs::observe(KIND, result)
	}

	async fn send(
		&self,
		cancel: &CancelToken,
		spec: RequestSpec,
	) -> Result<(HttpResponse, QuotaInfo)> {
		let url = self.resolve(&spec.path, &spec.query)?;
		let token = self.tokens.access_token(cancel).await?;
		let mut request = HttpRequest::new(spec.method, url)
			.with_header("Authorization", token.bearer())
			.with_header("Accept", "application/json");

		if let Some((content_type, bytes)) = spec.body.encode() {
			request = request.with_header("Content-Type", content_type).with_body(bytes);
		}

		self.limiter.wait(cancel).await?;

		let response = cancel.run(self.transport.execute(request)).await??;
		let quota = self.quota_headers.parse(&response.headers, OffsetDateTime::now_utc());

		self.limiter.update(&quota);

		if !response.is_success() {
			return Err(fault::classify(response.status, &response.body).into());
		}

		Ok((response, quota))
	}

	fn resolve(&self, path: &str, query: &BTreeMap<String, String>) -> Result<Url, ConfigError> {
		let raw = if path.starts_with('/') || path.is_empty() {
			format!("{}{path}", self.base_url)
		} else {
			format!("{}/{path}", self.base_url)
		};
		let mut url = Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })?;

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		Ok(url)
	}
}
impl Debug for Dispatcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("base_url", &self.base_url)
			.field("limiter", &self.limiter)
			.field("quota_headers", &self.quota_headers)
			.finish()
	}
}
