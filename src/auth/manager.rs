//! Credential ownership with proactive, single-flight refresh.
//!
//! [`TokenManager::access_token`] hands out the current access token and refreshes it once
//! it is within the refresh window of its expiry. Concurrent callers that hit the window
//! together queue on one async guard. The first performs the exchange; the rest take its
//! outcome (the new token or the same failure), so a burst of callers costs one token
//! endpoint round trip.

mod metrics;

pub use metrics::*;

// self
use crate::{
	_prelude::*,
	auth::{Credential, OAuthConfig, TokenSecret},
	cancel::CancelToken,
	dispatch::{TokenFuture, TokenSource},
	error::TokenError,
	http::Transport,
	obs,
};

/// Refresh this long before the recorded expiry.
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::minutes(5);

/// Receives every credential the manager obtains through a refresh.
///
/// Observers run synchronously inside the refresh critical section, so they must not block
/// (persist to a channel or a fast local store instead of a network call).
pub trait TokenObserver
where
	Self: Send + Sync,
{
	/// Called once per successful refresh with the credential now in use.
	fn on_refresh(&self, credential: &Credential);
}
impl<F> TokenObserver for F
where
	F: Fn(&Credential) + Send + Sync,
{
	fn on_refresh(&self, credential: &Credential) {
		self(credential)
	}
}

// Bumped once per settled refresh; cancelled exchanges leave it untouched.
#[derive(Debug, Default)]
struct RefreshOutcome {
	generation: u64,
	failure: Option<Arc<Error>>,
}
impl RefreshOutcome {
	fn settle(&mut self, failure: Option<Arc<Error>>) {
		self.generation = self.generation.wrapping_add(1);
		self.failure = failure;
	}
}

/// Owns one credential and keeps it usable.
pub struct TokenManager {
	oauth: OAuthConfig,
	transport: Arc<dyn Transport>,
	credential: RwLock<Option<Arc<Credential>>>,
	observer: RwLock<Option<Arc<dyn TokenObserver>>>,
	refresh_guard: AsyncMutex<()>,
	last_refresh: Mutex<RefreshOutcome>,
	refresh_window: Duration,
	refresh_metrics: RefreshMetrics,
}
impl TokenManager {
	/// Creates a manager; `credential` may be supplied later via
	/// [`update_token`](Self::update_token).
	pub fn new(
		oauth: OAuthConfig,
		transport: Arc<dyn Transport>,
		credential: Option<Credential>,
	) -> Self {
		Self {
			oauth,
			transport,
			credential: RwLock::new(credential.map(Arc::new)),
			observer: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
			last_refresh: Mutex::new(RefreshOutcome::default()),
			refresh_window: DEFAULT_REFRESH_WINDOW,
			refresh_metrics: RefreshMetrics::default(),
		}
	}

	/// Overrides the proactive refresh window. Negative values are treated as zero.
	pub fn with_refresh_window(mut self, window: Duration) -> Self {
		self.refresh_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Application settings used for refresh exchanges.
	pub fn oauth(&self) -> &OAuthConfig {
		&self.oauth
	}

	/// Current credential snapshot.
	pub fn credential(&self) -> Option<Arc<Credential>> {
		self.credential.read().clone()
	}

	/// Refresh counters for this manager.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}

	/// Installs the refresh observer, replacing any previous one.
	pub fn set_observer(&self, observer: impl 'static + TokenObserver) {
		*self.observer.write() = Some(Arc::new(observer));
	}

	/// Removes the refresh observer.
	pub fn clear_observer(&self) {
		*self.observer.write() = None;
	}

	/// Replaces the credential. A credential without a refresh token keeps the one already
	/// held. The observer is not invoked.
	pub fn update_token(&self, credential: Credential) {
		self.swap(credential);
	}

	/// Returns a usable access token, refreshing first when the credential is inside the
	/// refresh window.
	///
	/// # Errors
	///
	/// - [`TokenError::Missing`] when no credential has been supplied.
	/// - [`TokenError::ExpiredWithoutRefresh`] when a refresh is due but no refresh token is held;
	///   no request is sent.
	/// - [`TokenError::RefreshFailed`] wrapping the exchange failure; the previous credential stays
	///   in place.
	/// - [`Error::Cancelled`] when `cancel` fires while waiting for or performing the refresh.
	pub async fn access_token(&self, cancel: &CancelToken) -> Result<TokenSecret> {
		let observed = self.last_refresh.lock().generation;

		if let Some(token) = self.usable_token(OffsetDateTime::now_utc())? {
			return Ok(token);
		}

		let _singleflight = cancel.run(self.refresh_guard.lock()).await?;

		// A refresh settled while this caller queued; take its outcome.
		if let Some(outcome) = self.settled_since(observed) {
			return outcome;
		}
		// `update_token` may have installed a fresh credential meanwhile.
		if let Some(token) = self.usable_token(OffsetDateTime::now_utc())? {
			return Ok(token);
		}

		let refresh_token = self
			.credential()
			.and_then(|credential| credential.refresh_token.clone())
			.ok_or(TokenError::ExpiredWithoutRefresh)?;

		self.refresh_metrics.record_attempt();

		let refreshed =
			match self.oauth.refresh_token(self.transport.as_ref(), cancel, &refresh_token).await {
				Ok(credential) => credential,
				Err(Error::Cancelled) => {
					// Leaves the generation alone so queued callers run their own exchange.
					self.refresh_metrics.record_failure();

					return Err(Error::Cancelled);
				},
				Err(e) => {
					let source = Arc::new(e);

					self.refresh_metrics.record_failure();
					self.last_refresh.lock().settle(Some(source.clone()));

					return Err(TokenError::RefreshFailed { source }.into());
				},
			};
		let stored = self.swap(refreshed);

		self.last_refresh.lock().settle(None);
		self.refresh_metrics.record_success();
		obs::token_refreshed(stored.expires_at);

		let observer = self.observer.read().clone();

		if let Some(observer) = observer {
			observer.on_refresh(&stored);
		}

		Ok(stored.access_token.clone())
	}

	/// Outcome of the latest refresh when one settled after `observed` was read.
	fn settled_since(&self, observed: u64) -> Option<Result<TokenSecret>> {
		let failure = {
			let last = self.last_refresh.lock();

			if last.generation == observed {
				return None;
			}

			last.failure.clone()
		};

		Some(match failure {
			Some(source) => Err(TokenError::RefreshFailed { source }.into()),
			None => self
				.credential()
				.map(|credential| credential.access_token.clone())
				.ok_or_else(|| TokenError::Missing.into()),
		})
	}

	/// `Ok(None)` means a refresh is due and a refresh token is available.
	fn usable_token(&self, now: OffsetDateTime) -> Result<Option<TokenSecret>> {
		let credential = self.credential().ok_or(TokenError::Missing)?;

		if !credential.expires_within(self.refresh_window, now) {
			return Ok(Some(credential.access_token.clone()));
		}
		if credential.refresh_token.is_none() {
			return Err(TokenError::ExpiredWithoutRefresh.into());
		}

		Ok(None)
	}

	fn swap(&self, mut credential: Credential) -> Arc<Credential> {
		let mut slot = self.credential.write();

		if credential.refresh_token.is_none() {
			credential.refresh_token = slot.as_ref().and_then(|prev| prev.refresh_token.clone());
		}

		let credential = Arc::new(credential);

		*slot = Some(credential.clone());

		credential
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("oauth", &self.oauth)
			.field("credential", &self.credential.read())
			.field("has_observer", &self.observer.read().is_some())
			.field("refresh_window", &self.refresh_window)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
impl TokenSource for TokenManager {
	fn access_token<'a>(&'a self, cancel: &'a CancelToken) -> TokenFuture<'a> {
		Box::pin(TokenManager::access_token(self, cancel))
	}
}
