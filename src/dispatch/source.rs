//! Bearer token sources consulted before each request.

// self
use crate::{_prelude::*, auth::TokenSecret, cancel::CancelToken};

/// Boxed future returned by [`TokenSource::access_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenSecret>> + 'a + Send>>;

/// Supplies the bearer token attached to every request.
///
/// [`TokenManager`](crate::auth::TokenManager) refreshes transparently; [`StaticToken`] hands
/// out whatever it was last given.
pub trait TokenSource
where
	Self: 'static + Send + Sync,
{
	/// Returns a currently-valid access token.
	fn access_token<'a>(&'a self, cancel: &'a CancelToken) -> TokenFuture<'a>;
}

/// Fixed access token, replaceable at runtime.
pub struct StaticToken(RwLock<TokenSecret>);
impl StaticToken {
	/// Wraps `token`.
	pub fn new(token: impl Into<String>) -> Self {
		Self(RwLock::new(TokenSecret::new(token)))
	}

	/// Replaces the token used by subsequent requests.
	pub fn set(&self, token: impl Into<String>) {
		*self.0.write() = TokenSecret::new(token);
	}
}
impl Debug for StaticToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StaticToken(<redacted>)")
	}
}
impl TokenSource for StaticToken {
	fn access_token<'a>(&'a self, _: &'a CancelToken) -> TokenFuture<'a> {
		let token = self.0.read().clone();

		Box::pin(async move { Ok(token) })
	}
}
