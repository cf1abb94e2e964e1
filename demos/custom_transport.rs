//! Plugs an in-process transport into the dispatcher instead of reqwest.
//!
//! 1. Implement [`Transport`] by returning an [`HttpResponse`] for each [`HttpRequest`].
//! 2. Hand the transport to [`Dispatcher::new`] together with a [`TokenSource`].
//! 3. Observe quota pacing and error classification exactly as with a real network.

// std
use std::sync::{
	Arc,
	atomic::{AtomicU32, Ordering},
};
// crates.io
use color_eyre::Result;
use time::Duration;
// self
use strava_dispatch::{
	cancel::CancelToken,
	config::{ClientConfig, RateLimitConfig},
	dispatch::{Dispatcher, RequestSpec, StaticToken, TokenSource},
	http::{HttpRequest, HttpResponse, ResponseHeaders, Transport, TransportFuture},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::default()
		.with_base_url("https://strava.invalid/api/v3")
		.with_rate_limit(RateLimitConfig::default().with_min_delay(Duration::milliseconds(20)));
	let tokens: Arc<dyn TokenSource> = Arc::new(StaticToken::new("demo-token"));
	let dispatcher = Dispatcher::new(&config, Arc::new(CannedTransport::default()), tokens)?;
	let cancel = CancelToken::new();
	let athlete = dispatcher
		.perform_with_meta::<serde_json::Value>(&cancel, RequestSpec::get("/athlete"))
		.await?;

	println!("Athlete {} answered with status {}.", athlete.value["id"], athlete.status);
	println!("Quota after one call: {:?}.", dispatcher.rate_state());

	match dispatcher
		.perform::<serde_json::Value>(&cancel, RequestSpec::get("/activities/0"))
		.await
	{
		Ok(_) => println!("Canned transport unexpectedly found activity 0."),
		Err(e) if e.is_not_found() => println!("Classified as not found: {e}."),
		Err(e) => println!("Unexpected failure: {e}."),
	}

	Ok(())
}

#[derive(Default)]
struct CannedTransport {
	calls: AtomicU32,
}
impl Transport for CannedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let usage = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

		Box::pin(async move {
			let mut headers = ResponseHeaders::default();

			headers.insert("X-RateLimit-Limit", "600,30000");
			headers.insert("X-RateLimit-Usage", format!("{usage},{usage}"));

			let (status, body) = match request.url.path() {
				"/api/v3/athlete" => (200, br#"{"id":42,"firstname":"Ada"}"#.to_vec()),
				_ => (404, br#"{"message":"Resource Not Found","errors":[]}"#.to_vec()),
			};

			Ok(HttpResponse { status, headers, body })
		})
	}
}
