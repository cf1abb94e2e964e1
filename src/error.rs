//! Crate-level error types shared by the dispatcher, rate limiter, and token manager.

// self
use crate::{_prelude::*, fault::ApiError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Callers usually branch on the classification helpers ([`Error::is_rate_limited`],
/// [`Error::is_auth_error`], [`Error::is_not_found`]) to decide whether to retry,
/// re-authenticate, or abort.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The service answered with a non-2xx status.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A successful response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// The credential could not produce a usable access token.
	#[error(transparent)]
	Token(#[from] TokenError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The caller cancelled the operation while it was suspended.
	#[error("Operation was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns the classified API error, looking through refresh failures.
	pub fn as_api(&self) -> Option<&ApiError> {
		match self {
			Self::Api(err) => Some(err),
			Self::Token(TokenError::RefreshFailed { source }) => source.as_api(),
			_ => None,
		}
	}

	/// Returns `true` for HTTP 429 responses.
	pub fn is_rate_limited(&self) -> bool {
		self.as_api().is_some_and(ApiError::is_rate_limited)
	}

	/// Returns `true` for HTTP 401/403 responses.
	pub fn is_auth_error(&self) -> bool {
		self.as_api().is_some_and(ApiError::is_auth_error)
	}

	/// Returns `true` for HTTP 404 responses.
	pub fn is_not_found(&self) -> bool {
		self.as_api().is_some_and(ApiError::is_not_found)
	}

	/// Returns `true` if the operation was cancelled.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The API base URL cannot be parsed or cannot carry paths.
	#[error("Base URL `{base_url}` is invalid.")]
	InvalidBaseUrl {
		/// Offending base URL.
		base_url: String,
		/// Underlying parsing failure, when the URL did not parse at all.
		#[source]
		source: Option<url::ParseError>,
	},
	/// An OAuth endpoint cannot be parsed.
	#[error("The {endpoint} endpoint is invalid.")]
	InvalidEndpoint {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request path could not be joined onto the base URL.
	#[error("Request path `{path}` produces an invalid URL.")]
	InvalidPath {
		/// Offending request path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	BodyEncode(#[source] serde_json::Error),
	/// Quota header names must be non-empty.
	#[error("Quota header name for `{field}` must not be empty.")]
	EmptyHeaderName {
		/// Quota field whose header name is blank.
		field: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures decoding a successful response body.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Body is not valid JSON for the expected shape.
	#[error("Response body does not match the expected shape (status {status}).")]
	Json {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status of the response.
		status: u16,
	},
	/// Token endpoint response carried neither `expires_at` nor `expires_in`.
	#[error("Token response is missing both expires_at and expires_in.")]
	MissingExpiry,
	/// Token endpoint returned an expiry that cannot be represented.
	#[error("Token response expiry {value} is out of range.")]
	ExpiryOutOfRange {
		/// Raw expiry value.
		value: i64,
	},
}

/// Token-state failures raised by the token manager.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// No credential has been supplied.
	#[error("No credential is available.")]
	Missing,
	/// Credential is expired (or about to) and cannot be refreshed.
	#[error("Token expired and no refresh token is available.")]
	ExpiredWithoutRefresh,
	/// The refresh exchange failed; the previous credential is left in place.
	#[error("Failed to refresh the access token.")]
	RefreshFailed {
		/// Failure returned by the token endpoint exchange, shared by every caller that waited
		/// on the same refresh.
		#[source]
		source: Arc<Error>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request timed out while calling the API.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// The transport rejected the request before sending it.
	#[error("Request could not be built by the transport.")]
	Request {
		/// Transport-specific builder error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout { source: Box::new(e) }
		} else if e.is_builder() {
			Self::Request { source: Box::new(e) }
		} else {
			Self::network(e)
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::fault;

	#[test]
	fn predicates_look_through_refresh_failures() {
		let api = fault::classify(401, br#"{"message":"Authorization Error"}"#);
		let err = Error::from(TokenError::RefreshFailed { source: Arc::new(Error::Api(api)) });

		assert!(err.is_auth_error());
		assert!(!err.is_rate_limited());
		assert!(!err.is_not_found());
	}

	#[test]
	fn non_api_errors_are_unclassified() {
		let err = Error::from(TokenError::Missing);

		assert!(err.as_api().is_none());
		assert!(!err.is_auth_error());
		assert!(Error::Cancelled.is_cancelled());
	}
}
