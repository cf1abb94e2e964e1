//! Classification of non-2xx responses into typed [`ApiError`] values.
//!
//! The service reports failures with a JSON fault payload:
//!
//! ```json
//! {"message":"Resource Not Found","errors":[{"resource":"Activity","field":"id","code":"invalid"}]}
//! ```
//!
//! [`classify`] decodes that payload when it can and otherwise keeps the raw body as the
//! message. The transport status always wins over anything the body claims.

// self
use crate::_prelude::*;

/// Coarse classification of an [`ApiError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
	/// HTTP 429.
	RateLimited,
	/// HTTP 401 or 403.
	Unauthorized,
	/// HTTP 404.
	NotFound,
	/// Any other 4xx/5xx status.
	Other,
}
impl ApiErrorKind {
	/// Classifies a raw HTTP status code.
	pub const fn from_status(status: u16) -> Self {
		match status {
			429 => Self::RateLimited,
			401 | 403 => Self::Unauthorized,
			404 => Self::NotFound,
			_ => Self::Other,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::RateLimited => "rate_limited",
			Self::Unauthorized => "unauthorized",
			Self::NotFound => "not_found",
			Self::Other => "other",
		}
	}
}
impl Display for ApiErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Resource/field fault entry reported alongside an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fault {
	/// Resource the fault refers to (e.g. `Activity`).
	#[serde(deserialize_with = "null_as_default")]
	pub resource: String,
	/// Field the fault refers to (e.g. `id`).
	#[serde(deserialize_with = "null_as_default")]
	pub field: String,
	/// Machine-readable fault code (e.g. `invalid`).
	#[serde(deserialize_with = "null_as_default")]
	pub code: String,
}

// Explicit `null` members are treated like absent ones.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FaultPayload {
	message: Option<String>,
	code: Option<String>,
	resource: Option<String>,
	field: Option<String>,
	errors: Option<Vec<Fault>>,
}

/// Immutable API error built from a non-2xx response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
	status: u16,
	message: String,
	code: Option<String>,
	resource: Option<String>,
	field: Option<String>,
	errors: Vec<Fault>,
	decoded: bool,
}
impl ApiError {
	/// HTTP status reported by the transport.
	pub fn status(&self) -> u16 {
		self.status
	}

	/// Human-readable message (the raw body when the payload did not decode).
	pub fn message(&self) -> &str {
		&self.message
	}

	/// Machine code from the payload, when present.
	pub fn code(&self) -> Option<&str> {
		self.code.as_deref()
	}

	/// Top-level resource named by the payload, when present.
	pub fn resource(&self) -> Option<&str> {
		self.resource.as_deref()
	}

	/// Top-level field named by the payload, when present.
	pub fn field(&self) -> Option<&str> {
		self.field.as_deref()
	}

	/// Resource/field fault list.
	pub fn errors(&self) -> &[Fault] {
		&self.errors
	}

	/// Whether the body matched the structured fault schema.
	///
	/// `false` means the message is the raw response text, which usually points at an
	/// unexpected payload (HTML error pages, proxies) rather than a service-reported fault.
	pub fn decoded(&self) -> bool {
		self.decoded
	}

	/// Coarse classification derived from the status code.
	pub fn kind(&self) -> ApiErrorKind {
		ApiErrorKind::from_status(self.status)
	}

	/// Returns `true` for HTTP 429.
	pub fn is_rate_limited(&self) -> bool {
		matches!(self.kind(), ApiErrorKind::RateLimited)
	}

	/// Returns `true` for HTTP 401/403.
	pub fn is_auth_error(&self) -> bool {
		matches!(self.kind(), ApiErrorKind::Unauthorized)
	}

	/// Returns `true` for HTTP 404.
	pub fn is_not_found(&self) -> bool {
		matches!(self.kind(), ApiErrorKind::NotFound)
	}
}
impl Display for ApiError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		if self.message.is_empty() {
			write!(f, "strava: API error (status: {})", self.status)
		} else {
			write!(f, "strava: {} (status: {})", self.message, self.status)
		}
	}
}

impl StdError for ApiError {}

/// Builds an [`ApiError`] from a raw status code and response body.
pub fn classify(status: u16, body: &[u8]) -> ApiError {
	match serde_json::from_slice::<FaultPayload>(body) {
		Ok(payload) => ApiError {
			status,
			message: payload.message.unwrap_or_default(),
			code: non_empty(payload.code),
			resource: non_empty(payload.resource),
			field: non_empty(payload.field),
			errors: payload.errors.unwrap_or_default(),
			decoded: true,
		},
		Err(_) => ApiError {
			status,
			message: String::from_utf8_lossy(body).into_owned(),
			code: None,
			resource: None,
			field: None,
			errors: Vec::new(),
			decoded: false,
		},
	}
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.is_empty())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: serde::Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
