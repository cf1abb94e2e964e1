//! Logical request description consumed by the dispatcher.

// crates.io
use url::form_urlencoded;
// self
use crate::{_prelude::*, error::ConfigError, http::Method};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Request body variants.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Body {
	/// No body and no `Content-Type`.
	#[default]
	Empty,
	/// Flat key/value pairs sent as `application/x-www-form-urlencoded`.
	Form(BTreeMap<String, String>),
	/// Bytes passed through untouched with the given content type.
	Raw {
		/// `Content-Type` header value.
		content_type: String,
		/// Payload.
		bytes: Vec<u8>,
	},
	/// Pre-encoded JSON document.
	Json(Vec<u8>),
}
impl Body {
	/// Builds a form body; later duplicates of a key replace earlier ones.
	pub fn form<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}

	/// Encodes `value` as JSON.
	pub fn json<T>(value: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		serde_json::to_vec(value).map(Self::Json).map_err(ConfigError::BodyEncode)
	}

	/// Wraps raw bytes with an explicit content type.
	pub fn raw(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		Self::Raw { content_type: content_type.into(), bytes: bytes.into() }
	}

	/// Returns `true` for [`Body::Empty`].
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}

	/// Returns the `Content-Type` and encoded bytes, or `None` for an empty body.
	pub fn encode(self) -> Option<(String, Vec<u8>)> {
		match self {
			Self::Empty => None,
			Self::Form(pairs) => {
				let encoded =
					form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

				Some((FORM_CONTENT_TYPE.into(), encoded.into_bytes()))
			},
			Self::Raw { content_type, bytes } => Some((content_type, bytes)),
			Self::Json(bytes) => Some((JSON_CONTENT_TYPE.into(), bytes)),
		}
	}
}

/// One logical API call: method, path relative to the base URL, query, and body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSpec {
	/// HTTP verb.
	pub method: Method,
	/// Path appended to the base URL, e.g. `/athlete/activities`.
	pub path: String,
	/// Query parameters; keys are unique.
	pub query: BTreeMap<String, String>,
	/// Request body.
	pub body: Body,
}
impl RequestSpec {
	/// Creates a spec without query or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: BTreeMap::new(), body: Body::Empty }
	}

	/// `GET` shortcut.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// `POST` shortcut.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// `PUT` shortcut.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// `DELETE` shortcut.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Sets one query parameter, replacing a previous value for the same key.
	pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.insert(key.into(), value.to_string());

		self
	}

	/// Merges several query parameters.
	pub fn with_queries<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.query.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Sets the body.
	pub fn with_body(mut self, body: Body) -> Self {
		self.body = body;

		self
	}
}

/// Page-based pagination shared by list endpoints. Zero fields are omitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
	/// 1-based page number.
	pub page: u32,
	/// Items per page.
	pub per_page: u32,
	/// Only items after this epoch timestamp.
	pub after: i64,
	/// Only items before this epoch timestamp.
	pub before: i64,
}
impl Pagination {
	/// Renders the non-zero fields as query pairs.
	pub fn to_query(&self) -> BTreeMap<String, String> {
		let mut query = BTreeMap::new();

		if self.page > 0 {
			query.insert("page".into(), self.page.to_string());
		}
		if self.per_page > 0 {
			query.insert("per_page".into(), self.per_page.to_string());
		}
		if self.after > 0 {
			query.insert("after".into(), self.after.to_string());
		}
		if self.before > 0 {
			query.insert("before".into(), self.before.to_string());
		}

		query
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn form_body_is_url_encoded() {
		let (content_type, bytes) = Body::form([("name", "Morning Ride"), ("type", "Ride")])
			.encode()
			.expect("Form body should encode.");

		assert_eq!(content_type, "application/x-www-form-urlencoded");
		assert_eq!(bytes, b"name=Morning+Ride&type=Ride");
	}

	#[test]
	fn json_and_raw_bodies_keep_their_types() {
		let (content_type, bytes) = Body::json(&serde_json::json!({ "commute": true }))
			.expect("JSON body should serialize.")
			.encode()
			.expect("JSON body should encode.");

		assert_eq!(content_type, "application/json");
		assert_eq!(bytes, br#"{"commute":true}"#);

		let (content_type, bytes) =
			Body::raw("application/gpx+xml", b"<gpx/>".to_vec()).encode().expect("Raw body should encode.");

		assert_eq!(content_type, "application/gpx+xml");
		assert_eq!(bytes, b"<gpx/>");
		assert!(Body::Empty.encode().is_none());
	}

	#[test]
	fn pagination_skips_zero_fields() {
		let query = Pagination { page: 2, per_page: 50, ..Default::default() }.to_query();

		assert_eq!(query.len(), 2);
		assert_eq!(query.get("page").map(String::as_str), Some("2"));
		assert_eq!(query.get("per_page").map(String::as_str), Some("50"));
	}
}
