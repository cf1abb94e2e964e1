//! Response body decoding.

// std
use std::marker::PhantomData;
// crates.io
use serde::{
	Deserializer,
	de::{SeqAccess, Visitor},
};
// self
use crate::{_prelude::*, error::DecodeError};

/// Decodes `body` as JSON, recording the JSON path of any mismatch.
///
/// An empty (or whitespace-only) body decodes as `null`, so `()` and `Option<T>` targets
/// accept it while every other shape still fails.
pub fn decode_json<T>(status: u16, body: &[u8]) -> Result<T, DecodeError>
where
	T: DeserializeOwned,
{
	let body = if body.iter().all(u8::is_ascii_whitespace) { b"null".as_slice() } else { body };
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| DecodeError::Json { source, status })
}

/// List wrapper that drops items failing to decode instead of failing the whole list.
///
/// Stream endpoints return heterogeneous arrays; callers that only care about the shapes
/// they know decode into `LenientList<T>`. A body that is not an array still fails.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LenientList<T>(pub Vec<T>);
impl<T> LenientList<T> {
	/// Returns the decoded items.
	pub fn into_inner(self) -> Vec<T> {
		self.0
	}
}
impl<'de, T> Deserialize<'de> for LenientList<T>
where
	T: DeserializeOwned,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct LenientVisitor<T>(PhantomData<T>);
		impl<'de, T> Visitor<'de> for LenientVisitor<T>
		where
			T: DeserializeOwned,
		{
			type Value = LenientList<T>;

			fn expecting(&self, f: &mut Formatter) -> FmtResult {
				f.write_str("a list")
			}

			fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
			where
				A: SeqAccess<'de>,
			{
				let mut items = Vec::with_capacity(seq.size_hint().unwrap_or_default());

				while let Some(value) = seq.next_element::<serde_json::Value>()? {
					if let Ok(item) = serde_json::from_value(value) {
						items.push(item);
					}
				}

				Ok(LenientList(items))
			}
		}

		deserializer.deserialize_seq(LenientVisitor(PhantomData))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, PartialEq, Deserialize)]
	struct Stream {
		r#type: String,
		data: Vec<f64>,
	}

	#[test]
	fn decode_reports_json_path() {
		let err = decode_json::<Vec<Stream>>(200, br#"[{"type":"distance","data":["x"]}]"#)
			.expect_err("Wrong element type must fail.");
		let DecodeError::Json { source, status } = err else {
			panic!("Expected a JSON decode error.");
		};

		assert_eq!(status, 200);
		assert_eq!(source.path().to_string(), "[0].data[0]");
	}

	#[test]
	fn empty_body_decodes_into_unit_and_option_only() {
		decode_json::<()>(204, b"").expect("Empty body should decode into unit.");

		assert_eq!(decode_json::<Option<Stream>>(200, b" ").expect("Empty body should be None."), None);
		assert!(decode_json::<Stream>(200, b"").is_err());
	}

	#[test]
	fn lenient_list_skips_bad_items() {
		let list = decode_json::<LenientList<Stream>>(
			200,
			br#"[{"type":"time","data":[0,1]},{"type":"latlng","data":[[1.0,2.0]]},{"type":"altitude","data":[5.5]}]"#,
		)
		.expect("Lenient list should decode.");
		let kinds = list.0.iter().map(|s| s.r#type.as_str()).collect::<Vec<_>>();

		assert_eq!(kinds, ["time", "altitude"]);
		assert_eq!(list.0[1].data, [5.5]);
		assert!(decode_json::<LenientList<Stream>>(200, br#"{"type":"time"}"#).is_err());
	}
}
