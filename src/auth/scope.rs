//! Scope modeling for authorization requests.

// std
use std::{collections::BTreeSet, slice::Iter};
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain whitespace or the `,` delimiter.
	#[error("Scope contains a delimiter or whitespace: {scope}.")]
	InvalidCharacter {
		/// The offending scope string.
		scope: String,
	},
	/// The scope name is not one the service documents.
	#[error("Unknown scope: {scope}.")]
	Unknown {
		/// The unrecognized scope string.
		scope: String,
	},
}

/// Scopes the service documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
	/// Public profile, segments, routes, and clubs.
	Read,
	/// Private routes, segments, and events.
	ReadAll,
	/// Full profile regardless of visibility.
	ProfileReadAll,
	/// Update weight and FTP; star segments.
	ProfileWrite,
	/// Activities visible to everyone or followers.
	ActivityRead,
	/// Every activity including private ones.
	ActivityReadAll,
	/// Create and edit activities.
	ActivityWrite,
}
impl Scope {
	/// Every known scope.
	pub const ALL: [Scope; 7] = [
		Scope::Read,
		Scope::ReadAll,
		Scope::ProfileReadAll,
		Scope::ProfileWrite,
		Scope::ActivityRead,
		Scope::ActivityReadAll,
		Scope::ActivityWrite,
	];

	/// Returns the wire name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Scope::Read => "read",
			Scope::ReadAll => "read_all",
			Scope::ProfileReadAll => "profile:read_all",
			Scope::ProfileWrite => "profile:write",
			Scope::ActivityRead => "activity:read",
			Scope::ActivityReadAll => "activity:read_all",
			Scope::ActivityWrite => "activity:write",
		}
	}
}
impl Display for Scope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Scope {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Scope::ALL
			.into_iter()
			.find(|scope| scope.as_str() == s)
			.ok_or_else(|| ScopeValidationError::Unknown { scope: s.into() })
	}
}
impl From<Scope> for String {
	fn from(scope: Scope) -> Self {
		scope.as_str().into()
	}
}

/// Normalized set of scopes.
///
/// Scopes are deduplicated and sorted so equality and ordering stay consistent. The wire
/// form is comma-delimited, which is what the authorize endpoint and the `scope` query
/// parameter of the redirect both use.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeSet {
	scopes: Arc<[String]>,
}
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self { scopes: normalize(scopes)? })
	}

	/// Parses a comma-delimited scope list, skipping blank entries.
	pub fn parse(raw: &str) -> Result<Self, ScopeValidationError> {
		Self::new(raw.split(',').map(str::trim).filter(|s| !s.is_empty()))
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the normalized set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.scopes.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(|s| s.as_str())
	}

	/// Returns the comma-delimited wire form.
	pub fn normalized(&self) -> String {
		self.scopes.join(",")
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.scopes
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
impl FromIterator<Scope> for ScopeSet {
	fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
		let set = iter.into_iter().map(|scope| scope.as_str().to_owned()).collect::<BTreeSet<_>>();

		Self { scopes: Arc::from(set.into_iter().collect::<Vec<_>>()) }
	}
}

/// Iterator over scope strings.
pub struct ScopeIter<'a> {
	inner: Iter<'a, String>,
}
impl<'a> Iterator for ScopeIter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(|s| s.as_str())
	}
}
impl<'a> IntoIterator for &'a ScopeSet {
	type IntoIter = ScopeIter<'a>;
	type Item = &'a str;

	fn into_iter(self) -> Self::IntoIter {
		ScopeIter { inner: self.scopes.iter() }
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.scopes.len()))?;

		for scope in self.scopes.iter() {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ScopeSet::new(values).map_err(DeError::custom)
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut set = BTreeSet::new();

	for scope in scopes {
		let owned: String = scope.into();

		if owned.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if owned.chars().any(|c| c.is_whitespace() || c == ',') {
			return Err(ScopeValidationError::InvalidCharacter { scope: owned });
		}

		set.insert(owned);
	}

	Ok(Arc::from(set.into_iter().collect::<Vec<_>>()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_normalize_and_join_with_commas() {
		let lhs = ScopeSet::new(["activity:read_all", "read", "read"])
			.expect("Left-hand scope set should be valid.");
		let rhs = ScopeSet::parse("read, activity:read_all")
			.expect("Right-hand scope set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.normalized(), "activity:read_all,read");
	}

	#[test]
	fn scopes_reject_delimiters_and_whitespace() {
		let err = ScopeSet::new(["read,write"]).expect_err("Embedded commas must be rejected.");

		assert!(matches!(err, ScopeValidationError::InvalidCharacter { .. }));
		assert!(ScopeSet::new([""]).is_err());
		assert!(ScopeSet::new(["contains space"]).is_err());
		assert!(ScopeSet::parse("").expect("Empty string should parse.").is_empty());
		assert!(ScopeSet::parse(" , ").expect("Blank entries should be skipped.").is_empty());
	}

	#[test]
	fn known_scopes_round_trip_by_name() {
		for scope in Scope::ALL {
			assert_eq!(Scope::from_str(scope.as_str()), Ok(scope));
		}

		assert!(Scope::from_str("activity:delete").is_err());

		let set = [Scope::ActivityWrite, Scope::Read].into_iter().collect::<ScopeSet>();

		assert!(set.contains("activity:write"));
		assert_eq!(set.iter().collect::<Vec<_>>(), ["activity:write", "read"]);
	}
}
