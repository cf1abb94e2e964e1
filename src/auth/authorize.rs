//! Authorization URL construction and parsing.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, auth::ScopeSet};

const STATE_LEN: usize = 32;

/// Whether the consent screen is shown to athletes who already granted access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalPrompt {
	/// Skip the prompt when access was granted before.
	#[default]
	Auto,
	/// Always show the prompt.
	Force,
}
impl ApprovalPrompt {
	/// Returns the wire value.
	pub const fn as_str(self) -> &'static str {
		match self {
			ApprovalPrompt::Auto => "auto",
			ApprovalPrompt::Force => "force",
		}
	}
}
impl FromStr for ApprovalPrompt {
	type Err = AuthorizationParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"auto" => Ok(Self::Auto),
			"force" => Ok(Self::Force),
			other => Err(AuthorizationParseError::InvalidParameter {
				name: "approval_prompt",
				value: other.into(),
			}),
		}
	}
}

/// Errors raised by [`AuthorizationRequest::parse`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthorizationParseError {
	/// A required query parameter is missing.
	#[error("Authorization URL is missing `{0}`.")]
	MissingParameter(&'static str),
	/// A query parameter holds an unexpected value.
	#[error("Authorization URL parameter `{name}` has invalid value `{value}`.")]
	InvalidParameter {
		/// Parameter name.
		name: &'static str,
		/// Raw value.
		value: String,
	},
}

/// Optional knobs for an authorization URL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizationParams {
	/// Consent prompt behavior; omitted from the URL when `None`.
	pub approval_prompt: Option<ApprovalPrompt>,
	/// Anti-forgery value echoed back on the redirect.
	pub state: Option<String>,
}
impl AuthorizationParams {
	/// Sets the approval prompt.
	pub fn with_approval_prompt(mut self, prompt: ApprovalPrompt) -> Self {
		self.approval_prompt = Some(prompt);

		self
	}

	/// Sets the state value.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Sets a freshly generated state value.
	pub fn with_random_state(self) -> Self {
		self.with_state(random_state())
	}
}

/// Every parameter carried by an authorization URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRequest {
	/// Application identifier.
	pub client_id: String,
	/// Redirect target registered with the application.
	pub redirect_uri: String,
	/// Requested scopes; omitted from the URL when empty.
	pub scopes: ScopeSet,
	/// Consent prompt behavior.
	pub approval_prompt: Option<ApprovalPrompt>,
	/// Anti-forgery state.
	pub state: Option<String>,
}
impl AuthorizationRequest {
	/// Renders the request onto `endpoint`, replacing any query it already had.
	pub fn to_url(&self, endpoint: &Url) -> Url {
		let mut url = endpoint.clone();

		url.set_query(None);

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("client_id", &self.client_id);
			pairs.append_pair("response_type", "code");
			pairs.append_pair("redirect_uri", &self.redirect_uri);

			if !self.scopes.is_empty() {
				pairs.append_pair("scope", &self.scopes.normalized());
			}
			if let Some(prompt) = self.approval_prompt {
				pairs.append_pair("approval_prompt", prompt.as_str());
			}
			if let Some(state) = &self.state {
				pairs.append_pair("state", state);
			}
		}

		url
	}

	/// Recovers the request from a rendered authorization URL.
	pub fn parse(url: &Url) -> Result<Self, AuthorizationParseError> {
		let mut client_id = None;
		let mut response_type = None;
		let mut redirect_uri = None;
		let mut scopes = ScopeSet::default();
		let mut approval_prompt = None;
		let mut state = None;

		for (k, v) in url.query_pairs() {
			match k.as_ref() {
				"client_id" => client_id = Some(v.into_owned()),
				"response_type" => response_type = Some(v.into_owned()),
				"redirect_uri" => redirect_uri = Some(v.into_owned()),
				"scope" =>
					scopes = ScopeSet::parse(&v).map_err(|_| {
						AuthorizationParseError::InvalidParameter { name: "scope", value: v.to_string() }
					})?,
				"approval_prompt" => approval_prompt = Some(v.parse()?),
				"state" => state = Some(v.into_owned()),
				_ => {},
			}
		}

		match response_type.as_deref() {
			Some("code") => {},
			Some(other) =>
				return Err(AuthorizationParseError::InvalidParameter {
					name: "response_type",
					value: other.into(),
				}),
			None => return Err(AuthorizationParseError::MissingParameter("response_type")),
		}

		Ok(Self {
			client_id: client_id.ok_or(AuthorizationParseError::MissingParameter("client_id"))?,
			redirect_uri: redirect_uri
				.ok_or(AuthorizationParseError::MissingParameter("redirect_uri"))?,
			scopes,
			approval_prompt,
			state,
		})
	}
}

/// Generates a random alphanumeric state value.
pub fn random_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}
