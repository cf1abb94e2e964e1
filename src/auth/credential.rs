//! Credential model, builder, and token endpoint wire format.

// self
use crate::{_prelude::*, auth::TokenSecret, error::DecodeError};

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Athlete snapshot returned alongside a token.
///
/// Only the identity fields are typed; everything else the service sends is kept in
/// `extra` so callers can decode it into their own models.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteSummary {
	/// Athlete identifier.
	pub id: u64,
	/// Username, if set.
	#[serde(default)]
	pub username: Option<String>,
	/// First name.
	#[serde(default)]
	pub firstname: Option<String>,
	/// Last name.
	#[serde(default)]
	pub lastname: Option<String>,
	/// Remaining fields, untouched.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

/// OAuth credential with an absolute expiry.
///
/// Credentials are replaced wholesale on refresh; nothing mutates one in place.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
	/// Token type reported by the service (normally `Bearer`).
	pub token_type: String,
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if one was issued.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry instant.
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
	/// Athlete the credential belongs to, when the service included it.
	pub athlete: Option<AthleteSummary>,
}
impl Credential {
	/// Returns a builder.
	pub fn builder() -> CredentialBuilder {
		CredentialBuilder::default()
	}

	/// Returns `true` if the credential has expired at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}

	/// Returns `true` if the credential expires within `window` of `now` (or already has).
	pub fn expires_within(&self, window: Duration, now: OffsetDateTime) -> bool {
		now >= self.expires_at - window
	}

	/// Remaining lifetime at `now`; negative once expired.
	pub fn time_until_expiry(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("token_type", &self.token_type)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.field("athlete", &self.athlete.as_ref().map(|a| a.id))
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug, Default)]
pub struct CredentialBuilder {
	token_type: Option<String>,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	athlete: Option<AthleteSummary>,
}
impl CredentialBuilder {
	/// Overrides the token type (defaults to `Bearer`).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the instant relative expiries are measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Attaches the athlete snapshot.
	pub fn athlete(mut self, athlete: AthleteSummary) -> Self {
		self.athlete = Some(athlete);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let access_token = self.access_token.ok_or(CredentialBuilderError::MissingAccessToken)?;
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta,
			(None, None) => return Err(CredentialBuilderError::MissingExpiry),
		};

		Ok(Credential {
			token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
			access_token,
			refresh_token: self.refresh_token,
			expires_at,
			athlete: self.athlete,
		})
	}
}

/// Token endpoint response body.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
	/// Token type.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Absolute expiry in epoch seconds.
	#[serde(default)]
	pub expires_at: Option<i64>,
	/// Relative expiry in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Refresh token; an empty string counts as absent.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Access token.
	pub access_token: String,
	/// Athlete snapshot, included on code exchange.
	#[serde(default)]
	pub athlete: Option<AthleteSummary>,
}
impl TokenResponse {
	/// Converts the wire response into a [`Credential`], anchoring `expires_in` at
	/// `received_at`. An absolute `expires_at` wins when both are present.
	pub fn into_credential(self, received_at: OffsetDateTime) -> Result<Credential, DecodeError> {
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(secs), _) => OffsetDateTime::from_unix_timestamp(secs)
				.map_err(|_| DecodeError::ExpiryOutOfRange { value: secs })?,
			(None, Some(secs)) => received_at
				.checked_add(Duration::seconds(secs))
				.ok_or(DecodeError::ExpiryOutOfRange { value: secs })?,
			(None, None) => return Err(DecodeError::MissingExpiry),
		};

		Ok(Credential {
			token_type: self.token_type.filter(|t| !t.is_empty()).unwrap_or_else(|| "Bearer".into()),
			access_token: TokenSecret::new(self.access_token),
			refresh_token: self.refresh_token.filter(|t| !t.is_empty()).map(TokenSecret::new),
			expires_at,
			athlete: self.athlete,
		})
	}
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("token_type", &self.token_type)
			.field("expires_at", &self.expires_at)
			.field("expires_in", &self.expires_in)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}
