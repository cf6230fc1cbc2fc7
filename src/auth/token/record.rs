//! Immutable access token records, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::Secret},
};

/// Lifecycle status of a record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token carries an expiry that has not been reached.
	Active,
	/// Token carries no expiry and is treated as never expiring.
	NonExpiring,
	/// Token reached its expiry instant.
	Expired,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when the expiry precedes the issued-at instant.
	#[error("Expiry cannot precede the issued-at instant.")]
	ExpiryBeforeIssue,
	/// Issued when the relative expiry lands outside the representable date range.
	#[error("Expiry is outside the supported date range.")]
	ExpiryOutOfRange,
}

/// Access token issued for one OAuth2 client.
///
/// Records are replaced wholesale; nothing updates a stored record in place. When
/// `expires_at` is absent the token never expires.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: Secret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<Secret>,
	/// Token type reported by the provider (usually `bearer`).
	pub token_type: Option<String>,
	/// Scopes granted to this token.
	pub scope: ScopeSet,
	/// Issued-at instant recorded when the response was received.
	pub issued_at: OffsetDateTime,
	/// Expiry instant; `None` for tokens without `expires_in`.
	pub expires_at: Option<OffsetDateTime>,
	/// Provider-specific token response payload.
	pub raw: serde_json::Value,
}
impl AccessTokenRecord {
	/// Returns a builder for constructing records.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		match self.expires_at {
			None => TokenStatus::NonExpiring,
			Some(expiry) if instant >= expiry => TokenStatus::Expired,
			Some(_) => TokenStatus::Active,
		}
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record can still be used at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		!matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the record is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		matches!(self.status(), TokenStatus::Expired)
	}

	/// Returns `true` if a refresh token is attached.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.as_ref().is_some_and(|secret| !secret.is_empty())
	}

	/// Remaining lifetime at `instant`; `None` for non-expiring tokens.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Option<Duration> {
		self.expires_at.map(|expiry| expiry - instant)
	}
}
impl Debug for AccessTokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessTokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish_non_exhaustive()
	}
}

/// Builder for [`AccessTokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<Secret>,
	refresh_token: Option<Secret>,
	token_type: Option<String>,
	scope: ScopeSet,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	raw: Option<serde_json::Value>,
}
impl TokenRecordBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(Secret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(Secret::new(token));

		self
	}

	/// Carries an existing refresh secret onto the new record.
	pub fn refresh_secret(mut self, secret: Option<Secret>) -> Self {
		self.refresh_token = secret;

		self
	}

	/// Sets the token type.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the granted scopes.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Sets the issued-at instant.
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

	/// Attaches the provider's raw token response.
	pub fn raw(mut self, raw: serde_json::Value) -> Self {
		self.raw = Some(raw);

		self
	}

	/// Consumes the builder and produces an [`AccessTokenRecord`].
	///
	/// Leaving both `expires_at` and `expires_in` unset yields a non-expiring record.
	pub fn build(self) -> Result<AccessTokenRecord, TokenRecordBuilderError> {
		let access_token = self
			.access_token
			.filter(|secret| !secret.is_empty())
			.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) =>
				Some(issued_at.checked_add(delta).ok_or(TokenRecordBuilderError::ExpiryOutOfRange)?),
			(None, None) => None,
		};

		if expires_at.is_some_and(|expiry| expiry < issued_at) {
			return Err(TokenRecordBuilderError::ExpiryBeforeIssue);
		}

		Ok(AccessTokenRecord {
			access_token,
			refresh_token: self.refresh_token,
			token_type: self.token_type,
			scope: self.scope,
			issued_at,
			expires_at,
			raw: self.raw.unwrap_or(serde_json::Value::Null),
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn status_covers_expiring_and_non_expiring_records() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let record = AccessTokenRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(issued)
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token record builder should succeed for status transitions.");

		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:30 UTC)), TokenStatus::Active);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 01:00 UTC)), TokenStatus::Expired);
		assert!(record.is_valid_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(record.can_refresh());

		let forever = AccessTokenRecord::builder()
			.access_token("forever")
			.issued_at(issued)
			.build()
			.expect("Records without expiry should build.");

		assert_eq!(forever.status_at(macros::datetime!(2999-01-01 00:00 UTC)), TokenStatus::NonExpiring);
		assert!(forever.is_valid_at(macros::datetime!(2999-01-01 00:00 UTC)));
		assert_eq!(forever.remaining_at(issued), None);
		assert!(!forever.can_refresh());
	}

	#[test]
	fn builder_handles_relative_expiry_and_rejects_bad_input() {
		let record = AccessTokenRecord::builder()
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Token record builder should support relative expiry calculations.");

		assert_eq!(record.expires_at, Some(macros::datetime!(2025-01-01 00:30 UTC)));
		assert_eq!(record.raw, serde_json::Value::Null);
		assert_eq!(
			AccessTokenRecord::builder().access_token("").build().err(),
			Some(TokenRecordBuilderError::MissingAccessToken)
		);
		assert_eq!(
			AccessTokenRecord::builder()
				.access_token("secret")
				.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
				.expires_at(macros::datetime!(2024-12-31 00:00 UTC))
				.build()
				.err(),
			Some(TokenRecordBuilderError::ExpiryBeforeIssue)
		);
		assert_eq!(
			AccessTokenRecord::builder()
				.access_token("secret")
				.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
				.expires_in(Duration::seconds(9_999_999_999_999))
				.build()
				.err(),
			Some(TokenRecordBuilderError::ExpiryOutOfRange)
		);
	}

	#[test]
	fn debug_redacts_secrets() {
		let record = AccessTokenRecord::builder()
			.access_token("very-secret-access")
			.refresh_token("very-secret-refresh")
			.build()
			.expect("Record fixture should build.");
		let rendered = format!("{record:?}");

		assert!(!rendered.contains("very-secret"));
		assert!(rendered.contains("<redacted>"));
	}
}
