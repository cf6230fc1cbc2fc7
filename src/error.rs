//! Orchestrator-level error types shared across grants, registries, and stores.

// self
use crate::{_prelude::*, auth::ClientId, provider::GrantType};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by the orchestrator and grant strategies.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Network or transport failure while talking to the identity provider; callers may retry.
	#[error(transparent)]
	ProviderUnavailable(#[from] ProviderUnavailableError),

	/// The registry has no descriptor for the requested client.
	#[error("OAuth2 client `{client_id}` is not registered.")]
	UnknownClient {
		/// Client identifier that failed to resolve.
		client_id: ClientId,
	},
	/// The resource-owner grant was attempted without a username/password pair.
	#[error("OAuth2 client `{client_id}` requires resource-owner credentials.")]
	MissingCredentials {
		/// Client identifier that needs credentials.
		client_id: ClientId,
	},
	/// The stored record carries no refresh token, so a refresh cannot be attempted.
	#[error("No refresh token is available for OAuth2 client `{client_id}`.")]
	NoRefreshToken {
		/// Client identifier whose record lacks a refresh token.
		client_id: ClientId,
	},
	/// The callback `state` differs from the pending authorization state.
	#[error("Authorization state mismatch for OAuth2 client `{client_id}`.")]
	StateMismatch {
		/// Client identifier tied to the callback.
		client_id: ClientId,
	},
	/// No pending authorization exists for the client (replayed or stale callback).
	#[error("No pending authorization exists for OAuth2 client `{client_id}`.")]
	NoPendingAuthorization {
		/// Client identifier tied to the callback.
		client_id: ClientId,
	},
	/// The identity provider rejected the credentials, code, or refresh token.
	#[error("Provider rejected the {grant} grant: {reason}.")]
	AuthenticationFailed {
		/// Grant that was rejected.
		grant: GrantType,
		/// Classified rejection category.
		kind: RejectionKind,
		/// Provider-supplied message.
		reason: String,
	},
}
impl Error {
	/// Returns `true` for the failures after which a refresh may fall back to full re-acquisition.
	pub fn is_refresh_rejection(&self) -> bool {
		matches!(self, Self::AuthenticationFailed { .. } | Self::NoRefreshToken { .. })
	}
}

/// Provider rejection categories carried by [`Error::AuthenticationFailed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
	/// Bad authorization code, refresh token, or resource-owner credentials.
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scopes exceed what the client may obtain.
	InsufficientScope,
}
impl Display for RejectionKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			Self::InvalidGrant => "invalid_grant",
			Self::InvalidClient => "invalid_client",
			Self::InsufficientScope => "insufficient_scope",
		})
	}
}

/// Configuration and validation failures raised locally, before or after a provider call.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Descriptor contains an endpoint the OAuth client rejects.
	#[error("Descriptor contains an invalid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::provider::ClientDescriptorError),
	/// Registry document could not be parsed.
	#[error("Client registry document is invalid at `{path}`.")]
	RegistryParse {
		/// JSON path of the offending value.
		path: String,
		/// Underlying parse failure.
		#[source]
		source: serde_json::Error,
	},

	/// Operation requires a different grant type than the client is configured for.
	#[error("OAuth2 client `{client_id}` uses the {actual} grant, not {expected}.")]
	GrantMismatch {
		/// Client identifier.
		client_id: ClientId,
		/// Grant required by the operation.
		expected: GrantType,
		/// Grant configured for the client.
		actual: GrantType,
	},
	/// A grant strategy received a request meant for another grant.
	#[error("The {grant} strategy cannot serve a {request} request.")]
	UnsupportedRequest {
		/// Grant served by the strategy.
		grant: GrantType,
		/// Label of the rejected request.
		request: &'static str,
	},
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// Token endpoint response could not be captured as a raw payload.
	#[error("Token endpoint response could not be captured.")]
	RawPayload {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a zero duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
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

/// Transient failures reaching or understanding the token endpoint (safe to retry manually).
#[derive(Debug, ThisError)]
pub enum ProviderUnavailableError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or crate-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl ProviderUnavailableError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// HTTP status observed with the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::TokenEndpoint { status, .. } | Self::TokenResponseParse { status, .. } => *status,
			Self::Network { .. } | Self::Io(_) => None,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ProviderUnavailableError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn client() -> ClientId {
		ClientId::new("billing").expect("Client fixture should be valid.")
	}

	#[test]
	fn refresh_rejections_are_classified() {
		let rejected = Error::AuthenticationFailed {
			grant: GrantType::RefreshToken,
			kind: RejectionKind::InvalidGrant,
			reason: "refresh token revoked".into(),
		};

		assert!(rejected.is_refresh_rejection());
		assert!(Error::NoRefreshToken { client_id: client() }.is_refresh_rejection());

		let unavailable = Error::from(ProviderUnavailableError::TokenEndpoint {
			message: "bad gateway".into(),
			status: Some(502),
			retry_after: None,
		});

		assert!(!unavailable.is_refresh_rejection());
		assert!(!Error::UnknownClient { client_id: client() }.is_refresh_rejection());
	}

	#[test]
	fn messages_name_the_client_and_grant() {
		let err = Error::MissingCredentials { client_id: client() };

		assert_eq!(err.to_string(), "OAuth2 client `billing` requires resource-owner credentials.");

		let err = Error::AuthenticationFailed {
			grant: GrantType::ResourceOwnerPassword,
			kind: RejectionKind::InvalidGrant,
			reason: "bad password".into(),
		};

		assert_eq!(err.to_string(), "Provider rejected the password grant: bad password.");
	}
}
