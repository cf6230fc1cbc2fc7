//! Provider hooks that shape token requests and classify token endpoint failures.
//!
//! Grant strategies consult a [`ProviderHooks`] implementation whenever the token endpoint
//! answers with an error, and before every request to add provider-specific form fields.
//! The hooks work on crate-owned data only, so they stay independent of the HTTP client.

// self
use crate::{_prelude::*, error::RejectionKind, provider::GrantType};

/// Customization points for providers that deviate from RFC 6749 error semantics.
pub trait ProviderHooks: Send + Sync {
	/// Maps a token endpoint failure into the crate's error categories.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds provider-specific form parameters (`audience`, `resource`, ...) to a token request.
	fn augment_token_request(&self, _grant: GrantType, _form: &mut BTreeMap<String, String>) {}
}

/// Token endpoint failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Grant material (code, refresh token, resource-owner credentials) was rejected.
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scopes exceed what the client may obtain.
	InsufficientScope,
	/// Temporary failure; the caller may retry later.
	Transient,
}
impl ProviderErrorKind {
	/// Rejection category for permanent failures; `None` for transient ones.
	pub fn rejection(self) -> Option<RejectionKind> {
		match self {
			Self::InvalidGrant => Some(RejectionKind::InvalidGrant),
			Self::InvalidClient => Some(RejectionKind::InvalidClient),
			Self::InsufficientScope => Some(RejectionKind::InsufficientScope),
			Self::Transient => None,
		}
	}
}

/// Primitive description of a failed token request handed to [`ProviderHooks`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Grant of the failing request.
	pub grant: GrantType,
	/// HTTP status code, when a response was received.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Leading part of a non-JSON response body.
	pub body_preview: Option<String>,
	/// Whether the request failed before a response arrived.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an empty context for `grant`.
	pub fn new(grant: GrantType) -> Self {
		Self {
			grant,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Context for a request that never produced a response.
	pub fn network_failure(grant: GrantType) -> Self {
		Self { network_error: true, ..Self::new(grant) }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description`.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview, truncated to a bounded number of characters.
	pub fn with_body_preview(mut self, body: impl AsRef<str>) -> Self {
		let body = body.as_ref();
		let mut preview: String = body.chars().take(Self::BODY_PREVIEW_LIMIT).collect();

		if preview.len() < body.len() {
			preview.push('…');
		}

		self.body_preview = Some(preview);

		self
	}

	/// Human-readable reason assembled from the provider's fields.
	///
	/// Falls back to the body preview, then to the bare status, when no OAuth fields exist.
	pub fn reason(&self) -> String {
		let body = self.body_preview.as_deref().map(str::trim).filter(|body| !body.is_empty());

		match (self.oauth_error.as_deref(), self.error_description.as_deref()) {
			(_, Some(description)) => description.to_owned(),
			(Some(code), None) => code.to_owned(),
			(None, None) => match (self.http_status, body) {
				(Some(status), Some(body)) => format!("HTTP {status}: {body}"),
				(None, Some(body)) => body.to_owned(),
				(Some(status), None) => format!("HTTP {status}"),
				(None, None) => "no response".into(),
			},
		}
	}
}

/// RFC 6749 §5.2 heuristics.
///
/// Structured OAuth fields win, then hints in the description or body, then the HTTP status.
/// Network failures are always transient.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultProviderHooks;
impl ProviderHooks for DefaultProviderHooks {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		[ctx.oauth_error.as_deref(), ctx.error_description.as_deref()]
			.into_iter()
			.flatten()
			.find_map(exact_code)
			.or_else(|| {
				[ctx.error_description.as_deref(), ctx.body_preview.as_deref()]
					.into_iter()
					.flatten()
					.find_map(embedded_code)
			})
			.unwrap_or_else(|| status_kind(ctx.http_status))
	}
}

const ERROR_CODES: [(&str, ProviderErrorKind); 9] = [
	("invalid_grant", ProviderErrorKind::InvalidGrant),
	("access_denied", ProviderErrorKind::InvalidGrant),
	("invalid_client", ProviderErrorKind::InvalidClient),
	("unauthorized_client", ProviderErrorKind::InvalidClient),
	("invalid_scope", ProviderErrorKind::InsufficientScope),
	("insufficient_scope", ProviderErrorKind::InsufficientScope),
	("temporarily_unavailable", ProviderErrorKind::Transient),
	("server_error", ProviderErrorKind::Transient),
	("slow_down", ProviderErrorKind::Transient),
];

fn exact_code(value: &str) -> Option<ProviderErrorKind> {
	let value = value.trim();

	ERROR_CODES.iter().find(|(code, _)| value.eq_ignore_ascii_case(code)).map(|(_, kind)| *kind)
}

fn embedded_code(text: &str) -> Option<ProviderErrorKind> {
	let lowered = text.to_ascii_lowercase();

	ERROR_CODES.iter().find(|(code, _)| lowered.contains(code)).map(|(_, kind)| *kind)
}

fn status_kind(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn oauth_fields_take_precedence_over_status() {
		let ctx = ProviderErrorContext::new(GrantType::ResourceOwnerPassword)
			.with_http_status(401)
			.with_oauth_error("invalid_grant");

		assert_eq!(DefaultProviderHooks.classify_token_error(&ctx), ProviderErrorKind::InvalidGrant);

		let ctx = ProviderErrorContext::new(GrantType::RefreshToken)
			.with_http_status(400)
			.with_oauth_error("vendor_specific")
			.with_error_description("invalid_client: secret rotated");

		assert_eq!(
			DefaultProviderHooks.classify_token_error(&ctx),
			ProviderErrorKind::InvalidClient
		);
		assert_eq!(ctx.reason(), "invalid_client: secret rotated");
	}

	#[test]
	fn body_and_status_fallbacks() {
		let ctx = ProviderErrorContext::new(GrantType::ClientCredentials)
			.with_http_status(500)
			.with_body_preview("<html>temporarily_unavailable</html>");

		assert_eq!(DefaultProviderHooks.classify_token_error(&ctx), ProviderErrorKind::Transient);
		assert_eq!(ctx.reason(), "HTTP 500: <html>temporarily_unavailable</html>");

		let ctx = ProviderErrorContext::new(GrantType::ClientCredentials)
			.with_http_status(403)
			.with_body_preview("  \n");

		assert_eq!(ctx.reason(), "HTTP 403");

		let ctx = ProviderErrorContext::new(GrantType::ClientCredentials).with_http_status(403);

		assert_eq!(
			DefaultProviderHooks.classify_token_error(&ctx),
			ProviderErrorKind::InsufficientScope
		);
		assert_eq!(ctx.reason(), "HTTP 403");

		let ctx = ProviderErrorContext::network_failure(GrantType::AuthorizationCode)
			.with_oauth_error("invalid_grant");

		assert_eq!(DefaultProviderHooks.classify_token_error(&ctx), ProviderErrorKind::Transient);
	}

	#[test]
	fn body_preview_is_bounded() {
		let ctx = ProviderErrorContext::new(GrantType::ClientCredentials)
			.with_body_preview("x".repeat(1_000));
		let preview = ctx.body_preview.expect("Preview should be captured.");

		assert_eq!(preview.chars().count(), ProviderErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
		assert_eq!(ProviderErrorKind::Transient.rejection(), None);
	}
}
