//! Authorization code grant (RFC 6749 §4.1) with optional PKCE (RFC 7636).

// std
use std::borrow::Cow;
// crates.io
use oauth2::{AuthorizationCode, PkceCodeVerifier, RedirectUrl};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::PkceChallenge,
	grant::{GrantFuture, GrantMetrics, GrantRequest, GrantStrategy, TokenEndpoint, TransportErrorMapper},
	http::{ResponseMetadataSlot, TokenHttpClient},
	provider::{ClientDescriptorError, GrantType, Provider},
};

/// Builds authorization URLs and exchanges returned codes.
#[derive(Debug)]
pub struct AuthorizationCodeGrant<C, M> {
	endpoint: TokenEndpoint<C, M>,
	/// Exchange counters.
	pub metrics: Arc<GrantMetrics>,
}
impl<C, M> AuthorizationCodeGrant<C, M> {
	/// Creates the strategy over `endpoint`.
	pub fn new(endpoint: TokenEndpoint<C, M>) -> Self {
		Self { endpoint, metrics: Default::default() }
	}
}
impl<C, M> GrantStrategy for AuthorizationCodeGrant<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn grant(&self) -> GrantType {
		GrantType::AuthorizationCode
	}

	fn acquire<'a>(&'a self, provider: &'a Provider, request: GrantRequest<'a>) -> GrantFuture<'a> {
		Box::pin(async move {
			let grant = self.grant();
			let GrantRequest::AuthorizationCode { code, pkce_verifier } = request else {
				return self.metrics.track(Err(super::unsupported(grant, request.label())));
			};
			let Some(redirect_uri) = provider.redirect_uri() else {
				return self.metrics.track(Err(
					ConfigError::from(ClientDescriptorError::MissingRedirectUri).into()
				));
			};
			let redirect_url = match RedirectUrl::new(redirect_uri.to_string()) {
				Ok(url) => url,
				Err(source) =>
					return self.metrics.track(Err(ConfigError::InvalidRedirect { source }.into())),
			};
			let slot = ResponseMetadataSlot::default();
			let handle = self.endpoint.handle(slot.clone());
			let mut exchange = provider
				.oauth()
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_redirect_uri(Cow::Owned(redirect_url));

			if let Some(verifier) = pkce_verifier {
				exchange = exchange.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_owned()));
			}
			for (name, value) in self.endpoint.extra_params(provider, grant, false) {
				exchange = exchange.add_extra_param(name, value);
			}

			let outcome = exchange.request_async(&handle).await;

			self.metrics.track(self.endpoint.finish(provider, grant, &slot, outcome, None))
		})
	}

	fn authorization_url(
		&self,
		provider: &Provider,
		state: &str,
		pkce: Option<&PkceChallenge>,
	) -> Result<Url> {
		let mut url = provider
			.authorization_endpoint()
			.cloned()
			.ok_or(ConfigError::from(ClientDescriptorError::MissingAuthorizationEndpoint))?;
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", provider.oauth_client_id());

		if let Some(redirect_uri) = provider.redirect_uri() {
			pairs.append_pair("redirect_uri", redirect_uri.as_str());
		}
		if let Some(scope) = provider.scope().joined(provider.quirks().scope_delimiter) {
			pairs.append_pair("scope", &scope);
		}

		pairs.append_pair("state", state);

		if let Some(pkce) = pkce {
			pairs.append_pair("code_challenge", pkce.challenge());
			pairs.append_pair("code_challenge_method", pkce.method().as_str());
		}

		drop(pairs);

		Ok(url)
	}
}
