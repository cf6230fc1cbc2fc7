//! Refresh token grant (RFC 6749 §6).

// crates.io
use oauth2::RefreshToken;
// self
use crate::{
	_prelude::*,
	grant::{GrantFuture, GrantMetrics, GrantRequest, GrantStrategy, TokenEndpoint, TransportErrorMapper},
	http::{ResponseMetadataSlot, TokenHttpClient},
	provider::{ClientDescriptor, GrantType, Provider},
};

/// Exchanges the refresh token of a stored record for a new record.
///
/// Serves clients of every grant type. When the provider does not rotate the refresh token,
/// the previous one is carried onto the new record.
#[derive(Debug)]
pub struct RefreshTokenGrant<C, M> {
	endpoint: TokenEndpoint<C, M>,
	/// Exchange counters.
	pub metrics: Arc<GrantMetrics>,
}
impl<C, M> RefreshTokenGrant<C, M> {
	/// Creates the strategy over `endpoint`.
	pub fn new(endpoint: TokenEndpoint<C, M>) -> Self {
		Self { endpoint, metrics: Default::default() }
	}
}
impl<C, M> GrantStrategy for RefreshTokenGrant<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn grant(&self) -> GrantType {
		GrantType::RefreshToken
	}

	fn build_provider(&self, descriptor: &ClientDescriptor) -> Result<Provider> {
		Ok(Provider::from_descriptor(descriptor, self.grant())?)
	}

	fn acquire<'a>(&'a self, provider: &'a Provider, request: GrantRequest<'a>) -> GrantFuture<'a> {
		Box::pin(async move {
			let grant = self.grant();
			let GrantRequest::Refresh { stored } = request else {
				return self.metrics.track(Err(super::unsupported(grant, request.label())));
			};
			let Some(current) = stored.refresh_token.as_ref().filter(|secret| !secret.is_empty())
			else {
				return self
					.metrics
					.track(Err(Error::NoRefreshToken { client_id: provider.client_id().clone() }));
			};
			let refresh_token = RefreshToken::new(current.expose().to_owned());
			let slot = ResponseMetadataSlot::default();
			let handle = self.endpoint.handle(slot.clone());
			let mut exchange = provider.oauth().exchange_refresh_token(&refresh_token);

			for (name, value) in self.endpoint.extra_params(provider, grant, false) {
				exchange = exchange.add_extra_param(name, value);
			}

			let outcome = exchange.request_async(&handle).await;

			self.metrics.track(self.endpoint.finish(
				provider,
				grant,
				&slot,
				outcome,
				Some(current.clone()),
			))
		})
	}
}
