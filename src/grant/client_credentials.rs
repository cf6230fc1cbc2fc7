//! Client credentials grant (RFC 6749 §4.4).

// self
use crate::{
	_prelude::*,
	grant::{GrantFuture, GrantMetrics, GrantRequest, GrantStrategy, TokenEndpoint, TransportErrorMapper},
	http::{ResponseMetadataSlot, TokenHttpClient},
	provider::{GrantType, Provider},
};

/// Exchanges the client's own credentials for an access token.
///
/// Resource-owner credentials are never needed; the configured scopes are always requested.
#[derive(Debug)]
pub struct ClientCredentialsGrant<C, M> {
	endpoint: TokenEndpoint<C, M>,
	/// Exchange counters.
	pub metrics: Arc<GrantMetrics>,
}
impl<C, M> ClientCredentialsGrant<C, M> {
	/// Creates the strategy over `endpoint`.
	pub fn new(endpoint: TokenEndpoint<C, M>) -> Self {
		Self { endpoint, metrics: Default::default() }
	}
}
impl<C, M> GrantStrategy for ClientCredentialsGrant<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn grant(&self) -> GrantType {
		GrantType::ClientCredentials
	}

	fn acquire<'a>(&'a self, provider: &'a Provider, request: GrantRequest<'a>) -> GrantFuture<'a> {
		Box::pin(async move {
			let grant = self.grant();
			let GrantRequest::ClientCredentials = request else {
				return self.metrics.track(Err(super::unsupported(grant, request.label())));
			};
			let slot = ResponseMetadataSlot::default();
			let handle = self.endpoint.handle(slot.clone());
			let mut exchange = provider.oauth().exchange_client_credentials();

			for (name, value) in self.endpoint.extra_params(provider, grant, true) {
				exchange = exchange.add_extra_param(name, value);
			}

			let outcome = exchange.request_async(&handle).await;

			self.metrics.track(self.endpoint.finish(provider, grant, &slot, outcome, None))
		})
	}
}
