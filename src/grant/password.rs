//! Resource-owner password credentials grant (RFC 6749 §4.3).

// crates.io
use oauth2::{ResourceOwnerPassword, ResourceOwnerUsername};
// self
use crate::{
	_prelude::*,
	grant::{GrantFuture, GrantMetrics, GrantRequest, GrantStrategy, TokenEndpoint, TransportErrorMapper},
	http::{ResponseMetadataSlot, TokenHttpClient},
	provider::{GrantType, Provider},
};

/// Exchanges a caller-supplied username/password pair for an access token.
///
/// The pair is used for one request and never stored. Blank pairs fail with
/// [`Error::MissingCredentials`] without contacting the provider.
#[derive(Debug)]
pub struct PasswordGrant<C, M> {
	endpoint: TokenEndpoint<C, M>,
	/// Exchange counters.
	pub metrics: Arc<GrantMetrics>,
}
impl<C, M> PasswordGrant<C, M> {
	/// Creates the strategy over `endpoint`.
	pub fn new(endpoint: TokenEndpoint<C, M>) -> Self {
		Self { endpoint, metrics: Default::default() }
	}
}
impl<C, M> GrantStrategy for PasswordGrant<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn grant(&self) -> GrantType {
		GrantType::ResourceOwnerPassword
	}

	fn acquire<'a>(&'a self, provider: &'a Provider, request: GrantRequest<'a>) -> GrantFuture<'a> {
		Box::pin(async move {
			let grant = self.grant();
			let GrantRequest::Password { credentials } = request else {
				return self.metrics.track(Err(super::unsupported(grant, request.label())));
			};

			if credentials.is_blank() {
				return self
					.metrics
					.track(Err(Error::MissingCredentials { client_id: provider.client_id().clone() }));
			}

			let username = ResourceOwnerUsername::new(credentials.username.clone());
			let password = ResourceOwnerPassword::new(credentials.password.expose().to_owned());
			let slot = ResponseMetadataSlot::default();
			let handle = self.endpoint.handle(slot.clone());
			let mut exchange = provider.oauth().exchange_password(&username, &password);

			for (name, value) in self.endpoint.extra_params(provider, grant, true) {
				exchange = exchange.add_extra_param(name, value);
			}

			let outcome = exchange.request_async(&handle).await;

			self.metrics.track(self.endpoint.finish(provider, grant, &slot, outcome, None))
		})
	}
}
