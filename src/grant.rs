//! Grant strategies: one pluggable implementation per OAuth2 grant type.
//!
//! The orchestrator never talks to a token endpoint itself. It resolves a client's
//! descriptor, picks the [`GrantStrategy`] for the grant it needs from [`GrantStrategies`], and
//! hands it a [`GrantRequest`]. Strategies share a [`TokenEndpoint`] that owns the HTTP
//! transport, the transport error mapper, and the [`ProviderHooks`].

mod authorization_code;
mod client_credentials;
mod endpoint;
mod metrics;
mod password;
mod refresh;

pub use authorization_code::*;
pub use client_credentials::*;
pub use endpoint::*;
pub use metrics::*;
pub use password::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, ResourceOwnerCredentials},
	error::ConfigError,
	flows::PkceChallenge,
	http::TokenHttpClient,
	provider::{ClientDescriptor, GrantType, Provider, ProviderHooks},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Boxed future returned by [`GrantStrategy::acquire`].
pub type GrantFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessTokenRecord>> + 'a + Send>>;

/// Input of a single token acquisition.
#[derive(Clone, Copy, Debug)]
pub enum GrantRequest<'a> {
	/// Client-credentials exchange; needs nothing beyond the client's own configuration.
	ClientCredentials,
	/// Resource-owner password exchange.
	Password {
		/// Caller-supplied username/password pair.
		credentials: &'a ResourceOwnerCredentials,
	},
	/// Refresh of a stored record.
	Refresh {
		/// Record whose refresh token is exchanged.
		stored: &'a AccessTokenRecord,
	},
	/// Authorization code exchange after the callback.
	AuthorizationCode {
		/// Code returned to the redirect URI.
		code: &'a str,
		/// PKCE verifier issued when the authorization began, if any.
		pkce_verifier: Option<&'a str>,
	},
}
impl GrantRequest<'_> {
	/// Stable label of the request kind.
	pub const fn label(&self) -> &'static str {
		match self {
			Self::ClientCredentials => "client_credentials",
			Self::Password { .. } => "password",
			Self::Refresh { .. } => "refresh_token",
			Self::AuthorizationCode { .. } => "authorization_code",
		}
	}
}

/// Pluggable implementation of one grant type.
pub trait GrantStrategy
where
	Self: Send + Sync,
{
	/// Grant type served by this strategy.
	fn grant(&self) -> GrantType;

	/// Builds the provider this strategy uses for `descriptor`.
	///
	/// The default implementation only accepts descriptors configured for [`Self::grant`].
	fn build_provider(&self, descriptor: &ClientDescriptor) -> Result<Provider> {
		let grant = self.grant();

		if descriptor.grant_type != grant {
			return Err(ConfigError::GrantMismatch {
				client_id: descriptor.id.clone(),
				expected: grant,
				actual: descriptor.grant_type,
			}
			.into());
		}

		Ok(Provider::from_descriptor(descriptor, grant)?)
	}

	/// Performs the token exchange described by `request`.
	///
	/// Nothing is persisted here; the orchestrator stores the returned record.
	fn acquire<'a>(&'a self, provider: &'a Provider, request: GrantRequest<'a>) -> GrantFuture<'a>;

	/// Builds the URL the resource owner is sent to; only authorization-code strategies
	/// support it.
	fn authorization_url(
		&self,
		_provider: &Provider,
		_state: &str,
		_pkce: Option<&PkceChallenge>,
	) -> Result<Url> {
		Err(unsupported(self.grant(), "authorization_url"))
	}
}

/// The strategy set consulted by the orchestrator, one per grant type.
#[derive(Clone)]
pub struct GrantStrategies {
	/// Authorization code strategy.
	pub authorization_code: Arc<dyn GrantStrategy>,
	/// Client credentials strategy.
	pub client_credentials: Arc<dyn GrantStrategy>,
	/// Refresh token strategy.
	pub refresh_token: Arc<dyn GrantStrategy>,
	/// Resource-owner password strategy.
	pub resource_owner_password: Arc<dyn GrantStrategy>,
}
impl GrantStrategies {
	/// Builds the standard strategies over a shared transport and error mapper.
	pub fn with_http_client<C, M>(http_client: C, mapper: M) -> Self
	where
		C: TokenHttpClient,
		M: TransportErrorMapper<C::TransportError>,
	{
		Self::with_endpoint(TokenEndpoint::new(Arc::new(http_client), Arc::new(mapper)))
	}

	/// Builds the standard strategies over a fully configured endpoint.
	pub fn with_endpoint<C, M>(endpoint: TokenEndpoint<C, M>) -> Self
	where
		C: TokenHttpClient,
		M: TransportErrorMapper<C::TransportError>,
	{
		Self {
			authorization_code: Arc::new(AuthorizationCodeGrant::new(endpoint.clone())),
			client_credentials: Arc::new(ClientCredentialsGrant::new(endpoint.clone())),
			refresh_token: Arc::new(RefreshTokenGrant::new(endpoint.clone())),
			resource_owner_password: Arc::new(PasswordGrant::new(endpoint)),
		}
	}

	/// Same as [`Self::with_http_client`] with custom provider hooks.
	pub fn with_hooks<C, M>(
		http_client: C,
		mapper: M,
		hooks: Arc<dyn ProviderHooks>,
	) -> Self
	where
		C: TokenHttpClient,
		M: TransportErrorMapper<C::TransportError>,
	{
		Self::with_endpoint(
			TokenEndpoint::new(Arc::new(http_client), Arc::new(mapper)).with_hooks(hooks),
		)
	}

	/// Strategy registered for `grant`.
	pub fn for_grant(&self, grant: GrantType) -> &Arc<dyn GrantStrategy> {
		match grant {
			GrantType::AuthorizationCode => &self.authorization_code,
			GrantType::ClientCredentials => &self.client_credentials,
			GrantType::RefreshToken => &self.refresh_token,
			GrantType::ResourceOwnerPassword => &self.resource_owner_password,
		}
	}
}
#[cfg(feature = "reqwest")]
impl Default for GrantStrategies {
	fn default() -> Self {
		Self::with_http_client(ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
impl Debug for GrantStrategies {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GrantStrategies").finish_non_exhaustive()
	}
}

fn unsupported(grant: GrantType, request: &'static str) -> Error {
	ConfigError::UnsupportedRequest { grant, request }.into()
}
