//! Providers: OAuth clients constructed from a descriptor for one grant.

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, EndpointNotSet, EndpointSet, TokenUrl,
	basic::BasicClient,
};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet},
	error::ConfigError,
	provider::{
		ClientAuthMethod, ClientDescriptor, ClientDescriptorError, GrantType, ProviderQuirks,
	},
};

/// `oauth2` client with only the token endpoint configured.
///
/// Authorization URLs are assembled by the authorization-code strategy, so the auth endpoint
/// type state stays unset.
pub type OAuthClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Client object bound to one descriptor and the grant it was built for.
///
/// Providers hold configuration only, so they are cheap to clone and safe to cache for the
/// lifetime of the process.
#[derive(Clone)]
pub struct Provider {
	client_id: ClientId,
	grant: GrantType,
	fingerprint: String,
	oauth: OAuthClient,
	oauth_client_id: String,
	authorization_endpoint: Option<Url>,
	redirect_uri: Option<Url>,
	scope: ScopeSet,
	auth_method: ClientAuthMethod,
	quirks: ProviderQuirks,
}
impl Provider {
	/// Builds a provider for `grant` from the descriptor's configuration.
	///
	/// The descriptor is validated again, so descriptors from any registry get the same checks.
	pub fn from_descriptor(
		descriptor: &ClientDescriptor,
		grant: GrantType,
	) -> Result<Self, ConfigError> {
		descriptor.validate()?;

		let config = &descriptor.provider;
		let token_url = TokenUrl::new(config.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let mut oauth =
			BasicClient::new(OAuthClientId::new(config.client_id.clone())).set_token_uri(token_url);

		if let Some(secret) =
			config.client_secret.as_ref().filter(|_| config.client_auth_method.uses_secret())
		{
			oauth = oauth.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}
		if config.client_auth_method != ClientAuthMethod::ClientSecretBasic {
			oauth = oauth.set_auth_type(AuthType::RequestBody);
		}

		if grant == GrantType::AuthorizationCode {
			if config.endpoints.authorization.is_none() {
				return Err(ClientDescriptorError::MissingAuthorizationEndpoint.into());
			}
			if config.redirect_uri.is_none() {
				return Err(ClientDescriptorError::MissingRedirectUri.into());
			}
		}

		Ok(Self {
			client_id: descriptor.id.clone(),
			grant,
			fingerprint: descriptor.fingerprint(),
			oauth,
			oauth_client_id: config.client_id.clone(),
			authorization_endpoint: config.endpoints.authorization.clone(),
			redirect_uri: config.redirect_uri.clone(),
			scope: config.scope.clone(),
			auth_method: config.client_auth_method,
			quirks: config.quirks,
		})
	}

	/// Registry key of the client this provider serves.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// Grant the provider was built for.
	pub fn grant(&self) -> GrantType {
		self.grant
	}

	/// Fingerprint of the descriptor the provider was built from.
	pub fn fingerprint(&self) -> &str {
		&self.fingerprint
	}

	/// Underlying `oauth2` client.
	pub fn oauth(&self) -> &OAuthClient {
		&self.oauth
	}

	/// Provider-side OAuth `client_id`.
	pub fn oauth_client_id(&self) -> &str {
		&self.oauth_client_id
	}

	/// Authorization endpoint, when configured.
	pub fn authorization_endpoint(&self) -> Option<&Url> {
		self.authorization_endpoint.as_ref()
	}

	/// Redirect URI, when configured.
	pub fn redirect_uri(&self) -> Option<&Url> {
		self.redirect_uri.as_ref()
	}

	/// Scopes requested on acquisition.
	pub fn scope(&self) -> &ScopeSet {
		&self.scope
	}

	/// Client authentication method.
	pub fn auth_method(&self) -> ClientAuthMethod {
		self.auth_method
	}

	/// Provider quirks.
	pub fn quirks(&self) -> ProviderQuirks {
		self.quirks
	}
}
impl Debug for Provider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Provider")
			.field("client_id", &self.client_id)
			.field("grant", &self.grant)
			.field("fingerprint", &self.fingerprint)
			.field("oauth_client_id", &self.oauth_client_id)
			.field("token_endpoint", &self.oauth.token_uri().as_str())
			.field("auth_method", &self.auth_method)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn descriptor(grant: GrantType, method: ClientAuthMethod) -> ClientDescriptor {
		let mut builder = ClientDescriptor::builder(
			ClientId::new("portal").expect("Client fixture should be valid."),
			grant,
		)
		.client_id("portal-app")
		.client_secret("portal-secret")
		.client_auth_method(method)
		.token_endpoint(Url::parse("https://idp.example.com/token").expect("URL should parse."));

		if grant == GrantType::AuthorizationCode {
			builder = builder
				.authorization_endpoint(
					Url::parse("https://idp.example.com/authorize").expect("URL should parse."),
				)
				.redirect_uri(
					Url::parse("https://app.example.com/callback").expect("URL should parse."),
				);
		}

		builder.build().expect("Descriptor fixture should build.")
	}

	#[test]
	fn builds_for_each_auth_method() {
		for method in [
			ClientAuthMethod::ClientSecretBasic,
			ClientAuthMethod::ClientSecretPost,
			ClientAuthMethod::Public,
		] {
			let descriptor = descriptor(GrantType::AuthorizationCode, method);
			let provider = Provider::from_descriptor(&descriptor, GrantType::AuthorizationCode)
				.expect("Provider should build for every auth method.");

			assert_eq!(provider.auth_method(), method);
			assert_eq!(provider.fingerprint(), descriptor.fingerprint());
			assert_eq!(provider.oauth().token_uri().as_str(), "https://idp.example.com/token");
		}
	}

	#[test]
	fn authorization_code_requires_endpoints() {
		let descriptor =
			descriptor(GrantType::ClientCredentials, ClientAuthMethod::ClientSecretBasic);
		let err = Provider::from_descriptor(&descriptor, GrantType::AuthorizationCode)
			.expect_err("Authorization-code providers need an authorization endpoint.");

		assert!(matches!(err, ConfigError::InvalidDescriptor(_)));

		let refresh = Provider::from_descriptor(&descriptor, GrantType::RefreshToken)
			.expect("Refresh providers only need the token endpoint.");

		assert_eq!(refresh.grant(), GrantType::RefreshToken);
		assert!(!format!("{refresh:?}").contains("portal-secret"));
	}
}
