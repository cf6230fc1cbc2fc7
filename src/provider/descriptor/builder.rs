// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, Secret},
	provider::{
		ClientAuthMethod, ClientDescriptor, GrantType, ProviderConfig, ProviderEndpoints,
		ProviderQuirks,
	},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ClientDescriptorError {
	/// Provider-side `client_id` is empty.
	#[error("OAuth client_id cannot be empty.")]
	MissingOAuthClientId,
	/// Token endpoint is mandatory for all grants.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Authorization-code clients need an authorization endpoint.
	#[error("The authorization_code grant requires an authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Authorization-code clients need a redirect URI for the callback.
	#[error("The authorization_code grant requires a redirect URI.")]
	MissingRedirectUri,
	/// Confidential client-credentials clients need a secret.
	#[error("The {method} client authentication method requires a client secret.")]
	MissingClientSecret {
		/// Configured authentication method.
		method: ClientAuthMethod,
	},
	/// PKCE only applies to the authorization-code grant.
	#[error("The `pkce_required` flag requires the authorization_code grant.")]
	PkceRequiredWithoutAuthorizationCode,
	/// Provider endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Reject scope delimiters that are control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
}

/// Builder for [`ClientDescriptor`] values.
#[derive(Debug)]
pub struct ClientDescriptorBuilder {
	id: ClientId,
	grant_type: GrantType,
	client_id: String,
	client_secret: Option<Secret>,
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	redirect_uri: Option<Url>,
	scope: ScopeSet,
	client_auth_method: ClientAuthMethod,
	quirks: ProviderQuirks,
}
impl ClientDescriptorBuilder {
	/// Creates a new builder seeded with the client and grant.
	pub fn new(id: ClientId, grant_type: GrantType) -> Self {
		Self {
			id,
			grant_type,
			client_id: String::new(),
			client_secret: None,
			authorization_endpoint: None,
			token_endpoint: None,
			redirect_uri: None,
			scope: ScopeSet::default(),
			client_auth_method: ClientAuthMethod::default(),
			quirks: ProviderQuirks::default(),
		}
	}

	/// Sets the provider-side OAuth `client_id`.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = client_id.into();

		self
	}

	/// Sets the OAuth `client_secret`.
	pub fn client_secret(mut self, secret: impl Into<Secret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the redirect URI used by the authorization-code callback.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Sets the requested scopes.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Overrides the provider quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ClientDescriptor, ClientDescriptorError> {
		let token = self.token_endpoint.ok_or(ClientDescriptorError::MissingTokenEndpoint)?;
		let descriptor = ClientDescriptor {
			id: self.id,
			grant_type: self.grant_type,
			provider: ProviderConfig {
				client_id: self.client_id,
				client_secret: self.client_secret,
				endpoints: ProviderEndpoints {
					authorization: self.authorization_endpoint,
					token,
				},
				redirect_uri: self.redirect_uri,
				scope: self.scope,
				client_auth_method: self.client_auth_method,
				quirks: self.quirks,
			},
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ClientDescriptor {
	/// Validates descriptor invariants; registries call this for every parsed document.
	pub fn validate(&self) -> Result<(), ClientDescriptorError> {
		let provider = &self.provider;

		if provider.client_id.trim().is_empty() {
			return Err(ClientDescriptorError::MissingOAuthClientId);
		}

		validate_endpoint("token", &provider.endpoints.token)?;

		if let Some(authorization) = provider.endpoints.authorization.as_ref() {
			validate_endpoint("authorization", authorization)?;
		}

		match self.grant_type {
			GrantType::AuthorizationCode => {
				if provider.endpoints.authorization.is_none() {
					return Err(ClientDescriptorError::MissingAuthorizationEndpoint);
				}
				if provider.redirect_uri.is_none() {
					return Err(ClientDescriptorError::MissingRedirectUri);
				}
			},
			GrantType::ClientCredentials
				if provider.client_auth_method.uses_secret()
					&& provider.client_secret.as_ref().is_none_or(Secret::is_empty) =>
				return Err(ClientDescriptorError::MissingClientSecret {
					method: provider.client_auth_method,
				}),
			_ =>
				if provider.quirks.pkce_required {
					return Err(ClientDescriptorError::PkceRequiredWithoutAuthorizationCode);
				},
		}

		if provider.quirks.scope_delimiter.is_control() {
			return Err(ClientDescriptorError::InvalidScopeDelimiter {
				delimiter: provider.quirks.scope_delimiter,
			});
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ClientDescriptorError> {
	if url.scheme() != "https" {
		Err(ClientDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
