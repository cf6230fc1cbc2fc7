//! Client descriptors: the per-client configuration resolved by a [`ClientRegistry`].
//!
//! A descriptor binds a [`ClientId`] to a [`GrantType`] and the provider settings required to
//! talk to the token endpoint. Descriptors are plain `serde` data so hosts can keep them in any
//! configuration format and validate them with [`ClientDescriptor::validate`].
//!
//! [`ClientRegistry`]: crate::registry::ClientRegistry

/// Builder API for assembling client descriptors.
pub mod builder;
/// Grant types a client can be configured with.
pub mod grant;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use grant::*;
pub use quirks::*;

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, Secret},
};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// Public client; only `client_id` is sent.
	#[serde(rename = "none")]
	Public,
}
impl ClientAuthMethod {
	/// Returns the RFC 7591 `token_endpoint_auth_method` value.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ClientSecretBasic => "client_secret_basic",
			Self::ClientSecretPost => "client_secret_post",
			Self::Public => "none",
		}
	}

	/// Whether the method authenticates with a client secret.
	pub fn uses_secret(self) -> bool {
		!matches!(self, Self::Public)
	}
}
impl Display for ClientAuthMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Endpoints exposed by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint; required for authorization-code clients.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub authorization: Option<Url>,
	/// Token endpoint used for every grant.
	pub token: Url,
}

/// Provider settings for one configured client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// OAuth `client_id` registered with the provider.
	pub client_id: String,
	/// OAuth `client_secret`, absent for public clients.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_secret: Option<Secret>,
	/// Provider endpoints.
	pub endpoints: ProviderEndpoints,
	/// Redirect URI registered for the authorization-code callback.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub redirect_uri: Option<Url>,
	/// Scopes requested on every acquisition.
	#[serde(default)]
	pub scope: ScopeSet,
	/// Client authentication method used at the token endpoint.
	#[serde(default)]
	pub client_auth_method: ClientAuthMethod,
	/// Provider quirks.
	#[serde(default)]
	pub quirks: ProviderQuirks,
}

/// Immutable per-client configuration owned by the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientDescriptor {
	/// Registry key of the client.
	pub id: ClientId,
	/// Grant the client acquires tokens with.
	pub grant_type: GrantType,
	/// Provider settings.
	pub provider: ProviderConfig,
}
impl ClientDescriptor {
	/// Creates a new builder for the provided client and grant.
	pub fn builder(id: ClientId, grant_type: GrantType) -> ClientDescriptorBuilder {
		ClientDescriptorBuilder::new(id, grant_type)
	}

	/// Stable digest of every configuration field, secrets included.
	///
	/// Cached providers are keyed by this value, so any configuration change yields a new one.
	pub fn fingerprint(&self) -> String {
		let provider = &self.provider;
		let mut hasher = Sha256::new();
		let mut field = |value: &str| {
			hasher.update((value.len() as u64).to_be_bytes());
			hasher.update(value.as_bytes());
		};

		field(self.id.as_str());
		field(self.grant_type.as_str());
		field(&provider.client_id);
		field(provider.client_secret.as_ref().map(Secret::expose).unwrap_or_default());
		field(provider.endpoints.authorization.as_ref().map(Url::as_str).unwrap_or_default());
		field(provider.endpoints.token.as_str());
		field(provider.redirect_uri.as_ref().map(Url::as_str).unwrap_or_default());
		field(&provider.scope.normalized());
		field(provider.client_auth_method.as_str());
		field(if provider.quirks.pkce_required { "pkce" } else { "" });
		field(provider.quirks.scope_delimiter.encode_utf8(&mut [0; 4]));

		URL_SAFE_NO_PAD.encode(hasher.finalize())
	}
}
