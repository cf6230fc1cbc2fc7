//! Client registries resolve a [`ClientId`] to its [`ClientDescriptor`].
//!
//! The orchestrator only consumes the [`ClientRegistry`] trait; hosts back it with whatever
//! configuration storage they use. [`MemoryRegistry`] is the in-process reference
//! implementation and owns a [`ProviderCache`].

// self
use crate::{
	_prelude::*,
	auth::ClientId,
	error::ConfigError,
	provider::{ClientDescriptor, ProviderCache},
};

/// Lookup of client configuration by registry key.
pub trait ClientRegistry: Send + Sync {
	/// Returns the descriptor of `client_id`, if registered.
	fn resolve(&self, client_id: &ClientId) -> Option<Arc<ClientDescriptor>>;

	/// Provider cache owned by the registry, if it keeps one.
	fn provider_cache(&self) -> Option<&ProviderCache> {
		None
	}
}

/// Thread-safe in-memory registry with an attached provider cache.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
	clients: RwLock<HashMap<ClientId, Arc<ClientDescriptor>>>,
	providers: ProviderCache,
}
impl MemoryRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a registry holding `descriptors`; later duplicates replace earlier ones.
	///
	/// Every descriptor is validated first; one invalid entry rejects the whole set.
	pub fn from_descriptors<I>(descriptors: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = ClientDescriptor>,
	{
		let clients = descriptors
			.into_iter()
			.map(|descriptor| -> Result<_, ConfigError> {
				descriptor.validate()?;

				Ok((descriptor.id.clone(), Arc::new(descriptor)))
			})
			.collect::<Result<_, _>>()?;

		Ok(Self { clients: RwLock::new(clients), providers: ProviderCache::default() })
	}

	/// Parses a JSON array of descriptors and validates each one.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(json);
		let descriptors: Vec<ClientDescriptor> = serde_path_to_error::deserialize(&mut de)
			.map_err(|e| ConfigError::RegistryParse {
				path: e.path().to_string(),
				source: e.into_inner(),
			})?;

		Self::from_descriptors(descriptors)
	}

	/// Replaces the provider cache with one of the given capacity.
	pub fn with_provider_capacity(mut self, capacity: usize) -> Self {
		self.providers = ProviderCache::new(capacity);

		self
	}

	/// Validates and inserts or replaces a descriptor, then drops its cached providers.
	///
	/// A rejected descriptor leaves the registry untouched.
	pub fn upsert(
		&self,
		descriptor: ClientDescriptor,
	) -> Result<Option<Arc<ClientDescriptor>>, ConfigError> {
		descriptor.validate()?;

		let id = descriptor.id.clone();
		let previous = self.clients.write().insert(id.clone(), Arc::new(descriptor));

		self.providers.invalidate(&id);

		Ok(previous)
	}

	/// Removes a descriptor and drops its cached providers.
	pub fn remove(&self, client_id: &ClientId) -> Option<Arc<ClientDescriptor>> {
		let previous = self.clients.write().remove(client_id);

		self.providers.invalidate(client_id);

		previous
	}

	/// Registered client identifiers, sorted.
	pub fn client_ids(&self) -> Vec<ClientId> {
		let mut ids = self.clients.read().keys().cloned().collect::<Vec<_>>();

		ids.sort();

		ids
	}
}
impl ClientRegistry for MemoryRegistry {
	fn resolve(&self, client_id: &ClientId) -> Option<Arc<ClientDescriptor>> {
		self.clients.read().get(client_id).cloned()
	}

	fn provider_cache(&self) -> Option<&ProviderCache> {
		Some(&self.providers)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::provider::{ClientDescriptorError, GrantType};

	const DOCUMENT: &str = r#"[
		{
			"id": "crm",
			"grant_type": "client_credentials",
			"provider": {
				"client_id": "crm-app",
				"client_secret": "crm-secret",
				"endpoints": { "token": "https://idp.example.com/token" }
			}
		},
		{
			"id": "portal",
			"grant_type": "authorization_code",
			"provider": {
				"client_id": "portal-app",
				"endpoints": {
					"authorization": "https://idp.example.com/authorize",
					"token": "https://idp.example.com/token"
				},
				"redirect_uri": "https://app.example.com/callback",
				"client_auth_method": "none",
				"quirks": { "pkce_required": true }
			}
		}
	]"#;

	fn id(value: &str) -> ClientId {
		ClientId::new(value).expect("Client fixture should be valid.")
	}

	#[test]
	fn parses_and_resolves_documents() {
		let registry = MemoryRegistry::from_json_str(DOCUMENT).expect("Document should parse.");

		assert_eq!(registry.client_ids(), vec![id("crm"), id("portal")]);

		let portal = registry.resolve(&id("portal")).expect("Portal should resolve.");

		assert_eq!(portal.grant_type, GrantType::AuthorizationCode);
		assert!(portal.provider.quirks.pkce_required);
		assert!(registry.resolve(&id("unknown")).is_none());
	}

	#[test]
	fn parse_errors_report_the_json_path() {
		let err = MemoryRegistry::from_json_str(
			r#"[{ "id": "crm", "grant_type": "implicit", "provider": {} }]"#,
		)
		.expect_err("Unknown grant types should be rejected.");

		match err {
			ConfigError::RegistryParse { path, .. } => assert_eq!(path, "[0].grant_type"),
			other => panic!("Unexpected error: {other:?}."),
		}

		let err = MemoryRegistry::from_json_str(
			r#"[{
				"id": "crm",
				"grant_type": "client_credentials",
				"provider": {
					"client_id": "crm-app",
					"client_secret": "s",
					"endpoints": { "token": "http://idp.example.com/token" }
				}
			}]"#,
		)
		.expect_err("Plain HTTP endpoints should be rejected.");

		assert!(matches!(
			err,
			ConfigError::InvalidDescriptor(ClientDescriptorError::InsecureEndpoint {
				endpoint: "token",
				..
			})
		));
	}

	#[test]
	fn upsert_and_remove_invalidate_cached_providers() {
		let registry = MemoryRegistry::from_json_str(DOCUMENT).expect("Document should parse.");
		let crm = registry.resolve(&id("crm")).expect("CRM should resolve.");
		let cache = registry.provider_cache().expect("Memory registry owns a cache.");

		cache
			.get_or_try_insert(&crm, GrantType::ClientCredentials, || {
				crate::provider::Provider::from_descriptor(&crm, GrantType::ClientCredentials)
			})
			.expect("Provider should build.");

		assert_eq!(cache.len(), 1);

		let previous = registry.upsert((*crm).clone()).expect("Valid descriptor should upsert.");

		assert!(previous.is_some());
		assert!(cache.is_empty());
		assert!(registry.remove(&id("crm")).is_some());
		assert!(registry.resolve(&id("crm")).is_none());
	}

	#[test]
	fn upsert_rejects_invalid_descriptors_and_keeps_the_previous_one() {
		let registry = MemoryRegistry::from_json_str(DOCUMENT).expect("Document should parse.");
		let mut insecure = (*registry.resolve(&id("crm")).expect("CRM should resolve.")).clone();

		insecure.provider.endpoints.token =
			Url::parse("http://idp.example.com/token").expect("URL fixture should parse.");

		let err = registry.upsert(insecure).expect_err("Plain HTTP endpoints should be rejected.");

		assert!(matches!(
			err,
			ConfigError::InvalidDescriptor(ClientDescriptorError::InsecureEndpoint {
				endpoint: "token",
				..
			})
		));

		let kept = registry.resolve(&id("crm")).expect("CRM should stay registered.");

		assert_eq!(kept.provider.endpoints.token.scheme(), "https");
	}
}
