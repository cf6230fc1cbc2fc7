//! The token orchestrator: per-client dispatch over grant strategies, stores, and the
//! authorization capture flow.

pub mod authorization;

mod access;

pub use authorization::*;

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, ClientId},
	grant::GrantStrategies,
	provider::{ClientDescriptor, GrantType, Provider},
	registry::ClientRegistry,
	store::{PendingStateStore, TokenStore},
};

/// Result of [`TokenOrchestrator::get_access_token`].
#[derive(Clone, Debug, PartialEq)]
pub enum AccessOutcome {
	/// A usable access token.
	Ready(AccessTokenRecord),
	/// The client needs interactive authorization; send the resource owner to the redirect and
	/// finish with [`TokenOrchestrator::complete_authorization`].
	AuthorizationRequired(AuthorizationRedirect),
}
impl AccessOutcome {
	/// Returns the record for [`AccessOutcome::Ready`].
	pub fn into_record(self) -> Option<AccessTokenRecord> {
		match self {
			Self::Ready(record) => Some(record),
			Self::AuthorizationRequired(_) => None,
		}
	}

	/// Returns the redirect for [`AccessOutcome::AuthorizationRequired`].
	pub fn redirect(&self) -> Option<&AuthorizationRedirect> {
		match self {
			Self::Ready(_) => None,
			Self::AuthorizationRequired(redirect) => Some(redirect),
		}
	}
}

/// Coordinates token acquisition for every client known to a registry.
///
/// The orchestrator owns no configuration of its own: descriptors come from the
/// [`ClientRegistry`], records from the [`TokenStore`], pending authorizations from the
/// [`PendingStateStore`], and the token endpoint exchanges from the [`GrantStrategies`]. All
/// collaborators are injected at construction, so the orchestrator is cheap to clone and share.
#[derive(Clone)]
pub struct TokenOrchestrator {
	registry: Arc<dyn ClientRegistry>,
	tokens: Arc<dyn TokenStore>,
	pending: Arc<dyn PendingStateStore>,
	strategies: GrantStrategies,
	expiry_leeway: Duration,
	flow_guards: Arc<Mutex<HashMap<ClientId, Arc<AsyncMutex<()>>>>>,
}
impl TokenOrchestrator {
	/// Creates an orchestrator over the provided collaborators.
	pub fn new(
		registry: Arc<dyn ClientRegistry>,
		tokens: Arc<dyn TokenStore>,
		pending: Arc<dyn PendingStateStore>,
		strategies: GrantStrategies,
	) -> Self {
		Self {
			registry,
			tokens,
			pending,
			strategies,
			expiry_leeway: Duration::ZERO,
			flow_guards: Default::default(),
		}
	}

	/// Treats records expiring within `leeway` as already expired; negative values clamp to zero.
	pub fn with_expiry_leeway(mut self, leeway: Duration) -> Self {
		self.expiry_leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		self
	}

	/// Strategy set used for token endpoint exchanges.
	pub fn strategies(&self) -> &GrantStrategies {
		&self.strategies
	}

	/// Returns the provider of `client_id` for the grant type the client is configured with.
	pub fn provider(&self, client_id: &ClientId) -> Result<Arc<Provider>> {
		let descriptor = self.resolve(client_id)?;

		self.provider_for(&descriptor, descriptor.grant_type)
	}

	fn resolve(&self, client_id: &ClientId) -> Result<Arc<ClientDescriptor>> {
		self.registry
			.resolve(client_id)
			.ok_or_else(|| Error::UnknownClient { client_id: client_id.clone() })
	}

	fn provider_for(&self, descriptor: &ClientDescriptor, grant: GrantType) -> Result<Arc<Provider>> {
		let strategy = self.strategies.for_grant(grant);

		match self.registry.provider_cache() {
			Some(cache) =>
				cache.get_or_try_insert(descriptor, grant, || strategy.build_provider(descriptor)),
			None => strategy.build_provider(descriptor).map(Arc::new),
		}
	}

	fn is_usable(&self, record: &AccessTokenRecord, now: OffsetDateTime) -> bool {
		match now.checked_add(self.expiry_leeway) {
			Some(horizon) => record.is_valid_at(horizon),
			// A horizon past the representable range outlives every finite expiry.
			None => record.expires_at.is_none(),
		}
	}

	/// Waits for the singleflight guard of a client, creating it on demand.
	async fn lock_flow(&self, client_id: &ClientId) -> FlowPermit {
		let guard = self
			.flow_guards
			.lock()
			.entry(client_id.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone();
		let held = guard.lock_arc().await;

		FlowPermit { guards: self.flow_guards.clone(), client_id: client_id.clone(), held: Some(held) }
	}
}
impl Debug for TokenOrchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenOrchestrator")
			.field("strategies", &self.strategies)
			.field("expiry_leeway", &self.expiry_leeway)
			.finish_non_exhaustive()
	}
}

/// Held singleflight guard; removes the client's entry once no other flow references it.
struct FlowPermit {
	guards: Arc<Mutex<HashMap<ClientId, Arc<AsyncMutex<()>>>>>,
	client_id: ClientId,
	held: Option<MutexGuardArc<()>>,
}
impl Drop for FlowPermit {
	fn drop(&mut self) {
		// Waiters clone the entry under this lock, so a count of one means nobody else holds it.
		let mut guards = self.guards.lock();

		drop(self.held.take());

		if guards.get(&self.client_id).is_some_and(|guard| Arc::strong_count(guard) == 1) {
			guards.remove(&self.client_id);
		}
	}
}
