//! Bounded least-recently-used cache of constructed providers.

// self
use crate::{
	_prelude::*,
	auth::ClientId,
	provider::{ClientDescriptor, GrantType, Provider},
};

type CacheKey = (ClientId, GrantType);

/// Process-local provider cache keyed by client and grant.
///
/// Entries remember the fingerprint of the descriptor they were built from; a lookup with a
/// changed descriptor rebuilds the provider instead of serving the stale one.
#[derive(Debug)]
pub struct ProviderCache {
	capacity: usize,
	state: Mutex<CacheState>,
}
impl ProviderCache {
	/// Default number of cached providers.
	pub const DEFAULT_CAPACITY: usize = 64;

	/// Creates a cache holding at most `capacity` providers (at least one).
	pub fn new(capacity: usize) -> Self {
		Self { capacity: capacity.max(1), state: Mutex::new(CacheState::default()) }
	}

	/// Maximum number of cached providers.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Number of cached providers.
	pub fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns the cached provider for `descriptor` and `grant`, building it with `build` on a
	/// miss or when the descriptor changed since the entry was stored.
	pub fn get_or_try_insert<F, E>(
		&self,
		descriptor: &ClientDescriptor,
		grant: GrantType,
		build: F,
	) -> Result<Arc<Provider>, E>
	where
		F: FnOnce() -> Result<Provider, E>,
	{
		let key = (descriptor.id.clone(), grant);
		let fingerprint = descriptor.fingerprint();

		if let Some(provider) = self.state.lock().touch(&key, &fingerprint) {
			return Ok(provider);
		}

		let provider = Arc::new(build()?);

		self.state.lock().insert(key, Arc::clone(&provider), self.capacity);

		Ok(provider)
	}

	/// Drops every cached provider of `client_id`.
	pub fn invalidate(&self, client_id: &ClientId) {
		self.state.lock().entries.retain(|(id, _), _| id != client_id);
	}

	/// Drops every cached provider.
	pub fn clear(&self) {
		self.state.lock().entries.clear();
	}
}
impl Default for ProviderCache {
	fn default() -> Self {
		Self::new(Self::DEFAULT_CAPACITY)
	}
}

#[derive(Debug, Default)]
struct CacheState {
	tick: u64,
	entries: HashMap<CacheKey, CacheEntry>,
}
impl CacheState {
	fn touch(&mut self, key: &CacheKey, fingerprint: &str) -> Option<Arc<Provider>> {
		self.tick += 1;

		if self.entries.get(key)?.provider.fingerprint() != fingerprint {
			self.entries.remove(key);

			return None;
		}

		let entry = self.entries.get_mut(key)?;

		entry.last_used = self.tick;

		Some(Arc::clone(&entry.provider))
	}

	fn insert(&mut self, key: CacheKey, provider: Arc<Provider>, capacity: usize) {
		self.tick += 1;

		if !self.entries.contains_key(&key) && self.entries.len() >= capacity {
			let oldest = self
				.entries
				.iter()
				.min_by_key(|(_, entry)| entry.last_used)
				.map(|(key, _)| key.clone());

			if let Some(oldest) = oldest {
				self.entries.remove(&oldest);
			}
		}

		self.entries.insert(key, CacheEntry { provider, last_used: self.tick });
	}
}

#[derive(Debug)]
struct CacheEntry {
	provider: Arc<Provider>,
	last_used: u64,
}
