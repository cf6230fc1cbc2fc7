//! Thread-safe in-memory store for tests, demos, and single-process hosts.

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, ClientId},
	flows::PendingAuthorizationState,
	store::{
		self, ConsumeOutcome, PendingStateStore, StoreError, StoreFuture, StoreKey, TokenStore,
	},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, String>>>;

/// In-process key-value store serving both the token and the pending-state namespace.
///
/// Values are kept as JSON strings, the same representation a persistent backend would
/// write. An optional TTL makes pending states older than the limit behave as missing.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	map: StoreMap,
	pending_ttl: Option<Duration>,
}
impl MemoryStore {
	/// Treats pending states created more than `ttl` ago as missing.
	pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
		self.pending_ttl = Some(ttl);

		self
	}

	/// Number of stored values across both namespaces.
	pub fn len(&self) -> usize {
		self.map.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.map.read().is_empty()
	}

	fn read_now<T>(map: &StoreMap, key: &StoreKey) -> Result<Option<T>, StoreError>
	where
		T: for<'de> Deserialize<'de>,
	{
		map.read().get(key).map(|raw| store::decode(key, raw)).transpose()
	}

	fn is_expired(&self, state: &PendingAuthorizationState) -> bool {
		self.pending_ttl.is_some_and(|ttl| OffsetDateTime::now_utc() - state.created_at > ttl)
	}

	fn consume_now(
		&self,
		client_id: &ClientId,
		returned_state: &str,
	) -> Result<ConsumeOutcome, StoreError> {
		let key = StoreKey::pending_state(client_id);
		let mut guard = self.map.write();
		let Some(raw) = guard.get(&key) else {
			return Ok(ConsumeOutcome::Missing);
		};
		let pending: PendingAuthorizationState = store::decode(&key, raw)?;

		if self.is_expired(&pending) {
			guard.remove(&key);

			return Ok(ConsumeOutcome::Missing);
		}
		if !store::state_tokens_match(&pending.state_token, returned_state) {
			return Ok(ConsumeOutcome::Mismatch);
		}

		guard.remove(&key);

		Ok(ConsumeOutcome::Consumed(pending))
	}
}
impl TokenStore for MemoryStore {
	fn get<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, Option<AccessTokenRecord>> {
		let map = self.map.clone();
		let key = StoreKey::access_token(client_id);

		Box::pin(async move { Self::read_now(&map, &key) })
	}

	fn set<'a>(
		&'a self,
		client_id: &'a ClientId,
		record: AccessTokenRecord,
	) -> StoreFuture<'a, ()> {
		let map = self.map.clone();
		let key = StoreKey::access_token(client_id);

		Box::pin(async move {
			let raw = store::encode(&key, &record)?;

			map.write().insert(key, raw);

			Ok(())
		})
	}

	fn delete<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, ()> {
		let map = self.map.clone();
		let key = StoreKey::access_token(client_id);

		Box::pin(async move {
			map.write().remove(&key);

			Ok(())
		})
	}
}
impl PendingStateStore for MemoryStore {
	fn save_state(&self, state: PendingAuthorizationState) -> StoreFuture<'_, ()> {
		let map = self.map.clone();

		Box::pin(async move {
			let key = StoreKey::pending_state(&state.client_id);
			let raw = store::encode(&key, &state)?;

			map.write().insert(key, raw);

			Ok(())
		})
	}

	fn load_state<'a>(
		&'a self,
		client_id: &'a ClientId,
	) -> StoreFuture<'a, Option<PendingAuthorizationState>> {
		Box::pin(async move {
			let key = StoreKey::pending_state(client_id);
			let pending: Option<PendingAuthorizationState> = Self::read_now(&self.map, &key)?;

			Ok(pending.filter(|state| !self.is_expired(state)))
		})
	}

	fn consume_state<'a>(
		&'a self,
		client_id: &'a ClientId,
		returned_state: &'a str,
	) -> StoreFuture<'a, ConsumeOutcome> {
		Box::pin(async move { self.consume_now(client_id, returned_state) })
	}

	fn delete_state<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, ()> {
		let map = self.map.clone();
		let key = StoreKey::pending_state(client_id);

		Box::pin(async move {
			map.write().remove(&key);

			Ok(())
		})
	}
}
