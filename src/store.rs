//! Storage contracts for access tokens and pending authorization states, plus reference
//! implementations.
//!
//! Both contracts are keyed by [`ClientId`]. Backends persist values as JSON under the keys
//! produced by [`StoreKey`], so a single key-value backend can serve both namespaces.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, ClientId},
	flows::PendingAuthorizationState,
};

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Per-client access token persistence.
///
/// Each client's record is independent; `set` overwrites the previous record wholesale.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Fetches the record stored for `client_id`, if any.
	fn get<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, Option<AccessTokenRecord>>;

	/// Persists `record` for `client_id`, replacing any previous record.
	fn set<'a>(&'a self, client_id: &'a ClientId, record: AccessTokenRecord)
	-> StoreFuture<'a, ()>;

	/// Deletes the record stored for `client_id`; deleting a missing record is not an error.
	fn delete<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, ()>;
}

/// Per-client pending authorization persistence for the authorization-code callback.
pub trait PendingStateStore
where
	Self: Send + Sync,
{
	/// Stores `state`, overwriting any pending state of the same client.
	fn save_state(&self, state: PendingAuthorizationState) -> StoreFuture<'_, ()>;

	/// Loads the pending state of `client_id` without consuming it.
	fn load_state<'a>(
		&'a self,
		client_id: &'a ClientId,
	) -> StoreFuture<'a, Option<PendingAuthorizationState>>;

	/// Atomically compares `returned_state` with the pending state and deletes it on a match.
	///
	/// A mismatch leaves the pending state in place.
	fn consume_state<'a>(
		&'a self,
		client_id: &'a ClientId,
		returned_state: &'a str,
	) -> StoreFuture<'a, ConsumeOutcome>;

	/// Deletes the pending state of `client_id`.
	fn delete_state<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, ()>;
}

/// Result of [`PendingStateStore::consume_state`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
	/// The state matched and was deleted.
	Consumed(PendingAuthorizationState),
	/// A pending state exists but carries a different token.
	Mismatch,
	/// No pending state exists (never issued, already consumed, or expired).
	Missing,
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Namespaced key under which a backend stores one client's value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey(String);
impl StoreKey {
	/// Prefix of access token keys.
	pub const ACCESS_TOKEN_PREFIX: &'static str = "access_token-";
	/// Prefix of pending authorization state keys.
	pub const PENDING_STATE_PREFIX: &'static str = "pending_state-";

	/// Key of the access token record of `client_id`.
	pub fn access_token(client_id: &ClientId) -> Self {
		Self(format!("{}{client_id}", Self::ACCESS_TOKEN_PREFIX))
	}

	/// Key of the pending authorization state of `client_id`.
	pub fn pending_state(client_id: &ClientId) -> Self {
		Self(format!("{}{client_id}", Self::PENDING_STATE_PREFIX))
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

pub(crate) fn encode<T>(key: &StoreKey, value: &T) -> Result<String, StoreError>
where
	T: Serialize,
{
	serde_json::to_string(value).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize {key}: {e}"),
	})
}

pub(crate) fn decode<T>(key: &StoreKey, raw: &str) -> Result<T, StoreError>
where
	T: for<'de> Deserialize<'de>,
{
	serde_json::from_str(raw).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {key}: {e}"),
	})
}

/// Compares CSRF tokens without short-circuiting on the first differing byte.
pub(crate) fn state_tokens_match(expected: &str, returned: &str) -> bool {
	expected.len() == returned.len()
		&& expected.bytes().zip(returned.bytes()).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
}
