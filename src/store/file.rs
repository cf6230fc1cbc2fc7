//! JSON-file store for lightweight deployments that need tokens to survive restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, ClientId},
	flows::PendingAuthorizationState,
	store::{
		self, ConsumeOutcome, PendingStateStore, StoreError, StoreFuture, StoreKey, TokenStore,
	},
};

type Snapshot = BTreeMap<String, String>;

/// Persists every key to a JSON object file, rewritten atomically after each mutation.
///
/// The file maps store keys (`access_token-<client>`, `pending_state-<client>`) to the JSON
/// encoding of their values.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
	pending_ttl: Option<Duration>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let snapshot = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)), pending_ttl: None })
	}

	/// Treats pending states created more than `ttl` ago as missing.
	pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
		self.pending_ttl = Some(ttl);

		self
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_now<T>(&self, key: &StoreKey) -> Result<Option<T>, StoreError>
	where
		T: for<'de> Deserialize<'de>,
	{
		self.inner.read().get(key.as_str()).map(|raw| store::decode(key, raw)).transpose()
	}

	fn is_expired(&self, state: &PendingAuthorizationState) -> bool {
		self.pending_ttl.is_some_and(|ttl| OffsetDateTime::now_utc() - state.created_at > ttl)
	}

	fn write_now(&self, key: StoreKey, raw: Option<String>) -> Result<(), StoreError> {
		let mut guard = self.inner.write();
		let changed = match raw {
			Some(raw) => guard.insert(key.to_string(), raw.clone()).as_ref() != Some(&raw),
			None => guard.remove(key.as_str()).is_some(),
		};

		if changed { persist(&self.path, &guard) } else { Ok(()) }
	}
}
impl TokenStore for FileStore {
	fn get<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, Option<AccessTokenRecord>> {
		Box::pin(async move { self.read_now(&StoreKey::access_token(client_id)) })
	}

	fn set<'a>(
		&'a self,
		client_id: &'a ClientId,
		record: AccessTokenRecord,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let key = StoreKey::access_token(client_id);
			let raw = store::encode(&key, &record)?;

			self.write_now(key, Some(raw))
		})
	}

	fn delete<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.write_now(StoreKey::access_token(client_id), None) })
	}
}
impl PendingStateStore for FileStore {
	fn save_state(&self, state: PendingAuthorizationState) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let key = StoreKey::pending_state(&state.client_id);
			let raw = store::encode(&key, &state)?;

			self.write_now(key, Some(raw))
		})
	}

	fn load_state<'a>(
		&'a self,
		client_id: &'a ClientId,
	) -> StoreFuture<'a, Option<PendingAuthorizationState>> {
		Box::pin(async move {
			let pending: Option<PendingAuthorizationState> =
				self.read_now(&StoreKey::pending_state(client_id))?;

			Ok(pending.filter(|state| !self.is_expired(state)))
		})
	}

	fn consume_state<'a>(
		&'a self,
		client_id: &'a ClientId,
		returned_state: &'a str,
	) -> StoreFuture<'a, ConsumeOutcome> {
		Box::pin(async move {
			let key = StoreKey::pending_state(client_id);
			let mut guard = self.inner.write();
			let Some(raw) = guard.get(key.as_str()) else {
				return Ok(ConsumeOutcome::Missing);
			};
			let pending: PendingAuthorizationState = store::decode(&key, raw)?;

			if self.is_expired(&pending) {
				guard.remove(key.as_str());
				persist(&self.path, &guard)?;

				return Ok(ConsumeOutcome::Missing);
			}
			if !store::state_tokens_match(&pending.state_token, returned_state) {
				return Ok(ConsumeOutcome::Mismatch);
			}

			guard.remove(key.as_str());
			persist(&self.path, &guard)?;

			Ok(ConsumeOutcome::Consumed(pending))
		})
	}

	fn delete_state<'a>(&'a self, client_id: &'a ClientId) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.write_now(StoreKey::pending_state(client_id), None) })
	}
}

fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
	if !path.exists() {
		return Ok(Snapshot::new());
	}

	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(Snapshot::new());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

fn persist(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
	let serialized = serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize store snapshot: {e}"),
	})?;
	let tmp_path = path.with_extension("tmp");

	{
		let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
			message: format!("Failed to create {}: {e}", tmp_path.display()),
		})?;

		file.write_all(&serialized).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", tmp_path.display()),
		})?;
		file.sync_all().map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", tmp_path.display()),
		})?;
	}

	fs::rename(&tmp_path, path).map_err(|e| StoreError::Backend {
		message: format!("Failed to replace {}: {e}", path.display()),
	})
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"oauth2_conductor_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn client() -> ClientId {
		ClientId::new("reporting").expect("Client fixture should be valid.")
	}

	#[test]
	fn records_survive_reopen() {
		let path = temp_path("reopen");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let record = AccessTokenRecord::builder()
			.access_token("access-token")
			.refresh_token("refresh-token")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Failed to build file-store test record.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.set(&client(), record.clone()))
			.expect("Failed to save fixture record to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.get(&client()))
			.expect("Failed to fetch fixture record from file store.")
			.expect("File store lost record after reopen.");

		assert_eq!(fetched, record);

		let raw = fs::read_to_string(&path).expect("Snapshot should be readable.");

		assert!(raw.contains("access_token-reporting"));

		rt.block_on(reopened.delete(&client())).expect("Delete should succeed.");

		assert!(
			rt.block_on(reopened.get(&client())).expect("Fetch should succeed.").is_none(),
			"Deleted record should be gone."
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn pending_state_is_single_use_across_reopen() {
		let path = temp_path("pending");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let state = PendingAuthorizationState::new(client(), "state-token", None);
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save_state(state.clone())).expect("Pending state should persist.");

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(
			rt.block_on(reopened.consume_state(&client(), "other")).expect("Consume should run."),
			ConsumeOutcome::Mismatch
		);
		assert_eq!(
			rt.block_on(reopened.consume_state(&client(), "state-token"))
				.expect("Consume should run."),
			ConsumeOutcome::Consumed(state)
		);
		let reopened = FileStore::open(&path).expect("Reopen should succeed.");

		assert_eq!(rt.block_on(reopened.load_state(&client())).expect("Load should run."), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
