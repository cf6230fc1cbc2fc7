// crates.io
use time::{Duration, macros};
// self
use oauth2_conductor::{
	auth::{AccessTokenRecord, ClientId, ScopeSet, TokenStatus},
	flows::PendingAuthorizationState,
	store::{ConsumeOutcome, MemoryStore, PendingStateStore, StoreKey, TokenStore},
};

fn client(name: &str) -> ClientId {
	ClientId::new(name).expect("Failed to build client identifier for memory store tests.")
}

fn build_record(access: &str, refresh: Option<&str>) -> AccessTokenRecord {
	let issued = macros::datetime!(2025-11-10 12:00 UTC);
	let mut builder = AccessTokenRecord::builder()
		.access_token(access)
		.scope(ScopeSet::new(["email", "profile"]).expect("Scope fixture should be valid."))
		.issued_at(issued)
		.expires_at(issued + Duration::hours(1));

	if let Some(value) = refresh {
		builder = builder.refresh_token(value);
	}

	builder.build().expect("Token record fixture should build successfully.")
}

#[tokio::test]
async fn set_get_and_delete_round_trip() {
	let store = MemoryStore::default();
	let id = client("crm");
	let record = build_record("access-1", Some("refresh-1"));

	assert!(store.get(&id).await.expect("Fetching from an empty store should succeed.").is_none());

	store.set(&id, record.clone()).await.expect("Saving record fixture should succeed.");

	let fetched = store
		.get(&id)
		.await
		.expect("Fetching token record should succeed.")
		.expect("Stored record should remain present.");

	assert_eq!(fetched, record);
	assert_eq!(
		fetched.status_at(macros::datetime!(2025-11-10 14:00 UTC)),
		TokenStatus::Expired,
		"Stores keep expired records; callers decide whether to reuse them."
	);

	store.delete(&id).await.expect("Deleting the record should succeed.");
	store.delete(&id).await.expect("Deleting a missing record should succeed.");

	assert!(store.get(&id).await.expect("Fetching should succeed.").is_none());
}

#[tokio::test]
async fn set_replaces_the_previous_record_wholesale() {
	let store = MemoryStore::default();
	let id = client("crm");

	store.set(&id, build_record("access-old", Some("refresh-old"))).await.expect("Save.");
	store.set(&id, build_record("access-new", None)).await.expect("Overwrite.");

	let fetched =
		store.get(&id).await.expect("Fetch should succeed.").expect("Record should be present.");

	assert_eq!(fetched.access_token.expose(), "access-new");
	assert!(fetched.refresh_token.is_none());
}

#[tokio::test]
async fn clients_and_namespaces_are_independent() {
	let store = MemoryStore::default();
	let crm = client("crm");
	let erp = client("erp");

	store.set(&crm, build_record("access-crm", None)).await.expect("Save CRM record.");
	store
		.save_state(PendingAuthorizationState::new(crm.clone(), "state-crm", None))
		.await
		.expect("Save CRM pending state.");

	assert_eq!(store.len(), 2);
	assert!(store.get(&erp).await.expect("Fetch should succeed.").is_none());
	assert!(store.load_state(&erp).await.expect("Load should succeed.").is_none());

	store.delete_state(&crm).await.expect("Delete pending state.");

	assert!(store.get(&crm).await.expect("Fetch should succeed.").is_some());
	assert_eq!(StoreKey::access_token(&crm).as_str(), "access_token-crm");
	assert_eq!(StoreKey::pending_state(&crm).as_str(), "pending_state-crm");
}

#[tokio::test]
async fn consume_is_single_use_and_mismatch_keeps_the_state() {
	let store = MemoryStore::default();
	let id = client("portal");
	let state = PendingAuthorizationState::new(id.clone(), "expected-state", None);

	store.save_state(state.clone()).await.expect("Save pending state.");

	assert_eq!(
		store.consume_state(&id, "forged-state").await.expect("Consume should run."),
		ConsumeOutcome::Mismatch
	);
	assert_eq!(
		store.load_state(&id).await.expect("Load should succeed."),
		Some(state.clone()),
		"A mismatched callback must not discard the pending state."
	);
	assert_eq!(
		store.consume_state(&id, "expected-state").await.expect("Consume should run."),
		ConsumeOutcome::Consumed(state)
	);
	assert_eq!(
		store.consume_state(&id, "expected-state").await.expect("Consume should run."),
		ConsumeOutcome::Missing
	);
}

#[tokio::test]
async fn concurrent_consumers_have_a_single_winner() {
	let store = MemoryStore::default();
	let id = client("portal");

	store
		.save_state(PendingAuthorizationState::new(id.clone(), "race-state", None))
		.await
		.expect("Save pending state.");

	let store_a = store.clone();
	let store_b = store.clone();
	let id_a = id.clone();
	let id_b = id;
	let task_a = tokio::spawn(async move {
		store_a.consume_state(&id_a, "race-state").await.expect("Consume A should run.")
	});
	let task_b = tokio::spawn(async move {
		store_b.consume_state(&id_b, "race-state").await.expect("Consume B should run.")
	});
	let (outcome_a, outcome_b) = tokio::join!(task_a, task_b);
	let outcomes = [
		outcome_a.expect("Consume task A should not panic."),
		outcome_b.expect("Consume task B should not panic."),
	];
	let winners =
		outcomes.iter().filter(|outcome| matches!(outcome, ConsumeOutcome::Consumed(_))).count();

	assert_eq!(winners, 1, "only one consumer should win");
	assert!(outcomes.contains(&ConsumeOutcome::Missing));
}

#[tokio::test]
async fn pending_ttl_expires_stale_states() {
	let store = MemoryStore::default().with_pending_ttl(Duration::minutes(10));
	let id = client("portal");
	let mut stale = PendingAuthorizationState::new(id.clone(), "stale-state", None);

	stale.created_at -= Duration::minutes(11);

	store.save_state(stale).await.expect("Save stale pending state.");

	assert!(store.load_state(&id).await.expect("Load should succeed.").is_none());
	assert_eq!(
		store.consume_state(&id, "stale-state").await.expect("Consume should run."),
		ConsumeOutcome::Missing
	);
	assert!(store.is_empty(), "Consuming an expired state should drop it.");

	let fresh = PendingAuthorizationState::new(id.clone(), "fresh-state", None);

	store.save_state(fresh.clone()).await.expect("Save fresh pending state.");

	assert_eq!(store.load_state(&id).await.expect("Load should succeed."), Some(fresh));
}
