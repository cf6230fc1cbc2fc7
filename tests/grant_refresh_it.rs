#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oauth2_conductor::{
	_preludet::*,
	auth::{AccessTokenRecord, ClientId, ResourceOwnerCredentials},
	flows::AccessOutcome,
	provider::{ClientAuthMethod, ClientDescriptor, GrantType},
	store::{MemoryStore, TokenStore},
};

fn client(name: &str) -> ClientId {
	ClientId::new(name).expect("Client fixture should be valid.")
}

fn build_descriptor(server: &MockServer, name: &str, grant: GrantType) -> ClientDescriptor {
	ClientDescriptor::builder(client(name), grant)
		.client_id(format!("{name}-app"))
		.client_secret("refresh-secret")
		.authorization_endpoint(
			Url::parse(&server.url("/authorize"))
				.expect("Mock authorization endpoint should parse successfully."),
		)
		.token_endpoint(
			Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully."),
		)
		.redirect_uri(
			Url::parse("https://app.example.com/callback")
				.expect("Redirect URI should parse successfully."),
		)
		.client_auth_method(ClientAuthMethod::ClientSecretPost)
		.build()
		.expect("Client descriptor should build successfully.")
}

async fn seed_expired(store: &MemoryStore, id: &ClientId, access: &str, refresh: &str) {
	let issued = OffsetDateTime::now_utc() - Duration::hours(2);
	let record = AccessTokenRecord::builder()
		.access_token(access)
		.refresh_token(refresh)
		.issued_at(issued)
		.expires_at(issued + Duration::hours(1))
		.build()
		.expect("Seed record should build successfully.");

	store.set(id, record).await.expect("Seeding the token store should succeed.");
}

#[tokio::test]
async fn refresh_rotation_is_persisted() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server, "crm", GrantType::AuthorizationCode);
	let (orchestrator, _registry, store) = build_reqwest_test_orchestrator([descriptor]);
	let id = client("crm");

	seed_expired(&store, &id, "access-old", "refresh-old").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "refresh-old");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-new\",\"refresh_token\":\"refresh-new\",\"token_type\":\"bearer\",\"expires_in\":1800}",
				);
		})
		.await;
	let record = orchestrator
		.get_access_token(&id, None)
		.await
		.expect("Refresh token rotation should succeed.")
		.into_record()
		.expect("Refresh should yield a token.");

	mock.assert_async().await;

	assert_eq!(record.access_token.expose(), "access-new");
	assert_eq!(record.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-new"));

	let stored = store
		.get(&id)
		.await
		.expect("Token store fetch should succeed.")
		.expect("Record should remain present after refresh.");

	assert_eq!(stored, record);
}

#[tokio::test]
async fn refresh_without_rotation_keeps_the_previous_refresh_token() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server, "sync", GrantType::RefreshToken);
	let (orchestrator, _registry, store) = build_reqwest_test_orchestrator([descriptor]);
	let id = client("sync");

	seed_expired(&store, &id, "access-old", "refresh-stable").await;

	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("grant_type", "refresh_token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-new\",\"token_type\":\"bearer\",\"expires_in\":60}");
		})
		.await;
	let record = orchestrator
		.get_access_token(&id, None)
		.await
		.expect("Refresh should succeed.")
		.into_record()
		.expect("Refresh should yield a token.");

	assert_eq!(record.access_token.expose(), "access-new");
	assert_eq!(record.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-stable"));
}

#[tokio::test]
async fn rejected_refresh_deletes_the_record_and_requests_authorization() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server, "crm", GrantType::AuthorizationCode);
	let (orchestrator, _registry, store) = build_reqwest_test_orchestrator([descriptor]);
	let id = client("crm");

	seed_expired(&store, &id, "access-revoked", "refresh-revoked").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"refresh token revoked\"}");
		})
		.await;
	let outcome = orchestrator
		.get_access_token(&id, None)
		.await
		.expect("A rejected refresh should fall back to authorization.");

	mock.assert_calls_async(1).await;

	let AccessOutcome::AuthorizationRequired(redirect) = outcome else {
		panic!("Expected an authorization redirect, got {outcome:?}.");
	};

	assert_eq!(redirect.authorize_url.path(), "/authorize");
	assert!(store.get(&id).await.expect("Token store fetch should succeed.").is_none());
}

#[tokio::test]
async fn rejected_refresh_falls_back_to_password_credentials() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server, "ledger", GrantType::ResourceOwnerPassword);
	let (orchestrator, _registry, store) = build_reqwest_test_orchestrator([descriptor]);
	let id = client("ledger");

	seed_expired(&store, &id, "access-old", "refresh-expired").await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("grant_type", "refresh_token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let password = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("grant_type", "password");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-password\",\"token_type\":\"bearer\",\"expires_in\":600}");
		})
		.await;
	let credentials = ResourceOwnerCredentials::new("ops", "hunter2");
	let record = orchestrator
		.get_access_token(&id, Some(&credentials))
		.await
		.expect("Password fallback should succeed.")
		.into_record()
		.expect("Password fallback should yield a token.");

	refresh.assert_calls_async(1).await;
	password.assert_calls_async(1).await;

	assert_eq!(record.access_token.expose(), "access-password");
}

#[tokio::test]
async fn refresh_outages_keep_the_stored_record() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server, "crm", GrantType::AuthorizationCode);
	let (orchestrator, _registry, store) = build_reqwest_test_orchestrator([descriptor]);
	let id = client("crm");

	seed_expired(&store, &id, "access-old", "refresh-old").await;

	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(502).header("content-type", "application/json").body("{}");
		})
		.await;
	let err = orchestrator
		.get_access_token(&id, None)
		.await
		.expect_err("Provider outage should surface.");

	assert!(matches!(err, Error::ProviderUnavailable(_)));

	let stored = store
		.get(&id)
		.await
		.expect("Token store fetch should succeed.")
		.expect("Record should survive an outage.");

	assert_eq!(stored.access_token.expose(), "access-old");
}
