//! Walks an authorization-code client through the redirect: the orchestrator asks for
//! authorization, the demo plays the provider's callback, and the exchanged token is then
//! served from the store.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_conductor::{
	auth::{ClientId, ScopeSet},
	flows::{AccessOutcome, TokenOrchestrator},
	grant::{GrantStrategies, ReqwestTransportErrorMapper},
	http::ReqwestHttpClient,
	provider::{ClientAuthMethod, ClientDescriptor, GrantType},
	registry::{ClientRegistry, MemoryRegistry},
	reqwest::Client,
	store::{MemoryStore, PendingStateStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", "demo-code");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"portal-access\",\"refresh_token\":\"portal-refresh\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let id = ClientId::new("portal")?;
	let descriptor = ClientDescriptor::builder(id.clone(), GrantType::AuthorizationCode)
		.client_id("portal-app")
		.client_auth_method(ClientAuthMethod::Public)
		.authorization_endpoint(Url::parse(&server.url("/authorize"))?)
		.token_endpoint(Url::parse(&server.url("/token"))?)
		.redirect_uri(Url::parse("https://app.example.com/oauth/callback")?)
		.scope(ScopeSet::new(["openid", "profile", "offline_access"])?)
		.build()?;
	let registry: Arc<dyn ClientRegistry> = Arc::new(MemoryRegistry::from_descriptors([descriptor])?);
	let store = Arc::new(MemoryStore::default());
	let tokens: Arc<dyn TokenStore> = store.clone();
	let pending: Arc<dyn PendingStateStore> = store;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let orchestrator = TokenOrchestrator::new(
		registry,
		tokens,
		pending,
		GrantStrategies::with_http_client(http_client, ReqwestTransportErrorMapper),
	);
	let redirect = match orchestrator.get_access_token(&id, None).await? {
		AccessOutcome::AuthorizationRequired(redirect) => redirect,
		AccessOutcome::Ready(_) => return Err(eyre!("A fresh client should need authorization.")),
	};

	println!("Send the resource owner to: {}.", redirect.authorize_url);

	// The provider redirects back with the state it was given and a one-time code.
	let record = orchestrator.complete_authorization(&id, &redirect.state, "demo-code").await?;

	println!("Captured access token: {}.", record.access_token.expose());

	let reused = orchestrator
		.get_access_token(&id, None)
		.await?
		.into_record()
		.ok_or_else(|| eyre!("The captured token should be reused."))?;

	println!("Reused access token: {}.", reused.access_token.expose());

	token_mock.assert_calls_async(1).await;

	Ok(())
}
