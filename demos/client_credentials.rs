//! Serves two service clients from one orchestrator: the first call for each client hits the
//! token endpoint, later calls reuse the stored token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_conductor::{
	auth::{ClientId, ScopeSet},
	flows::TokenOrchestrator,
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
			when.method(POST).path("/token").form_urlencoded_tuple("grant_type", "client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let token_endpoint = Url::parse(&server.url("/token"))?;
	let billing = ClientDescriptor::builder(ClientId::new("billing")?, GrantType::ClientCredentials)
		.client_id("billing-service")
		.client_secret("billing-secret")
		.token_endpoint(token_endpoint.clone())
		.scope(ScopeSet::new(["invoices.read"])?)
		.build()?;
	let reporting =
		ClientDescriptor::builder(ClientId::new("reporting")?, GrantType::ClientCredentials)
			.client_id("reporting-service")
			.client_secret("reporting-secret")
			.client_auth_method(ClientAuthMethod::ClientSecretPost)
			.token_endpoint(token_endpoint)
			.scope(ScopeSet::new(["reports.read", "reports.export"])?)
			.build()?;
	let registry: Arc<dyn ClientRegistry> =
		Arc::new(MemoryRegistry::from_descriptors([billing, reporting])?);
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

	for name in ["billing", "reporting", "billing", "reporting"] {
		let id = ClientId::new(name)?;
		let outcome = orchestrator.get_access_token(&id, None).await?;

		if let Some(record) = outcome.into_record() {
			println!("{id}: {} ({}).", record.access_token.expose(), record.scope.normalized());
		}
	}

	token_mock.assert_calls_async(2).await;

	Ok(())
}
