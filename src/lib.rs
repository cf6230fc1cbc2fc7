//! Multi-client OAuth 2.0 token orchestration: per-client grant dispatch, refresh fallbacks,
//! CSRF-safe authorization capture, and pluggable token stores in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod flows;
pub mod grant;
pub mod http;
pub mod obs;
pub mod provider;
pub mod registry;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		flows::TokenOrchestrator,
		grant::{GrantStrategies, ReqwestTransportErrorMapper},
		http::ReqwestHttpClient,
		provider::ClientDescriptor,
		registry::{ClientRegistry, MemoryRegistry},
		store::{MemoryStore, PendingStateStore, TokenStore},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Reqwest-backed grant strategies that trust the mock server certificates.
	pub fn test_grant_strategies() -> GrantStrategies {
		GrantStrategies::with_http_client(test_reqwest_http_client(), ReqwestTransportErrorMapper)
	}

	/// Constructs a [`TokenOrchestrator`] over an in-memory registry seeded with `descriptors`,
	/// a shared in-memory store (tokens + pending states), and the reqwest transport.
	pub fn build_reqwest_test_orchestrator<I>(
		descriptors: I,
	) -> (TokenOrchestrator, Arc<MemoryRegistry>, Arc<MemoryStore>)
	where
		I: IntoIterator<Item = ClientDescriptor>,
	{
		let registry_backend = Arc::new(
			MemoryRegistry::from_descriptors(descriptors)
				.expect("Test descriptors should pass registry validation."),
		);
		let registry: Arc<dyn ClientRegistry> = registry_backend.clone();
		let store_backend = Arc::new(MemoryStore::default());
		let token_store: Arc<dyn TokenStore> = store_backend.clone();
		let pending_store: Arc<dyn PendingStateStore> = store_backend.clone();
		let orchestrator = TokenOrchestrator::new(
			registry,
			token_store,
			pending_store,
			test_grant_strategies(),
		);

		(orchestrator, registry_backend, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
