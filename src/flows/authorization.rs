//! Authorization capture: the two-phase, CSRF-protected authorization-code handshake.
//!
//! [`TokenOrchestrator::begin_authorization`] stores a [`PendingAuthorizationState`] and hands
//! back the URL the resource owner must visit. When the provider redirects back,
//! [`TokenOrchestrator::complete_authorization`] atomically consumes the pending state and
//! exchanges the code. A state is usable once; a mismatching callback leaves it in place.

pub mod session;

pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, ClientId, Secret},
	error::ConfigError,
	flows::TokenOrchestrator,
	grant::GrantRequest,
	obs::{self, FlowKind},
	provider::{ClientAuthMethod, ClientDescriptor, GrantType, Provider},
	store::ConsumeOutcome,
};

impl TokenOrchestrator {
	/// Starts an authorization for `client_id`, replacing any authorization already pending.
	pub async fn begin_authorization(&self, client_id: &ClientId) -> Result<AuthorizationRedirect> {
		obs::observe(FlowKind::BeginAuthorization, client_id.as_str(), async move {
			let descriptor = self.resolve(client_id)?;

			self.start_authorization(&descriptor).await
		})
		.await
	}

	/// Finishes the authorization of `client_id` with the `state` and `code` of the callback.
	///
	/// Fails with [`Error::StateMismatch`] when `returned_state` differs from the pending one and
	/// with [`Error::NoPendingAuthorization`] when nothing is pending. The code is only exchanged
	/// after the pending state has been consumed; the new record is persisted and returned.
	pub async fn complete_authorization(
		&self,
		client_id: &ClientId,
		returned_state: &str,
		code: &str,
	) -> Result<AccessTokenRecord> {
		obs::observe(FlowKind::CompleteAuthorization, client_id.as_str(), async move {
			let descriptor = self.resolve(client_id)?;

			ensure_authorization_code(&descriptor)?;

			let provider = self.provider_for(&descriptor, GrantType::AuthorizationCode)?;
			let _singleflight = self.lock_flow(client_id).await;
			let pending = match self.pending.consume_state(client_id, returned_state).await? {
				ConsumeOutcome::Consumed(pending) => pending,
				ConsumeOutcome::Mismatch =>
					return Err(Error::StateMismatch { client_id: client_id.clone() }),
				ConsumeOutcome::Missing =>
					return Err(Error::NoPendingAuthorization { client_id: client_id.clone() }),
			};
			let request = GrantRequest::AuthorizationCode {
				code,
				pkce_verifier: pending.pkce_verifier.as_ref().map(Secret::expose),
			};
			let record = self.strategies.authorization_code.acquire(&provider, request).await?;

			self.tokens.set(client_id, record.clone()).await?;

			Ok(record)
		})
		.await
	}

	/// Loads the authorization pending for `client_id`, if any.
	pub async fn pending_authorization(
		&self,
		client_id: &ClientId,
	) -> Result<Option<PendingAuthorizationState>> {
		Ok(self.pending.load_state(client_id).await?)
	}

	/// Drops the authorization pending for `client_id`.
	pub async fn cancel_authorization(&self, client_id: &ClientId) -> Result<()> {
		Ok(self.pending.delete_state(client_id).await?)
	}

	pub(super) async fn start_authorization(
		&self,
		descriptor: &ClientDescriptor,
	) -> Result<AuthorizationRedirect> {
		ensure_authorization_code(descriptor)?;

		let provider = self.provider_for(descriptor, GrantType::AuthorizationCode)?;
		let pkce = uses_pkce(&provider).then(PkcePair::generate);
		let state = session::random_state();
		let authorize_url = self.strategies.authorization_code.authorization_url(
			&provider,
			&state,
			pkce.as_ref().map(PkcePair::challenge),
		)?;
		let pending = PendingAuthorizationState::new(
			descriptor.id.clone(),
			state.clone(),
			pkce.map(PkcePair::into_verifier),
		);

		self.pending.save_state(pending).await?;

		Ok(AuthorizationRedirect { client_id: descriptor.id.clone(), authorize_url, state })
	}
}

fn ensure_authorization_code(descriptor: &ClientDescriptor) -> Result<()> {
	if descriptor.grant_type == GrantType::AuthorizationCode {
		Ok(())
	} else {
		Err(ConfigError::GrantMismatch {
			client_id: descriptor.id.clone(),
			expected: GrantType::AuthorizationCode,
			actual: descriptor.grant_type,
		}
		.into())
	}
}

fn uses_pkce(provider: &Provider) -> bool {
	provider.quirks().pkce_required || provider.auth_method() == ClientAuthMethod::Public
}
