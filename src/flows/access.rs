//! `get_access_token` dispatch: fast path, singleflight re-acquisition, and refresh fallbacks.

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, ClientId, ResourceOwnerCredentials},
	flows::{AccessOutcome, TokenOrchestrator},
	grant::GrantRequest,
	obs::{self, FlowKind},
	provider::{ClientDescriptor, GrantType},
};

impl TokenOrchestrator {
	/// Returns a usable access token for `client_id`, acquiring a new one when needed.
	///
	/// A stored record that is still valid is returned without contacting the provider or
	/// writing to the store. Otherwise the client's grant type decides how a new record is
	/// obtained:
	///
	/// - authorization code: refresh when possible; a rejected or impossible refresh deletes the
	///   stored record and starts a new authorization, returned as
	///   [`AccessOutcome::AuthorizationRequired`];
	/// - client credentials: a new exchange; `credentials` are ignored;
	/// - resource-owner password: refresh when possible, otherwise exchange `credentials`,
	///   failing with [`Error::MissingCredentials`] when none are supplied;
	/// - refresh token: refresh the stored record, failing with [`Error::NoRefreshToken`] when
	///   there is nothing to refresh.
	///
	/// New records are persisted before they are returned. Concurrent calls for the same client
	/// share a guard, so only one of them reaches the provider.
	pub async fn get_access_token(
		&self,
		client_id: &ClientId,
		credentials: Option<&ResourceOwnerCredentials>,
	) -> Result<AccessOutcome> {
		obs::observe(FlowKind::AccessToken, client_id.as_str(), async move {
			let descriptor = self.resolve(client_id)?;

			if let Some(record) = self.usable_record(client_id).await? {
				return Ok(AccessOutcome::Ready(record));
			}

			let _singleflight = self.lock_flow(client_id).await;
			let current = self.tokens.get(client_id).await?;

			if let Some(record) =
				current.as_ref().filter(|record| self.is_usable(record, OffsetDateTime::now_utc()))
			{
				return Ok(AccessOutcome::Ready(record.clone()));
			}

			self.reacquire(&descriptor, current, credentials).await
		})
		.await
	}

	/// Deletes the stored record of `client_id`.
	pub async fn clear_access_token(&self, client_id: &ClientId) -> Result<()> {
		Ok(self.tokens.delete(client_id).await?)
	}

	/// Reads the stored record of `client_id` as-is, without validity checks.
	pub async fn retrieve_access_token(
		&self,
		client_id: &ClientId,
	) -> Result<Option<AccessTokenRecord>> {
		Ok(self.tokens.get(client_id).await?)
	}

	/// Clears the stored record, then acquires a new one through [`Self::get_access_token`].
	pub async fn reset_access_token(
		&self,
		client_id: &ClientId,
		credentials: Option<&ResourceOwnerCredentials>,
	) -> Result<AccessOutcome> {
		self.resolve(client_id)?;
		self.clear_access_token(client_id).await?;
		self.get_access_token(client_id, credentials).await
	}

	async fn usable_record(&self, client_id: &ClientId) -> Result<Option<AccessTokenRecord>> {
		let now = OffsetDateTime::now_utc();

		Ok(self.tokens.get(client_id).await?.filter(|record| self.is_usable(record, now)))
	}

	async fn reacquire(
		&self,
		descriptor: &ClientDescriptor,
		stale: Option<AccessTokenRecord>,
		credentials: Option<&ResourceOwnerCredentials>,
	) -> Result<AccessOutcome> {
		let client_id = &descriptor.id;
		let refreshable = stale.filter(AccessTokenRecord::can_refresh);

		match descriptor.grant_type {
			GrantType::ClientCredentials => {
				let record = self
					.exchange(descriptor, GrantType::ClientCredentials, GrantRequest::ClientCredentials)
					.await?;

				self.persist(client_id, record).await
			},
			GrantType::AuthorizationCode => {
				if let Some(stored) = &refreshable {
					match self.refresh(descriptor, stored).await {
						Ok(record) => return self.persist(client_id, record).await,
						Err(e) if e.is_refresh_rejection() => {
							self.tokens.delete(client_id).await?;

							obs::record_fallback(GrantType::RefreshToken, GrantType::AuthorizationCode);
						},
						Err(e) => return Err(e),
					}
				}

				let redirect = self.start_authorization(descriptor).await?;

				Ok(AccessOutcome::AuthorizationRequired(redirect))
			},
			GrantType::ResourceOwnerPassword => {
				if let Some(stored) = &refreshable {
					match self.refresh(descriptor, stored).await {
						Ok(record) => return self.persist(client_id, record).await,
						Err(e) if e.is_refresh_rejection() => obs::record_fallback(
							GrantType::RefreshToken,
							GrantType::ResourceOwnerPassword,
						),
						Err(e) => return Err(e),
					}
				}

				let credentials = credentials
					.filter(|credentials| !credentials.is_blank())
					.ok_or_else(|| Error::MissingCredentials { client_id: client_id.clone() })?;
				let record = self
					.exchange(
						descriptor,
						GrantType::ResourceOwnerPassword,
						GrantRequest::Password { credentials },
					)
					.await?;

				self.persist(client_id, record).await
			},
			GrantType::RefreshToken => {
				let stored = refreshable
					.ok_or_else(|| Error::NoRefreshToken { client_id: client_id.clone() })?;
				let record = self.refresh(descriptor, &stored).await?;

				self.persist(client_id, record).await
			},
		}
	}

	async fn refresh(
		&self,
		descriptor: &ClientDescriptor,
		stored: &AccessTokenRecord,
	) -> Result<AccessTokenRecord> {
		self.exchange(descriptor, GrantType::RefreshToken, GrantRequest::Refresh { stored }).await
	}

	async fn exchange(
		&self,
		descriptor: &ClientDescriptor,
		grant: GrantType,
		request: GrantRequest<'_>,
	) -> Result<AccessTokenRecord> {
		let provider = self.provider_for(descriptor, grant)?;

		self.strategies.for_grant(grant).acquire(&provider, request).await
	}

	async fn persist(&self, client_id: &ClientId, record: AccessTokenRecord) -> Result<AccessOutcome> {
		self.tokens.set(client_id, record.clone()).await?;

		Ok(AccessOutcome::Ready(record))
	}
}
