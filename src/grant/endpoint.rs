//! Shared token endpoint plumbing: request decoration, response mapping, and error mapping.

// crates.io
use oauth2::{
	HttpClientError, RequestTokenError, TokenResponse,
	basic::{BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, ScopeSet, Secret},
	error::{ConfigError, ProviderUnavailableError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		DefaultProviderHooks, GrantType, Provider, ProviderErrorContext, ProviderErrorKind,
		ProviderHooks,
	},
};

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		grant: GrantType,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() => ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) if inner.is_timeout() =>
				unavailable("Request timed out while calling the token endpoint", meta),
			HttpClientError::Reqwest(inner) => ProviderUnavailableError::from(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => ProviderUnavailableError::Io(inner).into(),
			HttpClientError::Other(message) => unavailable(
				&format!("HTTP client error occurred while calling the token endpoint: {message}"),
				meta,
			),
			_ => unavailable("HTTP client error occurred while calling the token endpoint", meta),
		}
	}
}

/// Transport, error mapper, and provider hooks shared by every grant strategy.
pub struct TokenEndpoint<C, M> {
	http_client: Arc<C>,
	mapper: Arc<M>,
	hooks: Arc<dyn ProviderHooks>,
}
impl<C, M> TokenEndpoint<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Creates an endpoint using [`DefaultProviderHooks`].
	pub fn new(http_client: Arc<C>, mapper: Arc<M>) -> Self {
		Self { http_client, mapper, hooks: Arc::new(DefaultProviderHooks) }
	}

	/// Replaces the provider hooks.
	pub fn with_hooks(mut self, hooks: Arc<dyn ProviderHooks>) -> Self {
		self.hooks = hooks;

		self
	}

	/// Returns an `oauth2` handle that reports response metadata into `slot`.
	pub(crate) fn handle(&self, slot: ResponseMetadataSlot) -> C::Handle {
		self.http_client.with_metadata(slot)
	}

	/// Form parameters added on top of what `oauth2` sends for `grant`.
	///
	/// Scopes are joined with the provider's delimiter here instead of through `oauth2`, which
	/// always uses spaces.
	pub(crate) fn extra_params(
		&self,
		provider: &Provider,
		grant: GrantType,
		include_scope: bool,
	) -> Vec<(String, String)> {
		let mut form = BTreeMap::new();

		form.insert("grant_type".to_owned(), grant.as_str().to_owned());

		if include_scope
			&& let Some(scope) = provider.scope().joined(provider.quirks().scope_delimiter)
		{
			form.insert("scope".to_owned(), scope);
		}

		self.hooks.augment_token_request(grant, &mut form);

		form.into_iter().filter(|(name, _)| name != "grant_type").collect()
	}

	/// Converts the outcome of an `oauth2` exchange into a token record or a crate error.
	///
	/// `previous_refresh` is carried onto the record when the provider does not rotate the
	/// refresh token.
	pub(crate) fn finish(
		&self,
		provider: &Provider,
		grant: GrantType,
		slot: &ResponseMetadataSlot,
		outcome: Result<BasicTokenResponse, BasicRequestTokenError<HttpClientError<C::TransportError>>>,
		previous_refresh: Option<Secret>,
	) -> Result<AccessTokenRecord> {
		let meta = slot.take();

		match outcome {
			Ok(response) => record_from_response(provider, &response, previous_refresh),
			Err(err) => Err(self.map_request_error(grant, meta.as_ref(), err)),
		}
	}

	fn map_request_error(
		&self,
		grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> Error {
		let status = meta.and_then(|meta| meta.status);

		match err {
			RequestTokenError::ServerResponse(response) =>
				self.classify(grant, server_context(grant, status, &response), meta),
			RequestTokenError::Request(error) => self.mapper.map_transport_error(grant, meta, error),
			RequestTokenError::Parse(_, body) if status.is_some_and(|code| code >= 400) => {
				let ctx = ProviderErrorContext::new(grant)
					.with_http_status(status.unwrap_or_default())
					.with_body_preview(String::from_utf8_lossy(&body));

				self.classify(grant, ctx, meta)
			},
			RequestTokenError::Parse(source, _) =>
				ProviderUnavailableError::TokenResponseParse { source, status }.into(),
			RequestTokenError::Other(message) => match status {
				Some(code) if code >= 400 =>
					self.classify(grant, ProviderErrorContext::new(grant).with_http_status(code), meta),
				_ => unavailable(
					&format!("Token endpoint returned an unexpected response: {message}"),
					meta,
				),
			},
		}
	}

	fn classify(
		&self,
		grant: GrantType,
		ctx: ProviderErrorContext,
		meta: Option<&ResponseMetadata>,
	) -> Error {
		let kind = self.hooks.classify_token_error(&ctx);

		match kind.rejection() {
			Some(kind) => Error::AuthenticationFailed { grant, kind, reason: ctx.reason() },
			None => {
				debug_assert_eq!(kind, ProviderErrorKind::Transient);

				unavailable(&format!("Token endpoint failed: {}", ctx.reason()), meta)
			},
		}
	}
}
impl<C, M> Clone for TokenEndpoint<C, M> {
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			mapper: Arc::clone(&self.mapper),
			hooks: Arc::clone(&self.hooks),
		}
	}
}
impl<C, M> Debug for TokenEndpoint<C, M> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenEndpoint").finish_non_exhaustive()
	}
}

fn server_context(
	grant: GrantType,
	status: Option<u16>,
	response: &BasicErrorResponse,
) -> ProviderErrorContext {
	let mut ctx = ProviderErrorContext::new(grant).with_oauth_error(response.error().as_ref().to_string());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = status {
		ctx = ctx.with_http_status(status);
	}

	ctx
}

fn unavailable(message: &str, meta: Option<&ResponseMetadata>) -> Error {
	ProviderUnavailableError::TokenEndpoint {
		message: message.to_owned(),
		status: meta.and_then(|meta| meta.status),
		retry_after: meta.and_then(|meta| meta.retry_after),
	}
	.into()
}

fn record_from_response(
	provider: &Provider,
	response: &BasicTokenResponse,
	previous_refresh: Option<Secret>,
) -> Result<AccessTokenRecord> {
	let issued_at = OffsetDateTime::now_utc();
	let scope = match response.scopes() {
		Some(scopes) => ScopeSet::new(
			scopes.iter().map(|scope| scope.as_str()).filter(|scope| !scope.is_empty()),
		)
		.map_err(ConfigError::from)?,
		None => provider.scope().clone(),
	};
	let raw = serde_json::to_value(response).map_err(|source| ConfigError::RawPayload { source })?;
	let mut builder = AccessTokenRecord::builder()
		.access_token(response.access_token().secret().as_str())
		.token_type(response.token_type().as_ref())
		.scope(scope)
		.issued_at(issued_at)
		.raw(raw);

	if let Some(expires_in) = response.expires_in() {
		let secs = i64::try_from(expires_in.as_secs())
			.map_err(|_| ConfigError::ExpiresInOutOfRange)?;

		if secs <= 0 {
			return Err(ConfigError::NonPositiveExpiresIn.into());
		}

		let expires_at = issued_at
			.checked_add(Duration::seconds(secs))
			.ok_or(ConfigError::ExpiresInOutOfRange)?;

		builder = builder.expires_at(expires_at);
	}

	builder = match response.refresh_token() {
		Some(refresh) => builder.refresh_token(refresh.secret().as_str()),
		None => builder.refresh_secret(previous_refresh),
	};

	builder.build().map_err(|e| ConfigError::from(e).into())
}
