//! Request dispatcher: bearer attachment, 401 detection, and refresh-then-replay.
//!
//! Every call reads the access credential from the [`CredentialStore`] right before it is sent.
//! A 401 on a refreshable request that has not been replayed yet is handed to the
//! [`RefreshCoordinator`]; the request is then replayed once with the credential the
//! coordinator yields. A second 401 on the replay is terminal.

// self
use crate::{
	_prelude::*,
	auth::{RefreshGrant, TokenSecret},
	config::ClientConfig,
	error::{ConfigError, DecodeError, RefreshError},
	http::{HttpRequest, HttpResponse, HttpTransport, Method},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::{RefreshCoordinator, RefreshOutcome},
	request::{self, AUTHORIZATION, ApiEnvelope, ApiRequest},
	store::{CredentialStore, RotateOutcome, StoreError},
};

/// Issues API calls on behalf of the façade and any other collaborator.
///
/// Cloning is cheap; clones share the transport, store, and refresh coordinator, so a burst of
/// 401s across clones still produces a single refresh call.
pub struct Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	config: Arc<ClientConfig>,
	refresh_url: Url,
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a dispatcher with its own refresh coordinator.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self, ConfigError> {
		let refresh_url = config.endpoint(&config.endpoints.refresh)?;
		let coordinator = RefreshCoordinator::new(config.refresh_timeout, config.failure_policy);

		Ok(Self {
			config: Arc::new(config),
			refresh_url,
			transport: transport.into(),
			store,
			coordinator: Arc::new(coordinator),
		})
	}

	/// Client configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Credential store consulted before every call.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Refresh coordinator shared by every clone of this dispatcher.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Sends `request` and decodes the envelope, rejecting `success: false` bodies.
	pub async fn call<D>(&self, request: ApiRequest) -> Result<ApiEnvelope<D>>
	where
		D: DeserializeOwned,
	{
		let path = request.path.clone();
		let response = self.send(request).await?;
		let envelope = request::decode_envelope::<D>(&path, &response)?;

		if !envelope.success {
			return Err(Error::Api {
				status: response.status,
				message: envelope
					.message
					.unwrap_or_else(|| "The server reported the request as unsuccessful.".into()),
				retry_after: response.retry_after,
			});
		}

		Ok(envelope)
	}

	/// Sends `request` and returns the raw 2xx response.
	///
	/// Non-2xx statuses other than 401 are reported as [`Error::Api`] without any retry.
	pub async fn send(&self, mut request: ApiRequest) -> Result<HttpResponse> {
		loop {
			let (outbound, sent_with) = self.resolve(&request)?;
			let response = self.transport.execute(outbound).await?;

			if response.is_success() {
				return Ok(response);
			}
			if !response.is_unauthorized() {
				return Err(api_error(&response));
			}
			if !request.is_refreshable() || request.is_retried() {
				return Err(unauthorized(&response));
			}

			let Some(refresh_token) = self.store.refresh_token()? else {
				return Err(unauthorized(&response));
			};
			let access_token = match (self.store.access_token()?, sent_with) {
				// A refresh already finished since this request left; reuse its credential.
				(Some(current), Some(sent)) if current != sent => current,
				_ =>
					self.coordinator
						.refresh_or_wait(|| self.refresh_credentials(refresh_token))
						.await?,
			};

			request = request.into_replay(&access_token);
		}
	}

	/// Sends `request` once and returns the response whatever its status.
	pub(crate) async fn exchange(&self, request: &ApiRequest) -> Result<HttpResponse> {
		let (outbound, _) = self.resolve(request)?;

		Ok(self.transport.execute(outbound).await?)
	}

	// Returns the outbound request plus the stored credential it carries, if any.
	fn resolve(&self, request: &ApiRequest) -> Result<(HttpRequest, Option<TokenSecret>)> {
		let url = self.config.endpoint(&request.path)?;
		let mut headers = request.headers.clone();
		let mut sent_with = None;

		if !headers.contains_key(AUTHORIZATION)
			&& let Some(access_token) = self.store.access_token()?
		{
			headers.insert(AUTHORIZATION.into(), access_token.bearer());

			sent_with = Some(access_token);
		}

		let outbound = HttpRequest { method: request.method, url, headers, body: request.body.clone() };

		Ok((outbound, sent_with))
	}

	// The refresh call goes straight to the transport so a 401 here never re-enters `send`.
	async fn refresh_credentials(&self, refresh_token: TokenSecret) -> RefreshOutcome {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_credentials");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let outbound = HttpRequest {
					method: Method::Post,
					url: self.refresh_url.clone(),
					headers: BTreeMap::new(),
					body: Some(serde_json::json!({ "refreshToken": refresh_token.expose() })),
				};
				let response = self
					.transport
					.execute(outbound)
					.await
					.map_err(|e| RefreshError::Network { message: describe(&e) })?;

				if !response.is_success() {
					return Err(RefreshError::Rejected {
						status: response.status,
						message: request::server_message(&response)
							.unwrap_or_else(|| "Session expired; please sign in again.".into()),
					});
				}

				let envelope = request::decode_envelope::<RefreshGrant>(
					&self.config.endpoints.refresh,
					&response,
				)
				.map_err(|e| RefreshError::Malformed { message: describe_decode(e) })?;

				if !envelope.success {
					return Err(RefreshError::Rejected {
						status: response.status,
						message: envelope
							.message
							.unwrap_or_else(|| "Session expired; please sign in again.".into()),
					});
				}

				let storage = |e: StoreError| RefreshError::Storage { message: e.to_string() };
				let Some(current) = self.store.read().map_err(storage)? else {
					return Err(RefreshError::SessionCleared);
				};
				let replacement = envelope.data.apply_to(&current);

				match self
					.store
					.rotate(&refresh_token, replacement.clone())
					.map_err(storage)?
				{
					RotateOutcome::Updated => Ok(replacement.access_token),
					RotateOutcome::RefreshMismatch(current) => Ok(current.access_token),
					RotateOutcome::Missing => Err(RefreshError::SessionCleared),
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
impl<T> Clone for Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			refresh_url: self.refresh_url.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_url", &self.refresh_url.as_str())
			.field("coordinator", &self.coordinator.state())
			.finish()
	}
}

fn api_error(response: &HttpResponse) -> Error {
	Error::Api {
		status: response.status,
		message: request::server_message(response)
			.unwrap_or_else(|| format!("Request failed with status {}.", response.status)),
		retry_after: response.retry_after,
	}
}

fn unauthorized(response: &HttpResponse) -> Error {
	Error::Unauthorized {
		message: request::server_message(response)
			.unwrap_or_else(|| "Authentication required.".into()),
	}
}

fn describe(error: &dyn StdError) -> String {
	match error.source() {
		Some(source) => format!("{error} {source}"),
		None => error.to_string(),
	}
}

fn describe_decode(error: Error) -> String {
	match error {
		Error::Decode(DecodeError::Envelope { source, .. }) => source.to_string(),
		other => other.to_string(),
	}
}
