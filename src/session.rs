//! Session façade: the named auth operations the UI layer calls.
//!
//! Each operation wraps one dispatcher call and keeps the [`CredentialStore`] in step with the
//! server. Operations that change which account is signed in (register, login, logout, startup
//! restore) are serialized by one async guard so they never interleave their store writes.

pub mod form;

pub use form::*;

// self
use crate::{
	_prelude::*,
	auth::{AuthTokens, Email, SessionStatus},
	config::ClientConfig,
	dispatch::Dispatcher,
	error::{ConfigError, ValidationError},
	http::{HttpResponse, HttpTransport},
	obs::{self, FlowKind},
	refresh::{RefreshCoordinator, RefreshMetrics},
	request::{self, ApiEnvelope, ApiRequest},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

const REGISTER_FALLBACK: &str = "Unable to create account.";
const LOGIN_FALLBACK: &str = "Invalid credentials.";
const RESET_FALLBACK: &str = "If the email exists, reset instructions were sent.";
const RESET_FAILED_FALLBACK: &str = "Unable to send reset instructions.";

#[cfg(feature = "reqwest")]
/// Session specialized for the crate's default reqwest transport.
pub type ReqwestSession = Session<ReqwestTransport>;

/// Entry point for authentication and authenticated calls.
///
/// Clones share the dispatcher, store, refresh coordinator, and auth guard.
pub struct Session<T>
where
	T: ?Sized + HttpTransport,
{
	dispatcher: Dispatcher<T>,
	auth_guard: Arc<AsyncMutex<()>>,
}
impl<T> Session<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a session over a caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			dispatcher: Dispatcher::new(config, store, transport)?,
			auth_guard: Default::default(),
		})
	}

	/// Client configuration.
	pub fn config(&self) -> &ClientConfig {
		self.dispatcher.config()
	}

	/// Credential store backing this session.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		self.dispatcher.store()
	}

	/// Dispatcher used for every call; shareable with other collaborators.
	pub fn dispatcher(&self) -> &Dispatcher<T> {
		&self.dispatcher
	}

	/// Refresh coordinator shared by all calls made through this session.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		self.dispatcher.coordinator()
	}

	/// In-process refresh counters.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		self.coordinator().metrics()
	}

	/// Creates an account and stores the returned credentials.
	///
	/// The form is validated locally first; a [`ValidationError`] never reaches the network.
	pub async fn register(&self, form: &RegistrationForm) -> Result<AuthTokens> {
		obs::observe(FlowKind::Register, "register", async {
			let registration = form.validate()?;
			let request = ApiRequest::post(&self.config().endpoints.register)
				.json(&registration)?
				.without_refresh();
			let _guard = self.auth_guard.lock().await;

			self.mint(request, REGISTER_FALLBACK).await
		})
		.await
	}

	/// Signs in and stores the returned credentials.
	pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens> {
		obs::observe(FlowKind::Login, "login", async {
			let email = Email::new(email.trim()).map_err(ValidationError::from)?;

			if password.is_empty() {
				return Err(ValidationError::EmptyPassword.into());
			}

			let request = ApiRequest::post(&self.config().endpoints.login)
				.json(&serde_json::json!({ "email": email, "password": password }))?
				.without_refresh();
			let _guard = self.auth_guard.lock().await;

			self.mint(request, LOGIN_FALLBACK).await
		})
		.await
	}

	/// Asks the server whether the stored access credential is still accepted.
	///
	/// Read-only: the store is never touched, even when the answer is unauthenticated.
	pub async fn get_session(&self) -> Result<SessionStatus> {
		obs::observe(FlowKind::Session, "get_session", self.fetch_session()).await
	}

	/// Startup check: keeps the stored session only if the server still accepts it.
	///
	/// Without a stored access credential no call is made. A negative answer or a failed probe
	/// clears the store and reports the session as unauthenticated.
	pub async fn restore_session(&self) -> Result<SessionStatus> {
		obs::observe(FlowKind::Session, "restore_session", async {
			let _guard = self.auth_guard.lock().await;

			if self.store().access_token()?.is_none() {
				return Ok(SessionStatus::unauthenticated());
			}

			match self.fetch_session().await {
				Ok(status) if status.authenticated => Ok(status),
				_ => {
					self.store().clear()?;

					Ok(SessionStatus::unauthenticated())
				},
			}
		})
		.await
	}

	/// Signs out on the server, then clears the local credentials whatever the server said.
	///
	/// The server error, if any, is still returned after the store has been cleared. Dropping
	/// the future mid-call clears the store as well.
	pub async fn logout(&self) -> Result<()> {
		obs::observe(FlowKind::Logout, "logout", async {
			let _guard = self.auth_guard.lock().await;
			let cleanup = ClearOnDrop::new(self.store().as_ref());
			let outcome = self.dispatcher.send(ApiRequest::post(&self.config().endpoints.logout)).await;

			cleanup.finish()?;
			outcome?;

			Ok(())
		})
		.await
	}

	/// Requests password reset instructions and returns the server's confirmation message.
	pub async fn reset_password(&self, email: &str) -> Result<String> {
		obs::observe(FlowKind::ResetPassword, "reset_password", async {
			let email = Email::new(email.trim()).map_err(ValidationError::from)?;
			let request = ApiRequest::post(&self.config().endpoints.reset_password)
				.json(&serde_json::json!({ "email": email }))?
				.without_refresh();
			let response = self.dispatcher.exchange(&request).await?;
			let envelope = accepted::<Option<serde_json::Value>>(
				&request.path,
				&response,
				RESET_FAILED_FALLBACK,
			)?;

			Ok(envelope
				.message
				.map(|message| message.trim().to_owned())
				.filter(|message| !message.is_empty())
				.unwrap_or_else(|| RESET_FALLBACK.into()))
		})
		.await
	}

	/// Calls any other API endpoint through the authenticated dispatcher path.
	pub async fn request<D>(&self, request: ApiRequest) -> Result<ApiEnvelope<D>>
	where
		D: DeserializeOwned,
	{
		obs::observe(FlowKind::Request, "request", self.dispatcher.call(request)).await
	}

	async fn fetch_session(&self) -> Result<SessionStatus> {
		let request = ApiRequest::get(&self.config().endpoints.session);

		Ok(self.dispatcher.call::<SessionStatus>(request).await?.data)
	}

	// Runs a credential-minting call and persists the pair it returns.
	async fn mint(&self, request: ApiRequest, fallback: &str) -> Result<AuthTokens> {
		let response = self.dispatcher.exchange(&request).await?;
		let tokens = accepted::<AuthTokens>(&request.path, &response, fallback)?.data;

		self.store().persist(tokens.credentials())?;

		Ok(tokens)
	}
}
#[cfg(feature = "reqwest")]
impl Session<ReqwestTransport> {
	/// Creates a session backed by a fresh reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
		Self::with_transport(config, store, ReqwestTransport::new()?)
	}
}
impl<T> Clone for Session<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { dispatcher: self.dispatcher.clone(), auth_guard: self.auth_guard.clone() }
	}
}
impl<T> Debug for Session<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session").field("dispatcher", &self.dispatcher).finish()
	}
}

// Clears the store when dropped unless `finish` already did.
struct ClearOnDrop<'a> {
	store: Option<&'a dyn CredentialStore>,
}
impl<'a> ClearOnDrop<'a> {
	fn new(store: &'a dyn CredentialStore) -> Self {
		Self { store: Some(store) }
	}

	fn finish(mut self) -> Result<()> {
		match self.store.take() {
			Some(store) => Ok(store.clear()?),
			None => Ok(()),
		}
	}
}
impl Drop for ClearOnDrop<'_> {
	fn drop(&mut self) {
		if let Some(store) = self.store.take() {
			let _ = store.clear();
		}
	}
}

// Decodes an auth endpoint response; any rejection becomes `Error::Auth`.
fn accepted<D>(path: &str, response: &HttpResponse, fallback: &str) -> Result<ApiEnvelope<D>>
where
	D: DeserializeOwned,
{
	if !response.is_success() {
		return Err(Error::Auth {
			status: Some(response.status),
			message: request::server_message(response).unwrap_or_else(|| fallback.into()),
		});
	}

	let envelope = request::decode_envelope::<D>(path, response)?;

	if !envelope.success {
		return Err(Error::Auth {
			status: Some(response.status),
			message: envelope
				.message
				.map(|message| message.trim().to_owned())
				.filter(|message| !message.is_empty())
				.unwrap_or_else(|| fallback.into()),
		});
	}

	Ok(envelope)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::CredentialPair,
		error::TransportError,
		http::{HttpRequest, TransportFuture},
		store::{FileStore, MemoryStore},
	};

	type Route = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

	struct FakeTransport {
		route: Route,
		seen: Mutex<Vec<HttpRequest>>,
	}
	impl FakeTransport {
		fn new(
			route: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
		) -> Arc<Self> {
			Arc::new(Self { route: Box::new(route), seen: Mutex::default() })
		}

		fn paths(&self) -> Vec<String> {
			self.seen.lock().iter().map(|request| request.url.path().to_owned()).collect()
		}
	}
	impl HttpTransport for FakeTransport {
		fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
			let outcome = (self.route)(&request);

			self.seen.lock().push(request);

			Box::pin(async move { outcome })
		}
	}

	fn ok(data: serde_json::Value) -> Result<HttpResponse, TransportError> {
		Ok(HttpResponse::json(200, &serde_json::json!({ "success": true, "data": data })))
	}

	fn session(transport: Arc<FakeTransport>, store: MemoryStore) -> Session<FakeTransport> {
		let config = ClientConfig::builder().build().expect("Default config should build.");

		Session::with_transport(config, Arc::new(store), transport).expect("Session should build.")
	}

	#[tokio::test]
	async fn login_persists_returned_pair() {
		let transport = FakeTransport::new(|request| {
			assert_eq!(
				request.body,
				Some(serde_json::json!({ "email": "a@b.com", "password": "x" }))
			);

			ok(serde_json::json!({ "accessToken": "T1", "refreshToken": "R1", "userId": "u-1" }))
		});
		let store = MemoryStore::default();
		let tokens = session(transport, store.clone())
			.login("a@b.com", "x")
			.await
			.expect("Login should succeed.");

		assert_eq!(tokens.user_id.as_deref(), Some("u-1"));
		assert_eq!(store.snapshot(), Some(CredentialPair::new("T1", "R1")));
	}

	#[tokio::test]
	async fn login_rejection_uses_fallback_and_never_refreshes() {
		let transport = FakeTransport::new(|_| Ok(HttpResponse { status: 401, ..Default::default() }));
		let store = MemoryStore::with_credentials(CredentialPair::new("T0", "R0"));
		let err = session(transport.clone(), store.clone())
			.login("a@b.com", "wrong")
			.await
			.expect_err("Rejected login should fail.");

		assert!(matches!(
			err,
			Error::Auth { status: Some(401), ref message } if message == LOGIN_FALLBACK
		));
		assert_eq!(transport.paths(), vec!["/auth/login".to_owned()]);
		assert_eq!(store.snapshot(), Some(CredentialPair::new("T0", "R0")));
	}

	#[tokio::test]
	async fn register_surfaces_server_message() {
		let transport = FakeTransport::new(|_| {
			Ok(HttpResponse::json(
				409,
				&serde_json::json!({ "success": false, "message": "Email already registered." }),
			))
		});
		let store = MemoryStore::default();
		let err = session(transport, store.clone())
			.register(&RegistrationForm::new("a@b.com", "x"))
			.await
			.expect_err("Duplicate email should fail.");

		assert!(matches!(
			err,
			Error::Auth { status: Some(409), ref message } if message == "Email already registered."
		));
		assert_eq!(store.snapshot(), None);
	}

	#[tokio::test]
	async fn invalid_registration_never_reaches_network() {
		let transport = FakeTransport::new(|_| ok(serde_json::json!(null)));
		let err = session(transport.clone(), MemoryStore::default())
			.register(&RegistrationForm::new("a@b.com", "x").confirm_password("y"))
			.await
			.expect_err("Mismatched passwords should fail.");

		assert!(matches!(err, Error::Validation(ValidationError::PasswordMismatch)));
		assert!(transport.paths().is_empty());
	}

	#[tokio::test]
	async fn logout_clears_store_even_on_network_failure() {
		let transport = FakeTransport::new(|request| {
			Err(TransportError::network(
				request.url.path(),
				std::io::Error::other("connection reset"),
			))
		});
		let store = MemoryStore::with_credentials(CredentialPair::new("T1", "R1"));
		let err = session(transport, store.clone())
			.logout()
			.await
			.expect_err("Network failure should still be reported.");

		assert!(matches!(err, Error::Transport(_)));
		assert_eq!(store.snapshot(), None);
	}

	#[tokio::test]
	async fn logout_drops_file_credentials_when_rewrite_fails() {
		let path = std::env::temp_dir().join(format!(
			"ledger_auth_logout_{}_{}.json",
			std::process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		));
		let store = Arc::new(FileStore::open(&path).expect("Failed to open file store."));

		store.persist(CredentialPair::new("T1", "R1")).expect("Failed to persist credentials.");

		let tmp_path = path.with_extension("tmp");

		std::fs::create_dir(&tmp_path).expect("Failed to block the temp file slot.");

		let transport =
			FakeTransport::new(|_| Ok(HttpResponse { status: 204, ..Default::default() }));
		let config = ClientConfig::builder().build().expect("Default config should build.");
		let session = Session::<FakeTransport>::with_transport(config, store.clone(), transport.clone())
			.expect("Session should build.");

		session.logout().await.expect("Logout should succeed.");
		session
			.dispatcher()
			.send(ApiRequest::get("/records"))
			.await
			.expect("Follow-up call should succeed.");

		assert_eq!(store.read().expect("Read should succeed."), None);
		let follow_up = transport.seen.lock().last().and_then(|request| {
			request.header("authorization").map(str::to_owned)
		});

		assert_eq!(follow_up, None);

		std::fs::remove_dir(&tmp_path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary directory {}: {e}", tmp_path.display())
		});
	}

	#[tokio::test]
	async fn register_persists_returned_pair() {
		let transport = FakeTransport::new(|request| {
			assert_eq!(
				request.body,
				Some(serde_json::json!({ "email": "a@b.com", "password": "x" }))
			);

			ok(serde_json::json!({ "accessToken": "T1", "refreshToken": "R1", "userId": "u-1" }))
		});
		let store = MemoryStore::default();
		let tokens = session(transport, store.clone())
			.register(&RegistrationForm::new("a@b.com", "x"))
			.await
			.expect("Registration should succeed.");

		assert_eq!(tokens.user_id.as_deref(), Some("u-1"));
		assert_eq!(store.snapshot(), Some(CredentialPair::new("T1", "R1")));
	}

	#[tokio::test]
	async fn get_session_is_read_only() {
		let transport =
			FakeTransport::new(|_| ok(serde_json::json!({ "authenticated": false, "userId": null })));
		let store = MemoryStore::with_credentials(CredentialPair::new("T1", "R1"));
		let status = session(transport, store.clone())
			.get_session()
			.await
			.expect("Session probe should succeed.");

		assert!(!status.authenticated);
		assert_eq!(store.snapshot(), Some(CredentialPair::new("T1", "R1")));
	}

	#[tokio::test]
	async fn restore_session_clears_rejected_credentials() {
		let transport =
			FakeTransport::new(|_| ok(serde_json::json!({ "authenticated": false, "userId": null })));
		let store = MemoryStore::with_credentials(CredentialPair::new("T1", "R1"));
		let status = session(transport, store.clone())
			.restore_session()
			.await
			.expect("Restore should succeed.");

		assert_eq!(status, SessionStatus::unauthenticated());
		assert_eq!(store.snapshot(), None);
	}

	#[tokio::test]
	async fn restore_session_without_credentials_skips_network() {
		let transport = FakeTransport::new(|_| ok(serde_json::json!(null)));
		let status = session(transport.clone(), MemoryStore::default())
			.restore_session()
			.await
			.expect("Restore should succeed.");

		assert!(!status.authenticated);
		assert!(transport.paths().is_empty());
	}

	#[tokio::test]
	async fn reset_password_falls_back_to_generic_message() {
		let transport = FakeTransport::new(|_| ok(serde_json::json!(null)));
		let message = session(transport.clone(), MemoryStore::default())
			.reset_password("a@b.com")
			.await
			.expect("Reset should succeed.");

		assert_eq!(message, RESET_FALLBACK);
		assert_eq!(transport.paths(), vec!["/auth/reset-password".to_owned()]);

		let err = session(transport, MemoryStore::default())
			.reset_password("nobody")
			.await
			.expect_err("Malformed email should fail locally.");

		assert!(matches!(err, Error::Validation(ValidationError::Email(_))));
	}
}
