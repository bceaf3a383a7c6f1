//! Client configuration: API base URL, auth endpoint paths, and refresh coordination policy.

/// Builder API for assembling client configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const BASE_URL_ENV: &str = "LEDGER_API_BASE_URL";
/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// What happens to queued callers when a refresh attempt fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshFailurePolicy {
	/// Every queued caller is rejected with the same refresh error.
	#[default]
	RejectQueued,
	/// Queued callers stay queued until a later refresh succeeds; only the initiator observes
	/// the failure. Timeouts and cancellations still reject the queue.
	LeavePending,
}

/// Relative paths of the auth endpoints consumed by the façade and dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
	/// `POST` account creation.
	pub register: String,
	/// `POST` credential login.
	pub login: String,
	/// `GET` session probe.
	pub session: String,
	/// `POST` server-side logout.
	pub logout: String,
	/// `POST` access credential refresh.
	pub refresh: String,
	/// `POST` password reset request.
	pub reset_password: String,
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self {
			register: "/auth/register".into(),
			login: "/auth/login".into(),
			session: "/auth/session".into(),
			logout: "/auth/logout".into(),
			refresh: "/auth/refresh".into(),
			reset_password: "/auth/reset-password".into(),
		}
	}
}

/// Validated client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// API base URL, normalized to end with `/`.
	pub base_url: Url,
	/// Auth endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Bound on a single refresh call; `None` waits indefinitely.
	pub refresh_timeout: Option<Duration>,
	/// Queue handling when a refresh fails.
	pub failure_policy: RefreshFailurePolicy,
}
impl ClientConfig {
	/// Default bound on the refresh call.
	pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(30);

	/// Returns a builder seeded with defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::new()
	}

	/// Builds a config from [`BASE_URL_ENV`], falling back to [`DEFAULT_BASE_URL`].
	pub fn from_env() -> Result<Self, ConfigError> {
		let mut builder = Self::builder();

		if let Some(raw) = std::env::var(BASE_URL_ENV).ok().filter(|v| !v.trim().is_empty()) {
			builder = builder.base_url_str(raw.trim())?;
		}

		builder.build()
	}

	/// Resolves an endpoint path against the base URL.
	///
	/// Leading slashes are ignored so `/auth/login` stays under a base such as
	/// `https://host/api/`.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let relative = path.trim_start_matches('/');

		self.base_url
			.join(relative)
			.map_err(|source| ConfigError::InvalidUrl { url: path.to_owned(), source })
	}
}
