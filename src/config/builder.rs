// self
use crate::{
	_prelude::*,
	config::{AuthEndpoints, ClientConfig, DEFAULT_BASE_URL, RefreshFailurePolicy},
	error::ConfigError,
};

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// API base URL; [`DEFAULT_BASE_URL`] when unset.
	pub base_url: Option<Url>,
	/// Auth endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Bound on a single refresh call.
	pub refresh_timeout: Option<Duration>,
	/// Queue handling when a refresh fails.
	pub failure_policy: RefreshFailurePolicy,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with defaults.
	pub fn new() -> Self {
		Self {
			base_url: None,
			endpoints: AuthEndpoints::default(),
			refresh_timeout: Some(ClientConfig::DEFAULT_REFRESH_TIMEOUT),
			failure_policy: RefreshFailurePolicy::default(),
		}
	}

	/// Sets the API base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Parses and sets the API base URL.
	pub fn base_url_str(self, raw: &str) -> Result<Self, ConfigError> {
		let url = parse_url(raw)?;

		Ok(self.base_url(url))
	}

	/// Replaces every auth endpoint path.
	pub fn endpoints(mut self, endpoints: AuthEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Bounds the refresh call.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Lets the refresh call run without a bound.
	pub fn without_refresh_timeout(mut self) -> Self {
		self.refresh_timeout = None;

		self
	}

	/// Chooses how queued callers are treated when a refresh fails.
	pub fn failure_policy(mut self, policy: RefreshFailurePolicy) -> Self {
		self.failure_policy = policy;

		self
	}

	/// Validates the builder and produces a [`ClientConfig`].
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url = match self.base_url {
			Some(url) => url,
			None => parse_url(DEFAULT_BASE_URL)?,
		};

		match base_url.scheme() {
			"http" | "https" => {},
			other => return Err(ConfigError::UnsupportedScheme { scheme: other.to_owned() }),
		}

		if base_url.cannot_be_a_base() {
			return Err(ConfigError::CannotBeBase { url: base_url.to_string() });
		}
		if self.refresh_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(ConfigError::NonPositiveRefreshTimeout);
		}

		Ok(ClientConfig {
			base_url: normalize_base(base_url),
			endpoints: self.endpoints,
			refresh_timeout: self.refresh_timeout,
			failure_policy: self.failure_policy,
		})
	}
}
impl Default for ClientConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })
}

// `Url::join` replaces the last path segment unless the base ends with `/`.
fn normalize_base(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url.set_query(None);
	url.set_fragment(None);

	url
}
