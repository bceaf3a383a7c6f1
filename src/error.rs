//! Client-level error types shared across the dispatcher, refresh coordinator, and façade.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Input rejected locally before any network call.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Credential refresh failed; the original request was not replayed.
	#[error(transparent)]
	Refresh(#[from] RefreshError),

	/// Server rejected the access credential and no further refresh is possible.
	#[error("Unauthorized: {message}")]
	Unauthorized {
		/// Server-supplied or fallback message.
		message: String,
	},
	/// Server rejected a login, registration, or password reset.
	#[error("{message}")]
	Auth {
		/// HTTP status code, when the server answered.
		status: Option<u16>,
		/// Server-supplied or fallback message.
		message: String,
	},
	/// Any other non-success response, passed through unmodified.
	#[error("{message}")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Server-supplied or fallback message.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl Error {
	/// Returns the HTTP status code carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Unauthorized { .. } => Some(401),
			Self::Auth { status, .. } => *status,
			Self::Api { status, .. } => Some(*status),
			Self::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
			_ => None,
		}
	}

	/// Returns true when the error means the user must sign in again.
	pub fn requires_login(&self) -> bool {
		matches!(
			self,
			Self::Unauthorized { .. }
				| Self::Refresh(RefreshError::Rejected { .. } | RefreshError::SessionCleared)
		)
	}
}

/// Configuration and validation failures raised while building the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL or endpoint path cannot be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses something other than http or https.
	#[error("Base URL must use http or https, got `{scheme}`.")]
	UnsupportedScheme {
		/// Scheme that was supplied.
		scheme: String,
	},
	/// Base URL cannot carry relative paths (e.g. `mailto:`).
	#[error("Base URL `{url}` cannot be used as a base.")]
	CannotBeBase {
		/// Offending URL string.
		url: String,
	},
	/// Refresh timeout must be positive when set.
	#[error("The refresh timeout must be positive.")]
	NonPositiveRefreshTimeout,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Body(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {path}.")]
	Network {
		/// Request path that failed.
		path: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(path: impl Into<String>, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { path: path.into(), source: Box::new(src) }
	}
}

/// Response decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Response body is not the expected envelope.
	#[error("Response from {path} is malformed JSON.")]
	Envelope {
		/// Request path that produced the body.
		path: String,
		/// HTTP status code.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Local input checks that never reach the network.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Password and its confirmation differ.
	#[error("Passwords do not match.")]
	PasswordMismatch,
	/// Password was empty.
	#[error("Password cannot be empty.")]
	EmptyPassword,
	/// Email address is malformed.
	#[error(transparent)]
	Email(#[from] crate::auth::IdentifierError),
}

/// Outcome shared with every caller waiting on a failed refresh.
///
/// The type is `Clone` so a single failure can be fanned out to the whole pending queue.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint rejected the refresh credential.
	#[error("Session expired: {message}")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Server-supplied or fallback message.
		message: String,
	},
	/// Refresh call failed on the network.
	#[error("Network error during credential refresh: {message}")]
	Network {
		/// Transport failure summary.
		message: String,
	},
	/// Refresh endpoint answered with an unexpected payload.
	#[error("Refresh endpoint returned a malformed response: {message}")]
	Malformed {
		/// Parsing failure summary.
		message: String,
	},
	/// Refresh call exceeded the configured bound.
	#[error("Credential refresh timed out after {after}.")]
	TimedOut {
		/// Configured bound.
		after: Duration,
	},
	/// The refresh initiator was cancelled before the call completed.
	#[error("Credential refresh was aborted.")]
	Aborted,
	/// Credentials were cleared (logout) while the refresh was in flight.
	#[error("Session was cleared during credential refresh.")]
	SessionCleared,
	/// New credentials could not be persisted.
	#[error("Refreshed credentials could not be stored: {message}")]
	Storage {
		/// Store failure summary.
		message: String,
	},
}
