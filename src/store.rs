//! Credential Store contract and built-in backends.
//!
//! The store holds at most one [`CredentialPair`]. Both credentials are written, rotated, and
//! cleared together, so readers never observe a half-written pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
};

/// Fixed key under which the access credential is persisted.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Fixed key under which the refresh credential is persisted.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Storage backend contract for the client's credential pair.
///
/// Reads are synchronous because the dispatcher consults the store before every outbound call.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists (or replaces) both credentials.
	fn persist(&self, pair: CredentialPair) -> Result<(), StoreError>;

	/// Returns the stored pair, if any.
	fn read(&self) -> Result<Option<CredentialPair>, StoreError>;

	/// Atomically replaces the pair if the stored refresh credential still equals `expected`.
	fn rotate(
		&self,
		expected_refresh: &TokenSecret,
		replacement: CredentialPair,
	) -> Result<RotateOutcome, StoreError>;

	/// Removes both credentials. Clearing an empty store is not an error.
	fn clear(&self) -> Result<(), StoreError>;

	/// Returns the current access credential, if any.
	fn access_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.read()?.map(|pair| pair.access_token))
	}

	/// Returns the current refresh credential, if any.
	fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.read()?.map(|pair| pair.refresh_token))
	}
}

/// Result of a refresh-credential compare-and-swap attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RotateOutcome {
	/// The refresh credential matched and the pair was replaced.
	Updated,
	/// Another pair (e.g. from a newer login) is stored; it is returned untouched.
	RefreshMismatch(CredentialPair),
	/// The store was cleared in the meantime.
	Missing,
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

pub(crate) fn rotate_slot(
	slot: &mut Option<CredentialPair>,
	expected_refresh: &TokenSecret,
	replacement: CredentialPair,
) -> RotateOutcome {
	match slot {
		Some(existing) if &existing.refresh_token == expected_refresh => {
			*existing = replacement;

			RotateOutcome::Updated
		},
		Some(existing) => RotateOutcome::RefreshMismatch(existing.clone()),
		None => RotateOutcome::Missing,
	}
}
