//! Thread-safe in-memory [`CredentialStore`] for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	store::{self, CredentialStore, RotateOutcome, StoreError},
};

/// Keeps the credential pair in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<CredentialPair>>>);
impl MemoryStore {
	/// Creates a store seeded with an existing pair.
	pub fn with_credentials(pair: CredentialPair) -> Self {
		Self(Arc::new(RwLock::new(Some(pair))))
	}

	/// Returns the stored pair without going through the trait.
	pub fn snapshot(&self) -> Option<CredentialPair> {
		self.0.read().clone()
	}
}
impl CredentialStore for MemoryStore {
	fn persist(&self, pair: CredentialPair) -> Result<(), StoreError> {
		*self.0.write() = Some(pair);

		Ok(())
	}

	fn read(&self) -> Result<Option<CredentialPair>, StoreError> {
		Ok(self.snapshot())
	}

	fn rotate(
		&self,
		expected_refresh: &TokenSecret,
		replacement: CredentialPair,
	) -> Result<RotateOutcome, StoreError> {
		let mut guard = self.0.write();

		Ok(store::rotate_slot(&mut guard, expected_refresh, replacement))
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().take();

		Ok(())
	}
}
