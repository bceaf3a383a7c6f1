//! Durable file-backed [`CredentialStore`], the client-side analogue of browser local storage.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	store::{self, ACCESS_TOKEN_KEY, CredentialStore, REFRESH_TOKEN_KEY, RotateOutcome, StoreError},
};

type Entries = BTreeMap<String, String>;

/// Persists the credential pair to a JSON object keyed by [`ACCESS_TOKEN_KEY`] and
/// [`REFRESH_TOKEN_KEY`] after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<CredentialPair>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	// A file holding only one of the two keys is treated as empty.
	fn load_snapshot(path: &Path) -> Result<Option<CredentialPair>, StoreError> {
		if !path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		let mut entries: Entries =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		match (entries.remove(ACCESS_TOKEN_KEY), entries.remove(REFRESH_TOKEN_KEY)) {
			(Some(access), Some(refresh)) => Ok(Some(CredentialPair::new(access, refresh))),
			_ => Ok(None),
		}
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: Option<&CredentialPair>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let mut entries = Entries::new();

		if let Some(pair) = contents {
			entries.insert(ACCESS_TOKEN_KEY.into(), pair.access_token.expose().into());
			entries.insert(REFRESH_TOKEN_KEY.into(), pair.refresh_token.expose().into());
		}

		let serialized =
			serde_json::to_vec_pretty(&entries).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credentials: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn persist(&self, pair: CredentialPair) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		self.persist_locked(Some(&pair))?;
		*guard = Some(pair);

		Ok(())
	}

	fn read(&self) -> Result<Option<CredentialPair>, StoreError> {
		Ok(self.inner.read().clone())
	}

	fn rotate(
		&self,
		expected_refresh: &TokenSecret,
		replacement: CredentialPair,
	) -> Result<RotateOutcome, StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();
		let outcome = store::rotate_slot(&mut next, expected_refresh, replacement);

		if outcome == RotateOutcome::Updated {
			self.persist_locked(next.as_ref())?;
			*guard = next;
		}

		Ok(outcome)
	}

	fn clear(&self) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		if guard.is_none() && !self.path.exists() {
			return Ok(());
		}

		// In-memory state is cleared even when the disk write below fails.
		guard.take();

		match self.persist_locked(None) {
			Ok(()) => Ok(()),
			Err(write_error) => match fs::remove_file(&self.path) {
				Ok(()) => Ok(()),
				Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
				Err(e) => Err(StoreError::Backend {
					message: format!(
						"{write_error} Fallback removal of {} failed: {e}",
						self.path.display()
					),
				}),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"ledger_auth_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn persist_and_reload_round_trip() {
		let path = temp_path("reload");
		let store = FileStore::open(&path).expect("Failed to open file store.");

		store.persist(CredentialPair::new("T1", "R1")).expect("Failed to persist credentials.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store.");

		assert_eq!(
			reopened.read().expect("Read should succeed."),
			Some(CredentialPair::new("T1", "R1"))
		);

		let raw = fs::read_to_string(&path).expect("Store file should be readable.");

		assert!(raw.contains("\"access_token\""));
		assert!(raw.contains("\"refresh_token\""));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store file {}: {e}", path.display())
		});
	}

	#[test]
	fn clear_persists_empty_object_and_is_idempotent() {
		let path = temp_path("clear");
		let store = FileStore::open(&path).expect("Failed to open file store.");

		store.clear().expect("Clearing a fresh store should succeed.");
		store.persist(CredentialPair::new("T1", "R1")).expect("Failed to persist credentials.");
		store.clear().expect("Clear should succeed.");
		store.clear().expect("Second clear should succeed.");

		let reopened = FileStore::open(&path).expect("Failed to reopen file store.");

		assert_eq!(reopened.read().expect("Read should succeed."), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store file {}: {e}", path.display())
		});
	}

	#[test]
	fn clear_drops_credentials_when_rewrite_fails() {
		let path = temp_path("clear_fallback");
		let store = FileStore::open(&path).expect("Failed to open file store.");

		store.persist(CredentialPair::new("T1", "R1")).expect("Failed to persist credentials.");

		let mut tmp_path = path.clone();

		tmp_path.set_extension("tmp");
		// A directory in the temp slot makes the rewrite fail.
		fs::create_dir(&tmp_path).expect("Failed to block the temp file slot.");

		store.clear().expect("Clear should fall back to removing the store file.");

		assert_eq!(store.read().expect("Read should succeed."), None);
		assert!(!path.exists(), "Store file should have been removed.");

		let reopened = FileStore::open(&path).expect("Failed to reopen file store.");

		assert_eq!(reopened.read().expect("Read should succeed."), None);

		fs::remove_dir(&tmp_path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary directory {}: {e}", tmp_path.display())
		});
	}

	#[test]
	fn partial_file_loads_as_empty() {
		let path = temp_path("partial");

		fs::write(&path, "{\"access_token\":\"T1\"}").expect("Failed to seed partial store file.");

		let store = FileStore::open(&path).expect("Failed to open partial file store.");

		assert_eq!(store.read().expect("Read should succeed."), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store file {}: {e}", path.display())
		});
	}

	#[test]
	fn rotate_writes_through_only_on_update() {
		let path = temp_path("rotate");
		let store = FileStore::open(&path).expect("Failed to open file store.");

		store.persist(CredentialPair::new("T1", "R1")).expect("Failed to persist credentials.");

		let outcome = store
			.rotate(&TokenSecret::new("R1"), CredentialPair::new("T2", "R2"))
			.expect("Rotate should succeed.");

		assert_eq!(outcome, RotateOutcome::Updated);

		let outcome = store
			.rotate(&TokenSecret::new("R1"), CredentialPair::new("T3", "R3"))
			.expect("Rotate should succeed.");

		assert_eq!(outcome, RotateOutcome::RefreshMismatch(CredentialPair::new("T2", "R2")));

		let reopened = FileStore::open(&path).expect("Failed to reopen file store.");

		assert_eq!(
			reopened.read().expect("Read should succeed."),
			Some(CredentialPair::new("T2", "R2"))
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store file {}: {e}", path.display())
		});
	}
}
