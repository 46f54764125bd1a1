//! The local user store interface and a reference in-memory implementation.
use std::{
	collections::{BTreeMap, HashMap},
	fmt,
	sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Whether a locally stored password may be used to log in.
///
/// The directory is the sole credential authority, so records created by
/// this library are always marked [`PasswordState::Unusable`] and never
/// flipped back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordState {
	/// The record carries a usable local password.
	Usable,
	/// Local password login is disabled for this record.
	Unusable,
}

/// A user record in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUserRecord {
	/// The identity fields the record is keyed by. Immutable.
	pub lookup: BTreeMap<String, String>,
	/// The remaining profile fields. Overwritten on every sync.
	pub profile: BTreeMap<String, String>,
	/// Local password state.
	pub password: PasswordState,
}

impl fmt::Display for LocalUserRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut first = true;
		for (field, value) in &self.lookup {
			if !first {
				write!(f, ", ")?;
			}
			write!(f, "{field}={value}")?;
			first = false;
		}
		Ok(())
	}
}

/// The external local user store, keyed by lookup fields.
pub trait UserStore: Send + Sync {
	/// Creates or updates the record identified by `lookup`. On create the
	/// record starts with `defaults` as its profile; on update `defaults`
	/// overwrite the stored profile fields. Returns the record and whether
	/// it was created.
	///
	/// # Errors
	/// [`Error::Store`] on storage failure.
	fn upsert(
		&self,
		lookup: BTreeMap<String, String>,
		defaults: BTreeMap<String, String>,
	) -> Result<(LocalUserRecord, bool), Error>;

	/// Marks the password of the record identified by `lookup` unusable.
	///
	/// # Errors
	/// [`Error::Store`] on storage failure or if the record is missing.
	fn set_password_unusable(&self, lookup: &BTreeMap<String, String>) -> Result<(), Error>;
}

/// In-memory [`UserStore`] used by the sync binary and the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
	/// Records keyed by their rendered lookup mapping.
	users: Mutex<HashMap<String, LocalUserRecord>>,
}

impl MemoryStore {
	/// Creates an empty store.
	#[must_use]
	pub fn new() -> Self {
		MemoryStore::default()
	}

	/// Returns the record identified by `lookup`, if any.
	#[must_use]
	pub fn get(&self, lookup: &BTreeMap<String, String>) -> Option<LocalUserRecord> {
		self.users.lock().ok()?.get(&store_key(lookup)).cloned()
	}

	/// Number of stored records.
	#[must_use]
	pub fn len(&self) -> usize {
		self.users.lock().map(|users| users.len()).unwrap_or(0)
	}

	/// Whether the store holds no records.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Renders a lookup mapping into a stable store key. `BTreeMap` iteration
/// order makes the key independent of insertion order.
fn store_key(lookup: &BTreeMap<String, String>) -> String {
	let pairs: Vec<String> =
		lookup.iter().map(|(field, value)| format!("{field}={value}")).collect();
	pairs.join("\x1f")
}

impl UserStore for MemoryStore {
	fn upsert(
		&self,
		lookup: BTreeMap<String, String>,
		defaults: BTreeMap<String, String>,
	) -> Result<(LocalUserRecord, bool), Error> {
		let mut users =
			self.users.lock().map_err(|_| Error::Store("user store lock poisoned".to_owned()))?;
		let key = store_key(&lookup);
		if let Some(record) = users.get_mut(&key) {
			for (field, value) in defaults {
				record.profile.insert(field, value);
			}
			Ok((record.clone(), false))
		} else {
			let record = LocalUserRecord {
				lookup,
				profile: defaults,
				password: PasswordState::Usable,
			};
			users.insert(key, record.clone());
			Ok((record, true))
		}
	}

	fn set_password_unusable(&self, lookup: &BTreeMap<String, String>) -> Result<(), Error> {
		let mut users =
			self.users.lock().map_err(|_| Error::Store("user store lock poisoned".to_owned()))?;
		let record = users
			.get_mut(&store_key(lookup))
			.ok_or_else(|| Error::Store(format!("no record for lookup {lookup:?}")))?;
		record.password = PasswordState::Unusable;
		Ok(())
	}
}
