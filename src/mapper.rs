//! Mapping of directory entries onto local user records.
use std::{collections::BTreeMap, fmt, sync::Arc};

use ldap3::SearchEntry;
use tracing::info;

use crate::{
	config::Config,
	entry::SearchEntryExt,
	error::Error,
	hooks::Hooks,
	store::{LocalUserRecord, PasswordState, UserStore},
};

/// Converts directory entries into local user records and upserts them
/// into the store.
#[derive(Clone)]
pub struct EntryMapper {
	/// Field alias table and lookup field names.
	config: Arc<Config>,
	/// Clean and relation hooks.
	hooks: Arc<Hooks>,
	/// The external local user store.
	store: Arc<dyn UserStore>,
}

impl EntryMapper {
	/// Creates a mapper writing to `store`.
	#[must_use]
	pub fn new(config: Arc<Config>, hooks: Arc<Hooks>, store: Arc<dyn UserStore>) -> Self {
		EntryMapper { config, hooks, store }
	}

	/// Maps `entry` onto a local user record and upserts it.
	///
	/// For every aliased field present in the entry the first attribute
	/// value is taken (multi-valued attributes collapse to their first
	/// value). The fields then pass through the clean hook, are split into
	/// lookup and profile fields, and are upserted keyed by the lookup
	/// fields. Newly created records get an unusable password, since the
	/// directory is the sole credential authority. Finally the relation
	/// hook runs with the raw entry attributes.
	///
	/// # Errors
	/// [`Error::Store`] on store failure, [`Error::Relation`] if the
	/// relation hook fails. Both propagate; nothing here is swallowed.
	pub fn map_entry(&self, entry: &SearchEntry) -> Result<LocalUserRecord, Error> {
		let mut fields = BTreeMap::new();
		for (field, attribute) in &self.config.user_field_alias {
			if let Some(value) = entry.attr_first(attribute) {
				fields.insert(field.clone(), value.to_owned());
			}
		}
		let mut fields = self.hooks.clean_user_data.clean(fields);

		// A lookup attribute missing from the entry keys the record by the
		// empty string rather than failing the sync.
		let mut lookup = BTreeMap::new();
		for name in &self.config.lookup_field_names {
			lookup.insert(name.clone(), fields.remove(name).unwrap_or_default());
		}

		let (mut record, created) = self.store.upsert(lookup.clone(), fields)?;
		if created {
			info!("LDAP user created locally: {record}");
			self.store.set_password_unusable(&lookup)?;
			record.password = PasswordState::Unusable;
		}

		self.hooks
			.sync_user_relations
			.sync_relations(&record, &entry.attrs)
			.map_err(Error::Relation)?;

		Ok(record)
	}
}

impl fmt::Debug for EntryMapper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EntryMapper").field("config", &self.config).finish_non_exhaustive()
	}
}
