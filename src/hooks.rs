//! Pluggable behavior hooks and their name-based registry.
//!
//! Three seams of the sync pipeline are caller-replaceable: how a single
//! search filter clause is formatted, how mapped user fields are cleaned
//! before storage, and how secondary relations (groups, roles) are synced
//! after a record is upserted. Each has a default implementation and can be
//! overridden either directly (construct [`Hooks`] yourself) or by name in
//! the configuration, resolved once at load time through a
//! [`HookRegistry`].
use std::{
	collections::{BTreeMap, HashMap},
	fmt,
	sync::Arc,
};

use crate::{config::HookConfig, error::Error, filter::escape, store::LocalUserRecord};

/// Formats one `(attribute=value)` clause of a search filter.
pub trait FormatSearchFilter: Send + Sync {
	/// Formats a single clause. Implementations are responsible for
	/// escaping; the builder passes attribute names and values through
	/// verbatim.
	fn format_clause(&self, attribute: &str, value: &str) -> String;
}

/// Default clause formatter: an escaped equality match.
#[derive(Debug, Clone, Copy)]
pub struct EqualityFilter;

impl FormatSearchFilter for EqualityFilter {
	fn format_clause(&self, attribute: &str, value: &str) -> String {
		format!("({}={})", escape(attribute), escape(value))
	}
}

/// Normalizes user fields mapped from a directory entry before they are
/// partitioned into lookup and profile fields.
pub trait CleanUserData: Send + Sync {
	/// Returns the cleaned fields. Keys may be rewritten; the lookup
	/// partition happens on the output of this hook.
	fn clean(&self, fields: BTreeMap<String, String>) -> BTreeMap<String, String>;
}

/// Default cleaner: returns the fields untouched.
#[derive(Debug, Clone, Copy)]
pub struct KeepUserData;

impl CleanUserData for KeepUserData {
	fn clean(&self, fields: BTreeMap<String, String>) -> BTreeMap<String, String> {
		fields
	}
}

/// Populates secondary associations of a user record (group membership,
/// roles) from the raw directory attributes.
pub trait SyncUserRelations: Send + Sync {
	/// Syncs relations for `record`. Failures propagate out of the mapper
	/// as [`Error::Relation`] and abort the surrounding sync run.
	fn sync_relations(
		&self,
		record: &LocalUserRecord,
		attributes: &HashMap<String, Vec<String>>,
	) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default relation syncer: does nothing.
#[derive(Debug, Clone, Copy)]
pub struct NoRelations;

impl SyncUserRelations for NoRelations {
	fn sync_relations(
		&self,
		_record: &LocalUserRecord,
		_attributes: &HashMap<String, Vec<String>>,
	) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		Ok(())
	}
}

/// The resolved hook set used by the filter builder and the entry mapper.
#[derive(Clone)]
pub struct Hooks {
	/// Clause formatter used by the filter builder.
	pub format_search_filter: Arc<dyn FormatSearchFilter>,
	/// Field cleaner applied by the mapper.
	pub clean_user_data: Arc<dyn CleanUserData>,
	/// Relation syncer invoked by the mapper after every upsert.
	pub sync_user_relations: Arc<dyn SyncUserRelations>,
}

impl Default for Hooks {
	fn default() -> Self {
		Hooks {
			format_search_filter: Arc::new(EqualityFilter),
			clean_user_data: Arc::new(KeepUserData),
			sync_user_relations: Arc::new(NoRelations),
		}
	}
}

impl fmt::Debug for Hooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hooks").finish_non_exhaustive()
	}
}

/// Registry of named hook implementations.
///
/// A new registry knows the default implementation of every hook under the
/// name `default`; callers register their own implementations and refer to
/// them by name from the configuration.
pub struct HookRegistry {
	/// Named clause formatters.
	formatters: HashMap<String, Arc<dyn FormatSearchFilter>>,
	/// Named field cleaners.
	cleaners: HashMap<String, Arc<dyn CleanUserData>>,
	/// Named relation syncers.
	relation_syncers: HashMap<String, Arc<dyn SyncUserRelations>>,
}

/// Name under which the default implementation of each hook is registered.
const DEFAULT_HOOK: &str = "default";

impl HookRegistry {
	/// Creates a registry containing only the default implementations.
	#[must_use]
	pub fn new() -> Self {
		let mut registry = HookRegistry {
			formatters: HashMap::new(),
			cleaners: HashMap::new(),
			relation_syncers: HashMap::new(),
		};
		registry.register_formatter(DEFAULT_HOOK, Arc::new(EqualityFilter));
		registry.register_cleaner(DEFAULT_HOOK, Arc::new(KeepUserData));
		registry.register_relation_syncer(DEFAULT_HOOK, Arc::new(NoRelations));
		registry
	}

	/// Registers a clause formatter under `name`.
	pub fn register_formatter(&mut self, name: &str, hook: Arc<dyn FormatSearchFilter>) {
		self.formatters.insert(name.to_owned(), hook);
	}

	/// Registers a field cleaner under `name`.
	pub fn register_cleaner(&mut self, name: &str, hook: Arc<dyn CleanUserData>) {
		self.cleaners.insert(name.to_owned(), hook);
	}

	/// Registers a relation syncer under `name`.
	pub fn register_relation_syncer(&mut self, name: &str, hook: Arc<dyn SyncUserRelations>) {
		self.relation_syncers.insert(name.to_owned(), hook);
	}

	/// Resolves the hook names in `config` against this registry. Unset
	/// names resolve to the default implementation.
	///
	/// # Errors
	/// [`Error::UnknownHook`] if a configured name is not registered.
	pub fn resolve(&self, config: &HookConfig) -> Result<Hooks, Error> {
		Ok(Hooks {
			format_search_filter: lookup(&self.formatters, config.format_search_filter.as_deref())?,
			clean_user_data: lookup(&self.cleaners, config.clean_user_data.as_deref())?,
			sync_user_relations: lookup(
				&self.relation_syncers,
				config.sync_user_relations.as_deref(),
			)?,
		})
	}
}

impl Default for HookRegistry {
	fn default() -> Self {
		HookRegistry::new()
	}
}

impl fmt::Debug for HookRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookRegistry")
			.field("formatters", &self.formatters.keys())
			.field("cleaners", &self.cleaners.keys())
			.field("relation_syncers", &self.relation_syncers.keys())
			.finish()
	}
}

/// Looks up an optional hook name in one of the registry tables.
fn lookup<T: ?Sized>(
	table: &HashMap<String, Arc<T>>,
	name: Option<&str>,
) -> Result<Arc<T>, Error> {
	let name = name.unwrap_or(DEFAULT_HOOK);
	table.get(name).map(Arc::clone).ok_or_else(|| Error::UnknownHook(name.to_owned()))
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use std::{collections::BTreeMap, sync::Arc};

	use super::{CleanUserData, EqualityFilter, FormatSearchFilter, HookRegistry};
	use crate::{config::HookConfig, error::Error};

	/// Cleaner that lower-cases every value.
	struct Lowercase;

	impl CleanUserData for Lowercase {
		fn clean(&self, fields: BTreeMap<String, String>) -> BTreeMap<String, String> {
			fields.into_iter().map(|(k, v)| (k, v.to_lowercase())).collect()
		}
	}

	#[test]
	fn equality_filter_escapes_both_sides() {
		assert_eq!(EqualityFilter.format_clause("mail", "a*@x.com"), "(mail=a\\2A@x.com)");
	}

	#[test]
	fn resolve_unset_names_to_defaults() {
		let hooks = HookRegistry::new().resolve(&HookConfig::default()).unwrap();
		assert_eq!(hooks.format_search_filter.format_clause("uid", "jd"), "(uid=jd)");
	}

	#[test]
	fn resolve_registered_hook_by_name() {
		let mut registry = HookRegistry::new();
		registry.register_cleaner("lowercase", Arc::new(Lowercase));
		let config = HookConfig {
			clean_user_data: Some("lowercase".to_owned()),
			..HookConfig::default()
		};

		let hooks = registry.resolve(&config).unwrap();
		let fields = [("username".to_owned(), "JDoe".to_owned())].into_iter().collect();
		let cleaned = hooks.clean_user_data.clean(fields);
		assert_eq!(cleaned.get("username").map(String::as_str), Some("jdoe"));
	}

	#[test]
	fn resolve_unknown_name_fails() {
		let config = HookConfig {
			sync_user_relations: Some("nope".to_owned()),
			..HookConfig::default()
		};
		let err = HookRegistry::new().resolve(&config).unwrap_err();
		assert!(matches!(err, Error::UnknownHook(name) if name == "nope"));
	}
}
