//! Config for the LDAP client.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use url::Url;

/// LDAP authentication and sync configuration.
///
/// Every option has a default, so a config file only needs to name the
/// options that differ from them. The defaults target a directory at
/// `ldap://localhost:389` with users of class `inetOrgPerson` under
/// `ou=people,dc=example,dc=com`, looked up by `username`.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
	/// The URL to connect to the server with. Supports ldap and ldaps
	/// schemes.
	pub url: Url,
	/// Negotiate TLS (StartTLS) before binding instead of binding in the
	/// clear.
	pub use_tls: bool,
	/// The DN to bind as for searches.
	pub admin_dn: String,
	/// The password for the admin DN.
	pub admin_password: String,
	/// Timeout to establish a connection, in seconds. No timeout if unset.
	pub connect_timeout: Option<u64>,
	/// Timeout per directory operation, in seconds. No timeout if unset.
	pub receive_timeout: Option<u64>,
	/// The search base for user entries.
	pub user_search_base: String,
	/// The object class every user entry must carry. Always part of the
	/// search filter, including the empty one used for full enumeration.
	pub user_object_class: String,
	/// Local field name to directory attribute name.
	pub user_field_alias: BTreeMap<String, String>,
	/// The local fields that identify a user record. Must be a subset of
	/// the keys of [`Config::user_field_alias`].
	pub lookup_field_names: BTreeSet<String>,
	/// Page size for the [simple paged search control] used when
	/// enumerating the directory.
	///
	/// [simple paged search control]: https://www.rfc-editor.org/rfc/rfc2696.html
	pub page_size: i32,
	/// Hook names to resolve against a [`HookRegistry`] at load time.
	///
	/// [`HookRegistry`]: crate::hooks::HookRegistry
	pub hooks: HookConfig,
}

/// Names of hook implementations to resolve from a registry. Unset names
/// fall back to the default implementation of each hook.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct HookConfig {
	/// Formats one `(attribute=value)` filter clause.
	pub format_search_filter: Option<String>,
	/// Normalizes mapped user fields before they are stored.
	pub clean_user_data: Option<String>,
	/// Populates secondary associations after a record is upserted.
	pub sync_user_relations: Option<String>,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			url: default_url(),
			use_tls: false,
			admin_dn: String::new(),
			admin_password: String::new(),
			connect_timeout: None,
			receive_timeout: None,
			user_search_base: "ou=people,dc=example,dc=com".to_owned(),
			user_object_class: "inetOrgPerson".to_owned(),
			user_field_alias: [
				("username", "sAMAccountName"),
				("first_name", "givenName"),
				("last_name", "sn"),
				("email", "mail"),
			]
			.into_iter()
			.map(|(field, attribute)| (field.to_owned(), attribute.to_owned()))
			.collect(),
			lookup_field_names: ["username".to_owned()].into_iter().collect(),
			page_size: 30,
			hooks: HookConfig::default(),
		}
	}
}

/// The default directory URL.
fn default_url() -> Url {
	#[allow(clippy::expect_used)]
	Url::parse("ldap://localhost:389").expect("default LDAP URL is valid")
}
