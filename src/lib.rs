//! Authenticate users against an LDAP directory and synchronize directory
//! entries into a local user store.
//!
//! Authentication is search-then-rebind: an admin-bound connection searches
//! for the single entry matching the configured lookup fields, the same
//! connection is re-bound with the entry's DN and the supplied password,
//! and on success the entry is mapped onto a local user record. The
//! directory stays the sole credential authority; locally created records
//! always carry an unusable password.
//!
//! Synchronization enumerates the directory with a paginated subtree
//! search and upserts one record per entry, keyed by the lookup fields, so
//! sync runs are idempotent and safe to repeat.
//!
//! For a general primer on LDAP, the [introduction] in the `ldap3` crate
//! which is used here for interfacing with LDAP is an excellent resource.
//!
//! [introduction]: https://github.com/inejge/ldap3/blob/master/LDAP-primer.md
//!
//! # Getting started
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use ldap_auth_sync::{
//!     AuthenticationService, Config, HookRegistry, MemoryStore, SyncDriver,
//! };
//! use url::Url;
//!
//! // Configuration is usually deserialized with serde; it is
//! // hand-constructed here for demonstration purposes.
//! let config = Arc::new(Config {
//!     url: Url::parse("ldap://localhost:389")?,
//!     admin_dn: "cn=admin,dc=example,dc=com".to_owned(),
//!     admin_password: "verysecret".to_owned(),
//!     user_search_base: "ou=people,dc=example,dc=com".to_owned(),
//!     ..Config::default()
//! });
//! let hooks = Arc::new(HookRegistry::new().resolve(&config.hooks)?);
//! let store = Arc::new(MemoryStore::new());
//!
//! // Mirror the whole directory into the store.
//! let driver = SyncDriver::new(config.clone(), hooks.clone(), store.clone());
//! println!("synced {} users", driver.sync_all().await?);
//!
//! // Authenticate one user.
//! let service = AuthenticationService::new(config, hooks, store);
//! let fields = [("username".to_owned(), "jdoe".to_owned())].into_iter().collect();
//! match service.authenticate(&fields, "hunter2").await? {
//!     Some(user) => println!("authenticated {user}"),
//!     None => println!("rejected"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod ldap;
pub mod mapper;
pub mod store;
pub mod sync;

pub use ldap3::{self, SearchEntry};

pub use crate::{
	auth::AuthenticationService,
	config::{Config, HookConfig},
	entry::SearchEntryExt,
	error::Error,
	hooks::{HookRegistry, Hooks},
	ldap::DirectoryClient,
	mapper::EntryMapper,
	store::{LocalUserRecord, MemoryStore, PasswordState, UserStore},
	sync::SyncDriver,
};
