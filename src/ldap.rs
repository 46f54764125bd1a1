//! Client for connecting to LDAP, looking up users and verifying passwords.
use std::{collections::BTreeMap, sync::Arc, time::Duration};

use ldap3::{
	adapters::{Adapter, EntriesOnly, PagedResults},
	Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions, SearchStream,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{config::Config, filter::build_filter, hooks::Hooks};

/// Attribute selection requesting all user attributes plus operational
/// ones.
const ALL_ATTRIBUTES: [&str; 2] = ["*", "+"];

/// A live admin-bound session to the directory.
///
/// Owns the protocol handle and the connection driver task. Sessions are
/// single-flight and must not be shared across concurrent operations; every
/// authentication attempt or sync run opens its own. Call
/// [`BoundConnection::unbind`] on every exit path to release the session.
#[derive(Debug)]
pub struct BoundConnection {
	/// The protocol handle operations are issued on.
	ldap: Ldap,
	/// The task driving the underlying connection.
	driver: JoinHandle<()>,
	/// Per-operation timeout, applied before each request.
	receive_timeout: Option<Duration>,
}

impl BoundConnection {
	/// The protocol handle with the receive timeout armed for the next
	/// operation.
	fn handle(&mut self) -> &mut Ldap {
		if let Some(timeout) = self.receive_timeout {
			self.ldap.with_timeout(timeout);
		}
		&mut self.ldap
	}

	/// Releases the session. Failures are logged; there is nothing useful
	/// a caller could do with them.
	pub async fn unbind(mut self) {
		if let Err(err) = self.ldap.unbind().await {
			warn!("LDAP unbind failed: {err}");
		}
		if let Err(err) = self.driver.await {
			warn!("Failed to join LDAP connection task: {err}");
		}
	}
}

/// Issues directory operations on behalf of the authentication and sync
/// front ends.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
	/// Connection, search and attribute configuration.
	config: Arc<Config>,
	/// Resolved hooks; the clause formatter is used for the enumeration
	/// filter.
	hooks: Arc<Hooks>,
}

impl DirectoryClient {
	/// Creates a client for the given configuration and hooks.
	#[must_use]
	pub fn new(config: Arc<Config>, hooks: Arc<Hooks>) -> Self {
		DirectoryClient { config, hooks }
	}

	/// Opens a connection and binds with the admin credentials.
	///
	/// TLS is negotiated before the bind when `use_tls` is set. Any
	/// transport or bind failure is logged at warn and yields `None`;
	/// callers treat that as "no connection available", not as a fatal
	/// error.
	pub async fn bind(&self) -> Option<BoundConnection> {
		let mut settings = LdapConnSettings::new().set_starttls(self.config.use_tls);
		if let Some(secs) = self.config.connect_timeout {
			settings = settings.set_conn_timeout(Duration::from_secs(secs));
		}

		let (conn, mut ldap) =
			match LdapConnAsync::from_url_with_settings(settings, &self.config.url).await {
				Ok(pair) => pair,
				Err(err) => {
					warn!("LDAP admin bind failed: {err}");
					return None;
				}
			};
		let driver = tokio::spawn(async move {
			if let Err(err) = conn.drive().await {
				warn!("LDAP connection error: {err}");
			}
		});

		let bind = ldap
			.simple_bind(&self.config.admin_dn, &self.config.admin_password)
			.await
			.and_then(|res| res.success());
		match bind {
			Ok(_) => {
				info!("LDAP admin bind successful");
				Some(BoundConnection {
					ldap,
					driver,
					receive_timeout: self.config.receive_timeout.map(Duration::from_secs),
				})
			}
			Err(err) => {
				warn!("LDAP admin bind failed: {err}");
				let _ = ldap.unbind().await;
				driver.abort();
				None
			}
		}
	}

	/// Searches for at most one entry matching `filter` under the user
	/// search base, requesting all attributes including operational ones.
	///
	/// Absence of a result and protocol failures both yield `None`; the
	/// difference is not observable by callers.
	pub async fn search_single(
		&self,
		conn: &mut BoundConnection,
		filter: &str,
	) -> Option<SearchEntry> {
		let result = conn
			.handle()
			.with_search_options(SearchOptions::new().sizelimit(1))
			.search(&self.config.user_search_base, Scope::Subtree, filter, ALL_ATTRIBUTES)
			.await
			.and_then(|res| res.success());
		match result {
			Ok((entries, _)) => {
				let entry = entries.into_iter().next().map(SearchEntry::construct);
				if entry.is_none() {
					warn!("LDAP user lookup failed: no such user");
				}
				entry
			}
			Err(err) => {
				warn!("LDAP user lookup failed: {err}");
				None
			}
		}
	}

	/// Re-binds the connection as `dn` to verify `password`.
	///
	/// This is the sole password verification mechanism; passwords never
	/// reach local storage or comparison logic. Returns whether the
	/// directory accepted the credentials.
	pub async fn rebind(&self, conn: &mut BoundConnection, dn: &str, password: &str) -> bool {
		match conn.handle().simple_bind(dn, password).await.and_then(|res| res.success()) {
			Ok(_) => {
				info!("LDAP user rebind successful");
				true
			}
			Err(err) => {
				warn!("LDAP rebind failed: {err}");
				false
			}
		}
	}

	/// Starts a paginated subtree search over every entry of the
	/// configured object class.
	///
	/// Returns `None` (logged) if the search cannot be started. The
	/// resulting stream is finite and not restartable.
	pub async fn iterate_all(&self, conn: &mut BoundConnection) -> Option<EntryStream> {
		let filter = match build_filter(
			&BTreeMap::new(),
			&self.config.user_object_class,
			&self.config.user_field_alias,
			&*self.hooks.format_search_filter,
		) {
			Ok(filter) => filter,
			Err(err) => {
				warn!("LDAP paged search failed: {err}");
				return None;
			}
		};

		let adapters: Vec<Box<dyn Adapter<String, Vec<String>>>> = vec![
			Box::new(EntriesOnly::new()),
			Box::new(PagedResults::new(self.config.page_size)),
		];
		let search = conn
			.handle()
			.streaming_search_with(
				adapters,
				&self.config.user_search_base,
				Scope::Subtree,
				&filter,
				ALL_ATTRIBUTES.map(str::to_owned).to_vec(),
			)
			.await;
		match search {
			Ok(search) => Some(EntryStream { search, done: false }),
			Err(err) => {
				warn!("LDAP paged search failed: {err}");
				None
			}
		}
	}
}

/// A lazy, finite stream of directory entries from a paginated search.
///
/// Reference and control messages are filtered out; only result entries are
/// yielded. A protocol failure mid-stream is logged and ends the stream
/// early, so a partial enumeration looks like a short one. Sync runs are
/// idempotent and expected to be re-run.
pub struct EntryStream {
	/// The underlying paged search.
	search: SearchStream<'static, String, Vec<String>>,
	/// Set once the stream has ended, normally or through an error.
	done: bool,
}

impl EntryStream {
	/// The next entry, or `None` once the stream has ended.
	pub async fn next(&mut self) -> Option<SearchEntry> {
		if self.done {
			return None;
		}
		match self.search.next().await {
			Ok(Some(entry)) => Some(SearchEntry::construct(entry)),
			Ok(None) => {
				self.done = true;
				if let Err(err) = self.search.finish().await.success() {
					warn!("LDAP paged search ended with error: {err}");
				}
				None
			}
			Err(err) => {
				warn!("LDAP paged search failed: {err}");
				self.done = true;
				None
			}
		}
	}
}

impl std::fmt::Debug for EntryStream {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EntryStream").field("done", &self.done).finish_non_exhaustive()
	}
}
