//! Authentication against the directory.
use std::{collections::BTreeMap, sync::Arc};

use tracing::info;

use crate::{
	config::Config,
	entry::SearchEntryExt,
	error::Error,
	filter::build_filter,
	hooks::Hooks,
	ldap::{BoundConnection, DirectoryClient},
	mapper::EntryMapper,
	store::{LocalUserRecord, UserStore},
};

/// Answers "given these lookup fields and a password, which local user is
/// this" by searching the directory as admin and re-binding as the found
/// entry.
///
/// Every call opens its own admin connection and releases it before
/// returning, so the directory is the source of truth at call time and
/// concurrent calls never share a session.
#[derive(Debug, Clone)]
pub struct AuthenticationService {
	/// Lookup field names and filter configuration.
	config: Arc<Config>,
	/// Resolved hooks for filter formatting.
	hooks: Arc<Hooks>,
	/// The directory client.
	client: DirectoryClient,
	/// Maps the found entry onto a local record.
	mapper: EntryMapper,
}

impl AuthenticationService {
	/// Creates a service writing authenticated users to `store`.
	#[must_use]
	pub fn new(config: Arc<Config>, hooks: Arc<Hooks>, store: Arc<dyn UserStore>) -> Self {
		AuthenticationService {
			client: DirectoryClient::new(config.clone(), hooks.clone()),
			mapper: EntryMapper::new(config.clone(), hooks.clone(), store),
			config,
			hooks,
		}
	}

	/// Authenticates a user and returns the mapped local record.
	///
	/// `Ok(None)` is the rejection outcome for every expected failure:
	/// implausible credentials, admin bind failure, unknown user, wrong
	/// password. The causes are deliberately indistinguishable so callers
	/// cannot leak whether a username exists. Configuration, store and
	/// relation-hook problems surface as `Err`.
	///
	/// # Errors
	/// [`Error::UnmappedField`] for fields missing from the alias table,
	/// [`Error::Store`] and [`Error::Relation`] from the mapping step.
	pub async fn authenticate(
		&self,
		lookup_fields: &BTreeMap<String, String>,
		password: &str,
	) -> Result<Option<LocalUserRecord>, Error> {
		// Fails closed before any network traffic.
		if !self.credentials_plausible(lookup_fields, password) {
			return Ok(None);
		}

		let Some(mut conn) = self.client.bind().await else {
			return Ok(None);
		};
		let outcome = self.authenticate_bound(&mut conn, lookup_fields, password).await;
		conn.unbind().await;
		outcome
	}

	/// Whether the credentials are worth a directory round trip: the
	/// password is non-empty and the supplied field names exactly match
	/// the configured lookup field set.
	fn credentials_plausible(
		&self,
		lookup_fields: &BTreeMap<String, String>,
		password: &str,
	) -> bool {
		!password.is_empty()
			&& lookup_fields.keys().eq(self.config.lookup_field_names.iter())
	}

	/// The search, rebind and mapping steps on an established admin
	/// connection. Split out so [`AuthenticationService::authenticate`]
	/// can unbind on every exit path.
	async fn authenticate_bound(
		&self,
		conn: &mut BoundConnection,
		lookup_fields: &BTreeMap<String, String>,
		password: &str,
	) -> Result<Option<LocalUserRecord>, Error> {
		let filter = build_filter(
			lookup_fields,
			&self.config.user_object_class,
			&self.config.user_field_alias,
			&*self.hooks.format_search_filter,
		)?;

		let Some(entry) = self.client.search_single(conn, &filter).await else {
			return Ok(None);
		};
		info!("LDAP user lookup successful");

		let dn = entry.bind_dn().to_owned();
		if !self.client.rebind(conn, &dn, password).await {
			return Ok(None);
		}

		self.mapper.map_entry(&entry).map(Some)
	}
}
