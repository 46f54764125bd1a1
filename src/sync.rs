//! Full-directory synchronization.
use std::sync::Arc;

use tracing::info;

use crate::{
	config::Config,
	error::Error,
	hooks::Hooks,
	ldap::{BoundConnection, DirectoryClient},
	mapper::EntryMapper,
	store::{LocalUserRecord, UserStore},
};

/// Enumerates the whole directory and upserts a local record per entry.
///
/// Designed for at-least-once semantics: mapping is an idempotent upsert
/// keyed by the lookup fields, so re-running a truncated or repeated sync
/// is safe.
#[derive(Debug, Clone)]
pub struct SyncDriver {
	/// The directory client.
	client: DirectoryClient,
	/// Maps each entry onto the local store.
	mapper: EntryMapper,
}

impl SyncDriver {
	/// Creates a driver writing to `store`.
	#[must_use]
	pub fn new(config: Arc<Config>, hooks: Arc<Hooks>, store: Arc<dyn UserStore>) -> Self {
		SyncDriver {
			client: DirectoryClient::new(config.clone(), hooks.clone()),
			mapper: EntryMapper::new(config, hooks, store),
		}
	}

	/// Syncs all directory entries and returns the number of records
	/// processed.
	///
	/// A protocol failure mid-enumeration truncates the run and the count
	/// reflects the entries processed until then; partial enumeration is
	/// acceptable because re-running is idempotent.
	///
	/// # Errors
	/// [`Error::Connect`] if the admin connection cannot be established;
	/// [`Error::Store`] and [`Error::Relation`] from the mapping step.
	pub async fn sync_all(&self) -> Result<u64, Error> {
		self.sync_all_with(|_| {}).await
	}

	/// Like [`SyncDriver::sync_all`], invoking `on_synced` for every
	/// record after its upsert.
	pub async fn sync_all_with(
		&self,
		on_synced: impl FnMut(&LocalUserRecord) + Send,
	) -> Result<u64, Error> {
		let Some(mut conn) = self.client.bind().await else {
			return Err(Error::Connect);
		};
		let outcome = self.sync_bound(&mut conn, on_synced).await;
		conn.unbind().await;
		outcome
	}

	/// The enumeration loop on an established admin connection. Split out
	/// so [`SyncDriver::sync_all_with`] can unbind on every exit path.
	async fn sync_bound(
		&self,
		conn: &mut BoundConnection,
		mut on_synced: impl FnMut(&LocalUserRecord) + Send,
	) -> Result<u64, Error> {
		let Some(mut entries) = self.client.iterate_all(conn).await else {
			return Ok(0);
		};

		let mut count: u64 = 0;
		while let Some(entry) = entries.next().await {
			let record = self.mapper.map_entry(&entry)?;
			on_synced(&record);
			count += 1;
		}
		info!("LDAP sync processed {count} users");
		Ok(count)
	}
}
