#![allow(
	clippy::expect_used,
	clippy::missing_docs_in_private_items,
	clippy::print_stdout,
	clippy::unwrap_used
)]
use std::{error::Error, sync::Arc};

use ldap_auth_sync::{
	AuthenticationService, Hooks, MemoryStore, PasswordState, SyncDriver,
};
use serial_test::serial;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod common;

use common::{
	arc_config, ldap_add_organizational_unit, ldap_add_user, ldap_connect,
	ldap_delete_organizational_unit, ldap_delete_user, lookup,
};

fn init_tracing() {
	let filter = EnvFilter::default().add_directive(LevelFilter::DEBUG.into());
	let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[ignore = "docker"]
#[tokio::test]
#[serial]
async fn sync_all_mirrors_the_directory() -> Result<(), Box<dyn Error>> {
	init_tracing();

	let mut ldap = ldap_connect().await?;
	let _ = ldap_delete_organizational_unit(&mut ldap, "users").await;
	ldap_add_organizational_unit(&mut ldap, "users").await?;
	ldap_add_user(&mut ldap, "user01", "Ada", "Lovelace", "ada@example.org", "pw1").await?;
	ldap_add_user(&mut ldap, "user02", "Grace", "Hopper", "grace@example.org", "pw2").await?;
	ldap_add_user(&mut ldap, "user03", "Alan", "Turing", "alan@example.org", "pw3").await?;

	let config = arc_config()?;
	let store = Arc::new(MemoryStore::new());
	let driver = SyncDriver::new(config.clone(), Arc::new(Hooks::default()), store.clone());

	let count = driver.sync_all().await?;
	assert_eq!(count, 3);
	assert_eq!(store.len(), 3);

	let ada = store.get(&lookup("user01")).expect("user01 synced");
	assert_eq!(ada.profile.get("email").map(String::as_str), Some("ada@example.org"));
	assert_eq!(ada.profile.get("first_name").map(String::as_str), Some("Ada"));
	assert_eq!(ada.password, PasswordState::Unusable);

	// Re-running updates in place instead of duplicating.
	let count = driver.sync_all().await?;
	assert_eq!(count, 3);
	assert_eq!(store.len(), 3);

	ldap_delete_user(&mut ldap, "user01").await?;
	ldap_delete_user(&mut ldap, "user02").await?;
	ldap_delete_user(&mut ldap, "user03").await?;
	ldap_delete_organizational_unit(&mut ldap, "users").await?;
	ldap.unbind().await?;
	Ok(())
}

#[ignore = "docker"]
#[tokio::test]
#[serial]
async fn authenticate_verifies_the_password_against_the_directory() -> Result<(), Box<dyn Error>>
{
	init_tracing();

	let mut ldap = ldap_connect().await?;
	let _ = ldap_delete_organizational_unit(&mut ldap, "users").await;
	ldap_add_organizational_unit(&mut ldap, "users").await?;
	ldap_add_user(&mut ldap, "user01", "Ada", "Lovelace", "ada@example.org", "hunter2").await?;

	let config = arc_config()?;
	let store = Arc::new(MemoryStore::new());
	let service =
		AuthenticationService::new(config, Arc::new(Hooks::default()), store.clone());

	let user = service.authenticate(&lookup("user01"), "hunter2").await?;
	let user = user.expect("correct password authenticates");
	assert_eq!(user.lookup.get("username").map(String::as_str), Some("user01"));
	assert_eq!(user.password, PasswordState::Unusable);
	assert_eq!(store.len(), 1);

	// Wrong password and unknown user are both plain rejections.
	assert!(service.authenticate(&lookup("user01"), "wrong").await?.is_none());
	assert!(service.authenticate(&lookup("nobody"), "hunter2").await?.is_none());

	ldap_delete_user(&mut ldap, "user01").await?;
	ldap_delete_organizational_unit(&mut ldap, "users").await?;
	ldap.unbind().await?;
	Ok(())
}

#[ignore = "docker"]
#[tokio::test]
#[serial]
async fn authenticate_is_repeatable() -> Result<(), Box<dyn Error>> {
	init_tracing();

	let mut ldap = ldap_connect().await?;
	let _ = ldap_delete_organizational_unit(&mut ldap, "users").await;
	ldap_add_organizational_unit(&mut ldap, "users").await?;
	ldap_add_user(&mut ldap, "user01", "Ada", "Lovelace", "ada@example.org", "hunter2").await?;

	let config = arc_config()?;
	let store = Arc::new(MemoryStore::new());
	let service =
		AuthenticationService::new(config, Arc::new(Hooks::default()), store.clone());

	// Each call opens and releases its own connection; the second call
	// updates the record created by the first.
	assert!(service.authenticate(&lookup("user01"), "hunter2").await?.is_some());
	assert!(service.authenticate(&lookup("user01"), "hunter2").await?.is_some());
	assert_eq!(store.len(), 1);

	ldap_delete_user(&mut ldap, "user01").await?;
	ldap_delete_organizational_unit(&mut ldap, "users").await?;
	ldap.unbind().await?;
	Ok(())
}
