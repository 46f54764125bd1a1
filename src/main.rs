//! Sync command: mirrors all directory users into the local store.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use ldap_auth_sync::{Config, HookRegistry, MemoryStore, SyncDriver};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Creates local user records for all users found in the remote LDAP
/// directory.
#[derive(Debug, Parser)]
#[command(name = "ldap-sync-users", version)]
struct Args {
	/// Path to the YAML configuration file.
	#[arg(short, long, default_value = "ldap-auth-sync.yaml")]
	config: PathBuf,
	/// Do not print a line per synced record.
	#[arg(short, long)]
	quiet: bool,
}

/// Loads the configuration, runs one full sync and reports the outcome.
#[tokio::main]
async fn main() -> ExitCode {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::WARN.into()));
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let args = Args::parse();

	let file = match std::fs::File::open(&args.config) {
		Ok(file) => file,
		Err(err) => {
			eprintln!("Could not open {}: {err}", args.config.display());
			return ExitCode::FAILURE;
		}
	};
	let config: Config = match serde_yaml::from_reader(file) {
		Ok(config) => config,
		Err(err) => {
			eprintln!("Could not parse {}: {err}", args.config.display());
			return ExitCode::FAILURE;
		}
	};

	let hooks = match HookRegistry::new().resolve(&config.hooks) {
		Ok(hooks) => hooks,
		Err(err) => {
			eprintln!("{err}");
			return ExitCode::FAILURE;
		}
	};

	let driver = SyncDriver::new(Arc::new(config), Arc::new(hooks), Arc::new(MemoryStore::new()));
	let quiet = args.quiet;
	match driver
		.sync_all_with(|record| {
			if !quiet {
				println!("Synced {record}");
			}
		})
		.await
	{
		Ok(count) => {
			println!("Synced {count} users");
			ExitCode::SUCCESS
		}
		Err(err) => {
			eprintln!("Sync failed: {err}");
			ExitCode::FAILURE
		}
	}
}
