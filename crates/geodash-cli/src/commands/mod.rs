//! Command implementations: one module per subcommand (spec §6.2), sharing a `Facade`
//! builder for the read-only lookups.

mod cities_in_state;
mod config_cmd;
mod coordinates;
mod countries;
mod city;
mod import;
mod search;
mod server;
mod states;
mod table_info;

use crate::cli::{Cli, Command};
use crate::config as cli_config;
use crate::output;
use geodash_core::config::LayeredConfig;
use geodash_core::error::Result;
use geodash_coordinator::Facade;
use geodash_search::InMemoryIndex;
use geodash_store::{open_store, GeoStore};
use std::path::PathBuf;
use std::sync::Arc;

fn default_config_path() -> PathBuf {
    PathBuf::from("geodash.toml")
}

/// Dispatches the parsed command, returning the process exit code.
pub async fn execute(cli: Cli) -> i32 {
    if let Command::Config(args) = &cli.command {
        return config_cmd::execute(args);
    }

    let config = match cli_config::load(&default_config_path(), cli.db_uri) {
        Ok(c) => c,
        Err(e) => return output::failure(&e),
    };
    if let Err(e) = config.validate() {
        return output::failure(&e);
    }

    match cli.command {
        Command::Search(args) => search::execute(args, &config).await,
        Command::City(args) => city::execute(args, &config).await,
        Command::Coordinates(args) => coordinates::execute(args, &config).await,
        Command::Countries => countries::execute(&config).await,
        Command::States(args) => states::execute(args, &config).await,
        Command::CitiesInState(args) => cities_in_state::execute(args, &config).await,
        Command::Import(args) => import::execute(args, &config).await,
        Command::TableInfo => table_info::execute(&config).await,
        Command::Server(args) => server::execute(args, config).await,
        Command::Config(_) => unreachable!("Config is handled before the config file is loaded"),
    }
}

/// Reads the log level a command needs before tracing is initialised: `server --debug`
/// forces debug regardless of the global `--log-level`.
pub fn effective_log_level(cli: &Cli) -> String {
    if let Command::Server(args) = &cli.command {
        if args.debug {
            return "debug".to_string();
        }
    }
    cli.log_level.clone().unwrap_or_else(|| "info".to_string())
}

/// Opens the store, runs a full scan to build the in-memory index, and assembles the same
/// `Facade` a worker process would use, minus the shared-memory coordination flags those
/// exist for fan-out across worker processes, not a single one-shot CLI call.
async fn build_facade(config: &LayeredConfig) -> Result<Facade<dyn GeoStore>> {
    let store = open_store(config).await?;
    store.ensure_schema().await?;
    let rows = store.all_cities().await?;
    let index = Arc::new(InMemoryIndex::build(rows, config.database_spatial.value));
    Ok(Facade::new(store, index, config))
}
