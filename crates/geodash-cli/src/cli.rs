//! CLI argument parsing (spec §6.2).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// geodash - city lookup and autocomplete over a pluggable store
#[derive(Parser, Debug)]
#[command(name = "geodash")]
#[command(about = "City lookup, autocomplete, and radius search", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database connection string; `sqlite:<path>` or bare path selects the embedded
    /// backend, anything else with a scheme selects the network backend.
    #[arg(long, global = true)]
    pub db_uri: Option<String>,

    /// Tracing verbosity (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search cities by name (exact, prefix, then fuzzy tiers).
    Search(SearchArgs),

    /// Look up a single city by id.
    City(CityArgs),

    /// Find cities within a radius of a coordinate.
    Coordinates(CoordinatesArgs),

    /// List distinct countries present in the store.
    Countries,

    /// List distinct states/provinces for a country.
    States(StatesArgs),

    /// List cities in a given state and country.
    CitiesInState(CitiesInStateArgs),

    /// Import a corpus CSV into the store.
    Import(ImportArgs),

    /// Report backend kind and row count.
    TableInfo,

    /// Run the HTTP server.
    Server(ServerArgs),

    /// Inspect or manage the on-disk configuration file.
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// The search query.
    pub query: String,
}

#[derive(Parser, Debug)]
pub struct CityArgs {
    /// City id.
    pub id: u32,
}

#[derive(Parser, Debug)]
pub struct CoordinatesArgs {
    pub lat: f64,
    pub lng: f64,

    /// Search radius in kilometers.
    #[arg(long, default_value = "10.0")]
    pub radius: f64,
}

#[derive(Parser, Debug)]
pub struct StatesArgs {
    pub country: String,
}

#[derive(Parser, Debug)]
pub struct CitiesInStateArgs {
    pub state: String,
    pub country: String,
}

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// Path to the corpus CSV. Falls back to `data.location` from config when omitted.
    #[arg(long)]
    pub csv_path: Option<PathBuf>,

    /// Row count per insert transaction. Falls back to `data.batch_size` from config.
    #[arg(long)]
    pub batch_size: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct ServerArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Run with debug-level tracing regardless of `--log-level`.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration and where each value came from.
    Show {
        #[arg(long, default_value = "geodash.toml")]
        path: PathBuf,
    },
    /// Write a default configuration file.
    Init {
        #[arg(long, default_value = "geodash.toml")]
        path: PathBuf,

        /// Overwrite the file if it already exists.
        #[arg(long)]
        force: bool,
    },
    /// Validate a configuration file's cross-field invariants.
    Validate {
        #[arg(long, default_value = "geodash.toml")]
        path: PathBuf,
    },
}
