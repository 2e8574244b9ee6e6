//! Command-line front end for the kiosk search engine
//!
//! Runs queries and index maintenance against the local content database.

mod handlers;
mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kiosksearch_common::initialize_environment;
use kiosksearch_config::{ConfigurationLoader, EnvironmentSource, SearchConfig, TomlFileSource};
use std::path::{Path, PathBuf};

use crate::handlers::search::SearchArgs;

/// Offline full-text search over the kiosk archive
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional configuration file path (TOML format)
    #[arg(long, short = 'c', global = true)]
    config_file: Option<PathBuf>,

    /// Content database file, overriding the configuration
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Directory for daily-rolling log files (stderr only when unset)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query and print the result set as JSON
    Search(SearchArgs),
    /// Rebuild every full-text index from its content table
    RebuildIndex,
    /// Create or upgrade the database schema
    Migrate,
    /// Print the effective configuration as TOML
    Config,
}

/// Defaults, then the TOML file, then `KIOSK_SEARCH_*` variables
fn load_config(config_file: Option<&Path>) -> anyhow::Result<SearchConfig> {
    let mut loader = ConfigurationLoader::new().add_source(Box::new(EnvironmentSource));
    if let Some(path) = config_file {
        anyhow::ensure!(
            path.exists(),
            "Config file '{}' does not exist",
            path.display()
        );
        loader = loader.add_source(Box::new(TomlFileSource::new(path)));
    }
    loader.load().context("Invalid configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    initialize_environment();
    let args = Args::parse();

    let mut config = load_config(args.config_file.as_deref())?;
    // Command-line arguments always override config file settings
    if let Some(database) = args.database {
        config.repository.database_path = database;
    }
    if let Some(log_dir) = args.log_dir {
        config.telemetry.log_dir = Some(log_dir);
    }

    // Keep the guards alive until exit so buffered log lines are flushed
    let _log_guards = logging::init(&config.telemetry)?;
    tracing::debug!(database = %config.repository.database_path.display(), "Configuration loaded");

    match args.command {
        Command::Search(search) => handlers::search::run(search, config).await,
        Command::RebuildIndex => handlers::maintenance::rebuild_index(config).await,
        Command::Migrate => handlers::maintenance::migrate(&config).await,
        Command::Config => handlers::config::show(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_global_options_parse_after_subcommand() {
        let args = Args::try_parse_from([
            "kiosksearch",
            "migrate",
            "--database",
            "/tmp/kiosk.db",
        ])
        .unwrap();

        assert!(matches!(args.command, Command::Migrate));
        assert_eq!(args.database, Some(PathBuf::from("/tmp/kiosk.db")));
    }

    #[test]
    fn test_load_config_reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\ncapacity = 7\n").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.cache.capacity, 7);
    }

    #[test]
    fn test_load_config_rejects_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/kiosksearch.toml")));
        assert!(result.is_err());
    }
}
