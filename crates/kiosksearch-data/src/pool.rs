//! Database connection pool management

use anyhow::{Context, Result};
use kiosksearch_config::RepositoryConfig;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::migrations::run_migrations;

/// Create a connection pool for the content database
///
/// The database file is created if it does not exist yet. WAL journaling lets
/// the kiosk keep reading while an import or index rebuild writes.
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory of the database file cannot be created
/// - The database file cannot be opened
/// - Acquiring the initial connection exceeds the configured timeout
pub async fn create_pool(config: &RepositoryConfig) -> Result<SqlitePool> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(&config.database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.timeout());

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.timeout())
        .connect_with(options)
        .await
        .with_context(|| {
            format!(
                "Failed to open content database at {}",
                config.database_path.display()
            )
        })?;

    tracing::debug!(
        path = %config.database_path.display(),
        max_connections = config.max_connections,
        "Content database pool ready"
    );

    Ok(pool)
}

/// Create an in-memory pool, mainly for tests and demos
///
/// A single connection is used so every query sees the same database.
///
/// # Errors
/// Returns an error if the in-memory database cannot be opened
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let options: SqliteConnectOptions = "sqlite::memory:"
        .parse()
        .context("Invalid in-memory database URL")?;

    // Closing the only connection would drop the database
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("Failed to open in-memory database")
}

/// Initialize database (create pool and run migrations)
///
/// # Errors
///
/// Returns an error if:
/// - Pool creation fails (see `create_pool` errors)
/// - Database migrations fail to run
pub async fn initialize_database(config: &RepositoryConfig) -> Result<SqlitePool> {
    let pool = create_pool(config).await?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}
