//! Database migration utilities

use sqlx::SqlitePool;

use crate::error::{DatabaseError, DatabaseResult};

/// Run all pending migrations embedded from the `migrations` directory
///
/// # Errors
/// Returns `DatabaseError::MigrationFailed` when a migration cannot be applied
pub async fn run_migrations(pool: &SqlitePool) -> DatabaseResult<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|source| DatabaseError::MigrationFailed {
            message: source.to_string(),
            source,
        })?;

    tracing::info!("Database migrations completed");
    Ok(())
}
