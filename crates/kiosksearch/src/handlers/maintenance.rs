//! Schema and index maintenance subcommands

use anyhow::Context;
use kiosksearch_config::SearchConfig;
use kiosksearch_data::{SqliteContentRepository, initialize_database};
use kiosksearch_search::QueryOrchestrator;
use std::sync::Arc;

/// Apply pending migrations
pub async fn migrate(config: &SearchConfig) -> anyhow::Result<()> {
    initialize_database(&config.repository).await?;
    println!(
        "Database at {} is up to date",
        config.repository.database_path.display()
    );
    Ok(())
}

/// Rebuild every full-text index and re-enable the primary strategy
pub async fn rebuild_index(config: SearchConfig) -> anyhow::Result<()> {
    let pool = initialize_database(&config.repository).await?;
    let orchestrator = QueryOrchestrator::new(Arc::new(SqliteContentRepository::new(pool)), config);

    orchestrator
        .rebuild_index()
        .await
        .context("Full-text index rebuild failed")?;
    println!("Full-text indexes rebuilt");
    Ok(())
}
