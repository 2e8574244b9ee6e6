//! Content repository trait for dependency injection and testing

use async_trait::async_trait;

use crate::error::DatabaseResult;
use crate::models::ContentRow;
use crate::query::ContentQuery;

/// Read access to the kiosk content tables plus index maintenance
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch the rows of one table matching `query`, in the requested order
    async fn fetch(&self, query: &ContentQuery) -> DatabaseResult<Vec<ContentRow>>;

    /// Count rows matching `query`, ignoring its limit
    async fn count(&self, query: &ContentQuery) -> DatabaseResult<u64>;

    /// Rebuild every full-text index from its backing table
    async fn rebuild_index(&self) -> DatabaseResult<()>;
}
