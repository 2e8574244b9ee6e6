//! Search strategies and the selector that chooses between them

pub mod fallback;
pub mod primary;
pub mod selector;

pub use fallback::FallbackStrategy;
pub use primary::PrimaryStrategy;
pub use selector::{StrategyHealth, StrategyOutcome, StrategySelector};

use async_trait::async_trait;
use kiosksearch_common::CorrelationId;
use kiosksearch_data::{
    ContentQuery, ContentRepository, ContentRow, ContentType, DatabaseError, RowOrder, TextMatch,
};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ErrorClass, StrategyError};
use crate::query::PreparedQuery;
use crate::result::{SearchResult, sort_results};

/// Which strategy produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Primary,
    Fallback,
}

/// One page of merged, sorted results plus the overall match count
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    pub results: Vec<SearchResult>,
    pub total_count: u64,
}

/// A way of answering a prepared query from the content repository
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn execute(
        &self,
        query: &PreparedQuery,
        correlation_id: &CorrelationId,
    ) -> Result<StrategyOutput, StrategyError>;
}

/// Repository access shared by both strategies: per-type fan-out under a timeout
pub(crate) struct TableScan {
    repository: Arc<dyn ContentRepository>,
    timeout: Duration,
}

impl TableScan {
    pub(crate) fn new(repository: Arc<dyn ContentRepository>, timeout: Duration) -> Self {
        Self {
            repository,
            timeout,
        }
    }

    /// Fetch up to `window` rows in `order` and the match count from each searchable table
    ///
    /// Tables run one after another; the first failure aborts the attempt.
    /// `classify` turns repository errors into the caller's error class, and a
    /// timeout is reported as `timeout_class`.
    pub(crate) async fn scan(
        &self,
        query: &PreparedQuery,
        text: &TextMatch,
        order: RowOrder,
        window: usize,
        timeout_class: ErrorClass,
        classify: fn(DatabaseError) -> StrategyError,
    ) -> Result<Vec<(ContentType, Vec<ContentRow>, u64)>, StrategyError> {
        let mut tables = Vec::with_capacity(query.categories.len());

        for &content_type in &query.categories {
            let table_query = ContentQuery::new(content_type, text.clone())
                .with_filter(query.filter.clone())
                .with_order(order)
                .with_limit(window)
                .with_exact_title(query.text.phrase());

            if !table_query.is_satisfiable() {
                continue;
            }

            let rows = self
                .bounded(self.repository.fetch(&table_query), timeout_class)
                .await?
                .map_err(classify)?;
            let count = self
                .bounded(self.repository.count(&table_query), timeout_class)
                .await?
                .map_err(classify)?;

            tracing::trace!(
                content_type = %content_type,
                rows = rows.len(),
                count,
                "Scanned table"
            );
            tables.push((content_type, rows, count));
        }

        Ok(tables)
    }

    async fn bounded<F, T>(&self, call: F, timeout_class: ErrorClass) -> Result<T, StrategyError>
    where
        F: std::future::Future<Output = T> + Send,
    {
        tokio::time::timeout(self.timeout, call).await.map_err(|_| {
            StrategyError::new(
                timeout_class,
                format!(
                    "repository call timed out after {}ms",
                    self.timeout.as_millis()
                ),
            )
        })
    }
}

/// Merge per-table results, sort them and cut the requested page
pub(crate) fn paginate(mut results: Vec<SearchResult>, query: &PreparedQuery) -> Vec<SearchResult> {
    sort_results(&mut results, query.sort_by);
    results
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect()
}
