//! Indexed full-text search: the default, highest quality strategy

use async_trait::async_trait;
use kiosksearch_common::CorrelationId;
use kiosksearch_data::{ContentRepository, RowOrder, TextMatch};
use std::sync::Arc;
use std::time::Duration;

use super::{SearchStrategy, StrategyKind, StrategyOutput, TableScan, paginate};
use crate::error::{ErrorClass, StrategyError};
use crate::formatter;
use crate::query::{PreparedQuery, SortBy};

/// Full-text strategy over each table's FTS5 index
///
/// For relevance ordering each table contributes its best `candidate_pool`
/// rows: exact-title matches first, then by index rank. These are re-scored
/// per type by the relevance formatter before merging.
pub struct PrimaryStrategy {
    scan: TableScan,
    candidate_pool: usize,
}

impl PrimaryStrategy {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        timeout: Duration,
        candidate_pool: usize,
    ) -> Self {
        Self {
            scan: TableScan::new(repository, timeout),
            candidate_pool,
        }
    }
}

#[async_trait]
impl SearchStrategy for PrimaryStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Primary
    }

    #[tracing::instrument(skip(self, query), fields(correlation_id, terms = query.text.terms.len()))]
    async fn execute(
        &self,
        query: &PreparedQuery,
        correlation_id: &CorrelationId,
    ) -> Result<StrategyOutput, StrategyError> {
        tracing::Span::current().record("correlation_id", correlation_id.to_string());

        let text = if query.text.is_empty() {
            TextMatch::All
        } else {
            TextMatch::FullText(query.text.terms.clone())
        };

        // Composite re-ranking can reorder rows, so look past the page.
        // Without terms recency is the only signal, so pick candidates by year.
        let (order, window) = match query.sort_by {
            SortBy::Relevance if query.text.is_empty() => (
                RowOrder::YearDesc,
                query.window().max(self.candidate_pool),
            ),
            SortBy::Relevance => (RowOrder::Rank, query.window().max(self.candidate_pool)),
            SortBy::Name | SortBy::Date => (query.sort_by.row_order(), query.window()),
        };

        let tables = self
            .scan
            .scan(
                query,
                &text,
                order,
                window,
                ErrorClass::Transient,
                StrategyError::from_primary,
            )
            .await?;

        let mut total_count = 0_u64;
        let mut results = Vec::new();
        for (_, rows, count) in tables {
            total_count = total_count.saturating_add(count);
            results.extend(formatter::format_ranked(rows, &query.text));
        }

        tracing::debug!(total_count, "Full-text search complete");
        Ok(StrategyOutput {
            results: paginate(results, query),
            total_count,
        })
    }
}
