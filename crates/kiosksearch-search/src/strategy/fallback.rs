//! Degraded substring search, the availability floor
//!
//! Scans base tables only, never the full-text indexes, so a damaged index
//! cannot break it. Every match gets the same low score.

use async_trait::async_trait;
use kiosksearch_common::CorrelationId;
use kiosksearch_data::{ContentRepository, TextMatch};
use std::sync::Arc;
use std::time::Duration;

use super::{SearchStrategy, StrategyKind, StrategyOutput, TableScan, paginate};
use crate::error::{ErrorClass, StrategyError};
use crate::formatter;
use crate::query::PreparedQuery;

pub struct FallbackStrategy {
    scan: TableScan,
}

impl FallbackStrategy {
    pub fn new(repository: Arc<dyn ContentRepository>, timeout: Duration) -> Self {
        Self {
            scan: TableScan::new(repository, timeout),
        }
    }
}

#[async_trait]
impl SearchStrategy for FallbackStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fallback
    }

    #[tracing::instrument(skip(self, query), fields(correlation_id))]
    async fn execute(
        &self,
        query: &PreparedQuery,
        correlation_id: &CorrelationId,
    ) -> Result<StrategyOutput, StrategyError> {
        tracing::Span::current().record("correlation_id", correlation_id.to_string());

        let text = if query.text.is_empty() {
            TextMatch::All
        } else {
            TextMatch::Substring(query.text.phrase())
        };

        // Uniform scores make every sort order a pure column order, which
        // each table already applies; the page window is enough
        let tables = self
            .scan
            .scan(
                query,
                &text,
                query.sort_by.row_order(),
                query.window(),
                ErrorClass::RepositoryUnavailable,
                StrategyError::from_fallback,
            )
            .await?;

        let mut total_count = 0_u64;
        let mut results = Vec::new();
        for (_, rows, count) in tables {
            total_count = total_count.saturating_add(count);
            results.extend(formatter::format_unranked(rows));
        }

        tracing::debug!(total_count, "Substring search complete");
        Ok(StrategyOutput {
            results: paginate(results, query),
            total_count,
        })
    }
}
