//! The search façade: validation, caching, retry and strategy selection
//!
//! One `QueryOrchestrator` per process owns the result cache and the strategy
//! health. Both are shared by overlapping `submit` calls and only locked for
//! in-memory bookkeeping.

use chrono::Utc;
use kiosksearch_common::CorrelationId;
use kiosksearch_config::{QueryConfig, SearchConfig};
use kiosksearch_data::ContentRepository;
use std::sync::Arc;
use std::time::Instant;

use crate::analytics::{AnalyticsSink, NoopAnalyticsSink, SearchEvent};
use crate::cache::{CacheEntry, CacheKey, ResultCache};
use crate::clock::{Clock, SystemClock};
use crate::error::{SearchError, StrategyError};
use crate::query::{PreparedQuery, SearchQuery};
use crate::result::SearchResultSet;
use crate::retry::RetryPolicy;
use crate::strategy::{
    FallbackStrategy, PrimaryStrategy, SearchStrategy, StrategyHealth, StrategyOutcome,
    StrategySelector,
};

/// Builder for [`QueryOrchestrator`]
///
/// Defaults: configuration from `SearchConfig::default()`, the system clock,
/// no analytics, and the SQL-backed primary and fallback strategies.
pub struct QueryOrchestratorBuilder {
    repository: Arc<dyn ContentRepository>,
    config: SearchConfig,
    clock: Arc<dyn Clock>,
    analytics: Arc<dyn AnalyticsSink>,
    retry: Option<RetryPolicy>,
    primary: Option<Arc<dyn SearchStrategy>>,
    fallback: Option<Arc<dyn SearchStrategy>>,
}

impl QueryOrchestratorBuilder {
    pub fn new(repository: Arc<dyn ContentRepository>) -> Self {
        Self {
            repository,
            config: SearchConfig::default(),
            clock: Arc::new(SystemClock),
            analytics: Arc::new(NoopAnalyticsSink),
            retry: None,
            primary: None,
            fallback: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Override the policy derived from `config.retry`
    #[must_use]
    pub const fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    #[must_use]
    pub fn primary_strategy(mut self, primary: Arc<dyn SearchStrategy>) -> Self {
        self.primary = Some(primary);
        self
    }

    #[must_use]
    pub fn fallback_strategy(mut self, fallback: Arc<dyn SearchStrategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn build(self) -> QueryOrchestrator {
        let config = self.config;
        let timeout = config.repository.timeout();

        let primary = self.primary.unwrap_or_else(|| {
            Arc::new(PrimaryStrategy::new(
                Arc::clone(&self.repository),
                timeout,
                config.repository.candidate_pool,
            ))
        });
        let fallback = self.fallback.unwrap_or_else(|| {
            Arc::new(FallbackStrategy::new(Arc::clone(&self.repository), timeout))
        });

        QueryOrchestrator {
            selector: StrategySelector::new(
                primary,
                fallback,
                config.selector.transient_failure_threshold,
            ),
            cache: ResultCache::from_config(&config.cache, Arc::clone(&self.clock)),
            retry: self
                .retry
                .unwrap_or_else(|| RetryPolicy::from_config(&config.retry)),
            repository: self.repository,
            clock: self.clock,
            analytics: self.analytics,
            query_config: config.query,
        }
    }
}

/// Entry point for kiosk searches
pub struct QueryOrchestrator {
    selector: StrategySelector,
    cache: ResultCache,
    retry: RetryPolicy,
    repository: Arc<dyn ContentRepository>,
    clock: Arc<dyn Clock>,
    analytics: Arc<dyn AnalyticsSink>,
    query_config: QueryConfig,
}

impl QueryOrchestrator {
    pub fn builder(repository: Arc<dyn ContentRepository>) -> QueryOrchestratorBuilder {
        QueryOrchestratorBuilder::new(repository)
    }

    /// Orchestrator with the given configuration and default collaborators
    pub fn new(repository: Arc<dyn ContentRepository>, config: SearchConfig) -> Self {
        Self::builder(repository).config(config).build()
    }

    /// Run a query
    ///
    /// Superseded calls are not cancelled; their outcome still feeds the
    /// cache and the strategy health.
    ///
    /// # Errors
    /// - `Validation` when the query violates the contract (never retried)
    /// - `RepositoryUnavailable` when even the fallback cannot answer
    /// - `RetriesExhausted` when every attempt failed with a retryable class
    #[tracing::instrument(skip(self, query), fields(correlation_id, query = %query.text, cached = false, used_fallback = false))]
    pub async fn submit(&self, query: &SearchQuery) -> Result<SearchResultSet, SearchError> {
        let correlation_id = CorrelationId::new();
        tracing::Span::current().record("correlation_id", correlation_id.to_string());

        let started = self.clock.now();
        metrics::counter!("kiosk_search_requests_total").increment(1);

        let outcome = self.run(query, &correlation_id, started).await;
        self.report(query, &correlation_id, started, &outcome);
        outcome
    }

    async fn run(
        &self,
        query: &SearchQuery,
        correlation_id: &CorrelationId,
        started: Instant,
    ) -> Result<SearchResultSet, SearchError> {
        let prepared = PreparedQuery::prepare(query, &self.query_config).map_err(|reason| {
            tracing::info!(reason = %reason, "Rejected query");
            SearchError::Validation {
                reason,
                correlation_id: correlation_id.clone(),
            }
        })?;

        let key = CacheKey::fingerprint(&prepared);
        if let Some(entry) = self.cache.get(&key) {
            tracing::Span::current().record("cached", true);
            tracing::debug!(key = %key, "Cache hit");
            metrics::counter!("kiosk_search_cache_hits_total").increment(1);
            return Ok(self.result_set(&entry, started, true));
        }
        metrics::counter!("kiosk_search_cache_misses_total").increment(1);

        let outcome = self.execute_with_retry(&prepared, &key, correlation_id).await?;
        if outcome.used_fallback {
            tracing::Span::current().record("used_fallback", true);
        }

        let entry = self.cache.put(
            key,
            outcome.output.results,
            outcome.output.total_count,
            outcome.used_fallback,
        );
        Ok(self.result_set(&entry, started, false))
    }

    /// Selector calls under the retry policy
    async fn execute_with_retry(
        &self,
        prepared: &PreparedQuery,
        key: &CacheKey,
        correlation_id: &CorrelationId,
    ) -> Result<StrategyOutcome, SearchError> {
        let mut attempt = 1_u32;
        loop {
            match self.selector.execute(prepared, correlation_id).await {
                Ok(outcome) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Search succeeded after retry");
                    }
                    return Ok(outcome);
                }
                Err(error) if self.retry.should_retry(attempt, error.class) => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Search attempt failed, retrying"
                    );
                    self.clock.sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(self.escalate(error, attempt, key, correlation_id)),
            }
        }
    }

    /// Turn the final strategy error into the caller-facing error
    fn escalate(
        &self,
        error: StrategyError,
        attempts: u32,
        key: &CacheKey,
        correlation_id: &CorrelationId,
    ) -> SearchError {
        if self.retry.is_retryable(error.class) {
            tracing::error!(attempts, error = %error, "Search failed after retries");
            SearchError::RetriesExhausted {
                attempts,
                correlation_id: correlation_id.clone(),
                last_error: error,
                last_known_good: self.cache.get_stale(key),
            }
        } else {
            tracing::error!(error = %error, "Content repository unavailable");
            SearchError::RepositoryUnavailable {
                message: error.message.clone(),
                correlation_id: correlation_id.clone(),
                source: Some(error),
            }
        }
    }

    fn result_set(&self, entry: &CacheEntry, started: Instant, cache_hit: bool) -> SearchResultSet {
        SearchResultSet {
            results: entry.results.clone(),
            total_count: entry.total_count,
            used_fallback: entry.used_fallback,
            elapsed_ms: self.elapsed_ms(started),
            cache_hit,
        }
    }

    fn elapsed_ms(&self, started: Instant) -> u64 {
        let elapsed = self.clock.now().saturating_duration_since(started);
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Metrics and the analytics event for a completed call
    fn report(
        &self,
        query: &SearchQuery,
        correlation_id: &CorrelationId,
        started: Instant,
        outcome: &Result<SearchResultSet, SearchError>,
    ) {
        let elapsed_ms = self.elapsed_ms(started);
        #[allow(clippy::cast_precision_loss)]
        metrics::histogram!("kiosk_search_duration_ms").record(elapsed_ms as f64);

        let (result_count, used_fallback, cache_hit, error_class) = match outcome {
            Ok(set) => (set.results.len(), set.used_fallback, set.cache_hit, None),
            Err(error) => {
                metrics::counter!("kiosk_search_failures_total", "class" => error.class().as_str())
                    .increment(1);
                (0, false, false, Some(error.class()))
            }
        };
        if used_fallback && !cache_hit {
            metrics::counter!("kiosk_search_fallback_results_total").increment(1);
        }

        self.analytics.record(SearchEvent {
            correlation_id: correlation_id.to_string(),
            query: query.text.clone(),
            filters: query.filters.clone(),
            result_count,
            elapsed_ms,
            used_fallback,
            cache_hit,
            error_class,
            at: Utc::now(),
        });
    }

    /// Drop every cached result
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
        tracing::info!("Result cache invalidated");
    }

    /// Read-only snapshot of the strategy health
    pub fn health(&self) -> StrategyHealth {
        self.selector.health()
    }

    /// Signal that the full-text index is usable again
    pub fn reset_primary(&self) {
        self.selector.reset_primary();
    }

    /// Rebuild every full-text index, then re-enable the primary strategy
    ///
    /// Cached results are dropped so queries answered by the fallback are
    /// re-ranked by the rebuilt index.
    ///
    /// # Errors
    /// Returns `Maintenance` when the repository cannot rebuild; health is left untouched
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_index(&self) -> Result<(), SearchError> {
        self.repository
            .rebuild_index()
            .await
            .map_err(|source| SearchError::Maintenance {
                message: source.to_string(),
                source,
            })?;

        self.reset_primary();
        self.invalidate_cache();
        Ok(())
    }

    pub const fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub const fn query_config(&self) -> &QueryConfig {
        &self.query_config
    }
}
