//! Keystroke debouncing in front of the orchestrator
//!
//! Each call waits out the quiet interval; if a newer call arrives in the
//! meantime the older one is dropped without touching the repository. A call
//! that was dispatched but finished after a newer call started is also
//! dropped, so the caller only ever sees the latest query's results.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::SearchError;
use crate::orchestrator::QueryOrchestrator;
use crate::query::SearchQuery;
use crate::result::SearchResultSet;

#[derive(Debug)]
pub struct QueryDebouncer {
    interval: Duration,
    generation: AtomicU64,
}

impl QueryDebouncer {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: AtomicU64::new(0),
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `call` once the input has been quiet for the interval
    ///
    /// Returns `None` when a newer call superseded this one.
    pub async fn debounce<F, Fut, T>(&self, call: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst).wrapping_add(1);

        tokio::time::sleep(self.interval).await;
        if self.is_superseded(ticket) {
            tracing::trace!(ticket, "Debounced call superseded before dispatch");
            return None;
        }

        let output = call().await;
        if self.is_superseded(ticket) {
            tracing::trace!(ticket, "Debounced call superseded while running");
            return None;
        }
        Some(output)
    }

    /// Debounced `QueryOrchestrator::submit`
    pub async fn submit(
        &self,
        orchestrator: &QueryOrchestrator,
        query: &SearchQuery,
    ) -> Option<Result<SearchResultSet, SearchError>> {
        self.debounce(|| orchestrator.submit(query)).await
    }

    fn is_superseded(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_single_call_runs_after_interval() {
        let debouncer = QueryDebouncer::new(Duration::from_millis(250));
        let started = tokio::time::Instant::now();

        let output = debouncer.debounce(|| async { 7 }).await;

        assert_eq!(output, Some(7));
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_calls_only_run_the_last() {
        let debouncer = Arc::new(QueryDebouncer::new(Duration::from_millis(250)));
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for value in 0..3 {
            let debouncer = Arc::clone(&debouncer);
            let runs = Arc::clone(&runs);
            handles.push(tokio::spawn(async move {
                debouncer
                    .debounce(|| async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        value
                    })
                    .await
            }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut outputs = Vec::new();
        for handle in handles {
            outputs.push(handle.await.unwrap());
        }

        assert_eq!(outputs, vec![None, None, Some(2)]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_dropped_when_superseded_mid_flight() {
        let debouncer = Arc::new(QueryDebouncer::new(Duration::from_millis(100)));

        let slow = {
            let debouncer = Arc::clone(&debouncer);
            tokio::spawn(async move {
                debouncer
                    .debounce(|| async {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        "slow"
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(200)).await;
        let fast = debouncer.debounce(|| async { "fast" }).await;

        assert_eq!(fast, Some("fast"));
        assert_eq!(slow.await.unwrap(), None);
    }
}
