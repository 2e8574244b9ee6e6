//! Strategy selection driven by shared strategy health
//!
//! Two tiers of degradation:
//! - an index failure disables the primary strategy until `reset_primary`
//! - a run of transient failures at or past the threshold sends that one
//!   call to the fallback, leaving the primary enabled for the next call

use kiosksearch_common::CorrelationId;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{SearchStrategy, StrategyKind, StrategyOutput};
use crate::error::{ErrorClass, StrategyError};
use crate::query::PreparedQuery;

/// Whether the primary strategy is currently trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyHealth {
    pub primary_available: bool,
    pub consecutive_failures: u32,
    pub last_failure_class: Option<ErrorClass>,
}

impl Default for StrategyHealth {
    fn default() -> Self {
        Self {
            primary_available: true,
            consecutive_failures: 0,
            last_failure_class: None,
        }
    }
}

/// Results of one selector call and which strategy produced them
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub output: StrategyOutput,
    pub used_fallback: bool,
}

/// What the selector decided after a primary failure
enum Degrade {
    Fallback,
    Surface,
}

pub struct StrategySelector {
    primary: Arc<dyn SearchStrategy>,
    fallback: Arc<dyn SearchStrategy>,
    health: Mutex<StrategyHealth>,
    transient_threshold: u32,
}

impl StrategySelector {
    pub fn new(
        primary: Arc<dyn SearchStrategy>,
        fallback: Arc<dyn SearchStrategy>,
        transient_threshold: u32,
    ) -> Self {
        debug_assert_eq!(primary.kind(), StrategyKind::Primary);
        debug_assert_eq!(fallback.kind(), StrategyKind::Fallback);
        Self {
            primary,
            fallback,
            health: Mutex::new(StrategyHealth::default()),
            transient_threshold: transient_threshold.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StrategyHealth> {
        // Plain counters: a poisoned value is still meaningful
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the shared health state
    pub fn health(&self) -> StrategyHealth {
        *self.lock()
    }

    /// Trust the primary strategy again, e.g. after an index rebuild
    pub fn reset_primary(&self) {
        *self.lock() = StrategyHealth::default();
        tracing::info!("Primary search strategy re-enabled");
    }

    /// Run `query` on the strategy the current health allows
    ///
    /// # Errors
    /// - `Transient` when the primary failed transiently below the threshold
    /// - `RepositoryUnavailable` when the fallback failed
    #[tracing::instrument(skip(self, query), fields(correlation_id))]
    pub async fn execute(
        &self,
        query: &PreparedQuery,
        correlation_id: &CorrelationId,
    ) -> Result<StrategyOutcome, StrategyError> {
        tracing::Span::current().record("correlation_id", correlation_id.to_string());

        if !self.health().primary_available {
            tracing::debug!("Primary strategy disabled, using fallback");
            return self.run_fallback(query, correlation_id).await;
        }

        match self.primary.execute(query, correlation_id).await {
            Ok(output) => {
                // Availability is only restored by `reset_primary`: this call
                // may have started before another call's index failure
                self.lock().consecutive_failures = 0;

                Ok(StrategyOutcome {
                    output,
                    used_fallback: false,
                })
            }
            Err(error) => match self.record_failure(&error) {
                Degrade::Fallback => self.run_fallback(query, correlation_id).await,
                Degrade::Surface => Err(error),
            },
        }
    }

    /// Update health for a failed primary attempt and pick the next step
    fn record_failure(&self, error: &StrategyError) -> Degrade {
        let mut health = self.lock();
        health.last_failure_class = Some(error.class);

        match error.class {
            ErrorClass::Transient => {
                health.consecutive_failures = health.consecutive_failures.saturating_add(1);
                let failures = health.consecutive_failures;
                drop(health);

                if failures >= self.transient_threshold {
                    tracing::warn!(
                        consecutive_failures = failures,
                        error = %error,
                        "Primary strategy failing repeatedly, using fallback for this call"
                    );
                    metrics::counter!("kiosk_search_fallback_total", "reason" => "transient")
                        .increment(1);
                    Degrade::Fallback
                } else {
                    tracing::warn!(
                        consecutive_failures = failures,
                        error = %error,
                        "Primary strategy failed transiently"
                    );
                    Degrade::Surface
                }
            }
            ErrorClass::IndexFailure => {
                health.primary_available = false;
                drop(health);

                tracing::warn!(
                    error = %error,
                    "Full-text index unusable, disabling primary strategy until reset"
                );
                metrics::counter!("kiosk_search_fallback_total", "reason" => "index_failure")
                    .increment(1);
                Degrade::Fallback
            }
            ErrorClass::ValidationFailure | ErrorClass::RepositoryUnavailable => {
                drop(health);
                Degrade::Surface
            }
        }
    }

    async fn run_fallback(
        &self,
        query: &PreparedQuery,
        correlation_id: &CorrelationId,
    ) -> Result<StrategyOutcome, StrategyError> {
        let output = self.fallback.execute(query, correlation_id).await?;
        Ok(StrategyOutcome {
            output,
            used_fallback: true,
        })
    }
}
