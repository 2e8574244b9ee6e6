//! Kiosk search orchestration crate
//!
//! Validates and normalizes queries, answers them from a time-boxed result
//! cache or from the content repository, and degrades from the full-text
//! strategy to a substring scan when the index misbehaves.

pub mod analytics;
pub mod cache;
pub mod clock;
pub mod debounce;
pub mod error;
pub mod formatter;
pub mod orchestrator;
pub mod query;
pub mod result;
pub mod retry;
pub mod sanitize;
pub mod strategy;

// Re-export main types
pub use analytics::{
    AnalyticsSink, ChannelAnalyticsSink, NoopAnalyticsSink, SearchEvent, TracingAnalyticsSink,
};
pub use cache::{CacheEntry, CacheKey, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::QueryDebouncer;
pub use error::{ErrorClass, SearchError, StrategyError, ValidationError};
pub use orchestrator::{QueryOrchestrator, QueryOrchestratorBuilder};
pub use query::{FilterSet, PreparedQuery, QueryOptions, SearchQuery, SortBy, YearRange};
pub use result::{SearchResult, SearchResultSet};
pub use retry::{Backoff, RetryPolicy};
pub use sanitize::SanitizedText;
pub use strategy::{
    FallbackStrategy, PrimaryStrategy, SearchStrategy, StrategyHealth, StrategyKind,
    StrategyOutcome, StrategyOutput, StrategySelector,
};
