//! Error taxonomy for the search core
//!
//! Strategies report a [`StrategyError`] tagged with an [`ErrorClass`]; the
//! selector and orchestrator decide between retry, fallback and surfacing
//! based on that class alone. Callers only ever see [`SearchError`].

use kiosksearch_common::CorrelationId;
use kiosksearch_data::DatabaseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::CacheEntry;

/// The four classes that drive retry vs fallback vs surfacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Timeout or momentary unavailability; safe to retry
    Transient,
    /// The full-text index itself is unusable
    IndexFailure,
    /// The input violates the query contract
    ValidationFailure,
    /// Even the substring scan could not reach the repository
    RepositoryUnavailable,
}

impl ErrorClass {
    /// Whether another attempt may succeed
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::IndexFailure => "index_failure",
            Self::ValidationFailure => "validation_failure",
            Self::RepositoryUnavailable => "repository_unavailable",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed strategy attempt
#[derive(Debug, Error)]
#[error("{class} failure: {message}")]
pub struct StrategyError {
    pub class: ErrorClass,
    pub message: String,
    #[source]
    pub source: Option<DatabaseError>,
}

impl StrategyError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            source: None,
        }
    }

    /// Classify a repository error raised by the full-text path
    ///
    /// Only an unusable index disables the strategy. Any other query error
    /// is treated like a connectivity problem: it counts toward the transient
    /// threshold and only affects the call that hit it.
    pub fn from_primary(error: DatabaseError) -> Self {
        let class = if error.is_index_failure() {
            ErrorClass::IndexFailure
        } else {
            ErrorClass::Transient
        };
        Self {
            class,
            message: error.to_string(),
            source: Some(error),
        }
    }

    /// Classify a repository error raised by the substring path
    pub fn from_fallback(error: DatabaseError) -> Self {
        Self {
            class: ErrorClass::RepositoryUnavailable,
            message: error.to_string(),
            source: Some(error),
        }
    }
}

/// Why a query was rejected before touching the repository
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query text is {length} characters, the maximum is {max}")]
    TextTooLong { length: usize, max: usize },

    #[error("year range {min}..{max} is inverted")]
    InvertedYearRange { min: i32, max: i32 },

    #[error("'{0}' is not a decade (expected e.g. \"1990s\")")]
    InvalidDecade(String),

    #[error("limit {limit} is outside 1..={max}")]
    InvalidLimit { limit: usize, max: usize },
}

/// Typed failure returned to the caller of `submit`
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid query: {reason} (correlation: {correlation_id})")]
    Validation {
        reason: ValidationError,
        correlation_id: CorrelationId,
    },

    #[error("Content repository unavailable: {message} (correlation: {correlation_id})")]
    RepositoryUnavailable {
        message: String,
        correlation_id: CorrelationId,
        #[source]
        source: Option<StrategyError>,
    },

    #[error("Search failed after {attempts} attempts: {last_error} (correlation: {correlation_id})")]
    RetriesExhausted {
        attempts: u32,
        correlation_id: CorrelationId,
        #[source]
        last_error: StrategyError,
        /// The newest cached result for the same query, even if expired
        last_known_good: Option<Arc<CacheEntry>>,
    },

    #[error("Index maintenance failed: {message}")]
    Maintenance {
        message: String,
        #[source]
        source: DatabaseError,
    },
}

impl SearchError {
    /// The class a caller should react to
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Validation { .. } => ErrorClass::ValidationFailure,
            Self::RepositoryUnavailable { .. } | Self::Maintenance { .. } => {
                ErrorClass::RepositoryUnavailable
            }
            Self::RetriesExhausted { last_error, .. } => last_error.class,
        }
    }

    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::Validation { correlation_id, .. }
            | Self::RepositoryUnavailable { correlation_id, .. }
            | Self::RetriesExhausted { correlation_id, .. } => Some(correlation_id),
            Self::Maintenance { .. } => None,
        }
    }

    /// Stale results the caller may keep showing alongside the error
    pub fn last_known_good(&self) -> Option<&CacheEntry> {
        match self {
            Self::RetriesExhausted {
                last_known_good, ..
            } => last_known_good.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosksearch_data::{ContentType, DatabaseOperation};

    fn operation() -> Box<DatabaseOperation> {
        Box::new(DatabaseOperation::FetchRows {
            content_type: ContentType::Publication,
            kind: kiosksearch_data::MatchKind::FullText,
        })
    }

    fn unavailable() -> DatabaseError {
        DatabaseError::Unavailable {
            operation: operation(),
            message: "pool timed out".to_string(),
            correlation_id: None,
            source: None,
        }
    }

    fn broken_index() -> DatabaseError {
        DatabaseError::IndexFailure {
            operation: operation(),
            message: "no such table: publications_fts".to_string(),
            correlation_id: None,
            source: None,
        }
    }

    fn undecodable_row() -> DatabaseError {
        DatabaseError::UnexpectedState {
            operation: operation(),
            message: "column year is not an integer".to_string(),
            correlation_id: None,
        }
    }

    #[test]
    fn test_primary_classification() {
        assert_eq!(
            StrategyError::from_primary(unavailable()).class,
            ErrorClass::Transient
        );
        assert_eq!(
            StrategyError::from_primary(broken_index()).class,
            ErrorClass::IndexFailure
        );
    }

    #[test]
    fn test_unrelated_query_errors_do_not_blame_the_index() {
        assert_eq!(
            StrategyError::from_primary(undecodable_row()).class,
            ErrorClass::Transient
        );
    }

    #[test]
    fn test_fallback_errors_are_always_unavailability() {
        assert_eq!(
            StrategyError::from_fallback(unavailable()).class,
            ErrorClass::RepositoryUnavailable
        );
        assert_eq!(
            StrategyError::from_fallback(broken_index()).class,
            ErrorClass::RepositoryUnavailable
        );
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ErrorClass::Transient.is_retryable());
        assert!(!ErrorClass::IndexFailure.is_retryable());
        assert!(!ErrorClass::ValidationFailure.is_retryable());
        assert!(!ErrorClass::RepositoryUnavailable.is_retryable());
    }

    #[test]
    fn test_search_error_class_follows_last_error() {
        let err = SearchError::RetriesExhausted {
            attempts: 3,
            correlation_id: CorrelationId::new(),
            last_error: StrategyError::new(ErrorClass::Transient, "timeout"),
            last_known_good: None,
        };
        assert_eq!(err.class(), ErrorClass::Transient);
        assert!(err.last_known_good().is_none());
    }
}
