//! Structured error handling for the content repository
//!
//! Every failure carries the operation that produced it, and is classified so
//! the search layer can tell a flaky connection from a broken full-text index.

use std::fmt;
use thiserror::Error;

use crate::models::ContentType;
use crate::query::MatchKind;

/// Result type alias for database operations
pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

/// SQLite primary result codes we classify on (extended codes share the low byte)
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;
const SQLITE_CORRUPT: i64 = 11;

/// Coarse classification of a raw `sqlx::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlxFailure {
    Unavailable,
    Busy,
    Index,
    Other,
}

/// Database operation type for error context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseOperation {
    FetchRows {
        content_type: ContentType,
        kind: MatchKind,
    },
    CountRows {
        content_type: ContentType,
        kind: MatchKind,
    },
    RebuildIndex {
        content_type: ContentType,
    },
    InsertRecord {
        content_type: ContentType,
    },
    Connect,
    Migration,
}

impl fmt::Display for DatabaseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchRows { content_type, kind } => {
                write!(f, "fetch_rows(type={content_type}, match={kind:?})")
            }
            Self::CountRows { content_type, kind } => {
                write!(f, "count_rows(type={content_type}, match={kind:?})")
            }
            Self::RebuildIndex { content_type } => {
                write!(f, "rebuild_index(type={content_type})")
            }
            Self::InsertRecord { content_type } => {
                write!(f, "insert_record(type={content_type})")
            }
            Self::Connect => write!(f, "connect"),
            Self::Migration => write!(f, "migration"),
        }
    }
}

/// Content repository error with full context
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database could not be reached (pool closed, I/O failure, acquire timeout)
    #[error(
        "Content repository unavailable during '{operation}': {message} (correlation_id={correlation_id:?})"
    )]
    Unavailable {
        operation: Box<DatabaseOperation>,
        message: String,
        correlation_id: Option<String>,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// The database is busy or locked by the external writer
    #[error("Database busy during '{operation}': {message} (correlation_id={correlation_id:?})")]
    Busy {
        operation: Box<DatabaseOperation>,
        message: String,
        correlation_id: Option<String>,
        #[source]
        source: sqlx::Error,
    },

    /// The full-text index is missing, corrupt or rejected the match expression
    #[error(
        "Full-text index failure during '{operation}': {message} (correlation_id={correlation_id:?})"
    )]
    IndexFailure {
        operation: Box<DatabaseOperation>,
        message: String,
        correlation_id: Option<String>,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Query execution error
    #[error(
        "Query failed for operation '{operation}': {message} (correlation_id={correlation_id:?})"
    )]
    QueryFailed {
        operation: Box<DatabaseOperation>,
        message: String,
        correlation_id: Option<String>,
        #[source]
        source: sqlx::Error,
    },

    /// Migration error
    #[error("Database migration failed: {message}")]
    MigrationFailed {
        message: String,
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// Unexpected database state
    #[error(
        "Unexpected database state for operation '{operation}': {message} (correlation_id={correlation_id:?})"
    )]
    UnexpectedState {
        operation: Box<DatabaseOperation>,
        message: String,
        correlation_id: Option<String>,
    },
}

impl DatabaseError {
    /// Classify a `sqlx::Error` raised while running `operation`
    pub fn query_failed(
        operation: DatabaseOperation,
        source: sqlx::Error,
        correlation_id: Option<String>,
    ) -> Self {
        let message = source.to_string();
        let operation = Box::new(operation);

        match Self::classify(&source, &message) {
            SqlxFailure::Unavailable => Self::Unavailable {
                operation,
                message,
                correlation_id,
                source: Some(source),
            },
            SqlxFailure::Busy => Self::Busy {
                operation,
                message,
                correlation_id,
                source,
            },
            SqlxFailure::Index => Self::IndexFailure {
                operation,
                message,
                correlation_id,
                source: Some(source),
            },
            SqlxFailure::Other => Self::QueryFailed {
                operation,
                message,
                correlation_id,
                source,
            },
        }
    }

    fn classify(source: &sqlx::Error, message: &str) -> SqlxFailure {
        match source {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::WorkerCrashed => SqlxFailure::Unavailable,
            sqlx::Error::Database(db_err) => {
                let code = db_err
                    .code()
                    .and_then(|c| c.parse::<i64>().ok())
                    .map(|c| c & 0xff);

                match code {
                    Some(SQLITE_BUSY | SQLITE_LOCKED) => SqlxFailure::Busy,
                    Some(SQLITE_CORRUPT) => SqlxFailure::Index,
                    _ if Self::mentions_fulltext(message) => SqlxFailure::Index,
                    _ => SqlxFailure::Other,
                }
            }
            _ => SqlxFailure::Other,
        }
    }

    /// Whether an SQLite error message points at the FTS5 machinery
    fn mentions_fulltext(message: &str) -> bool {
        let lower = message.to_lowercase();
        lower.contains("fts5")
            || lower.contains("_fts")
            || lower.contains("malformed")
            || lower.contains("vtable")
            || lower.contains("unable to use function match")
    }

    /// Worth retrying: the repository may answer on the next attempt
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Busy { .. })
    }

    /// The full-text index itself is unusable
    pub const fn is_index_failure(&self) -> bool {
        matches!(self, Self::IndexFailure { .. })
    }

    /// Add correlation ID to existing error
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: String) -> Self {
        match &mut self {
            Self::Unavailable {
                correlation_id: id, ..
            }
            | Self::Busy {
                correlation_id: id, ..
            }
            | Self::IndexFailure {
                correlation_id: id, ..
            }
            | Self::QueryFailed {
                correlation_id: id, ..
            }
            | Self::UnexpectedState {
                correlation_id: id, ..
            } => {
                *id = Some(correlation_id);
            }
            Self::MigrationFailed { .. } => {
                // Migrations run before any query, nothing to correlate with
            }
        }
        self
    }

    /// Get the correlation ID if present
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Unavailable { correlation_id, .. }
            | Self::Busy { correlation_id, .. }
            | Self::IndexFailure { correlation_id, .. }
            | Self::QueryFailed { correlation_id, .. }
            | Self::UnexpectedState { correlation_id, .. } => correlation_id.as_deref(),
            Self::MigrationFailed { .. } => None,
        }
    }
}

/// Extension trait for converting sqlx errors with context
#[allow(clippy::result_large_err)]
pub trait DatabaseErrorExt<T> {
    /// Convert to `DatabaseError` with operation context
    ///
    /// # Errors
    /// Returns the classified `DatabaseError`
    fn map_db_err(
        self,
        operation: DatabaseOperation,
        correlation_id: Option<String>,
    ) -> DatabaseResult<T>;
}

impl<T> DatabaseErrorExt<T> for std::result::Result<T, sqlx::Error> {
    fn map_db_err(
        self,
        operation: DatabaseOperation,
        correlation_id: Option<String>,
    ) -> DatabaseResult<T> {
        self.map_err(|e| DatabaseError::query_failed(operation, e, correlation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_op() -> DatabaseOperation {
        DatabaseOperation::FetchRows {
            content_type: ContentType::Publication,
            kind: MatchKind::FullText,
        }
    }

    #[test]
    fn test_database_operation_display() {
        assert_eq!(
            fetch_op().to_string(),
            "fetch_rows(type=publication, match=FullText)"
        );
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = DatabaseError::query_failed(fetch_op(), sqlx::Error::PoolTimedOut, None);
        assert!(err.is_transient());
        assert!(!err.is_index_failure());
    }

    #[test]
    fn test_missing_row_is_neither_transient_nor_index() {
        let err = DatabaseError::query_failed(fetch_op(), sqlx::Error::RowNotFound, None);
        assert!(matches!(err, DatabaseError::QueryFailed { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_fulltext_messages_are_recognized() {
        assert!(DatabaseError::mentions_fulltext(
            "no such table: publications_fts"
        ));
        assert!(DatabaseError::mentions_fulltext("fts5: syntax error near \"\""));
        assert!(DatabaseError::mentions_fulltext(
            "database disk image is malformed"
        ));
        assert!(!DatabaseError::mentions_fulltext("no such column: foo"));
    }

    #[test]
    fn test_correlation_id_propagation() {
        let err = DatabaseError::UnexpectedState {
            operation: Box::new(fetch_op()),
            message: "boom".to_string(),
            correlation_id: None,
        };
        let err = err.with_correlation_id("abc-123".to_string());
        assert_eq!(err.correlation_id(), Some("abc-123"));
    }
}
