//! Common utilities shared across the kiosk search crates
//!
//! Correlation ids for tying a query to its log lines and analytics event,
//! one-time environment bootstrap, and tracing subscriber setup.

pub mod init;
pub mod telemetry;

pub use init::initialize_environment;
pub use telemetry::{TelemetryError, init_tracing};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID for tracking a single query through strategies, logs and analytics
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Uuid::try_parse(id).map_or_else(|_| Self(Uuid::new_v4()), Self)
    }
}
