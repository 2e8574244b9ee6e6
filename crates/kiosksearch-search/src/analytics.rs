//! Fire-and-forget analytics for completed queries
//!
//! Sinks must never block the caller and never fail a query; delivery
//! problems are logged and counted, then forgotten.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::ErrorClass;
use crate::query::FilterSet;

/// One completed `submit`, successful or not
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEvent {
    pub correlation_id: String,
    pub query: String,
    pub filters: FilterSet,
    pub result_count: usize,
    pub elapsed_ms: u64,
    pub used_fallback: bool,
    pub cache_hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
    pub at: DateTime<Utc>,
}

/// Destination for search events
pub trait AnalyticsSink: Send + Sync {
    /// Hand off an event without waiting
    fn record(&self, event: SearchEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalyticsSink;

impl AnalyticsSink for NoopAnalyticsSink {
    fn record(&self, _event: SearchEvent) {}
}

/// Emits each event as a structured log line on the `kiosk_search::analytics` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalyticsSink;

impl AnalyticsSink for TracingAnalyticsSink {
    fn record(&self, event: SearchEvent) {
        tracing::info!(
            target: "kiosk_search::analytics",
            correlation_id = %event.correlation_id,
            query = %event.query,
            categories = ?event.filters.categories,
            result_count = event.result_count,
            elapsed_ms = event.elapsed_ms,
            used_fallback = event.used_fallback,
            cache_hit = event.cache_hit,
            error_class = event.error_class.map(ErrorClass::as_str),
            "search completed"
        );
    }
}

/// Forwards events to a bounded channel; drops them when the consumer lags
#[derive(Debug, Clone)]
pub struct ChannelAnalyticsSink {
    sender: mpsc::Sender<SearchEvent>,
}

impl ChannelAnalyticsSink {
    pub const fn new(sender: mpsc::Sender<SearchEvent>) -> Self {
        Self { sender }
    }

    /// A sink and the receiver its events arrive on
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SearchEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }
}

impl AnalyticsSink for ChannelAnalyticsSink {
    fn record(&self, event: SearchEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                metrics::counter!("kiosk_search_analytics_dropped_total", "reason" => "full")
                    .increment(1);
                tracing::debug!(correlation_id = %event.correlation_id, "Analytics channel full, event dropped");
            }
            Err(TrySendError::Closed(event)) => {
                metrics::counter!("kiosk_search_analytics_dropped_total", "reason" => "closed")
                    .increment(1);
                tracing::debug!(correlation_id = %event.correlation_id, "Analytics channel closed, event dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(query: &str) -> SearchEvent {
        SearchEvent {
            correlation_id: "c-1".to_string(),
            query: query.to_string(),
            filters: FilterSet::default(),
            result_count: 3,
            elapsed_ms: 12,
            used_fallback: false,
            cache_hit: false,
            error_class: None,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_events() {
        let (sink, mut receiver) = ChannelAnalyticsSink::channel(4);
        sink.record(event("castilla"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.query, "castilla");
    }

    #[test]
    fn test_channel_sink_drops_when_full_or_closed() {
        let (sink, receiver) = ChannelAnalyticsSink::channel(1);
        sink.record(event("first"));
        sink.record(event("dropped"));

        drop(receiver);
        sink.record(event("closed"));
    }

    #[test]
    fn test_event_serialization_omits_missing_error_class() {
        let json = serde_json::to_value(event("law")).unwrap();
        assert!(json.get("error_class").is_none());
        assert_eq!(json["result_count"], 3);

        let mut failed = event("law");
        failed.error_class = Some(ErrorClass::ValidationFailure);
        let json = serde_json::to_value(failed).unwrap();
        assert_eq!(json["error_class"], "validation_failure");
    }
}
