//! In-memory implementation of `ContentRepository` for testing
//!
//! Evaluates `ContentQuery` predicates the same way the SQLite repository
//! renders them, and lets tests script failures per match kind.

// Allow test-specific patterns in mock implementation
#![allow(clippy::unwrap_used)] // Mocks can panic on lock poisoning
#![allow(clippy::expect_used)] // Test code can use expect
#![allow(clippy::arithmetic_side_effects)] // Test counters can overflow
#![allow(clippy::significant_drop_tightening)] // Mock locks don't need optimization

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{DatabaseError, DatabaseOperation, DatabaseResult};
use crate::models::{ContentRecord, ContentRow, ContentType};
use crate::query::{ContentQuery, MatchKind, RowOrder, TextMatch};
use crate::traits::ContentRepository;

/// A failure the mock returns instead of answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Momentary unavailability (retryable)
    Transient,
    /// The full-text index rejected the query
    Index,
    /// Any other query error
    Query,
}

// Type aliases to simplify complex types
type RecordList = Arc<Mutex<Vec<ContentRecord>>>;
type FailureScript = Arc<Mutex<HashMap<MatchKind, VecDeque<MockFailure>>>>;
type CallCounters = Arc<Mutex<HashMap<MatchKind, usize>>>;

/// Mock repository for testing
#[derive(Clone, Default)]
pub struct MockContentRepository {
    pub records: RecordList,

    // Behavior controls for testing
    failures: FailureScript,
    index_broken: Arc<AtomicBool>,
    unavailable: Arc<AtomicBool>,
    latency: Arc<Mutex<Option<Duration>>>,

    // Accounting
    calls: CallCounters,
    rebuilds: Arc<Mutex<usize>>,
}

impl MockContentRepository {
    /// Create an empty mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock repository holding `records`
    pub fn with_records(records: Vec<ContentRecord>) -> Self {
        let repo = Self::default();
        *repo.records.lock().unwrap() = records;
        repo
    }

    pub fn insert(&self, record: ContentRecord) {
        self.records.lock().unwrap().push(record);
    }

    /// Fail the next call of `kind` with `failure`
    ///
    /// Scripted failures queue up and are consumed one per call.
    pub fn fail_next(&self, kind: MatchKind, failure: MockFailure) {
        self.failures
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(failure);
    }

    /// Fail the next `times` calls of `kind` with `failure`
    pub fn fail_times(&self, kind: MatchKind, failure: MockFailure, times: usize) {
        for _ in 0..times {
            self.fail_next(kind, failure);
        }
    }

    /// Break every full-text index until `rebuild_index` runs
    pub fn break_index(&self) {
        self.index_broken.store(true, Ordering::SeqCst);
    }

    /// Make every call fail as if the database could not be reached
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Number of calls (fetch and count) made with `kind`
    pub fn calls(&self, kind: MatchKind) -> usize {
        self.calls.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }

    /// Number of calls made of any kind
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn rebuild_count(&self) -> usize {
        *self.rebuilds.lock().unwrap()
    }

    /// Record the call, then apply any configured failure
    async fn enter(&self, operation: DatabaseOperation, kind: MatchKind) -> DatabaseResult<()> {
        *self.calls.lock().unwrap().entry(kind).or_default() += 1;

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Self::error(operation, MockFailure::Transient));
        }

        let scripted = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        if let Some(failure) = scripted {
            return Err(Self::error(operation, failure));
        }

        if kind == MatchKind::FullText && self.index_broken.load(Ordering::SeqCst) {
            return Err(Self::error(operation, MockFailure::Index));
        }

        Ok(())
    }

    fn error(operation: DatabaseOperation, failure: MockFailure) -> DatabaseError {
        let operation = Box::new(operation);
        match failure {
            MockFailure::Transient => DatabaseError::Unavailable {
                operation,
                message: "mock repository unavailable".to_string(),
                correlation_id: None,
                source: None,
            },
            MockFailure::Index => DatabaseError::IndexFailure {
                operation,
                message: "mock full-text index is corrupt".to_string(),
                correlation_id: None,
                source: None,
            },
            MockFailure::Query => DatabaseError::UnexpectedState {
                operation,
                message: "mock query error".to_string(),
                correlation_id: None,
            },
        }
    }

    /// Evaluate `query` against the stored records, ignoring its limit
    fn evaluate(&self, query: &ContentQuery) -> Vec<ContentRow> {
        if !query.is_satisfiable() {
            return Vec::new();
        }

        let records = self.records.lock().unwrap();
        let mut rows: Vec<ContentRow> = records
            .iter()
            .filter(|r| r.content_type() == query.content_type)
            .filter(|r| query.filter.matches(r))
            .filter_map(|r| {
                text_rank(&query.text, r).map(|rank| ContentRow {
                    record: r.clone(),
                    rank,
                })
            })
            .collect();

        sort_rows(&mut rows, query.order);
        if query.leads_with_exact_title() {
            let phrase = query.exact_title.as_deref().unwrap_or_default().to_lowercase();
            // Stable: index order is kept within each group
            rows.sort_by_key(|row| row.record.title().to_lowercase() != phrase);
        }
        rows
    }
}

/// `None` when the record does not match; `Some(rank)` otherwise
#[allow(clippy::option_option)]
fn text_rank(text: &TextMatch, record: &ContentRecord) -> Option<Option<f64>> {
    match text {
        TextMatch::All => Some(None),
        TextMatch::FullText(terms) if terms.is_empty() => Some(None),
        TextMatch::FullText(terms) => {
            let tokens: Vec<String> = record
                .searchable_fields()
                .iter()
                .flat_map(|field| {
                    field
                        .split(|c: char| !c.is_alphanumeric())
                        .filter(|t| !t.is_empty())
                        .map(str::to_lowercase)
                        .collect::<Vec<_>>()
                })
                .collect();

            let mut hits = 0_usize;
            for term in terms {
                let term = term.to_lowercase();
                let matched = tokens.iter().filter(|t| t.starts_with(&term)).count();
                if matched == 0 {
                    return None;
                }
                hits += matched;
            }
            #[allow(clippy::cast_precision_loss)]
            Some(Some(hits as f64))
        }
        TextMatch::Substring(needle) => {
            let needle = needle.to_lowercase();
            record
                .searchable_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
                .then_some(None)
        }
    }
}

fn sort_rows(rows: &mut [ContentRow], order: RowOrder) {
    match order {
        RowOrder::Rank => rows.sort_by(|a, b| {
            b.rank
                .unwrap_or(0.0)
                .total_cmp(&a.rank.unwrap_or(0.0))
                .then_with(|| a.record.id().cmp(b.record.id()))
        }),
        RowOrder::Name => rows.sort_by(|a, b| {
            a.record
                .sort_name()
                .cmp(&b.record.sort_name())
                .then_with(|| a.record.id().cmp(b.record.id()))
        }),
        RowOrder::YearDesc => rows.sort_by(|a, b| {
            let (ya, yb) = (a.record.year(), b.record.year());
            ya.is_none()
                .cmp(&yb.is_none())
                .then_with(|| yb.cmp(&ya))
                .then_with(|| a.record.id().cmp(b.record.id()))
        }),
        RowOrder::Id => rows.sort_by(|a, b| a.record.id().cmp(b.record.id())),
    }
}

#[async_trait]
impl ContentRepository for MockContentRepository {
    async fn fetch(&self, query: &ContentQuery) -> DatabaseResult<Vec<ContentRow>> {
        let kind = query.text.kind();
        self.enter(
            DatabaseOperation::FetchRows {
                content_type: query.content_type,
                kind,
            },
            kind,
        )
        .await?;

        let mut rows = self.evaluate(query);
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn count(&self, query: &ContentQuery) -> DatabaseResult<u64> {
        let kind = query.text.kind();
        self.enter(
            DatabaseOperation::CountRows {
                content_type: query.content_type,
                kind,
            },
            kind,
        )
        .await?;

        Ok(self.evaluate(query).len() as u64)
    }

    async fn rebuild_index(&self) -> DatabaseResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Self::error(
                DatabaseOperation::RebuildIndex {
                    content_type: ContentType::Person,
                },
                MockFailure::Transient,
            ));
        }
        self.index_broken.store(false, Ordering::SeqCst);
        *self.rebuilds.lock().unwrap() += 1;
        Ok(())
    }
}
