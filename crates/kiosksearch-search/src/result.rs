//! Uniform result shapes returned to the caller

use kiosksearch_data::{ContentRecord, ContentType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::query::SortBy;

/// One ranked hit, identical in shape for every content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Repository-assigned id, stable across calls
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    pub subtitle: String,
    pub thumbnail_ref: Option<String>,
    /// Non-negative; comparable across content types
    pub relevance_score: f64,
    /// The full source record
    pub payload: ContentRecord,
}

/// Outcome of a successful `submit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultSet {
    pub results: Vec<SearchResult>,
    /// Matches across every searched table, before paging
    pub total_count: u64,
    pub used_fallback: bool,
    pub elapsed_ms: u64,
    pub cache_hit: bool,
}

fn by_id(a: &SearchResult, b: &SearchResult) -> Ordering {
    a.id.cmp(&b.id).then_with(|| a.content_type.cmp(&b.content_type))
}

/// Sort merged results by `sort_by`, ties broken by id
pub fn sort_results(results: &mut [SearchResult], sort_by: SortBy) {
    match sort_by {
        SortBy::Relevance => results.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then_with(|| by_id(a, b))
        }),
        SortBy::Name => results.sort_by(|a, b| {
            a.payload
                .sort_name()
                .cmp(&b.payload.sort_name())
                .then_with(|| by_id(a, b))
        }),
        SortBy::Date => results.sort_by(|a, b| {
            let (ya, yb) = (a.payload.year(), b.payload.year());
            ya.is_none()
                .cmp(&yb.is_none())
                .then_with(|| yb.cmp(&ya))
                .then_with(|| by_id(a, b))
        }),
    }
}
