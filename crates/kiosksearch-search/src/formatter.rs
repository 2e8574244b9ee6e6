//! Relevance formatting: repository rows to uniform, comparable results
//!
//! Scores are computed per content type so each table's `bm25` scale only
//! competes with itself. Within a type, every signal is normalized to
//! `[0, 1]` before weighting, so merged results are comparable.

use kiosksearch_data::{ContentRecord, ContentRow};

use crate::result::SearchResult;
use crate::sanitize::SanitizedText;

/// Score given to every substring match
///
/// Below the lowest score a full-text match can receive.
pub const FALLBACK_SCORE: f64 = 0.05;

/// Lowest score a full-text match can receive
pub const PRIMARY_FLOOR: f64 = 0.1;

const EXACT_TITLE_WEIGHT: f64 = 0.55;
const TEXT_RANK_WEIGHT: f64 = 0.35;
const TITLE_PREFIX_WEIGHT: f64 = 0.05;
const RECENCY_WEIGHT: f64 = 0.05;

fn join_parts(parts: &[Option<String>]) -> String {
    parts
        .iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Second display line, per content type
fn subtitle_of(record: &ContentRecord) -> String {
    match record {
        ContentRecord::Person(r) => join_parts(&[
            r.grad_year.map(|y| format!("Class of {y}")),
            r.class_role.clone(),
        ]),
        ContentRecord::Publication(r) => join_parts(&[
            r.publication_type.clone(),
            r.year.map(|y| y.to_string()),
            r.volume.as_ref().map(|v| format!("Vol. {v}")),
            r.issue.as_ref().map(|i| format!("No. {i}")),
        ]),
        ContentRecord::Image(r) => join_parts(&[r.collection.clone(), r.year.map(|y| y.to_string())]),
        ContentRecord::StaffRecord(r) => join_parts(&[r.position.clone(), r.department.clone()]),
    }
}

fn thumbnail_of(record: &ContentRecord) -> Option<String> {
    match record {
        ContentRecord::Person(r) => r.photo_file.clone(),
        ContentRecord::Publication(r) => r.thumbnail_path.clone(),
        ContentRecord::Image(r) => r.thumbnail_path.clone().or_else(|| r.image_path.clone()),
        ContentRecord::StaffRecord(r) => r.photo_path.clone(),
    }
}

/// Shape one record as a result with the given score
pub fn format(record: ContentRecord, relevance_score: f64) -> SearchResult {
    SearchResult {
        id: record.id().to_string(),
        content_type: record.content_type(),
        title: record.title(),
        subtitle: subtitle_of(&record),
        thumbnail_ref: thumbnail_of(&record),
        relevance_score,
        payload: record,
    }
}

/// Format full-text rows of ONE content type, scoring them in `[PRIMARY_FLOOR, 1]`
///
/// The composite weighs an exact title match highest, then the index rank
/// (divided by the batch maximum), then a title prefix match, then recency
/// (scaled across the batch's year span).
pub fn format_ranked(rows: Vec<ContentRow>, text: &SanitizedText) -> Vec<SearchResult> {
    let phrase = text.phrase();
    let max_rank = rows
        .iter()
        .filter_map(|r| r.rank)
        .filter(|r| r.is_finite() && *r > 0.0)
        .fold(0.0_f64, f64::max);
    let years = rows.iter().filter_map(|r| r.record.year());
    let (min_year, max_year) = years.fold((i32::MAX, i32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));

    rows.into_iter()
        .map(|row| {
            let title = row.record.title().to_lowercase();
            let exact = !phrase.is_empty() && title == phrase;
            let prefix = !phrase.is_empty() && title.starts_with(&phrase);

            let text_norm = match row.rank {
                Some(rank) if max_rank > 0.0 && rank.is_finite() => (rank / max_rank).clamp(0.0, 1.0),
                _ => 0.0,
            };

            let recency = row.record.year().map_or(0.0, |year| {
                if max_year > min_year {
                    f64::from(year.saturating_sub(min_year)) / f64::from(max_year.saturating_sub(min_year))
                } else {
                    1.0
                }
            });

            let composite = EXACT_TITLE_WEIGHT * f64::from(u8::from(exact))
                + TEXT_RANK_WEIGHT * text_norm
                + TITLE_PREFIX_WEIGHT * f64::from(u8::from(prefix))
                + RECENCY_WEIGHT * recency;

            format(row.record, PRIMARY_FLOOR + (1.0 - PRIMARY_FLOOR) * composite)
        })
        .collect()
}

/// Format substring rows with the uniform fallback score
pub fn format_unranked(rows: Vec<ContentRow>) -> Vec<SearchResult> {
    rows.into_iter()
        .map(|row| format(row.record, FALLBACK_SCORE))
        .collect()
}
