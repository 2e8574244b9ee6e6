//! Caller-facing query model and its validated, resolved form

use kiosksearch_config::QueryConfig;
use kiosksearch_data::{ContentType, RecordFilter, RowOrder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::sanitize::SanitizedText;

/// Result ordering requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    Name,
    Date,
}

impl SortBy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Name => "name",
            Self::Date => "date",
        }
    }

    /// Per-table row order that agrees with the merged order
    pub const fn row_order(self) -> RowOrder {
        match self {
            Self::Relevance => RowOrder::Rank,
            Self::Name => RowOrder::Name,
            Self::Date => RowOrder::YearDesc,
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "name" => Ok(Self::Name),
            "date" | "year" => Ok(Self::Date),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Inclusive year bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

/// AND-combined structured filters
///
/// An empty `categories` set means every content type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub categories: BTreeSet<ContentType>,
    #[serde(default)]
    pub year_range: Option<YearRange>,
    /// e.g. `"1990s"`
    #[serde(default)]
    pub decade: Option<String>,
    #[serde(default)]
    pub publication_type: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl FilterSet {
    #[must_use]
    pub fn with_category(mut self, content_type: ContentType) -> Self {
        self.categories.insert(content_type);
        self
    }

    #[must_use]
    pub const fn with_year_range(mut self, min: i32, max: i32) -> Self {
        self.year_range = Some(YearRange { min, max });
        self
    }

    #[must_use]
    pub fn with_decade(mut self, decade: impl Into<String>) -> Self {
        self.decade = Some(decade.into());
        self
    }

    #[must_use]
    pub fn with_publication_type(mut self, publication_type: impl Into<String>) -> Self {
        self.publication_type = Some(publication_type.into());
        self
    }

    #[must_use]
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

/// Paging and ordering options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Page size; `None` uses the configured default
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub sort_by: SortBy,
}

/// An immutable query as submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub options: QueryOptions,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.options.offset = offset;
        self
    }

    #[must_use]
    pub const fn with_sort(mut self, sort_by: SortBy) -> Self {
        self.options.sort_by = sort_by;
        self
    }
}

/// Parse `"1990s"`, `"1990's"` or `"1990"` into its inclusive year bounds
pub fn parse_decade(decade: &str) -> Result<YearRange, ValidationError> {
    let trimmed = decade.trim();
    let digits = trimmed
        .strip_suffix("'s")
        .or_else(|| trimmed.strip_suffix('s'))
        .unwrap_or(trimmed);

    let start: i32 = digits
        .parse()
        .map_err(|_| ValidationError::InvalidDecade(decade.to_string()))?;
    if !(0..=9990).contains(&start) || start % 10 != 0 {
        return Err(ValidationError::InvalidDecade(decade.to_string()));
    }

    Ok(YearRange {
        min: start,
        max: start.saturating_add(9),
    })
}

/// A validated query with every filter resolved to repository terms
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub text: SanitizedText,
    /// Content types to search, in fixed order
    pub categories: Vec<ContentType>,
    pub filter: RecordFilter,
    pub limit: usize,
    pub offset: usize,
    pub sort_by: SortBy,
}

impl PreparedQuery {
    /// Validate `query` against the configured contract and resolve its filters
    ///
    /// A decade and a year range are intersected; an empty intersection is
    /// valid and simply matches nothing.
    ///
    /// # Errors
    /// Returns the first contract violation found
    pub fn prepare(query: &SearchQuery, config: &QueryConfig) -> Result<Self, ValidationError> {
        let length = query.text.chars().count();
        if length > config.max_text_length {
            return Err(ValidationError::TextTooLong {
                length,
                max: config.max_text_length,
            });
        }

        let limit = query.options.limit.unwrap_or(config.default_limit);
        if limit == 0 || limit > config.max_limit {
            return Err(ValidationError::InvalidLimit {
                limit,
                max: config.max_limit,
            });
        }

        let filters = &query.filters;
        let mut year_min = None;
        let mut year_max = None;
        if let Some(range) = filters.year_range {
            if range.min > range.max {
                return Err(ValidationError::InvertedYearRange {
                    min: range.min,
                    max: range.max,
                });
            }
            year_min = Some(range.min);
            year_max = Some(range.max);
        }
        if let Some(decade) = &filters.decade {
            let bounds = parse_decade(decade)?;
            year_min = Some(year_min.map_or(bounds.min, |min: i32| min.max(bounds.min)));
            year_max = Some(year_max.map_or(bounds.max, |max: i32| max.min(bounds.max)));
        }

        let categories = if filters.categories.is_empty() {
            ContentType::ALL.to_vec()
        } else {
            filters.categories.iter().copied().collect()
        };

        Ok(Self {
            text: SanitizedText::parse(&query.text),
            categories,
            filter: RecordFilter {
                year_min,
                year_max,
                publication_type: normalized(filters.publication_type.as_deref()),
                department: normalized(filters.department.as_deref()),
            },
            limit,
            offset: query.options.offset,
            sort_by: query.options.sort_by,
        })
    }

    /// Rows each table must return so the merged page is exact
    pub const fn window(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

/// Trimmed and lowercased; blank means "no filter"
fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}
