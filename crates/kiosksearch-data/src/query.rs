//! Typed predicates executed against a single content table
//!
//! A `ContentQuery` is the repository's unit of work: one table, one text
//! predicate, a set of AND-combined column filters, an ordering and an
//! optional row cap. The SQLite repository renders it to SQL; the mock
//! repository evaluates it in memory.

use crate::models::{ContentRecord, ContentType};

/// How the query text is matched against a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// No text predicate; every row passing the filters matches
    All,
    /// Full-text index lookup; every term must match a word prefix
    FullText(Vec<String>),
    /// Case-insensitive substring scan over the searchable columns
    Substring(String),
}

impl TextMatch {
    pub const fn kind(&self) -> MatchKind {
        match self {
            Self::All => MatchKind::All,
            Self::FullText(_) => MatchKind::FullText,
            Self::Substring(_) => MatchKind::Substring,
        }
    }
}

/// Discriminant of [`TextMatch`], used for call accounting and scripted failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    All,
    FullText,
    Substring,
}

/// Column filters; all present fields must hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Inclusive lower bound on the record year
    pub year_min: Option<i32>,
    /// Inclusive upper bound on the record year
    pub year_max: Option<i32>,
    /// Only publications carry a publication type
    pub publication_type: Option<String>,
    /// Only staff records carry a department
    pub department: Option<String>,
}

impl RecordFilter {
    /// Whether rows of `content_type` can satisfy these filters at all
    pub const fn admits(&self, content_type: ContentType) -> bool {
        let type_ok = match content_type {
            ContentType::Publication => self.department.is_none(),
            ContentType::StaffRecord => self.publication_type.is_none(),
            ContentType::Person | ContentType::Image => {
                self.publication_type.is_none() && self.department.is_none()
            }
        };
        let range_ok = match (self.year_min, self.year_max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };
        type_ok && range_ok
    }

    pub const fn has_year_bounds(&self) -> bool {
        self.year_min.is_some() || self.year_max.is_some()
    }

    /// Evaluate the filters against a record
    pub fn matches(&self, record: &ContentRecord) -> bool {
        if !self.admits(record.content_type()) {
            return false;
        }

        if self.has_year_bounds() {
            let Some(year) = record.year() else {
                return false;
            };
            if self.year_min.is_some_and(|min| year < min)
                || self.year_max.is_some_and(|max| year > max)
            {
                return false;
            }
        }

        if let Some(wanted) = &self.publication_type {
            let ContentRecord::Publication(p) = record else {
                return false;
            };
            if !p
                .publication_type
                .as_deref()
                .is_some_and(|t| t.to_lowercase() == wanted.to_lowercase())
            {
                return false;
            }
        }

        if let Some(wanted) = &self.department {
            let ContentRecord::StaffRecord(s) = record else {
                return false;
            };
            if !s
                .department
                .as_deref()
                .is_some_and(|d| d.to_lowercase() == wanted.to_lowercase())
            {
                return false;
            }
        }

        true
    }
}

/// Row ordering requested from the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Best full-text rank first (falls back to id for unranked matches)
    Rank,
    /// Alphabetical by sort name
    Name,
    /// Most recent year first, undated rows last
    YearDesc,
    /// Stable id order
    Id,
}

/// One table's worth of work for the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub content_type: ContentType,
    pub text: TextMatch,
    pub filter: RecordFilter,
    pub order: RowOrder,
    /// Maximum rows to return; `None` returns every match
    pub limit: Option<usize>,
    /// Lowercased phrase whose exact-title matches lead a full-text rank order
    pub exact_title: Option<String>,
}

impl ContentQuery {
    pub fn new(content_type: ContentType, text: TextMatch) -> Self {
        Self {
            content_type,
            text,
            filter: RecordFilter::default(),
            order: RowOrder::Id,
            limit: None,
            exact_title: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub const fn with_order(mut self, order: RowOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rank rows whose title equals `phrase` ahead of the index order
    ///
    /// Only applies to `RowOrder::Rank` over full-text terms.
    #[must_use]
    pub fn with_exact_title(mut self, phrase: impl Into<String>) -> Self {
        let phrase = phrase.into();
        self.exact_title = (!phrase.is_empty()).then_some(phrase);
        self
    }

    /// Whether `exact_title` takes part in the row order
    pub fn leads_with_exact_title(&self) -> bool {
        self.order == RowOrder::Rank
            && self.exact_title.is_some()
            && matches!(&self.text, TextMatch::FullText(terms) if !terms.is_empty())
    }

    /// False when the filters exclude this table outright
    pub const fn is_satisfiable(&self) -> bool {
        self.filter.admits(self.content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PublicationRecord, StaffRecord};

    fn publication(kind: &str, year: Option<i32>) -> ContentRecord {
        ContentRecord::Publication(PublicationRecord {
            id: "pub-1".to_string(),
            title: "Law Review".to_string(),
            authors: None,
            publication_type: Some(kind.to_string()),
            year,
            volume: None,
            issue: None,
            description: None,
            document_path: None,
            thumbnail_path: None,
        })
    }

    fn staff(department: &str) -> ContentRecord {
        ContentRecord::StaffRecord(StaffRecord {
            id: "s-1".to_string(),
            name: "Ana Ruiz".to_string(),
            position: Some("Professor".to_string()),
            department: Some(department.to_string()),
            start_year: Some(1999),
            end_year: None,
            bio: None,
            photo_path: None,
        })
    }

    #[test]
    fn test_department_filter_excludes_other_types() {
        let filter = RecordFilter {
            department: Some("Law".to_string()),
            ..RecordFilter::default()
        };

        assert!(filter.admits(ContentType::StaffRecord));
        assert!(!filter.admits(ContentType::Person));
        assert!(!filter.admits(ContentType::Publication));
        assert!(filter.matches(&staff("law")));
        assert!(!filter.matches(&staff("History")));
    }

    #[test]
    fn test_year_bounds_are_inclusive_and_reject_undated() {
        let filter = RecordFilter {
            year_min: Some(1990),
            year_max: Some(1999),
            ..RecordFilter::default()
        };

        assert!(filter.matches(&publication("journal", Some(1990))));
        assert!(filter.matches(&publication("journal", Some(1999))));
        assert!(!filter.matches(&publication("journal", Some(2000))));
        assert!(!filter.matches(&publication("journal", None)));
    }

    #[test]
    fn test_inverted_year_range_is_unsatisfiable() {
        let query = ContentQuery::new(ContentType::Image, TextMatch::All).with_filter(
            RecordFilter {
                year_min: Some(2000),
                year_max: Some(1990),
                ..RecordFilter::default()
            },
        );
        assert!(!query.is_satisfiable());
    }

    #[test]
    fn test_publication_type_is_case_insensitive() {
        let filter = RecordFilter {
            publication_type: Some("Law Review".to_string()),
            ..RecordFilter::default()
        };
        assert!(filter.matches(&publication("law review", None)));
        assert!(!filter.matches(&publication("yearbook", None)));
    }

    #[test]
    fn test_department_comparison_folds_accented_letters() {
        let filter = RecordFilter {
            department: Some("ADMINISTRACIÓN".to_string()),
            ..RecordFilter::default()
        };
        assert!(filter.matches(&staff("Administración")));
    }
}
