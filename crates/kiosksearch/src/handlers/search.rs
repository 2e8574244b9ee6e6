//! `search` subcommand

use clap::Args;
use kiosksearch_config::SearchConfig;
use kiosksearch_data::{ContentType, SqliteContentRepository, initialize_database};
use kiosksearch_search::{
    FilterSet, QueryOrchestrator, SearchError, SearchQuery, SortBy, TracingAnalyticsSink,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to search for; empty lists everything the filters allow
    #[arg(default_value = "")]
    text: String,

    /// Restrict to a content type (person, publication, image, staff); repeatable
    #[arg(long = "type", value_name = "TYPE")]
    types: Vec<ContentType>,

    /// Earliest year, inclusive
    #[arg(long)]
    year_min: Option<i32>,

    /// Latest year, inclusive
    #[arg(long)]
    year_max: Option<i32>,

    /// Decade such as "1990s"
    #[arg(long)]
    decade: Option<String>,

    /// Publication type, e.g. "law review"
    #[arg(long)]
    publication_type: Option<String>,

    /// Staff department
    #[arg(long)]
    department: Option<String>,

    /// Page size (configured default when omitted)
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// relevance, name or date
    #[arg(long, default_value_t = SortBy::Relevance)]
    sort: SortBy,
}

impl SearchArgs {
    fn into_query(self) -> SearchQuery {
        let mut filters = FilterSet {
            categories: self.types.into_iter().collect(),
            decade: self.decade,
            publication_type: self.publication_type,
            department: self.department,
            ..FilterSet::default()
        };
        filters = match (self.year_min, self.year_max) {
            (None, None) => filters,
            (min, max) => filters.with_year_range(min.unwrap_or(i32::MIN), max.unwrap_or(i32::MAX)),
        };

        let mut query = SearchQuery::new(self.text)
            .with_filters(filters)
            .with_offset(self.offset)
            .with_sort(self.sort);
        if let Some(limit) = self.limit {
            query = query.with_limit(limit);
        }
        query
    }
}

/// Run one query and print the result set as JSON
pub async fn run(args: SearchArgs, config: SearchConfig) -> anyhow::Result<()> {
    let pool = initialize_database(&config.repository).await?;
    let orchestrator = QueryOrchestrator::builder(Arc::new(SqliteContentRepository::new(pool)))
        .config(config)
        .analytics(Arc::new(TracingAnalyticsSink))
        .build();

    match orchestrator.submit(&args.into_query()).await {
        Ok(result_set) => {
            println!("{}", serde_json::to_string_pretty(&result_set)?);
            Ok(())
        }
        Err(error) => {
            if let SearchError::RetriesExhausted {
                last_known_good: Some(entry),
                ..
            } = &error
            {
                tracing::warn!("Showing stale results from an earlier search");
                println!("{}", serde_json::to_string_pretty(&entry.results)?);
            }
            Err(error.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        search: SearchArgs,
    }

    fn parse(args: &[&str]) -> SearchQuery {
        let mut argv = vec!["search"];
        argv.extend_from_slice(args);
        Harness::try_parse_from(argv).unwrap().search.into_query()
    }

    #[test]
    fn test_flags_map_onto_query() {
        let query = parse(&[
            "law review",
            "--type",
            "publication",
            "--type",
            "staff",
            "--decade",
            "1990s",
            "--limit",
            "10",
            "--sort",
            "date",
        ]);

        assert_eq!(query.text, "law review");
        assert!(query.filters.categories.contains(&ContentType::Publication));
        assert!(query.filters.categories.contains(&ContentType::StaffRecord));
        assert_eq!(query.filters.decade.as_deref(), Some("1990s"));
        assert_eq!(query.options.limit, Some(10));
        assert_eq!(query.options.sort_by, SortBy::Date);
    }

    #[test]
    fn test_open_ended_year_bound() {
        let query = parse(&["castilla", "--year-min", "1980"]);

        let range = query.filters.year_range.unwrap();
        assert_eq!(range.min, 1980);
        assert_eq!(range.max, i32::MAX);
    }

    #[test]
    fn test_defaults() {
        let query = parse(&[]);

        assert!(query.text.is_empty());
        assert!(query.filters.categories.is_empty());
        assert_eq!(query.options.limit, None);
        assert_eq!(query.options.sort_by, SortBy::Relevance);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(Harness::try_parse_from(["search", "x", "--type", "video"]).is_err());
    }
}
