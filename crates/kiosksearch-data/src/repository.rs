//! SQLite content repository backed by FTS5 external-content indexes
//!
//! Each content type lives in its own table, shadowed by a `*_fts` virtual
//! table. Full-text queries join the index and rank with a per-type weighted
//! `bm25`; substring queries scan the base table only, so they keep working
//! when an index is damaged.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};

use crate::error::{DatabaseErrorExt, DatabaseOperation, DatabaseResult};
use crate::models::{
    ContentRecord, ContentRow, ContentType, ImageRecord, PersonRecord, PublicationRecord,
    StaffRecord,
};
use crate::query::{ContentQuery, RowOrder, TextMatch};
use crate::traits::ContentRepository;

/// Column alias carrying the full-text relevance
const RELEVANCE_COLUMN: &str = "relevance";

/// What a rendered query selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    Rows,
    Count,
}

/// `bm25` column weights, in FTS5 column order
const fn rank_weights(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Person => "2.0, 1.0, 3.0, 0.5",
        ContentType::Publication => "3.0, 1.5, 1.0",
        ContentType::Image => "3.0, 1.0, 1.0",
        ContentType::StaffRecord => "3.0, 1.5, 1.0, 0.5",
    }
}

/// Column that year filters and date ordering apply to
const fn year_column(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Person => "grad_year",
        ContentType::Publication | ContentType::Image => "year",
        ContentType::StaffRecord => "start_year",
    }
}

/// Render full-text terms as an FTS5 expression of quoted prefix terms
///
/// Terms are implicitly AND-ed; embedded quotes are doubled.
pub fn fts_expression(terms: &[String]) -> String {
    terms
        .iter()
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a `ContentQuery` to SQL
fn render(query: &ContentQuery, projection: Projection) -> QueryBuilder<'static, Sqlite> {
    let content_type = query.content_type;
    let table = content_type.table();
    let fts = content_type.fts_table();
    let terms = match &query.text {
        TextMatch::FullText(terms) if !terms.is_empty() => Some(terms),
        _ => None,
    };

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
    match projection {
        Projection::Rows => {
            if terms.is_some() {
                let weights = rank_weights(content_type);
                qb.push(format!(
                    "t.*, -bm25({fts}, {weights}) AS {RELEVANCE_COLUMN}"
                ));
            } else {
                qb.push(format!("t.*, NULL AS {RELEVANCE_COLUMN}"));
            }
        }
        Projection::Count => {
            qb.push("COUNT(*)");
        }
    }

    qb.push(format!(" FROM {table} AS t"));
    if terms.is_some() {
        qb.push(format!(" JOIN {fts} ON {fts}.rowid = t.rowid"));
    }
    qb.push(" WHERE 1 = 1");

    if let Some(terms) = terms {
        qb.push(format!(" AND {fts} MATCH "));
        qb.push_bind(fts_expression(terms));
    }

    // Substring scans read the folded key only, never the index
    if let TextMatch::Substring(needle) = &query.text {
        if !needle.is_empty() {
            qb.push(" AND instr(t.search_key, ");
            qb.push_bind(needle.to_lowercase());
            qb.push(") > 0");
        }
    }

    let year = year_column(content_type);
    if let Some(min) = query.filter.year_min {
        qb.push(format!(" AND t.{year} >= "));
        qb.push_bind(min);
    }
    if let Some(max) = query.filter.year_max {
        qb.push(format!(" AND t.{year} <= "));
        qb.push_bind(max);
    }
    if let Some(kind) = &query.filter.publication_type {
        qb.push(" AND t.publication_type_key = ");
        qb.push_bind(kind.to_lowercase());
    }
    if let Some(department) = &query.filter.department {
        qb.push(" AND t.department_key = ");
        qb.push_bind(department.to_lowercase());
    }

    if projection == Projection::Rows {
        let order = match query.order {
            RowOrder::Rank if terms.is_some() => match &query.exact_title {
                Some(phrase) if query.leads_with_exact_title() => {
                    qb.push(" ORDER BY t.title_key = ");
                    qb.push_bind(phrase.to_lowercase());
                    format!(" DESC, {RELEVANCE_COLUMN} DESC, t.id")
                }
                _ => format!(" ORDER BY {RELEVANCE_COLUMN} DESC, t.id"),
            },
            RowOrder::Rank | RowOrder::Id => " ORDER BY t.id".to_string(),
            RowOrder::Name => " ORDER BY t.sort_key, t.id".to_string(),
            RowOrder::YearDesc => format!(" ORDER BY t.{year} IS NULL, t.{year} DESC, t.id"),
        };
        qb.push(order);

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
    }

    qb
}

/// Decode one row into the record type of its table
fn decode_row(content_type: ContentType, row: &SqliteRow) -> Result<ContentRow, sqlx::Error> {
    let record = match content_type {
        ContentType::Person => ContentRecord::Person(PersonRecord::from_row(row)?),
        ContentType::Publication => ContentRecord::Publication(PublicationRecord::from_row(row)?),
        ContentType::Image => ContentRecord::Image(ImageRecord::from_row(row)?),
        ContentType::StaffRecord => ContentRecord::StaffRecord(StaffRecord::from_row(row)?),
    };
    let rank: Option<f64> = row.try_get(RELEVANCE_COLUMN)?;
    Ok(ContentRow { record, rank })
}

/// Content repository over a local SQLite database
#[derive(Clone)]
pub struct SqliteContentRepository {
    pool: SqlitePool,
}

impl SqliteContentRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a record; the triggers keep its index in step
    ///
    /// The folded search and sort keys are computed here.
    ///
    /// # Errors
    /// Returns a classified `DatabaseError` when the write fails
    pub async fn insert_record(&self, record: &ContentRecord) -> DatabaseResult<()> {
        let operation = DatabaseOperation::InsertRecord {
            content_type: record.content_type(),
        };

        let title_key = record.title().to_lowercase();
        let search_key = record.search_key();
        let sort_key = record.sort_name();

        let query = match record {
            ContentRecord::Person(r) => sqlx::query(
                r"
                INSERT INTO people
                    (id, first_name, middle_name, last_name, class_role, grad_year, grad_date, photo_file,
                     title_key, search_key, sort_key)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&r.id)
            .bind(&r.first_name)
            .bind(&r.middle_name)
            .bind(&r.last_name)
            .bind(&r.class_role)
            .bind(r.grad_year)
            .bind(&r.grad_date)
            .bind(&r.photo_file)
            .bind(&title_key)
            .bind(&search_key)
            .bind(&sort_key),
            ContentRecord::Publication(r) => sqlx::query(
                r"
                INSERT INTO publications
                    (id, title, authors, publication_type, year, volume, issue,
                     description, document_path, thumbnail_path,
                     publication_type_key, title_key, search_key, sort_key)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&r.id)
            .bind(&r.title)
            .bind(&r.authors)
            .bind(&r.publication_type)
            .bind(r.year)
            .bind(&r.volume)
            .bind(&r.issue)
            .bind(&r.description)
            .bind(&r.document_path)
            .bind(&r.thumbnail_path)
            .bind(r.publication_type.as_deref().map(str::to_lowercase))
            .bind(&title_key)
            .bind(&search_key)
            .bind(&sort_key),
            ContentRecord::Image(r) => sqlx::query(
                r"
                INSERT INTO images
                    (id, title, collection, description, year, image_path, thumbnail_path,
                     title_key, search_key, sort_key)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&r.id)
            .bind(&r.title)
            .bind(&r.collection)
            .bind(&r.description)
            .bind(r.year)
            .bind(&r.image_path)
            .bind(&r.thumbnail_path)
            .bind(&title_key)
            .bind(&search_key)
            .bind(&sort_key),
            ContentRecord::StaffRecord(r) => sqlx::query(
                r"
                INSERT INTO staff
                    (id, name, position, department, start_year, end_year, bio, photo_path,
                     department_key, title_key, search_key, sort_key)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&r.id)
            .bind(&r.name)
            .bind(&r.position)
            .bind(&r.department)
            .bind(r.start_year)
            .bind(r.end_year)
            .bind(&r.bio)
            .bind(&r.photo_path)
            .bind(r.department.as_deref().map(str::to_lowercase))
            .bind(&title_key)
            .bind(&search_key)
            .bind(&sort_key),
        };

        query
            .execute(&self.pool)
            .await
            .map_db_err(operation, None)?;
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for SqliteContentRepository {
    async fn fetch(&self, query: &ContentQuery) -> DatabaseResult<Vec<ContentRow>> {
        if !query.is_satisfiable() {
            return Ok(Vec::new());
        }

        let operation = DatabaseOperation::FetchRows {
            content_type: query.content_type,
            kind: query.text.kind(),
        };

        let mut qb = render(query, Projection::Rows);
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_db_err(operation.clone(), None)?;

        rows.iter()
            .map(|row| decode_row(query.content_type, row))
            .collect::<Result<Vec<_>, _>>()
            .map_db_err(operation, None)
    }

    async fn count(&self, query: &ContentQuery) -> DatabaseResult<u64> {
        if !query.is_satisfiable() {
            return Ok(0);
        }

        let operation = DatabaseOperation::CountRows {
            content_type: query.content_type,
            kind: query.text.kind(),
        };

        let mut qb = render(query, Projection::Count);
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_db_err(operation, None)?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn rebuild_index(&self) -> DatabaseResult<()> {
        for content_type in ContentType::ALL {
            let fts = content_type.fts_table();
            let sql = format!("INSERT INTO {fts}({fts}) VALUES ('rebuild')");

            sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .map_db_err(DatabaseOperation::RebuildIndex { content_type }, None)?;

            tracing::info!(content_type = %content_type, "Rebuilt full-text index");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::RecordFilter;

    #[test]
    fn test_fts_expression_quotes_prefix_terms() {
        let terms = vec!["law".to_string(), "re\"view".to_string()];
        assert_eq!(fts_expression(&terms), "\"law\"* \"re\"\"view\"*");
    }

    #[test]
    fn test_full_text_render_joins_index() {
        let query = ContentQuery::new(
            ContentType::Publication,
            TextMatch::FullText(vec!["law".to_string()]),
        )
        .with_order(RowOrder::Rank)
        .with_limit(10);

        let sql = render(&query, Projection::Rows).into_sql();
        assert!(sql.contains("JOIN publications_fts ON publications_fts.rowid = t.rowid"));
        assert!(sql.contains("publications_fts MATCH ?"));
        assert!(sql.contains("-bm25(publications_fts, 3.0, 1.5, 1.0)"));
        assert!(sql.ends_with("ORDER BY relevance DESC, t.id LIMIT ?"));
    }

    #[test]
    fn test_exact_title_leads_rank_order() {
        let query = ContentQuery::new(
            ContentType::Image,
            TextMatch::FullText(vec!["castilla".to_string(), "hall".to_string()]),
        )
        .with_order(RowOrder::Rank)
        .with_exact_title("castilla hall");

        let sql = render(&query, Projection::Rows).into_sql();
        assert!(sql.ends_with("ORDER BY t.title_key = ? DESC, relevance DESC, t.id"));

        // Ignored outside full-text rank ordering
        let by_name = query.clone().with_order(RowOrder::Name);
        assert!(
            render(&by_name, Projection::Rows)
                .into_sql()
                .ends_with("ORDER BY t.sort_key, t.id")
        );
    }

    #[test]
    fn test_substring_render_never_touches_index() {
        let query = ContentQuery::new(
            ContentType::StaffRecord,
            TextMatch::Substring("faculty".to_string()),
        )
        .with_filter(RecordFilter {
            department: Some("Law".to_string()),
            year_min: Some(1990),
            ..RecordFilter::default()
        });

        let sql = render(&query, Projection::Count).into_sql();
        assert!(!sql.contains("staff_fts"));
        assert!(sql.starts_with("SELECT COUNT(*) FROM staff AS t"));
        assert!(sql.contains("instr(t.search_key, ?) > 0"));
        assert!(sql.contains("t.start_year >= ?"));
        assert!(sql.contains("t.department_key = ?"));
        assert!(!sql.contains("ORDER BY"));
    }
}
