//! Integration tests for the SQLite/FTS5 content repository
//!
//! Each test runs the real migrations against a fresh in-memory database.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use kiosksearch_data::{
    ContentQuery, ContentRecord, ContentRepository, ContentType, ImageRecord, MatchKind,
    PersonRecord, PublicationRecord, RecordFilter, RowOrder, SqliteContentRepository, StaffRecord,
    TextMatch, create_memory_pool, run_migrations,
};

fn person(id: &str, first: &str, last: &str, year: i32) -> ContentRecord {
    ContentRecord::Person(PersonRecord {
        id: id.to_string(),
        first_name: first.to_string(),
        middle_name: None,
        last_name: last.to_string(),
        class_role: Some("Graduate".to_string()),
        grad_year: Some(year),
        grad_date: None,
        photo_file: None,
    })
}

fn publication(id: &str, title: &str, kind: &str, year: Option<i32>) -> ContentRecord {
    ContentRecord::Publication(PublicationRecord {
        id: id.to_string(),
        title: title.to_string(),
        authors: Some("Editorial Board".to_string()),
        publication_type: Some(kind.to_string()),
        year,
        volume: None,
        issue: None,
        description: Some("Quarterly journal of the school".to_string()),
        document_path: None,
        thumbnail_path: Some(format!("/thumbs/{id}.jpg")),
    })
}

async fn seeded_repository() -> SqliteContentRepository {
    let pool = create_memory_pool().await.expect("in-memory pool");
    run_migrations(&pool).await.expect("migrations");
    let repo = SqliteContentRepository::new(pool);

    let records = vec![
        person("p-1", "Maria", "Castilla", 1987),
        person("p-2", "Jose", "Castillo", 1994),
        person("p-3", "Ana", "Ruiz", 2003),
        publication("pub-1", "Law Review", "law review", Some(1995)),
        publication("pub-2", "Law Review Annual", "law review", Some(2010)),
        publication("pub-3", "Yearbook", "yearbook", None),
        ContentRecord::Image(ImageRecord {
            id: "img-1".to_string(),
            title: "Castilla Hall".to_string(),
            collection: Some("Campus".to_string()),
            description: None,
            year: Some(1960),
            image_path: Some("/images/hall.jpg".to_string()),
            thumbnail_path: None,
        }),
        ContentRecord::StaffRecord(StaffRecord {
            id: "s-1".to_string(),
            name: "Elena Torres".to_string(),
            position: Some("Professor".to_string()),
            department: Some("Law".to_string()),
            start_year: Some(1999),
            end_year: None,
            bio: Some("Longtime faculty member".to_string()),
            photo_path: None,
        }),
    ];
    for record in &records {
        repo.insert_record(record).await.expect("insert");
    }
    repo
}

fn ids(rows: &[kiosksearch_data::ContentRow]) -> Vec<&str> {
    rows.iter().map(|r| r.record.id()).collect()
}

#[tokio::test]
async fn test_full_text_prefix_search_ranks_rows() {
    let repo = seeded_repository().await;
    let query = ContentQuery::new(
        ContentType::Person,
        TextMatch::FullText(vec!["castil".to_string()]),
    )
    .with_order(RowOrder::Rank);

    let rows = repo.fetch(&query).await.unwrap();
    let mut found = ids(&rows);
    found.sort_unstable();
    assert_eq!(found, vec!["p-1", "p-2"]);
    assert!(rows.iter().all(|r| r.rank.is_some_and(|rank| rank > 0.0)));
}

#[tokio::test]
async fn test_full_text_terms_are_and_combined() {
    let repo = seeded_repository().await;
    let query = ContentQuery::new(
        ContentType::Publication,
        TextMatch::FullText(vec!["law".to_string(), "annual".to_string()]),
    );

    let rows = repo.fetch(&query).await.unwrap();
    assert_eq!(ids(&rows), vec!["pub-2"]);
}

#[tokio::test]
async fn test_substring_scan_matches_inside_words() {
    let repo = seeded_repository().await;
    let query = ContentQuery::new(
        ContentType::StaffRecord,
        TextMatch::Substring("FACULTY".to_string()),
    );

    let rows = repo.fetch(&query).await.unwrap();
    assert_eq!(ids(&rows), vec!["s-1"]);
    assert_eq!(rows[0].rank, None);
}

#[tokio::test]
async fn test_filters_and_year_ordering() {
    let repo = seeded_repository().await;
    let query = ContentQuery::new(ContentType::Publication, TextMatch::All)
        .with_filter(RecordFilter {
            publication_type: Some("Law Review".to_string()),
            ..RecordFilter::default()
        })
        .with_order(RowOrder::YearDesc);

    assert_eq!(ids(&repo.fetch(&query).await.unwrap()), vec!["pub-2", "pub-1"]);

    let undated_last = ContentQuery::new(ContentType::Publication, TextMatch::All)
        .with_order(RowOrder::YearDesc);
    assert_eq!(
        ids(&repo.fetch(&undated_last).await.unwrap()),
        vec!["pub-2", "pub-1", "pub-3"]
    );

    let in_nineties = ContentQuery::new(ContentType::Publication, TextMatch::All).with_filter(
        RecordFilter {
            year_min: Some(1990),
            year_max: Some(1999),
            ..RecordFilter::default()
        },
    );
    assert_eq!(ids(&repo.fetch(&in_nineties).await.unwrap()), vec!["pub-1"]);
}

#[tokio::test]
async fn test_name_order_sorts_people_by_surname() {
    let repo = seeded_repository().await;
    let query = ContentQuery::new(ContentType::Person, TextMatch::All).with_order(RowOrder::Name);

    assert_eq!(
        ids(&repo.fetch(&query).await.unwrap()),
        vec!["p-1", "p-2", "p-3"]
    );
}

#[tokio::test]
async fn test_count_ignores_limit() {
    let repo = seeded_repository().await;
    let query = ContentQuery::new(ContentType::Person, TextMatch::All).with_limit(1);

    assert_eq!(repo.fetch(&query).await.unwrap().len(), 1);
    assert_eq!(repo.count(&query).await.unwrap(), 3);
}

#[tokio::test]
async fn test_unsatisfiable_filter_returns_nothing() {
    let repo = seeded_repository().await;
    let query = ContentQuery::new(ContentType::Image, TextMatch::All).with_filter(RecordFilter {
        department: Some("Law".to_string()),
        ..RecordFilter::default()
    });

    assert!(repo.fetch(&query).await.unwrap().is_empty());
    assert_eq!(repo.count(&query).await.unwrap(), 0);
}

#[tokio::test]
async fn test_dropped_index_is_classified_as_index_failure() {
    let repo = seeded_repository().await;
    sqlx::query("DROP TABLE publications_fts")
        .execute(repo.pool())
        .await
        .unwrap();

    let fts = ContentQuery::new(
        ContentType::Publication,
        TextMatch::FullText(vec!["law".to_string()]),
    );
    let err = repo.fetch(&fts).await.unwrap_err();
    assert!(err.is_index_failure(), "unexpected error: {err}");
    assert!(!err.is_transient());

    // The base table still answers substring scans
    let scan = ContentQuery::new(ContentType::Publication, TextMatch::Substring("law".to_string()));
    assert_eq!(repo.fetch(&scan).await.unwrap().len(), 2);
    assert_eq!(scan.text.kind(), MatchKind::Substring);
}

#[tokio::test]
async fn test_rebuild_index_keeps_search_working() {
    let repo = seeded_repository().await;
    repo.rebuild_index().await.unwrap();

    let query = ContentQuery::new(
        ContentType::Image,
        TextMatch::FullText(vec!["hall".to_string()]),
    );
    assert_eq!(ids(&repo.fetch(&query).await.unwrap()), vec!["img-1"]);
}

#[tokio::test]
async fn test_substring_scan_folds_accented_capitals() {
    let repo = seeded_repository().await;
    repo.insert_record(&ContentRecord::Image(ImageRecord {
        id: "img-2".to_string(),
        title: "ÉCOLE NORMALE".to_string(),
        collection: Some("Campus".to_string()),
        description: None,
        year: Some(1921),
        image_path: None,
        thumbnail_path: None,
    }))
    .await
    .unwrap();

    let query = ContentQuery::new(ContentType::Image, TextMatch::Substring("école".to_string()));
    assert_eq!(ids(&repo.fetch(&query).await.unwrap()), vec!["img-2"]);
    assert_eq!(repo.count(&query).await.unwrap(), 1);
}

#[tokio::test]
async fn test_name_order_matches_record_sort_name_for_accented_surnames() {
    let repo = seeded_repository().await;
    repo.insert_record(&person("p-4", "Ángel", "ÁVILA", 1990))
        .await
        .unwrap();
    repo.insert_record(&person("p-5", "Beatriz", "Zamora", 1991))
        .await
        .unwrap();

    let query = ContentQuery::new(ContentType::Person, TextMatch::All).with_order(RowOrder::Name);
    let rows = repo.fetch(&query).await.unwrap();

    let mut expected: Vec<_> = rows.iter().map(|r| r.record.sort_name()).collect();
    expected.sort();
    let actual: Vec<_> = rows.iter().map(|r| r.record.sort_name()).collect();
    assert_eq!(actual, expected);
    assert_eq!(actual.last().map(String::as_str), Some("ávila, ángel"));
}

#[tokio::test]
async fn test_department_filter_folds_accented_capitals() {
    let repo = seeded_repository().await;
    repo.insert_record(&ContentRecord::StaffRecord(StaffRecord {
        id: "s-2".to_string(),
        name: "Irene Paz".to_string(),
        position: Some("Registrar".to_string()),
        department: Some("ADMINISTRACIÓN".to_string()),
        start_year: Some(2001),
        end_year: None,
        bio: None,
        photo_path: None,
    }))
    .await
    .unwrap();

    let query = ContentQuery::new(ContentType::StaffRecord, TextMatch::All).with_filter(
        RecordFilter {
            department: Some("administración".to_string()),
            ..RecordFilter::default()
        },
    );
    assert_eq!(ids(&repo.fetch(&query).await.unwrap()), vec!["s-2"]);
}

#[tokio::test]
async fn test_exact_title_leads_a_truncated_rank_window() {
    let repo = seeded_repository().await;
    for i in 0..5 {
        repo.insert_record(&publication(
            &format!("pub-law-{i}"),
            "Law Law Law",
            "journal",
            Some(2000 + i),
        ))
        .await
        .unwrap();
    }
    repo.insert_record(&ContentRecord::Publication(PublicationRecord {
        id: "pub-exact".to_string(),
        title: "LAW".to_string(),
        authors: None,
        publication_type: None,
        year: None,
        volume: None,
        issue: None,
        description: Some("Bound volumes of the student journal, 1950 to 1970".to_string()),
        document_path: None,
        thumbnail_path: None,
    }))
    .await
    .unwrap();

    let query = ContentQuery::new(
        ContentType::Publication,
        TextMatch::FullText(vec!["law".to_string()]),
    )
    .with_order(RowOrder::Rank)
    .with_limit(1)
    .with_exact_title("law");

    assert_eq!(ids(&repo.fetch(&query).await.unwrap()), vec!["pub-exact"]);
}
