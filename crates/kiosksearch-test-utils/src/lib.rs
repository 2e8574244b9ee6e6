//! Shared test utilities for the kiosk search integration tests
//!
//! Provides a persistent Tokio runtime, a small catalogue of fixture records
//! covering every content type, and repositories pre-seeded with it.
//!
//! ## Usage
//!
//! In your test crate's `Cargo.toml`:
//! ```toml
//! [dev-dependencies]
//! kiosksearch-test-utils = { path = "../kiosksearch-test-utils" }
//! ```
//!
//! In your tests:
//! ```no_run
//! #[test]
//! fn my_integration_test() {
//!     kiosksearch_test_utils::get_test_runtime().block_on(async {
//!         let repository = kiosksearch_test_utils::seeded_mock();
//!         // ... test logic ...
//!     })
//! }
//! ```

use kiosksearch_config::SearchConfig;
use kiosksearch_data::{
    ContentRecord, ImageRecord, MockContentRepository, PersonRecord, PublicationRecord,
    SqliteContentRepository, StaffRecord, create_memory_pool, run_migrations,
};
use std::sync::OnceLock;

/// Shared Tokio runtime for tests that cannot use `#[tokio::test]`
static TEST_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Get the shared test runtime (creates on first call, reuses thereafter)
///
/// Workers default to the CPU count; override with `TEST_RUNTIME_WORKERS`.
///
/// # Panics
/// Panics if the runtime cannot be created
#[allow(clippy::expect_used)] // Test infrastructure - panic on init failure is acceptable
pub fn get_test_runtime() -> &'static tokio::runtime::Runtime {
    TEST_RUNTIME.get_or_init(|| {
        let workers = std::env::var("TEST_RUNTIME_WORKERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(std::num::NonZero::get)
                    .unwrap_or(4)
            });

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("test-runtime")
            .worker_threads(workers)
            .build()
            .expect("Failed to create test runtime")
    })
}

pub fn person(id: &str, first: &str, last: &str, role: &str, year: i32) -> ContentRecord {
    ContentRecord::Person(PersonRecord {
        id: id.to_string(),
        first_name: first.to_string(),
        middle_name: None,
        last_name: last.to_string(),
        class_role: Some(role.to_string()),
        grad_year: Some(year),
        grad_date: Some(format!("{year}-05-20")),
        photo_file: Some(format!("{id}.jpg")),
    })
}

pub fn publication(
    id: &str,
    title: &str,
    publication_type: &str,
    year: Option<i32>,
) -> ContentRecord {
    ContentRecord::Publication(PublicationRecord {
        id: id.to_string(),
        title: title.to_string(),
        authors: Some("Editorial Board".to_string()),
        publication_type: Some(publication_type.to_string()),
        year,
        volume: Some("12".to_string()),
        issue: Some("3".to_string()),
        description: Some(format!("{title} from the school archive")),
        document_path: Some(format!("/documents/{id}.pdf")),
        thumbnail_path: Some(format!("/thumbs/{id}.jpg")),
    })
}

pub fn image(id: &str, title: &str, collection: &str, year: Option<i32>) -> ContentRecord {
    ContentRecord::Image(ImageRecord {
        id: id.to_string(),
        title: title.to_string(),
        collection: Some(collection.to_string()),
        description: None,
        year,
        image_path: Some(format!("/images/{id}.jpg")),
        thumbnail_path: None,
    })
}

pub fn staff(id: &str, name: &str, position: &str, department: &str, start: i32) -> ContentRecord {
    ContentRecord::StaffRecord(StaffRecord {
        id: id.to_string(),
        name: name.to_string(),
        position: Some(position.to_string()),
        department: Some(department.to_string()),
        start_year: Some(start),
        end_year: None,
        bio: Some(format!("{name} joined the faculty in {start}")),
        photo_path: None,
    })
}

/// A small catalogue touching every content type
///
/// Designed around the canonical kiosk searches: "castilla" hits people and
/// an image, "law review" hits publications, "faculty" hits staff.
pub fn fixture_records() -> Vec<ContentRecord> {
    vec![
        person("p-1", "Maria", "Castilla", "Valedictorian", 1987),
        person("p-2", "Jose", "Castilla", "Graduate", 1994),
        person("p-3", "Ana", "Castillo", "Graduate", 2003),
        person("p-4", "Luis", "Ruiz", "Class President", 1972),
        publication("pub-1", "Law Review", "law review", Some(1995)),
        publication("pub-2", "Law Review Annual", "law review", Some(2010)),
        publication("pub-3", "Alumni Yearbook", "yearbook", Some(1987)),
        publication("pub-4", "Commencement Program", "program", None),
        image("img-1", "Castilla Hall", "Campus", Some(1960)),
        image("img-2", "Moot Court Finals", "Events", Some(1994)),
        staff("s-1", "Elena Torres", "Professor", "Law", 1999),
        staff("s-2", "Miguel Santos", "Dean", "Administration", 1985),
        staff("s-3", "Rosa Castilla", "Librarian", "Library", 2008),
    ]
}

/// Mock repository holding [`fixture_records`]
pub fn seeded_mock() -> MockContentRepository {
    MockContentRepository::with_records(fixture_records())
}

/// In-memory SQLite repository with migrations applied and [`fixture_records`] inserted
///
/// # Panics
/// Panics if the database cannot be created or seeded
#[allow(clippy::expect_used)] // Test infrastructure - panic on setup failure is acceptable
pub async fn seeded_sqlite() -> SqliteContentRepository {
    let pool = create_memory_pool()
        .await
        .expect("Failed to create in-memory pool");
    run_migrations(&pool).await.expect("Failed to run migrations");

    let repository = SqliteContentRepository::new(pool);
    for record in fixture_records() {
        repository
            .insert_record(&record)
            .await
            .expect("Failed to insert fixture record");
    }
    repository
}

/// Default configuration, independent of the environment the tests run in
pub fn test_config() -> SearchConfig {
    SearchConfig::default()
}
