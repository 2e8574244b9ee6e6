//! Kiosk content repository on a local SQLite database with FTS5 indexes

// Module declarations
pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod query;
pub mod repository;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// Public exports
pub use error::{DatabaseError, DatabaseErrorExt, DatabaseOperation, DatabaseResult};
pub use migrations::run_migrations;
pub use models::{
    ContentRecord, ContentRow, ContentType, ImageRecord, PersonRecord, PublicationRecord,
    StaffRecord, UnknownContentType,
};
pub use pool::{create_memory_pool, create_pool, initialize_database};
pub use query::{ContentQuery, MatchKind, RecordFilter, RowOrder, TextMatch};
pub use repository::{SqliteContentRepository, fts_expression};
pub use traits::ContentRepository;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockContentRepository, MockFailure};
