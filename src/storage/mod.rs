//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - lists(id, list_type, component_label, dialog_title, creation_date, modify_date)
//! - authors(id, name, list_name, rank, rating, source, ..., last_count, current_count)
//! - titles(id, title, author, list_name, media_type, ..., check_date, reckon_date, ...)
//! - comments(id, item_type, item_id, text)

pub mod schema;
pub mod pool;
pub mod sqlite;
pub mod table;
pub mod lists;
pub mod authors;
pub mod titles;
pub mod comments;
pub mod reconcile;
pub mod dump;

pub use pool::{GeneratedKeys, PoolStats, PooledStatement, StatementPool, Ticket};
pub use sqlite::Session;
pub use table::{Table, TableName};
pub use lists::ListTable;
pub use authors::AuthorTable;
pub use titles::TitleTable;
pub use comments::CommentTable;
pub use reconcile::SyncReport;

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct DbStats {
    pub lists: usize,
    pub authors: usize,
    pub titles: usize,
    pub comments: usize,
}
