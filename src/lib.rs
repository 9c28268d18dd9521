//! # Shelfmark - persistence layer for library lists
//!
//! Shelfmark stores library items (Titles and Authors) filed under named Lists,
//! each item carrying a mutable collection of free-text Comments.
//!
//! Shelfmark provides:
//! - Value-typed entities whose equality ignores row identity
//! - A statement pool reusing compiled SQL over a single SQLite connection
//! - One table manager per table with application-level referential integrity
//! - A comment reconciliation engine (insert new / update changed / delete removed)
//! - The [`DbServer`] facade composing all of the above

pub mod ident;
pub mod list;
pub mod author;
pub mod title;
pub mod comment;
pub mod storage;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use ident::{Identity, RowId};
pub use list::{List, ListType};
pub use author::Author;
pub use title::Title;
pub use comment::{Comment, Commented, ItemType};
pub use storage::{DbStats, SyncReport, TableName};
pub use server::DbServer;
pub use config::ShelfConfig;

/// Result type alias for Shelfmark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Shelfmark operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("No {table} row with id {id}")]
    NotFound { table: &'static str, id: RowId },

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Connection is closed")]
    Closed,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`].
///
/// Callers that only care whether they misused the API, targeted a missing row,
/// or hit a storage failure can match on this instead of the full enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A precondition was violated by the caller
    Usage,
    /// The targeted row does not exist
    NotFound,
    /// The storage engine rejected the operation
    Storage,
}

impl Error {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Usage(_) => ErrorKind::Usage,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Integrity(_)
            | Error::UnknownTable(_)
            | Error::Closed
            | Error::Storage(_)
            | Error::Io(_) => ErrorKind::Storage,
        }
    }
}
