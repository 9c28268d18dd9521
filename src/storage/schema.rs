//! Database schema definitions
//!
//! Referential integrity between comments and their owners is enforced by the
//! table managers, not by foreign keys. `AUTOINCREMENT` keeps ids from being
//! reused after a delete or truncate.

/// SQL to create the lists table
pub const CREATE_LISTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    list_type INTEGER NOT NULL,
    component_label TEXT NOT NULL,
    dialog_title TEXT NOT NULL,
    creation_date TEXT NOT NULL,
    modify_date TEXT NOT NULL
)
"#;

/// SQL to create the authors table
pub const CREATE_AUTHORS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS authors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    list_name TEXT NOT NULL,
    rank INTEGER NOT NULL DEFAULT 0,
    rating INTEGER NOT NULL DEFAULT 0,
    source TEXT NOT NULL DEFAULT '',
    creation_date TEXT NOT NULL,
    modify_date TEXT NOT NULL,
    last_count INTEGER NOT NULL DEFAULT 0,
    current_count INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the titles table
pub const CREATE_TITLES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS titles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    list_name TEXT NOT NULL,
    media_type TEXT NOT NULL DEFAULT '',
    check_q_pos INTEGER NOT NULL DEFAULT 0,
    reckon_q_pos INTEGER NOT NULL DEFAULT 0,
    rank INTEGER NOT NULL DEFAULT 0,
    rating INTEGER NOT NULL DEFAULT 0,
    source TEXT NOT NULL DEFAULT '',
    check_date TEXT,
    reckon_date TEXT,
    creation_date TEXT NOT NULL,
    modify_date TEXT NOT NULL
)
"#;

/// SQL to create the comments table.
/// `item_type` is 1 for titles and 2 for authors.
pub const CREATE_COMMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_type INTEGER NOT NULL,
    item_id INTEGER NOT NULL,
    text TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_lists_dialog_title ON lists(dialog_title)",
    "CREATE INDEX IF NOT EXISTS idx_lists_type ON lists(list_type)",
    "CREATE INDEX IF NOT EXISTS idx_authors_name ON authors(name)",
    "CREATE INDEX IF NOT EXISTS idx_authors_list ON authors(list_name)",
    "CREATE INDEX IF NOT EXISTS idx_titles_author ON titles(author)",
    "CREATE INDEX IF NOT EXISTS idx_titles_list ON titles(list_name)",
    "CREATE INDEX IF NOT EXISTS idx_comments_item ON comments(item_type, item_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_LISTS_TABLE,
        CREATE_AUTHORS_TABLE,
        CREATE_TITLES_TABLE,
        CREATE_COMMENTS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
