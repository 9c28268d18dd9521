//! Shared table-manager contract

use super::sqlite::Session;
use crate::ident::RowId;
use crate::{Error, Result};
use rusqlite::Row;
use std::str::FromStr;

/// The four managed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    Lists,
    Authors,
    Titles,
    Comments,
}

impl TableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Lists => "lists",
            TableName::Authors => "authors",
            TableName::Titles => "titles",
            TableName::Comments => "comments",
        }
    }

    /// Column names in schema order, `id` first
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableName::Lists => &[
                "id",
                "list_type",
                "component_label",
                "dialog_title",
                "creation_date",
                "modify_date",
            ],
            TableName::Authors => &[
                "id",
                "name",
                "list_name",
                "rank",
                "rating",
                "source",
                "creation_date",
                "modify_date",
                "last_count",
                "current_count",
            ],
            TableName::Titles => &[
                "id",
                "title",
                "author",
                "list_name",
                "media_type",
                "check_q_pos",
                "reckon_q_pos",
                "rank",
                "rating",
                "source",
                "check_date",
                "reckon_date",
                "creation_date",
                "modify_date",
            ],
            TableName::Comments => &["id", "item_type", "item_id", "text"],
        }
    }

    pub fn all() -> &'static [TableName] {
        &[
            TableName::Lists,
            TableName::Authors,
            TableName::Titles,
            TableName::Comments,
        ]
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lists" => Ok(TableName::Lists),
            "authors" => Ok(TableName::Authors),
            "titles" => Ok(TableName::Titles),
            "comments" => Ok(TableName::Comments),
            _ => Err(Error::UnknownTable(s.to_string())),
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A manager owning the SQL and row mapping of one table.
///
/// Implementors supply `insert`, `update` and `delete` themselves; the
/// id-based reads and deletes are shared.
pub trait Table {
    type Entity;

    const NAME: TableName;

    /// Maps a row selected with [`Table::select_sql`]
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self::Entity>;

    /// `SELECT <all columns> FROM <table> <tail>`, columns in schema order
    fn select_sql(tail: &str) -> String {
        format!("SELECT {} FROM {} {}", Self::NAME.columns().join(", "), Self::NAME, tail)
    }

    /// Fetch one row; absence is `Ok(None)`, never an error
    fn get_by_id(&self, session: &Session<'_>, id: RowId) -> Result<Option<Self::Entity>> {
        let sql = Self::select_sql("WHERE id = ?1");
        session.query_optional(&sql, [id], Self::from_row)
    }

    /// All rows in primary-key order
    fn get_all(&self, session: &Session<'_>) -> Result<Vec<Self::Entity>> {
        let sql = Self::select_sql("ORDER BY id");
        session.query_all(&sql, [], Self::from_row)
    }

    fn exists(&self, session: &Session<'_>, id: RowId) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", Self::NAME);
        let found: Option<i64> = session.query_optional(&sql, [id], |row| row.get(0))?;
        Ok(found.is_some())
    }

    fn count(&self, session: &Session<'_>) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", Self::NAME);
        let count: Option<i64> = session.query_optional(&sql, [], |row| row.get(0))?;
        Ok(count.unwrap_or(0) as usize)
    }

    /// Delete one row; a missing row is `NotFound`
    fn delete_by_id(&self, session: &Session<'_>, id: RowId) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", Self::NAME);
        match session.execute(&sql, [id])? {
            0 => Err(Error::NotFound { table: Self::NAME.as_str(), id }),
            _ => Ok(()),
        }
    }

    /// Empty the table, returning the number of rows removed
    fn truncate(&self, session: &Session<'_>) -> Result<usize> {
        let sql = format!("DELETE FROM {}", Self::NAME);
        session.execute(&sql, [])
    }
}
