//! Authors table manager
//!
//! Maps only the author's own columns. Comments are loaded and written by the
//! reconciliation engine.

use super::sqlite::Session;
use super::table::{Table, TableName};
use crate::author::Author;
use crate::ident::{self, Identity, RowId};
use crate::{Error, Result};
use rusqlite::{params, Row};

const INSERT: &str = r#"
INSERT INTO authors (name, list_name, rank, rating, source, creation_date, modify_date, last_count, current_count)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#;

const UPDATE: &str = r#"
UPDATE authors
SET name = ?1, list_name = ?2, rank = ?3, rating = ?4, source = ?5,
    creation_date = ?6, modify_date = ?7, last_count = ?8, current_count = ?9
WHERE id = ?10
"#;

const SELECT_ID_FOR_NAME: &str = "SELECT id FROM authors WHERE name = ?1 ORDER BY id LIMIT 1";

/// Manager for the `authors` table
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorTable;

impl Table for AuthorTable {
    type Entity = Author;

    const NAME: TableName = TableName::Authors;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Author> {
        Ok(Author {
            ident: Some(row.get(0)?),
            name: row.get(1)?,
            list_name: row.get(2)?,
            rank: row.get(3)?,
            rating: row.get(4)?,
            source: row.get(5)?,
            creation_date: row.get(6)?,
            modify_date: row.get(7)?,
            last_count: row.get(8)?,
            current_count: row.get(9)?,
            comments: Vec::new(),
        })
    }
}

impl AuthorTable {
    /// Insert the author row (comments untouched) and assign its identity
    pub fn insert(&self, session: &Session<'_>, author: &mut Author) -> Result<RowId> {
        author.require_transient()?;
        let id = session.insert(
            INSERT,
            params![
                author.name,
                author.list_name,
                author.rank,
                author.rating,
                author.source,
                author.creation_date,
                author.modify_date,
                author.last_count,
                author.current_count,
            ],
        )?;
        ident::assign(&mut author.ident, id, Author::KIND)?;
        tracing::debug!("Inserted author {} ({:?})", id, author.name);
        Ok(id)
    }

    pub fn update(&self, session: &Session<'_>, author: &Author) -> Result<()> {
        let id = author.require_persisted()?;
        let changed = session.execute(
            UPDATE,
            params![
                author.name,
                author.list_name,
                author.rank,
                author.rating,
                author.source,
                author.creation_date,
                author.modify_date,
                author.last_count,
                author.current_count,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound { table: Self::NAME.as_str(), id });
        }
        Ok(())
    }

    pub fn delete(&self, session: &Session<'_>, author: &Author) -> Result<()> {
        let id = author.require_persisted()?;
        self.delete_by_id(session, id)
    }

    pub fn get_for_list_name(&self, session: &Session<'_>, list_name: &str) -> Result<Vec<Author>> {
        let sql = Self::select_sql("WHERE list_name = ?1 ORDER BY id");
        session.query_all(&sql, [list_name], Self::from_row)
    }

    /// Id of the first author (by id) with exactly this name
    pub fn id_for_name(&self, session: &Session<'_>, name: &str) -> Result<Option<RowId>> {
        session.query_optional(SELECT_ID_FOR_NAME, [name], |row| row.get(0))
    }
}
