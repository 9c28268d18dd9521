//! Titles table manager

use super::sqlite::Session;
use super::table::{Table, TableName};
use crate::ident::{self, Identity, RowId};
use crate::title::Title;
use crate::{Error, Result};
use rusqlite::{params, Row};

const INSERT: &str = r#"
INSERT INTO titles (title, author, list_name, media_type, check_q_pos, reckon_q_pos, rank, rating,
                    source, check_date, reckon_date, creation_date, modify_date)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
"#;

const UPDATE: &str = r#"
UPDATE titles
SET title = ?1, author = ?2, list_name = ?3, media_type = ?4, check_q_pos = ?5, reckon_q_pos = ?6,
    rank = ?7, rating = ?8, source = ?9, check_date = ?10, reckon_date = ?11,
    creation_date = ?12, modify_date = ?13
WHERE id = ?14
"#;

/// Manager for the `titles` table
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleTable;

impl Table for TitleTable {
    type Entity = Title;

    const NAME: TableName = TableName::Titles;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Title> {
        Ok(Title {
            ident: Some(row.get(0)?),
            title: row.get(1)?,
            author: row.get(2)?,
            list_name: row.get(3)?,
            media_type: row.get(4)?,
            check_q_pos: row.get(5)?,
            reckon_q_pos: row.get(6)?,
            rank: row.get(7)?,
            rating: row.get(8)?,
            source: row.get(9)?,
            check_date: row.get(10)?,
            reckon_date: row.get(11)?,
            creation_date: row.get(12)?,
            modify_date: row.get(13)?,
            comments: Vec::new(),
        })
    }
}

impl TitleTable {
    pub fn insert(&self, session: &Session<'_>, title: &mut Title) -> Result<RowId> {
        title.require_transient()?;
        let id = session.insert(
            INSERT,
            params![
                title.title,
                title.author,
                title.list_name,
                title.media_type,
                title.check_q_pos,
                title.reckon_q_pos,
                title.rank,
                title.rating,
                title.source,
                title.check_date,
                title.reckon_date,
                title.creation_date,
                title.modify_date,
            ],
        )?;
        ident::assign(&mut title.ident, id, Title::KIND)?;
        tracing::debug!("Inserted title {} ({:?})", id, title.title);
        Ok(id)
    }

    pub fn update(&self, session: &Session<'_>, title: &Title) -> Result<()> {
        let id = title.require_persisted()?;
        let changed = session.execute(
            UPDATE,
            params![
                title.title,
                title.author,
                title.list_name,
                title.media_type,
                title.check_q_pos,
                title.reckon_q_pos,
                title.rank,
                title.rating,
                title.source,
                title.check_date,
                title.reckon_date,
                title.creation_date,
                title.modify_date,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound { table: Self::NAME.as_str(), id });
        }
        Ok(())
    }

    pub fn delete(&self, session: &Session<'_>, title: &Title) -> Result<()> {
        let id = title.require_persisted()?;
        self.delete_by_id(session, id)
    }

    pub fn get_for_list_name(&self, session: &Session<'_>, list_name: &str) -> Result<Vec<Title>> {
        let sql = Self::select_sql("WHERE list_name = ?1 ORDER BY id");
        session.query_all(&sql, [list_name], Self::from_row)
    }

    pub fn get_for_author_name(&self, session: &Session<'_>, author: &str) -> Result<Vec<Title>> {
        let sql = Self::select_sql("WHERE author = ?1 ORDER BY id");
        session.query_all(&sql, [author], Self::from_row)
    }
}
