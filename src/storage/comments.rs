//! Comments table manager
//!
//! Owner existence is checked here: a comment row may only be written when the
//! Author or Title it names is present.

use super::authors::AuthorTable;
use super::sqlite::Session;
use super::table::{Table, TableName};
use super::titles::TitleTable;
use crate::comment::{Comment, ItemType};
use crate::ident::{self, Identity, RowId};
use crate::{Error, Result};
use rusqlite::{params, Row};

const INSERT: &str = "INSERT INTO comments (item_type, item_id, text) VALUES (?1, ?2, ?3)";

const UPDATE: &str = "UPDATE comments SET item_type = ?1, item_id = ?2, text = ?3 WHERE id = ?4";

const UPDATE_TEXT: &str = "UPDATE comments SET text = ?1 WHERE id = ?2";

const DELETE_BY_ID: &str = "DELETE FROM comments WHERE id = ?1";

const DELETE_FOR_ITEM: &str = "DELETE FROM comments WHERE item_type = ?1 AND item_id = ?2";

const DELETE_BY_TYPE: &str = "DELETE FROM comments WHERE item_type = ?1";

/// Manager for the `comments` table
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentTable;

impl Table for CommentTable {
    type Entity = Comment;

    const NAME: TableName = TableName::Comments;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
        Ok(Comment {
            ident: Some(row.get(0)?),
            item_type: row.get(1)?,
            item_id: Some(row.get(2)?),
            text: row.get(3)?,
        })
    }
}

impl CommentTable {
    /// Insert a transient comment whose owner already has a row
    pub fn insert(&self, session: &Session<'_>, comment: &mut Comment) -> Result<RowId> {
        comment.require_transient()?;
        let owner = self.require_owner(session, comment)?;
        let id = session.insert(INSERT, params![comment.item_type, owner, comment.text])?;
        ident::assign(&mut comment.ident, id, Comment::KIND)?;
        tracing::debug!("Inserted comment {} for {} {}", id, comment.item_type, owner);
        Ok(id)
    }

    pub fn update(&self, session: &Session<'_>, comment: &Comment) -> Result<()> {
        let id = comment.require_persisted()?;
        let owner = self.require_owner(session, comment)?;
        let changed = session.execute(UPDATE, params![comment.item_type, owner, comment.text, id])?;
        if changed == 0 {
            return Err(Error::NotFound { table: Self::NAME.as_str(), id });
        }
        Ok(())
    }

    pub fn delete(&self, session: &Session<'_>, comment: &Comment) -> Result<()> {
        let id = comment.require_persisted()?;
        self.delete_by_id(session, id)
    }

    pub fn get_for_item(
        &self,
        session: &Session<'_>,
        item_type: ItemType,
        item_id: RowId,
    ) -> Result<Vec<Comment>> {
        let sql = Self::select_sql("WHERE item_type = ?1 AND item_id = ?2 ORDER BY id");
        session.query_all(&sql, params![item_type, item_id], Self::from_row)
    }

    /// Delete every comment owned by one item, returning how many went
    pub fn delete_for_item(
        &self,
        session: &Session<'_>,
        item_type: ItemType,
        item_id: RowId,
    ) -> Result<usize> {
        session.execute(DELETE_FOR_ITEM, params![item_type, item_id])
    }

    /// Delete every comment owned by any item of `item_type`
    pub fn delete_by_type(&self, session: &Session<'_>, item_type: ItemType) -> Result<usize> {
        session.execute(DELETE_BY_TYPE, [item_type])
    }

    pub(crate) fn update_text(&self, session: &Session<'_>, id: RowId, text: &str) -> Result<bool> {
        Ok(session.execute(UPDATE_TEXT, params![text, id])? > 0)
    }

    /// Delete by id, reporting whether a row was actually there
    pub(crate) fn delete_if_present(&self, session: &Session<'_>, id: RowId) -> Result<bool> {
        Ok(session.execute(DELETE_BY_ID, [id])? > 0)
    }

    fn require_owner(&self, session: &Session<'_>, comment: &Comment) -> Result<RowId> {
        let owner = comment.item_id.ok_or_else(|| {
            Error::usage(format!(
                "comment {:?} has no owning {}; persist the owner first",
                comment.text, comment.item_type
            ))
        })?;
        let exists = match comment.item_type {
            ItemType::Author => AuthorTable.exists(session, owner)?,
            ItemType::Title => TitleTable.exists(session, owner)?,
        };
        if !exists {
            return Err(Error::Integrity(format!(
                "comment references missing {} {}",
                comment.item_type, owner
            )));
        }
        Ok(owner)
    }
}
