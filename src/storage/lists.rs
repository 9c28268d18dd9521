//! Lists table manager

use super::sqlite::Session;
use super::table::{Table, TableName};
use crate::ident::{self, Identity, RowId};
use crate::list::{List, ListType};
use crate::{Error, Result};
use rusqlite::{params, Row};

const INSERT: &str = r#"
INSERT INTO lists (list_type, component_label, dialog_title, creation_date, modify_date)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

const UPDATE: &str = r#"
UPDATE lists
SET list_type = ?1, component_label = ?2, dialog_title = ?3, creation_date = ?4, modify_date = ?5
WHERE id = ?6
"#;

const SELECT_ID_FOR_DIALOG_TITLE: &str = "SELECT id FROM lists WHERE dialog_title = ?1 ORDER BY id LIMIT 1";

/// Manager for the `lists` table
#[derive(Debug, Clone, Copy, Default)]
pub struct ListTable;

impl Table for ListTable {
    type Entity = List;

    const NAME: TableName = TableName::Lists;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<List> {
        Ok(List {
            ident: Some(row.get(0)?),
            list_type: row.get(1)?,
            component_label: row.get(2)?,
            dialog_title: row.get(3)?,
            creation_date: row.get(4)?,
            modify_date: row.get(5)?,
        })
    }
}

impl ListTable {
    /// Insert a transient list and assign its generated identity
    pub fn insert(&self, session: &Session<'_>, list: &mut List) -> Result<RowId> {
        list.require_transient()?;
        let id = session.insert(
            INSERT,
            params![
                list.list_type,
                list.component_label,
                list.dialog_title,
                list.creation_date,
                list.modify_date,
            ],
        )?;
        ident::assign(&mut list.ident, id, List::KIND)?;
        tracing::debug!("Inserted list {} ({:?})", id, list.dialog_title);
        Ok(id)
    }

    pub fn update(&self, session: &Session<'_>, list: &List) -> Result<()> {
        let id = list.require_persisted()?;
        let changed = session.execute(
            UPDATE,
            params![
                list.list_type,
                list.component_label,
                list.dialog_title,
                list.creation_date,
                list.modify_date,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound { table: Self::NAME.as_str(), id });
        }
        Ok(())
    }

    pub fn delete(&self, session: &Session<'_>, list: &List) -> Result<()> {
        let id = list.require_persisted()?;
        self.delete_by_id(session, id)
    }

    pub fn get_by_type(&self, session: &Session<'_>, list_type: ListType) -> Result<Vec<List>> {
        let sql = Self::select_sql("WHERE list_type = ?1 ORDER BY id");
        session.query_all(&sql, [list_type], Self::from_row)
    }

    /// Id of the first list (by id) whose dialog title matches exactly
    pub fn id_for_dialog_title(&self, session: &Session<'_>, dialog_title: &str) -> Result<Option<RowId>> {
        session.query_optional(SELECT_ID_FOR_DIALOG_TITLE, [dialog_title], |row| row.get(0))
    }
}
