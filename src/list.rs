//! Named lists that Titles and Authors are filed under
//!
//! `ListType` splits lists into two disjoint universes: title lists and author
//! lists. Items reference a list by its dialog title, not by id.

use crate::ident::{Identity, RowId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which universe of items a list holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Title,
    Author,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Title => "title",
            ListType::Author => "author",
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ListType::Title => 1,
            ListType::Author => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ListType::Title),
            2 => Some(ListType::Author),
            _ => None,
        }
    }
}

impl FromStr for ListType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "title" | "titles" => Ok(ListType::Title),
            "author" | "authors" => Ok(ListType::Author),
            _ => Err(Error::usage(format!("Unknown list type: {}", s))),
        }
    }
}

impl std::fmt::Display for ListType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for ListType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for ListType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = i64::column_result(value)?;
        ListType::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// A named list of Titles or Authors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub(crate) ident: Option<RowId>,
    pub list_type: ListType,
    /// Label of the UI component presenting the list
    pub component_label: String,
    /// Title shown on the list's dialog; items refer to the list by this value
    pub dialog_title: String,
    pub creation_date: DateTime<Utc>,
    pub modify_date: DateTime<Utc>,
}

impl List {
    pub fn new(
        list_type: ListType,
        component_label: impl Into<String>,
        dialog_title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            ident: None,
            list_type,
            component_label: component_label.into(),
            dialog_title: dialog_title.into(),
            creation_date: now,
            modify_date: now,
        }
    }

    pub fn with_dates(mut self, creation_date: DateTime<Utc>, modify_date: DateTime<Utc>) -> Self {
        self.creation_date = creation_date;
        self.modify_date = modify_date;
        self
    }

    /// Mark the list as modified now
    pub fn touch(&mut self) {
        self.modify_date = Utc::now();
    }

    fn key(&self) -> (ListType, &str, &str, &DateTime<Utc>, &DateTime<Utc>) {
        (
            self.list_type,
            self.component_label.as_str(),
            self.dialog_title.as_str(),
            &self.creation_date,
            &self.modify_date,
        )
    }
}

impl Identity for List {
    const KIND: &'static str = "list";

    fn ident(&self) -> Option<RowId> {
        self.ident
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for List {}

impl std::hash::Hash for List {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_list_type_parse() {
        assert_eq!(ListType::from_str("TITLES").unwrap(), ListType::Title);
        assert_eq!(ListType::from_str("author").unwrap(), ListType::Author);
        assert!(ListType::from_str("shelf").is_err());
    }

    #[test]
    fn test_equality_ignores_identity() {
        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let a = List::new(ListType::Title, "wishTitles", "Wish List Titles").with_dates(stamp, stamp);
        let mut b = a.clone();
        b.ident = Some(RowId::new(9));
        assert_eq!(a, b);

        b.dialog_title = "Read Titles".into();
        assert_ne!(a, b);
    }
}
