//! Comments attached to Titles and Authors
//!
//! A comment records its owner as `(item_type, item_id)`. The back reference is
//! weak: ownership is decided by querying on those two columns, never by
//! following the reference.

use crate::ident::{Identity, RowId};
use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which kind of item owns a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Title,
    Author,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Title => "title",
            ItemType::Author => "author",
        }
    }

    /// On-disk code stored in `comments.item_type`
    pub fn code(&self) -> i64 {
        match self {
            ItemType::Title => 1,
            ItemType::Author => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ItemType::Title),
            2 => Some(ItemType::Author),
            _ => None,
        }
    }

    pub fn all() -> &'static [ItemType] {
        &[ItemType::Title, ItemType::Author]
    }
}

impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "title" | "titles" => Ok(ItemType::Title),
            "author" | "authors" => Ok(ItemType::Author),
            _ => Err(Error::usage(format!("Unknown item type: {}", s))),
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for ItemType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for ItemType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = i64::column_result(value)?;
        ItemType::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// A free-text comment owned by a Title or an Author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub(crate) ident: Option<RowId>,
    pub item_type: ItemType,
    /// Identity of the owning row; `None` until the owner is persisted
    pub item_id: Option<RowId>,
    pub text: String,
}

impl Comment {
    pub fn new(item_type: ItemType, text: impl Into<String>) -> Self {
        Self {
            ident: None,
            item_type,
            item_id: None,
            text: text.into(),
        }
    }

    /// Comment tagged with an already known owner
    pub fn for_item(item_type: ItemType, item_id: RowId, text: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::new(item_type, text)
        }
    }

    fn sort_key(&self) -> (ItemType, Option<RowId>, &str) {
        (self.item_type, self.item_id, self.text.as_str())
    }
}

impl Identity for Comment {
    const KIND: &'static str = "comment";

    fn ident(&self) -> Option<RowId> {
        self.ident
    }
}

impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Comment {}

impl std::hash::Hash for Comment {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

/// Compare two comment collections as multisets, ignoring order and identity.
pub(crate) fn same_comments(a: &[Comment], b: &[Comment]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left: Vec<_> = a.iter().map(Comment::sort_key).collect();
    let mut right: Vec<_> = b.iter().map(Comment::sort_key).collect();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}

/// An item that owns a comment collection (Author or Title).
pub trait Commented: Identity {
    fn item_type(&self) -> ItemType;

    fn comments(&self) -> &[Comment];

    fn comments_mut(&mut self) -> &mut Vec<Comment>;

    /// Append a transient comment tagged with this item as owner.
    fn add_comment(&mut self, text: impl Into<String>) {
        let mut comment = Comment::new(self.item_type(), text);
        comment.item_id = self.ident();
        self.comments_mut().push(comment);
    }

    fn remove_comment(&mut self, index: usize) -> Option<Comment> {
        let comments = self.comments_mut();
        (index < comments.len()).then(|| comments.remove(index))
    }
}
