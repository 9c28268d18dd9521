//! Titles filed under a title list

use crate::comment::{same_comments, Comment, Commented, ItemType};
use crate::ident::{Identity, RowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A title tracked on a list.
///
/// The author and list are referenced by value (author name, list dialog
/// title). Equality ignores identity and comment order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Title {
    pub(crate) ident: Option<RowId>,
    pub title: String,
    /// Author name as stored in `authors.name`
    pub author: String,
    /// Dialog title of the list this title is filed under
    pub list_name: String,
    /// Free-form medium: "book", "audiobook", "ebook", ...
    pub media_type: String,
    /// Position in the library hold queue at the last check
    pub check_q_pos: i32,
    /// Estimated queue position at the reckon date
    pub reckon_q_pos: i32,
    pub rank: i32,
    pub rating: i32,
    pub source: String,
    pub check_date: Option<DateTime<Utc>>,
    pub reckon_date: Option<DateTime<Utc>>,
    pub creation_date: DateTime<Utc>,
    pub modify_date: DateTime<Utc>,
    pub comments: Vec<Comment>,
}

impl Title {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        list_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            ident: None,
            title: title.into(),
            author: author.into(),
            list_name: list_name.into(),
            media_type: String::new(),
            check_q_pos: 0,
            reckon_q_pos: 0,
            rank: 0,
            rating: 0,
            source: String::new(),
            check_date: None,
            reckon_date: None,
            creation_date: now,
            modify_date: now,
            comments: Vec::new(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Record a hold-queue check
    pub fn with_check(mut self, position: i32, date: DateTime<Utc>) -> Self {
        self.check_q_pos = position;
        self.check_date = Some(date);
        self
    }

    /// Record a projected queue position
    pub fn with_reckon(mut self, position: i32, date: DateTime<Utc>) -> Self {
        self.reckon_q_pos = position;
        self.reckon_date = Some(date);
        self
    }

    pub fn with_dates(mut self, creation_date: DateTime<Utc>, modify_date: DateTime<Utc>) -> Self {
        self.creation_date = creation_date;
        self.modify_date = modify_date;
        self
    }

    pub fn with_comment(mut self, text: impl Into<String>) -> Self {
        self.add_comment(text);
        self
    }

    pub fn touch(&mut self) {
        self.modify_date = Utc::now();
    }

    #[allow(clippy::type_complexity)]
    fn key(
        &self,
    ) -> (
        (&str, &str, &str, &str),
        (i32, i32, i32, i32),
        &str,
        (Option<&DateTime<Utc>>, Option<&DateTime<Utc>>),
        (&DateTime<Utc>, &DateTime<Utc>),
    ) {
        (
            (
                self.title.as_str(),
                self.author.as_str(),
                self.list_name.as_str(),
                self.media_type.as_str(),
            ),
            (self.check_q_pos, self.reckon_q_pos, self.rank, self.rating),
            self.source.as_str(),
            (self.check_date.as_ref(), self.reckon_date.as_ref()),
            (&self.creation_date, &self.modify_date),
        )
    }
}

impl Identity for Title {
    const KIND: &'static str = "title";

    fn ident(&self) -> Option<RowId> {
        self.ident
    }
}

impl Commented for Title {
    fn item_type(&self) -> ItemType {
        ItemType::Title
    }

    fn comments(&self) -> &[Comment] {
        &self.comments
    }

    fn comments_mut(&mut self) -> &mut Vec<Comment> {
        &mut self.comments
    }
}

impl PartialEq for Title {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key() && same_comments(&self.comments, &other.comments)
    }
}

impl Eq for Title {}

impl std::hash::Hash for Title {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
