//! Authors filed under an author list

use crate::comment::{same_comments, Comment, Commented, ItemType};
use crate::ident::{Identity, RowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An author tracked on a list.
///
/// Equality covers every business field plus the comment collection (as a
/// multiset); the row identity is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub(crate) ident: Option<RowId>,
    /// Display name, conventionally "Last, First"
    pub name: String,
    /// Dialog title of the list this author is filed under
    pub list_name: String,
    pub rank: i32,
    pub rating: i32,
    /// Where the author was discovered (a review, a friend, ...)
    pub source: String,
    pub creation_date: DateTime<Utc>,
    pub modify_date: DateTime<Utc>,
    /// Number of titles counted at the previous check
    pub last_count: i32,
    /// Number of titles counted now
    pub current_count: i32,
    pub comments: Vec<Comment>,
}

impl Author {
    pub fn new(name: impl Into<String>, list_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            ident: None,
            name: name.into(),
            list_name: list_name.into(),
            rank: 0,
            rating: 0,
            source: String::new(),
            creation_date: now,
            modify_date: now,
            last_count: 0,
            current_count: 0,
            comments: Vec::new(),
        }
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

    pub fn with_counts(mut self, last_count: i32, current_count: i32) -> Self {
        self.last_count = last_count;
        self.current_count = current_count;
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
    fn key(&self) -> (&str, &str, i32, i32, &str, &DateTime<Utc>, &DateTime<Utc>, i32, i32) {
        (
            self.name.as_str(),
            self.list_name.as_str(),
            self.rank,
            self.rating,
            self.source.as_str(),
            &self.creation_date,
            &self.modify_date,
            self.last_count,
            self.current_count,
        )
    }
}

impl Identity for Author {
    const KIND: &'static str = "author";

    fn ident(&self) -> Option<RowId> {
        self.ident
    }
}

impl Commented for Author {
    fn item_type(&self) -> ItemType {
        ItemType::Author
    }

    fn comments(&self) -> &[Comment] {
        &self.comments
    }

    fn comments_mut(&mut self) -> &mut Vec<Comment> {
        &mut self.comments
    }
}

impl PartialEq for Author {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key() && same_comments(&self.comments, &other.comments)
    }
}

impl Eq for Author {}

impl std::hash::Hash for Author {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doe() -> Author {
        let stamp = Utc.with_ymd_and_hms(2023, 11, 5, 12, 0, 0).unwrap();
        Author::new("Doe, Jane", "Wish List Authors")
            .with_rank(2)
            .with_source("NYT review")
            .with_dates(stamp, stamp)
    }

    #[test]
    fn test_comment_order_is_ignored() {
        let a = doe().with_comment("prolific").with_comment("essays too");
        let b = doe().with_comment("essays too").with_comment("prolific");
        assert_eq!(a, b);
        assert_ne!(a, doe().with_comment("prolific"));
    }

    #[test]
    fn test_identity_is_ignored() {
        let a = doe();
        let mut b = doe();
        b.ident = Some(RowId::new(42));
        assert_eq!(a, b);

        b.rating = 5;
        assert_ne!(a, b);
    }

    #[test]
    fn test_add_and_remove_comment() {
        let mut author = doe();
        author.ident = Some(RowId::new(3));
        author.add_comment("met at a signing");
        assert_eq!(author.comments[0].item_type, ItemType::Author);
        assert_eq!(author.comments[0].item_id, Some(RowId::new(3)));

        let removed = author.remove_comment(0).unwrap();
        assert_eq!(removed.text, "met at a signing");
        assert!(author.remove_comment(0).is_none());
    }
}
