//! Comment reconciliation engine
//!
//! Brings the persisted comments of one owner (Author or Title) in line with
//! its in-memory collection:
//! - persisted rows missing from memory are deleted
//! - persisted rows whose text changed in memory are updated
//! - comments without identity are inserted and receive one
//! - everything else is left alone
//!
//! These functions do not open transactions; the facade wraps them.

use super::comments::CommentTable;
use super::sqlite::Session;
use crate::comment::{Comment, Commented, ItemType};
use crate::ident::{Identity, RowId};
use crate::Result;
use std::collections::{BTreeMap, HashSet};

/// What one synchronization pass wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    /// In-memory comments with an identity that matched no row of this owner
    pub skipped: usize,
}

impl SyncReport {
    /// Number of rows written
    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }

    pub fn is_noop(&self) -> bool {
        self.writes() == 0
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} deleted, {} unchanged",
            self.inserted, self.updated, self.deleted, self.unchanged
        )?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// Replace the owner's comments with exactly what is stored.
pub fn get_comments_for<O: Commented>(session: &Session<'_>, owner: &mut O) -> Result<usize> {
    let owner_id = owner.require_persisted()?;
    let stored = CommentTable.get_for_item(session, owner.item_type(), owner_id)?;
    let count = stored.len();
    *owner.comments_mut() = stored;
    Ok(count)
}

/// Insert every comment that has no identity yet; persisted ones are ignored.
pub fn insert_comments_for<O: Commented>(session: &Session<'_>, owner: &mut O) -> Result<usize> {
    let owner_id = owner.require_persisted()?;
    let item_type = owner.item_type();
    let mut inserted = 0;
    for comment in owner.comments_mut().iter_mut().filter(|c| !c.is_persisted()) {
        adopt(comment, owner_id, item_type);
        CommentTable.insert(session, comment)?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Delete every stored comment of the owner, whether or not it is in memory.
pub fn delete_comments_for<O: Commented>(session: &Session<'_>, owner: &O) -> Result<usize> {
    let owner_id = owner.require_persisted()?;
    let removed = CommentTable.delete_for_item(session, owner.item_type(), owner_id)?;
    tracing::debug!("Deleted {} comments of {} {}", removed, owner.item_type(), owner_id);
    Ok(removed)
}

/// Three-way diff of the owner's in-memory comments against storage.
pub fn synchronize<O: Commented>(session: &Session<'_>, owner: &mut O) -> Result<SyncReport> {
    let owner_id = owner.require_persisted()?;
    let item_type = owner.item_type();

    let persisted: BTreeMap<RowId, Comment> = CommentTable
        .get_for_item(session, item_type, owner_id)?
        .into_iter()
        .filter_map(|c| c.ident().map(|id| (id, c)))
        .collect();
    let retained: HashSet<RowId> = owner.comments().iter().filter_map(Comment::ident).collect();

    let mut report = SyncReport::default();

    for id in persisted.keys().filter(|id| !retained.contains(*id)) {
        // A row that vanished in the meantime is not an error.
        if CommentTable.delete_if_present(session, *id)? {
            report.deleted += 1;
        }
    }

    let mut seen = HashSet::new();
    for comment in owner.comments_mut().iter_mut() {
        let Some(id) = comment.ident() else {
            adopt(comment, owner_id, item_type);
            CommentTable.insert(session, comment)?;
            report.inserted += 1;
            continue;
        };
        if !seen.insert(id) {
            tracing::warn!(
                "Skipping duplicate of comment {} for {} {}: {:?}",
                id,
                item_type,
                owner_id,
                comment.text
            );
            report.skipped += 1;
            continue;
        }
        match persisted.get(&id) {
            Some(stored) if stored.text == comment.text => report.unchanged += 1,
            Some(_) => {
                if CommentTable.update_text(session, id, &comment.text)? {
                    report.updated += 1;
                }
            }
            None => {
                tracing::warn!(
                    "Skipping comment {}: no stored row for {} {}",
                    id,
                    item_type,
                    owner_id
                );
                report.skipped += 1;
            }
        }
    }

    tracing::debug!("Synchronized comments of {} {}: {}", item_type, owner_id, report);
    Ok(report)
}

fn adopt(comment: &mut Comment, owner_id: RowId, item_type: ItemType) {
    comment.item_type = item_type;
    comment.item_id = Some(owner_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::authors::AuthorTable;
    use crate::storage::pool::StatementPool;
    use crate::storage::sqlite::test_support;
    use crate::storage::table::Table;
    use crate::storage::titles::TitleTable;
    use crate::{Author, ErrorKind, Title};

    fn texts(comments: &[Comment]) -> Vec<&str> {
        let mut texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        texts.sort_unstable();
        texts
    }

    #[test]
    fn test_synchronize_three_way() {
        let conn = test_support::connection();
        let pool = StatementPool::new();
        let session = Session::new(&conn, &pool);

        let mut title = Title::new("Book A", "Doe, Jane", "Wish List Titles")
            .with_comment("c1")
            .with_comment("c2")
            .with_comment("c3");
        TitleTable.insert(&session, &mut title).unwrap();
        assert_eq!(insert_comments_for(&session, &mut title).unwrap(), 3);

        let c1 = title.comments[0].ident().unwrap();
        let c2 = title.comments[1].ident().unwrap();
        let c3 = title.comments[2].ident().unwrap();

        title.comments[1].text = "c2 revised".into();
        title.remove_comment(2);
        title.add_comment("c4");

        let report = synchronize(&session, &mut title).unwrap();
        assert_eq!(
            report,
            SyncReport { inserted: 1, updated: 1, deleted: 1, unchanged: 1, skipped: 0 }
        );

        let c4 = title.comments[2].ident().unwrap();
        assert!(![c1, c2, c3].contains(&c4));

        let stored = CommentTable
            .get_for_item(&session, title.item_type(), title.ident().unwrap())
            .unwrap();
        assert_eq!(texts(&stored), vec!["c1", "c2 revised", "c4"]);
        let ids: Vec<_> = stored.iter().filter_map(Comment::ident).collect();
        assert_eq!(ids, vec![c1, c2, c4]);
    }

    #[test]
    fn test_synchronize_twice_writes_nothing() {
        let conn = test_support::connection();
        let pool = StatementPool::new();
        let session = Session::new(&conn, &pool);

        let mut author = Author::new("Doe, Jane", "").with_comment("a").with_comment("b");
        AuthorTable.insert(&session, &mut author).unwrap();

        let first = synchronize(&session, &mut author).unwrap();
        assert_eq!(first.inserted, 2);

        let second = synchronize(&session, &mut author).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.unchanged, 2);
        assert_eq!(CommentTable.count(&session).unwrap(), 2);
    }

    #[test]
    fn test_missing_rows_are_tolerated() {
        let conn = test_support::connection();
        let pool = StatementPool::new();
        let session = Session::new(&conn, &pool);

        let mut author = Author::new("Doe, Jane", "").with_comment("kept").with_comment("gone");
        AuthorTable.insert(&session, &mut author).unwrap();
        insert_comments_for(&session, &mut author).unwrap();

        // Row disappears behind the engine's back while still held in memory
        let gone = author.comments[1].ident().unwrap();
        CommentTable.delete_by_id(&session, gone).unwrap();

        let report = synchronize(&session, &mut author).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.writes(), 0);

        // And once removed from memory there is nothing left to delete
        author.remove_comment(1);
        assert!(synchronize(&session, &mut author).unwrap().is_noop());
    }

    #[test]
    fn test_duplicate_idents_are_written_once_and_counted() {
        let conn = test_support::connection();
        let pool = StatementPool::new();
        let session = Session::new(&conn, &pool);

        let mut author = Author::new("Doe, Jane", "").with_comment("original");
        AuthorTable.insert(&session, &mut author).unwrap();
        insert_comments_for(&session, &mut author).unwrap();

        let mut copy = author.comments[0].clone();
        copy.text = "conflicting copy".into();
        author.comments[0].text = "first copy wins".into();
        author.comments.push(copy);

        let report = synchronize(&session, &mut author).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);

        let stored = CommentTable
            .get_for_item(&session, ItemType::Author, author.ident().unwrap())
            .unwrap();
        assert_eq!(texts(&stored), vec!["first copy wins"]);
    }

    #[test]
    fn test_owner_without_identity_is_usage_error() {
        let conn = test_support::connection();
        let pool = StatementPool::new();
        let session = Session::new(&conn, &pool);

        let mut title = Title::new("Book A", "Doe, Jane", "").with_comment("x");
        for err in [
            synchronize(&session, &mut title).unwrap_err(),
            insert_comments_for(&session, &mut title).unwrap_err(),
            get_comments_for(&session, &mut title).unwrap_err(),
            delete_comments_for(&session, &title).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::Usage);
        }
    }

    #[test]
    fn test_get_comments_replaces_in_memory_set() {
        let conn = test_support::connection();
        let pool = StatementPool::new();
        let session = Session::new(&conn, &pool);

        let mut title = Title::new("Book A", "Doe, Jane", "").with_comment("stored");
        TitleTable.insert(&session, &mut title).unwrap();
        insert_comments_for(&session, &mut title).unwrap();

        title.add_comment("unsaved");
        assert_eq!(get_comments_for(&session, &mut title).unwrap(), 1);
        assert_eq!(texts(&title.comments), vec!["stored"]);

        assert_eq!(delete_comments_for(&session, &title).unwrap(), 1);
        assert_eq!(get_comments_for(&session, &mut title).unwrap(), 0);
        assert!(title.comments.is_empty());
    }

    #[test]
    fn test_insert_comments_skips_persisted() {
        let conn = test_support::connection();
        let pool = StatementPool::new();
        let session = Session::new(&conn, &pool);

        let mut author = Author::new("Doe, Jane", "").with_comment("one");
        AuthorTable.insert(&session, &mut author).unwrap();
        assert_eq!(insert_comments_for(&session, &mut author).unwrap(), 1);

        author.add_comment("two");
        assert_eq!(insert_comments_for(&session, &mut author).unwrap(), 1);
        assert_eq!(CommentTable.count(&session).unwrap(), 2);
    }
}
