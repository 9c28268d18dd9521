//! DbServer - the single entry point for callers
//!
//! Composes the table managers and the comment reconciliation engine over one
//! connection. Cross-table rules live here:
//! - inserting an Author/Title inserts its comments in the same transaction
//! - deleting an Author/Title deletes its comments in the same transaction
//! - `update_*` touches only the item's own columns; comment changes are
//!   persisted by an explicit `synchronize_comments_for`

use crate::comment::{Comment, Commented, ItemType};
use crate::config::{ShelfConfig, DUMP_DIR_NAME};
use crate::ident::{Identity, RowId};
use crate::storage::{
    dump, reconcile, sqlite, AuthorTable, CommentTable, DbStats, ListTable, PoolStats, Session,
    StatementPool, SyncReport, Table, TableName, TitleTable,
};
use crate::{Author, Error, List, ListType, Result, Title};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Facade over the four tables.
#[derive(Debug)]
pub struct DbServer {
    conn: Option<Connection>,
    pool: StatementPool,
    dump_dir: PathBuf,
    strict_references: bool,
}

impl DbServer {
    /// Open a database file (creates if doesn't exist).
    ///
    /// Dumps go to `<db dir>/dumps` unless `config.dump_dir` is set; a relative
    /// `dump_dir` is taken from the database's directory.
    pub fn open(path: &Path, config: &ShelfConfig) -> Result<Self> {
        let conn = sqlite::open_connection(path, config.statement_cache_capacity)?;
        tracing::info!("Opened database {}", path.display());
        let db_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let dump_dir = match config.dump_dir.as_deref() {
            Some(dir) => db_dir.join(dir),
            None => db_dir.join(DUMP_DIR_NAME),
        };
        Ok(Self::with_connection(conn, config, dump_dir))
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let config = ShelfConfig::default();
        let conn = sqlite::open_in_memory(config.statement_cache_capacity)?;
        let dump_dir = config.dump_dir_in(Path::new("."));
        Ok(Self::with_connection(conn, &config, dump_dir))
    }

    /// Open the database named by `config`; relative paths are taken from `base`
    pub fn from_config(config: &ShelfConfig, base: &Path) -> Result<Self> {
        let path = config.database_path_in(base);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = sqlite::open_connection(&path, config.statement_cache_capacity)?;
        tracing::info!("Opened database {}", path.display());
        Ok(Self::with_connection(conn, config, config.dump_dir_in(base)))
    }

    fn with_connection(conn: Connection, config: &ShelfConfig, dump_dir: PathBuf) -> Self {
        Self {
            conn: Some(conn),
            pool: StatementPool::with_capacity(config.statement_cache_capacity),
            dump_dir,
            strict_references: config.strict_references,
        }
    }

    /// Directory that `dump_table` writes into
    pub fn set_dump_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dump_dir = dir.into();
    }

    pub fn set_strict_references(&mut self, strict: bool) {
        self.strict_references = strict;
    }

    fn session(&self) -> Result<Session<'_>> {
        let conn = self.conn.as_ref().ok_or(Error::Closed)?;
        Ok(Session::new(conn, &self.pool))
    }

    /// Release the underlying connection. Every later call fails with `Closed`.
    pub fn close_connection(&mut self) -> Result<()> {
        let conn = self.conn.take().ok_or(Error::Closed)?;
        self.pool.reset();
        if let Err((conn, err)) = conn.close() {
            self.conn = Some(conn);
            return Err(err.into());
        }
        tracing::info!("Closed database connection");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn stats(&self) -> Result<DbStats> {
        let s = self.session()?;
        Ok(DbStats {
            lists: ListTable.count(&s)?,
            authors: AuthorTable.count(&s)?,
            titles: TitleTable.count(&s)?,
            comments: CommentTable.count(&s)?,
        })
    }

    // ========== List Operations ==========

    pub fn insert_list(&self, list: &mut List) -> Result<RowId> {
        ListTable.insert(&self.session()?, list)
    }

    pub fn update_list(&self, list: &List) -> Result<()> {
        ListTable.update(&self.session()?, list)
    }

    /// Delete a list. Items still filed under it are the caller's concern.
    pub fn delete_list(&self, list: &List) -> Result<()> {
        ListTable.delete(&self.session()?, list)
    }

    pub fn delete_list_by_id(&self, id: RowId) -> Result<()> {
        ListTable.delete_by_id(&self.session()?, id)
    }

    pub fn get_list(&self, id: RowId) -> Result<Option<List>> {
        ListTable.get_by_id(&self.session()?, id)
    }

    pub fn get_all_lists(&self) -> Result<Vec<List>> {
        ListTable.get_all(&self.session()?)
    }

    pub fn get_lists_by_type(&self, list_type: ListType) -> Result<Vec<List>> {
        ListTable.get_by_type(&self.session()?, list_type)
    }

    /// Id of the list with this dialog title, if any
    pub fn get_list_id(&self, dialog_title: &str) -> Result<Option<RowId>> {
        ListTable.id_for_dialog_title(&self.session()?, dialog_title)
    }

    // ========== Author Operations ==========

    /// Insert an author together with its comments
    pub fn insert_author(&self, author: &mut Author) -> Result<RowId> {
        let s = self.session()?;
        author.require_transient()?;
        self.check_list_reference(&s, &author.list_name)?;

        let fresh = snapshot_transient(&*author);
        let tx = s.transaction()?;
        let outcome = AuthorTable
            .insert(&s, author)
            .and_then(|id| reconcile::insert_comments_for(&s, author).map(|_| id));
        match outcome.and_then(|id| tx.commit().map(|_| id).map_err(Error::from)) {
            Ok(id) => Ok(id),
            Err(err) => {
                author.ident = None;
                restore_transient(author, &fresh);
                Err(err)
            }
        }
    }

    /// Update the author's own columns; comments are not reconciled
    pub fn update_author(&self, author: &Author) -> Result<()> {
        AuthorTable.update(&self.session()?, author)
    }

    /// Delete an author and every comment it owns
    pub fn delete_author(&self, author: &Author) -> Result<usize> {
        let id = author.require_persisted()?;
        self.delete_author_by_id(id)
    }

    pub fn delete_author_by_id(&self, id: RowId) -> Result<usize> {
        let s = self.session()?;
        let tx = s.transaction()?;
        AuthorTable.delete_by_id(&s, id)?;
        let removed = CommentTable.delete_for_item(&s, ItemType::Author, id)?;
        tx.commit()?;
        tracing::debug!("Deleted author {} and {} comments", id, removed);
        Ok(removed)
    }

    /// Fetch an author with its comments populated
    pub fn get_author(&self, id: RowId) -> Result<Option<Author>> {
        let s = self.session()?;
        let mut author = AuthorTable.get_by_id(&s, id)?;
        if let Some(author) = author.as_mut() {
            reconcile::get_comments_for(&s, author)?;
        }
        Ok(author)
    }

    pub fn get_all_authors(&self) -> Result<Vec<Author>> {
        let s = self.session()?;
        let authors = AuthorTable.get_all(&s)?;
        with_comments(&s, authors)
    }

    pub fn get_authors_for_list(&self, list_name: &str) -> Result<Vec<Author>> {
        let s = self.session()?;
        let authors = AuthorTable.get_for_list_name(&s, list_name)?;
        with_comments(&s, authors)
    }

    /// Id of the first author with exactly this name, if any
    pub fn get_author_id_for_name(&self, name: &str) -> Result<Option<RowId>> {
        AuthorTable.id_for_name(&self.session()?, name)
    }

    // ========== Title Operations ==========

    /// Insert a title together with its comments
    pub fn insert_title(&self, title: &mut Title) -> Result<RowId> {
        let s = self.session()?;
        title.require_transient()?;
        self.check_list_reference(&s, &title.list_name)?;
        self.check_author_reference(&s, &title.author)?;

        let fresh = snapshot_transient(&*title);
        let tx = s.transaction()?;
        let outcome = TitleTable
            .insert(&s, title)
            .and_then(|id| reconcile::insert_comments_for(&s, title).map(|_| id));
        match outcome.and_then(|id| tx.commit().map(|_| id).map_err(Error::from)) {
            Ok(id) => Ok(id),
            Err(err) => {
                title.ident = None;
                restore_transient(title, &fresh);
                Err(err)
            }
        }
    }

    /// Update the title's own columns; comments are not reconciled
    pub fn update_title(&self, title: &Title) -> Result<()> {
        TitleTable.update(&self.session()?, title)
    }

    /// Delete a title and every comment it owns
    pub fn delete_title(&self, title: &Title) -> Result<usize> {
        let id = title.require_persisted()?;
        self.delete_title_by_id(id)
    }

    pub fn delete_title_by_id(&self, id: RowId) -> Result<usize> {
        let s = self.session()?;
        let tx = s.transaction()?;
        TitleTable.delete_by_id(&s, id)?;
        let removed = CommentTable.delete_for_item(&s, ItemType::Title, id)?;
        tx.commit()?;
        tracing::debug!("Deleted title {} and {} comments", id, removed);
        Ok(removed)
    }

    /// Fetch a title with its comments populated
    pub fn get_title(&self, id: RowId) -> Result<Option<Title>> {
        let s = self.session()?;
        let mut title = TitleTable.get_by_id(&s, id)?;
        if let Some(title) = title.as_mut() {
            reconcile::get_comments_for(&s, title)?;
        }
        Ok(title)
    }

    pub fn get_all_titles(&self) -> Result<Vec<Title>> {
        let s = self.session()?;
        let titles = TitleTable.get_all(&s)?;
        with_comments(&s, titles)
    }

    pub fn get_titles_for_author(&self, author: &Author) -> Result<Vec<Title>> {
        self.get_titles_for_author_name(&author.name)
    }

    pub fn get_titles_for_author_name(&self, name: &str) -> Result<Vec<Title>> {
        let s = self.session()?;
        let titles = TitleTable.get_for_author_name(&s, name)?;
        with_comments(&s, titles)
    }

    pub fn get_titles_for_list(&self, list_name: &str) -> Result<Vec<Title>> {
        let s = self.session()?;
        let titles = TitleTable.get_for_list_name(&s, list_name)?;
        with_comments(&s, titles)
    }

    // ========== Comment Operations ==========

    /// Insert a single comment; its owner must already be stored
    pub fn insert_comment(&self, comment: &mut Comment) -> Result<RowId> {
        CommentTable.insert(&self.session()?, comment)
    }

    pub fn update_comment(&self, comment: &Comment) -> Result<()> {
        CommentTable.update(&self.session()?, comment)
    }

    pub fn delete_comment(&self, comment: &Comment) -> Result<()> {
        CommentTable.delete(&self.session()?, comment)
    }

    pub fn delete_comment_by_id(&self, id: RowId) -> Result<()> {
        CommentTable.delete_by_id(&self.session()?, id)
    }

    pub fn get_comment(&self, id: RowId) -> Result<Option<Comment>> {
        CommentTable.get_by_id(&self.session()?, id)
    }

    pub fn get_all_comments(&self) -> Result<Vec<Comment>> {
        CommentTable.get_all(&self.session()?)
    }

    /// Comments stored for one owner, without loading the owner
    pub fn get_comments_for_item(&self, item_type: ItemType, item_id: RowId) -> Result<Vec<Comment>> {
        CommentTable.get_for_item(&self.session()?, item_type, item_id)
    }

    // ========== Reconciliation ==========

    /// Replace the owner's in-memory comments with the stored ones
    pub fn get_comments_for<O: Commented>(&self, owner: &mut O) -> Result<usize> {
        reconcile::get_comments_for(&self.session()?, owner)
    }

    /// Insert the owner's not-yet-persisted comments
    pub fn insert_comments_for<O: Commented>(&self, owner: &mut O) -> Result<usize> {
        let s = self.session()?;
        owner.require_persisted()?;
        let fresh = snapshot_transient(&*owner);
        let tx = s.transaction()?;
        let outcome = reconcile::insert_comments_for(&s, owner);
        match outcome.and_then(|n| tx.commit().map(|_| n).map_err(Error::from)) {
            Ok(n) => Ok(n),
            Err(err) => {
                restore_transient(owner, &fresh);
                Err(err)
            }
        }
    }

    /// Delete every stored comment of the owner. Its in-memory set is then stale.
    pub fn delete_comments_for<O: Commented>(&self, owner: &O) -> Result<usize> {
        reconcile::delete_comments_for(&self.session()?, owner)
    }

    /// Persist the owner's in-memory comment set (insert / update / delete)
    pub fn synchronize_comments_for<O: Commented>(&self, owner: &mut O) -> Result<SyncReport> {
        let s = self.session()?;
        owner.require_persisted()?;
        let fresh = snapshot_transient(&*owner);
        let tx = s.transaction()?;
        let outcome = reconcile::synchronize(&s, owner);
        match outcome.and_then(|r| tx.commit().map(|_| r).map_err(Error::from)) {
            Ok(report) => Ok(report),
            Err(err) => {
                restore_transient(owner, &fresh);
                Err(err)
            }
        }
    }

    // ========== Table Operations ==========

    /// Empty one table by name. Truncating authors or titles also drops their comments.
    pub fn truncate_table(&self, name: &str) -> Result<usize> {
        let table: TableName = name.parse()?;
        let s = self.session()?;
        let tx = s.transaction()?;
        let removed = match table {
            TableName::Lists => ListTable.truncate(&s)?,
            TableName::Authors => {
                CommentTable.delete_by_type(&s, ItemType::Author)?;
                AuthorTable.truncate(&s)?
            }
            TableName::Titles => {
                CommentTable.delete_by_type(&s, ItemType::Title)?;
                TitleTable.truncate(&s)?
            }
            TableName::Comments => CommentTable.truncate(&s)?,
        };
        tx.commit()?;
        tracing::info!("Truncated {} ({} rows)", table, removed);
        Ok(removed)
    }

    /// Write one table to a diagnostic text file and return its path
    pub fn dump_table(&self, name: &str) -> Result<PathBuf> {
        let table: TableName = name.parse()?;
        dump::dump_table(&self.session()?, table, &self.dump_dir)
    }

    // ========== Reference Checks ==========

    fn check_list_reference(&self, s: &Session<'_>, list_name: &str) -> Result<()> {
        if !self.strict_references || list_name.is_empty() {
            return Ok(());
        }
        match ListTable.id_for_dialog_title(s, list_name)? {
            Some(_) => Ok(()),
            None => Err(Error::Integrity(format!("no list titled {:?}", list_name))),
        }
    }

    fn check_author_reference(&self, s: &Session<'_>, author: &str) -> Result<()> {
        if !self.strict_references || author.is_empty() {
            return Ok(());
        }
        match AuthorTable.id_for_name(s, author)? {
            Some(_) => Ok(()),
            None => Err(Error::Integrity(format!("no author named {:?}", author))),
        }
    }
}

fn with_comments<O: Commented>(s: &Session<'_>, mut owners: Vec<O>) -> Result<Vec<O>> {
    for owner in owners.iter_mut() {
        reconcile::get_comments_for(s, owner)?;
    }
    Ok(owners)
}

/// Owner tags of a comment that had no identity yet, by position
struct TransientComment {
    position: usize,
    item_type: ItemType,
    item_id: Option<RowId>,
}

fn snapshot_transient<O: Commented>(owner: &O) -> Vec<TransientComment> {
    owner
        .comments()
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_persisted())
        .map(|(position, c)| TransientComment {
            position,
            item_type: c.item_type,
            item_id: c.item_id,
        })
        .collect()
}

/// Undo what a rolled-back transaction did to transient comments: the
/// identity and the owner tags they were given.
fn restore_transient<O: Commented>(owner: &mut O, snapshot: &[TransientComment]) {
    let comments = owner.comments_mut();
    for saved in snapshot {
        if let Some(comment) = comments.get_mut(saved.position) {
            comment.ident = None;
            comment.item_type = saved.item_type;
            comment.item_id = saved.item_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn server_with_lists() -> DbServer {
        let server = DbServer::open_in_memory().unwrap();
        server
            .insert_list(&mut List::new(ListType::Title, "wishTitles", "Wish List Titles"))
            .unwrap();
        server
            .insert_list(&mut List::new(ListType::Author, "wishAuthors", "Wish List Authors"))
            .unwrap();
        server
    }

    #[test]
    fn test_author_round_trip_with_comments() {
        let server = server_with_lists();
        let mut author = Author::new("Doe, Jane", "Wish List Authors")
            .with_comment("debut was great")
            .with_comment("new one due in May");
        let id = server.insert_author(&mut author).unwrap();

        let stored = server.get_author(id).unwrap().unwrap();
        assert_eq!(stored, author);
        assert!(author.comments.iter().all(|c| c.item_id == Some(id)));
    }

    #[test]
    fn test_delete_cascades_to_comments() {
        let server = server_with_lists();
        let mut author = Author::new("Doe, Jane", "Wish List Authors")
            .with_comment("one")
            .with_comment("two");
        server.insert_author(&mut author).unwrap();
        let mut other = Author::new("Roe, Rick", "Wish List Authors").with_comment("keep me");
        server.insert_author(&mut other).unwrap();

        assert_eq!(server.delete_author(&author).unwrap(), 2);
        let remaining = server.get_all_comments().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "keep me");
        assert_eq!(
            server.delete_author(&author).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_update_does_not_touch_comments() {
        let server = server_with_lists();
        let mut author = Author::new("Doe, Jane", "Wish List Authors").with_comment("original");
        let id = server.insert_author(&mut author).unwrap();

        author.rank = 3;
        author.comments[0].text = "edited in memory only".into();
        server.update_author(&author).unwrap();

        let stored = server.get_author(id).unwrap().unwrap();
        assert_eq!(stored.rank, 3);
        assert_eq!(stored.comments[0].text, "original");
    }

    #[test]
    fn test_strict_references() {
        let mut server = server_with_lists();
        let mut stray = Author::new("Doe, Jane", "No Such List").with_comment("x");
        let err = server.insert_author(&mut stray).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
        assert_eq!(stray.ident(), None);

        let mut orphan = Title::new("Book A", "Nobody, Known", "Wish List Titles");
        assert!(matches!(server.insert_title(&mut orphan), Err(Error::Integrity(_))));

        server.set_strict_references(false);
        server.insert_title(&mut orphan).unwrap();
        assert!(orphan.is_persisted());
    }

    #[test]
    fn test_truncate_authors_drops_their_comments() {
        let server = server_with_lists();
        let mut author = Author::new("Doe, Jane", "Wish List Authors").with_comment("a");
        server.insert_author(&mut author).unwrap();
        let mut title = Title::new("Book A", "Doe, Jane", "Wish List Titles").with_comment("t");
        server.insert_title(&mut title).unwrap();

        assert_eq!(server.truncate_table("authors").unwrap(), 1);
        let comments = server.get_all_comments().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].item_type, ItemType::Title);

        let err = server.truncate_table("shelves").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_closed_connection_fails_cleanly() {
        let mut server = server_with_lists();
        server.close_connection().unwrap();
        assert!(server.is_closed());

        for err in [
            server.get_all_lists().unwrap_err(),
            server.stats().unwrap_err(),
            server.truncate_table("lists").unwrap_err(),
            server.close_connection().unwrap_err(),
        ] {
            assert!(matches!(err, Error::Closed));
            assert_eq!(err.kind(), ErrorKind::Storage);
        }
    }

    #[test]
    fn test_dump_dir_follows_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("shelf.db");

        let server = DbServer::open(&db, &ShelfConfig::default()).unwrap();
        let path = server.dump_table("lists").unwrap();
        assert_eq!(path.parent(), Some(dir.path().join("dumps").as_path()));

        let config = ShelfConfig { dump_dir: Some("out".into()), ..ShelfConfig::default() };
        let server = DbServer::open(&db, &config).unwrap();
        let path = server.dump_table("lists").unwrap();
        assert_eq!(path.parent(), Some(dir.path().join("out").as_path()));

        let server = DbServer::from_config(
            &ShelfConfig { database: Some("shelf.db".into()), ..config },
            dir.path(),
        )
        .unwrap();
        assert_eq!(server.dump_table("lists").unwrap().parent(), Some(dir.path().join("out").as_path()));
    }

    fn reject_comment_inserts(server: &DbServer) {
        server
            .conn
            .as_ref()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_comments BEFORE INSERT ON comments
                 BEGIN SELECT RAISE(ABORT, 'comments are frozen'); END;",
            )
            .unwrap();
    }

    #[test]
    fn test_failed_insert_restores_identities_and_owner_tags() {
        let server = server_with_lists();
        reject_comment_inserts(&server);

        let mut author = Author::new("Doe, Jane", "Wish List Authors").with_comment("lost");
        let err = server.insert_author(&mut author).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(author.ident(), None);
        assert_eq!(author.comments[0].ident(), None);
        assert_eq!(author.comments[0].item_id, None);
        assert_eq!(server.stats().unwrap(), DbStats { lists: 2, ..DbStats::default() });

        // The rolled-back id goes to the next author; the old comment must not claim it
        let mut other = Author::new("Roe, Rick", "Wish List Authors");
        let id = server.insert_author(&mut other).unwrap();
        assert_ne!(author.comments[0].item_id, Some(id));
    }

    #[test]
    fn test_failed_synchronize_keeps_store_and_memory() {
        let server = server_with_lists();
        let mut author = Author::new("Doe, Jane", "Wish List Authors").with_comment("kept");
        let id = server.insert_author(&mut author).unwrap();
        reject_comment_inserts(&server);

        author.remove_comment(0);
        author.comments.push(Comment::new(ItemType::Author, "late"));
        let err = server.synchronize_comments_for(&mut author).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);

        assert_eq!(author.ident(), Some(id));
        assert_eq!(author.comments[0].ident(), None);
        assert_eq!(author.comments[0].item_id, None);

        let stored = server.get_comments_for_item(ItemType::Author, id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "kept");
    }

    #[test]
    fn test_statements_are_reused() {
        let server = server_with_lists();
        for _ in 0..3 {
            server.get_list_id("Wish List Titles").unwrap();
        }
        let stats = server.pool_stats();
        assert!(stats.reused >= 2);
        assert_eq!(stats.out, 0);
    }
}
