//! Statement pool
//!
//! Hands out prepared statements keyed by `(sql, GeneratedKeys)` and tracks
//! which handles are checked out. Compiled statements live in the connection's
//! statement cache (`prepare_cached`): an idle statement is reused, and two
//! callers holding the same SQL at once get two distinct compiled instances.
//!
//! The cache is an LRU of fixed capacity. The pool mirrors its order so that
//! a statement evicted from the cache is no longer counted as idle.
//!
//! Every checkout is identified by a [`Ticket`]. A ticket can be surrendered
//! exactly once; surrendering it again, to a different pool, or after
//! [`StatementPool::reset`] is a usage error.

use crate::ident::RowId;
use crate::{Error, Result};
use rusqlite::{CachedStatement, Connection, Params, Statement};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Default capacity of the connection's statement cache. Covers every distinct
/// statement the table managers and the dump issue.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Whether a statement will be used to read back a generated row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratedKeys {
    Yes,
    No,
}

/// Pool key: the SQL text plus the generated-keys flag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementKey {
    pub sql: String,
    pub keys: GeneratedKeys,
}

impl StatementKey {
    fn new(sql: &str, keys: GeneratedKeys) -> Self {
        // The connection cache ignores surrounding whitespace.
        Self { sql: sql.trim().to_string(), keys }
    }

    /// Text handed to `prepare_cached`; one cache entry per key
    fn cache_text(&self) -> String {
        match self.keys {
            GeneratedKeys::No => self.sql.clone(),
            GeneratedKeys::Yes => format!("{}\n-- generated keys", self.sql),
        }
    }
}

/// Receipt for one checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pool: u64,
    serial: u64,
    key: StatementKey,
}

impl Ticket {
    pub fn key(&self) -> &StatementKey {
        &self.key
    }
}

#[derive(Debug, Default)]
struct PoolState {
    /// Ticket serials currently out, per key
    out: HashMap<StatementKey, HashSet<u64>>,
    /// Keys with a compiled statement parked in the cache, least recent first
    idle: VecDeque<StatementKey>,
    capacity: usize,
    next_serial: u64,
    compiled: usize,
    reused: usize,
}

impl PoolState {
    fn take_idle(&mut self, key: &StatementKey) -> bool {
        match self.idle.iter().position(|k| k == key) {
            Some(pos) => {
                self.idle.remove(pos);
                true
            }
            None => false,
        }
    }

    fn park(&mut self, key: &StatementKey) {
        self.take_idle(key);
        self.idle.push_back(key.clone());
        while self.idle.len() > self.capacity {
            if let Some(evicted) = self.idle.pop_front() {
                tracing::debug!("Statement evicted from cache: {}", evicted.sql);
            }
        }
    }
}

/// Snapshot of pool bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Checkouts that compiled a fresh statement
    pub compiled: usize,
    /// Checkouts served by an idle statement
    pub reused: usize,
    /// Keys with an idle compiled statement
    pub idle: usize,
    /// Handles currently checked out
    pub out: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "compiled={} reused={} idle={} out={}",
            self.compiled, self.reused, self.idle, self.out
        )
    }
}

/// Pool of prepared statements over a single connection.
///
/// The capacity must match what the connection's cache was configured with
/// (`set_prepared_statement_cache_capacity`).
#[derive(Debug)]
pub struct StatementPool {
    id: u64,
    state: Mutex<PoolState>,
}

impl Default for StatementPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementPool {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(PoolState { capacity, ..PoolState::default() }),
        }
    }

    // Bookkeeping stays consistent across a panic: every mutation is a single
    // insert/remove, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check out a ready-to-bind statement for `sql`.
    ///
    /// Malformed SQL fails with a storage error and leaves the pool unchanged.
    pub fn acquire<'c>(
        &'c self,
        conn: &'c Connection,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<PooledStatement<'c>> {
        let key = StatementKey::new(sql, keys);
        let mut state = self.lock();

        let stmt = conn.prepare_cached(&key.cache_text())?;

        let serial = state.next_serial;
        state.next_serial += 1;

        let reused = state.take_idle(&key);
        state.out.entry(key.clone()).or_default().insert(serial);

        if reused {
            state.reused += 1;
            tracing::debug!("Reusing statement #{}: {}", serial, sql.trim());
        } else {
            state.compiled += 1;
            tracing::debug!("Compiled statement #{}: {}", serial, sql.trim());
        }

        Ok(PooledStatement {
            pool: self,
            stmt,
            ticket: Ticket { pool: self.id, serial, key },
            armed: true,
        })
    }

    /// Return a handle to the pool that issued it.
    ///
    /// A handle from another pool is refused; it goes back to its own pool
    /// when dropped.
    pub fn release(&self, handle: PooledStatement<'_>) -> Result<()> {
        if handle.ticket.pool != self.id {
            return Err(Error::usage(format!(
                "statement #{} was not issued by this pool",
                handle.ticket.serial
            )));
        }
        handle.release()
    }

    /// Surrender a checkout by its ticket.
    pub fn release_ticket(&self, ticket: &Ticket) -> Result<()> {
        if ticket.pool != self.id {
            return Err(Error::usage(format!(
                "statement #{} was not issued by this pool",
                ticket.serial
            )));
        }

        let mut state = self.lock();
        let released = state
            .out
            .get_mut(&ticket.key)
            .is_some_and(|serials| serials.remove(&ticket.serial));

        if released {
            state.park(&ticket.key);
            Ok(())
        } else {
            Err(Error::usage(format!(
                "statement #{} is not checked out (already released?)",
                ticket.serial
            )))
        }
    }

    /// Forget all bookkeeping. Outstanding tickets become invalid.
    pub fn reset(&self) {
        let mut state = self.lock();
        let outstanding: usize = state.out.values().map(HashSet::len).sum();
        if outstanding > 0 {
            tracing::warn!("Resetting statement pool with {} handles still out", outstanding);
        }
        state.out.clear();
        state.idle.clear();
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            compiled: state.compiled,
            reused: state.reused,
            idle: state.idle.len(),
            out: state.out.values().map(HashSet::len).sum(),
        }
    }
}

/// A checked-out statement. Dereferences to [`rusqlite::Statement`].
///
/// Dropping the handle returns it to the pool; [`PooledStatement::release`]
/// does the same but reports bookkeeping errors.
pub struct PooledStatement<'c> {
    pool: &'c StatementPool,
    stmt: CachedStatement<'c>,
    ticket: Ticket,
    armed: bool,
}

impl<'c> PooledStatement<'c> {
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    /// Insert one row and return its generated id.
    ///
    /// Only available on handles acquired with [`GeneratedKeys::Yes`].
    pub fn insert<P: Params>(&mut self, params: P) -> Result<RowId> {
        if self.ticket.key.keys != GeneratedKeys::Yes {
            return Err(Error::usage(
                "statement was not acquired for generated keys",
            ));
        }
        let id = self.stmt.insert(params)?;
        Ok(RowId::new(id))
    }

    pub fn release(mut self) -> Result<()> {
        self.armed = false;
        self.pool.release_ticket(&self.ticket)
    }
}

impl<'c> Deref for PooledStatement<'c> {
    type Target = Statement<'c>;

    fn deref(&self) -> &Self::Target {
        &self.stmt
    }
}

impl DerefMut for PooledStatement<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.stmt
    }
}

impl Drop for PooledStatement<'_> {
    fn drop(&mut self) {
        if self.armed {
            // Tickets invalidated by a reset are expected here.
            let _ = self.pool.release_ticket(&self.ticket);
        }
    }
}

impl std::fmt::Debug for PooledStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledStatement")
            .field("ticket", &self.ticket)
            .field("armed", &self.armed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.set_prepared_statement_cache_capacity(DEFAULT_CACHE_CAPACITY);
        conn.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)", [])
            .unwrap();
        conn
    }

    #[test]
    fn test_reuse_after_release() {
        let conn = conn();
        let pool = StatementPool::new();

        let stmt = pool.acquire(&conn, "SELECT id FROM notes", GeneratedKeys::No).unwrap();
        stmt.release().unwrap();
        let stmt = pool.acquire(&conn, "SELECT id FROM notes", GeneratedKeys::No).unwrap();
        stmt.release().unwrap();

        let stats = pool.stats();
        assert_eq!(stats.compiled, 1);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.out, 0);
    }

    #[test]
    fn test_keys_flag_is_part_of_the_key() {
        let conn = conn();
        let pool = StatementPool::new();
        let sql = "INSERT INTO notes (body) VALUES (?1)";

        pool.acquire(&conn, sql, GeneratedKeys::No).unwrap().release().unwrap();
        let mut stmt = pool.acquire(&conn, sql, GeneratedKeys::Yes).unwrap();
        assert_eq!(pool.stats().reused, 0);

        let id = stmt.insert(["hello"]).unwrap();
        assert_eq!(id, RowId::new(1));
        stmt.release().unwrap();
    }

    #[test]
    fn test_concurrent_handles_for_same_sql() {
        let conn = conn();
        let pool = StatementPool::new();
        let sql = "SELECT COUNT(*) FROM notes";

        let mut a = pool.acquire(&conn, sql, GeneratedKeys::No).unwrap();
        let mut b = pool.acquire(&conn, sql, GeneratedKeys::No).unwrap();
        assert_ne!(a.ticket(), b.ticket());
        assert_eq!(pool.stats().out, 2);

        let x: i64 = a.query_row([], |row| row.get(0)).unwrap();
        let y: i64 = b.query_row([], |row| row.get(0)).unwrap();
        assert_eq!(x, y);

        pool.release(a).unwrap();
        pool.release(b).unwrap();
        assert_eq!(pool.stats().out, 0);
    }

    #[test]
    fn test_double_release_is_usage_error() {
        let conn = conn();
        let pool = StatementPool::new();

        let stmt = pool.acquire(&conn, "SELECT body FROM notes", GeneratedKeys::No).unwrap();
        let ticket = stmt.ticket().clone();
        stmt.release().unwrap();

        let err = pool.release_ticket(&ticket).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_foreign_ticket_is_usage_error() {
        let conn = conn();
        let pool = StatementPool::new();
        let other = StatementPool::new();

        let stmt = pool.acquire(&conn, "SELECT body FROM notes", GeneratedKeys::No).unwrap();
        let err = other.release_ticket(stmt.ticket()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        stmt.release().unwrap();
    }

    #[test]
    fn test_foreign_handle_is_refused() {
        let conn = conn();
        let pool = StatementPool::new();
        let other = StatementPool::new();

        let stmt = pool.acquire(&conn, "SELECT body FROM notes", GeneratedKeys::No).unwrap();
        let err = other.release(stmt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);

        // The refused handle went back to the pool that issued it
        assert_eq!(pool.stats().out, 0);
        assert_eq!(pool.stats().idle, 1);
        assert_eq!(other.stats(), PoolStats::default());
    }

    #[test]
    fn test_evicted_statements_are_not_idle() {
        let conn = conn();
        conn.set_prepared_statement_cache_capacity(1);
        let pool = StatementPool::with_capacity(1);

        for sql in ["SELECT 1", "SELECT 2", "SELECT 1", "SELECT 2"] {
            pool.acquire(&conn, sql, GeneratedKeys::No).unwrap().release().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.compiled, 4);
        assert_eq!(stats.reused, 0);
        assert_eq!(stats.idle, 1);

        pool.acquire(&conn, "SELECT 2", GeneratedKeys::No).unwrap().release().unwrap();
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn test_surrounding_whitespace_shares_a_key() {
        let conn = conn();
        let pool = StatementPool::new();

        pool.acquire(&conn, "SELECT id FROM notes", GeneratedKeys::No).unwrap().release().unwrap();
        pool.acquire(&conn, "\n  SELECT id FROM notes\n", GeneratedKeys::No).unwrap().release().unwrap();
        assert_eq!(pool.stats().reused, 1);
        assert_eq!(pool.stats().idle, 1);
    }

    #[test]
    fn test_malformed_sql_leaves_pool_unchanged() {
        let conn = conn();
        let pool = StatementPool::new();

        let err = pool.acquire(&conn, "SELEC nonsense FROM", GeneratedKeys::No).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn test_insert_requires_generated_keys() {
        let conn = conn();
        let pool = StatementPool::new();

        let mut stmt = pool
            .acquire(&conn, "INSERT INTO notes (body) VALUES (?1)", GeneratedKeys::No)
            .unwrap();
        assert_eq!(stmt.insert(["x"]).unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_drop_returns_handle_and_reset_invalidates() {
        let conn = conn();
        let pool = StatementPool::new();

        drop(pool.acquire(&conn, "SELECT id FROM notes", GeneratedKeys::No).unwrap());
        assert_eq!(pool.stats().out, 0);

        let stmt = pool.acquire(&conn, "SELECT id FROM notes", GeneratedKeys::No).unwrap();
        pool.reset();
        assert_eq!(stmt.release().unwrap_err().kind(), ErrorKind::Usage);
    }
}
