//! SQLite connection handling and the per-call session

use super::pool::{GeneratedKeys, PooledStatement, StatementPool};
use super::schema;
use crate::ident::RowId;
use crate::Result;
use rusqlite::{Connection, OptionalExtension, Params, Row, Transaction};
use std::path::Path;

/// Open a database file (creates if doesn't exist) and initialize the schema
pub fn open_connection(path: &Path, cache_capacity: usize) -> Result<Connection> {
    let conn = Connection::open(path)?;
    prepare_connection(&conn, cache_capacity)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_in_memory(cache_capacity: usize) -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare_connection(&conn, cache_capacity)?;
    Ok(conn)
}

fn prepare_connection(conn: &Connection, cache_capacity: usize) -> Result<()> {
    conn.set_prepared_statement_cache_capacity(cache_capacity);
    initialize_schema(conn)
}

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for stmt in schema::all_schema_statements() {
        conn.execute(stmt, [])?;
    }
    Ok(())
}

/// A live connection paired with its statement pool.
///
/// Every table-manager operation goes through a session: statements are
/// acquired from the pool, executed, and released.
#[derive(Debug, Clone, Copy)]
pub struct Session<'a> {
    conn: &'a Connection,
    pool: &'a StatementPool,
}

impl<'a> Session<'a> {
    pub fn new(conn: &'a Connection, pool: &'a StatementPool) -> Self {
        Self { conn, pool }
    }

    pub fn conn(&self) -> &'a Connection {
        self.conn
    }

    pub fn pool(&self) -> &'a StatementPool {
        self.pool
    }

    /// Acquire a statement that will not read back generated keys
    pub fn prepare(&self, sql: &str) -> Result<PooledStatement<'a>> {
        self.pool.acquire(self.conn, sql, GeneratedKeys::No)
    }

    /// Acquire a statement for inserting rows with generated ids
    pub fn prepare_insert(&self, sql: &str) -> Result<PooledStatement<'a>> {
        self.pool.acquire(self.conn, sql, GeneratedKeys::Yes)
    }

    /// Execute a statement and return the number of affected rows
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        let mut stmt = self.prepare(sql)?;
        let changed = stmt.execute(params)?;
        stmt.release()?;
        Ok(changed)
    }

    /// Insert a single row and return its generated id
    pub fn insert<P: Params>(&self, sql: &str, params: P) -> Result<RowId> {
        let mut stmt = self.prepare_insert(sql)?;
        let id = stmt.insert(params)?;
        stmt.release()?;
        Ok(id)
    }

    /// Run a query expected to yield at most one row
    pub fn query_optional<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.prepare(sql)?;
        let value = stmt.query_row(params, f).optional()?;
        stmt.release()?;
        Ok(value)
    }

    /// Run a query and map every row
    pub fn query_all<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.prepare(sql)?;
        let rows = stmt
            .query_map(params, f)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        stmt.release()?;
        Ok(rows)
    }

    /// Begin a transaction; it rolls back unless committed
    pub fn transaction(&self) -> Result<Transaction<'a>> {
        Ok(self.conn.unchecked_transaction()?)
    }
}
