//! SQLite set store
//!
//! Sets live in one table keyed by `(set_key, member)`. Pops run inside an
//! `IMMEDIATE` transaction, so they are atomic across connections and
//! processes as well as across tasks sharing this store.
//!
//! rusqlite is synchronous; every call runs on the blocking thread pool so a
//! busy database never stalls the async workers.

use crate::frontier::schema::initialize_schema;
use crate::frontier::traits::{ScanPage, SetStore, StoreError, StoreResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite set-store backend
pub struct SqliteSetStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSetStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut *guard)
        })
        .await?
    }
}

#[async_trait]
impl SetStore for SqliteSetStore {
    // ===== Sets =====

    async fn pop(&self, key: &str, count: usize) -> StoreResult<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let key = key.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // Walks idx_set_members_key in rowid order; only the taken rows are read
            let popped = {
                let mut stmt = tx.prepare(
                    "SELECT rowid, member FROM set_members WHERE set_key = ?1
                     ORDER BY rowid LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![key, count as i64], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };

            {
                let mut delete = tx.prepare("DELETE FROM set_members WHERE rowid = ?1")?;
                for (rowid, _) in &popped {
                    delete.execute(params![rowid])?;
                }
            }

            tx.commit()?;

            Ok(popped.into_iter().map(|(_, member)| member).collect())
        })
        .await
    }

    async fn add(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }

        let key = key.to_string();
        let members = members.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO set_members (set_key, member) VALUES (?1, ?2)",
                )?;
                for member in &members {
                    inserted += stmt.execute(params![key, member])?;
                }
            }
            tx.commit()?;

            Ok(inserted)
        })
        .await
    }

    async fn cardinality(&self, key: &str) -> StoreResult<usize> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM set_members WHERE set_key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }

    async fn scan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
        let key = key.to_string();
        let limit = count.max(1);
        self.with_conn(move |conn| {
            // The cursor is the last rowid returned; rowids only grow
            let mut stmt = conn.prepare(
                "SELECT rowid, member FROM set_members WHERE set_key = ?1 AND rowid > ?2
                 ORDER BY rowid LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(params![key, cursor as i64, limit as i64], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let next = match rows.last() {
                Some((rowid, _)) if rows.len() == limit => *rowid as u64,
                _ => 0,
            };

            Ok(ScanPage {
                cursor: next,
                members: rows.into_iter().map(|(_, member)| member).collect(),
            })
        })
        .await
    }

    async fn members(&self, key: &str) -> StoreResult<Vec<String>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT member FROM set_members WHERE set_key = ?1")?;
            let members = stmt
                .query_map(params![key], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(members)
        })
        .await
    }

    // ===== Values =====

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_values WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set_value(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO kv_values (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }
}
