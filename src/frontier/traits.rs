//! Set-store trait and error types
//!
//! This module defines the interface every queue backend implements: string
//! sets with atomic batched pop, cursor scans, and plain string values.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during set-store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for set-store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One page of a cursor scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call; `0` once the scan is complete
    pub cursor: u64,

    /// Members returned by this page
    pub members: Vec<String>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// Trait for set-semantics store backends
///
/// Implementations are shared between concurrent workers. `pop` must remove
/// and return members atomically so that two concurrent callers never
/// receive the same member.
#[async_trait]
pub trait SetStore: Send + Sync {
    // ===== Sets =====

    /// Removes and returns up to `count` arbitrary members of the set
    async fn pop(&self, key: &str, count: usize) -> StoreResult<Vec<String>>;

    /// Adds members to the set, returning how many were new
    async fn add(&self, key: &str, members: &[String]) -> StoreResult<usize>;

    /// Number of members in the set
    async fn cardinality(&self, key: &str) -> StoreResult<usize>;

    /// Pages through the set starting at `cursor` (`0` starts a new scan)
    ///
    /// `count` is a hint; a page may hold more or fewer members.
    async fn scan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage>;

    /// All members of the set
    async fn members(&self, key: &str) -> StoreResult<Vec<String>>;

    // ===== Values =====

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_value(&self, key: &str, value: &str) -> StoreResult<()>;
}
