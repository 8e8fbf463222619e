//! Frontier module: the shared work queues
//!
//! This module handles:
//! - The [`SetStore`] trait and its SQLite, Redis and in-memory backends
//! - The [`Frontier`] facade the workers and refill coordinator use
//! - Opening a store from its configuration

mod memory;
mod redis_store;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemorySetStore;
pub use redis_store::RedisSetStore;
pub use sqlite::SqliteSetStore;
pub use traits::{ScanPage, SetStore, StoreError, StoreResult};

use crate::config::StoreConfig;
use std::path::Path;
use std::sync::Arc;

/// A unit of work: one product URL
pub type WorkItem = String;

/// Opens the set store described by `config`
///
/// # Arguments
///
/// * `config` - Connection parameters for one store
///
/// # Returns
///
/// * `Ok(Arc<dyn SetStore>)` - Connected store
/// * `Err(StoreError)` - The database could not be opened or the server is unreachable
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn SetStore>> {
    let store: Arc<dyn SetStore> = match config {
        StoreConfig::Sqlite { path } => Arc::new(SqliteSetStore::new(Path::new(path))?),
        StoreConfig::Redis { url } => Arc::new(RedisSetStore::connect(url).await?),
        StoreConfig::Memory => Arc::new(MemorySetStore::new()),
    };
    Ok(store)
}

/// Typed view of the work queues held in a set store
///
/// Cloning is cheap; every clone talks to the same store.
#[derive(Clone)]
pub struct Frontier {
    store: Arc<dyn SetStore>,
}

impl Frontier {
    pub fn new(store: Arc<dyn SetStore>) -> Self {
        Self { store }
    }

    /// Atomically removes and returns up to `n` items from `queue`
    ///
    /// An empty result means the queue is exhausted. Item order is arbitrary.
    pub async fn pop_batch(&self, queue: &str, n: usize) -> StoreResult<Vec<WorkItem>> {
        self.store.pop(queue, n).await
    }

    /// Adds items to `queue`; items already present are absorbed
    ///
    /// Returns the number of newly added items.
    pub async fn refill(&self, queue: &str, items: &[WorkItem]) -> StoreResult<usize> {
        self.store.add(queue, items).await
    }

    pub async fn is_empty(&self, queue: &str) -> StoreResult<bool> {
        Ok(self.store.cardinality(queue).await? == 0)
    }

    pub async fn len(&self, queue: &str) -> StoreResult<usize> {
        self.store.cardinality(queue).await
    }
}
