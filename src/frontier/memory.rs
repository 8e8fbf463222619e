//! In-process set store

use crate::frontier::traits::{ScanPage, SetStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    sets: HashMap<String, HashSet<String>>,
    values: HashMap<String, String>,
}

/// Set store held entirely in memory
///
/// A single mutex guards all state, which makes `pop` trivially atomic.
#[derive(Debug, Default)]
pub struct MemorySetStore {
    inner: Mutex<Inner>,
}

impl MemorySetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl SetStore for MemorySetStore {
    async fn pop(&self, key: &str, count: usize) -> StoreResult<Vec<String>> {
        let mut inner = self.lock()?;
        let Some(set) = inner.sets.get_mut(key) else {
            return Ok(Vec::new());
        };

        let taken: Vec<String> = set.iter().take(count).cloned().collect();
        for member in &taken {
            set.remove(member);
        }
        if set.is_empty() {
            inner.sets.remove(key);
        }

        Ok(taken)
    }

    async fn add(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }

        let mut inner = self.lock()?;
        let set = inner.sets.entry(key.to_string()).or_default();
        Ok(members
            .iter()
            .filter(|m| set.insert((*m).clone()))
            .count())
    }

    async fn cardinality(&self, key: &str) -> StoreResult<usize> {
        let inner = self.lock()?;
        Ok(inner.sets.get(key).map_or(0, HashSet::len))
    }

    async fn scan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
        let inner = self.lock()?;
        let Some(set) = inner.sets.get(key) else {
            return Ok(ScanPage::default());
        };

        // Sorted so the cursor is a stable offset between calls
        let mut sorted: Vec<&String> = set.iter().collect();
        sorted.sort();

        let start = cursor as usize;
        let end = start.saturating_add(count.max(1)).min(sorted.len());
        let members = sorted
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|m| (*m).clone())
            .collect();
        let next = if end >= sorted.len() { 0 } else { end as u64 };

        Ok(ScanPage {
            cursor: next,
            members,
        })
    }

    async fn members(&self, key: &str) -> StoreResult<Vec<String>> {
        let inner = self.lock()?;
        Ok(inner
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        let inner = self.lock()?;
        Ok(inner.values.get(key).cloned())
    }

    async fn set_value(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
