//! Outbound proxy selection

use crate::frontier::SetStore;
use rand::seq::SliceRandom;

/// Proxy addresses loaded once per run
///
/// The pool is read-only after loading and shared by every worker.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    proxies: Vec<String>,
}

impl ProxyPool {
    pub fn new(proxies: Vec<String>) -> Self {
        Self { proxies }
    }

    /// A pool that always fetches directly
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the pool from a set in the local store
    ///
    /// Returns an empty pool when proxies are disabled or the set cannot be
    /// read; fetches then go out directly.
    pub async fn load(store: &dyn SetStore, enabled: bool, key: &str) -> Self {
        if !enabled {
            tracing::debug!("Proxies disabled, fetching directly");
            return Self::empty();
        }

        match store.members(key).await {
            Ok(mut proxies) => {
                proxies.retain(|p| !p.trim().is_empty());
                proxies.sort();
                tracing::info!("Loaded {} proxies from {}", proxies.len(), key);
                Self::new(proxies)
            }
            Err(e) => {
                tracing::warn!("Failed to load proxies from {}: {}", key, e);
                Self::empty()
            }
        }
    }

    /// Picks the proxy for one fetch
    ///
    /// A test override always wins. Otherwise a proxy is chosen uniformly at
    /// random; `None` means fetch directly.
    pub fn select(&self, test_override: Option<&str>) -> Option<String> {
        if let Some(proxy) = test_override {
            return Some(proxy.to_string());
        }
        self.proxies.choose(&mut rand::thread_rng()).cloned()
    }

    pub fn addresses(&self) -> &[String] {
        &self.proxies
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::{MemorySetStore, ScanPage, StoreError, StoreResult};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl SetStore for BrokenStore {
        async fn pop(&self, _: &str, _: usize) -> StoreResult<Vec<String>> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn add(&self, _: &str, _: &[String]) -> StoreResult<usize> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn cardinality(&self, _: &str) -> StoreResult<usize> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn scan(&self, _: &str, _: u64, _: usize) -> StoreResult<ScanPage> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn members(&self, _: &str) -> StoreResult<Vec<String>> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn get_value(&self, _: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn set_value(&self, _: &str, _: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[test]
    fn test_empty_pool_fetches_directly() {
        assert_eq!(ProxyPool::empty().select(None), None);
    }

    #[test]
    fn test_override_wins() {
        let pool = ProxyPool::new(vec!["http://p1:8080".to_string()]);
        assert_eq!(
            pool.select(Some("http://test:3128")).as_deref(),
            Some("http://test:3128")
        );
        assert_eq!(
            ProxyPool::empty().select(Some("http://test:3128")).as_deref(),
            Some("http://test:3128")
        );
    }

    #[test]
    fn test_select_draws_from_pool() {
        let pool = ProxyPool::new(vec!["http://p1:8080".into(), "http://p2:8080".into()]);
        for _ in 0..20 {
            let chosen = pool.select(None).unwrap();
            assert!(pool.addresses().contains(&chosen));
        }
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let store = MemorySetStore::new();
        store
            .add(
                "acme_proxies",
                &["http://p1:8080".to_string(), "http://p2:8080".to_string()],
            )
            .await
            .unwrap();

        let pool = ProxyPool::load(&store, true, "acme_proxies").await;
        assert_eq!(pool.len(), 2);

        let disabled = ProxyPool::load(&store, false, "acme_proxies").await;
        assert!(disabled.is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_yields_empty_pool() {
        let pool = ProxyPool::load(&BrokenStore, true, "acme_proxies").await;
        assert!(pool.is_empty());
    }
}
