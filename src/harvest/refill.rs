//! Day-gated refill of the working queue from the master queue
//!
//! The working queue is only refilled when it is empty and the refill marker
//! does not already hold today's date. The marker is written last, so a
//! refill interrupted part way is simply repeated from the start next run.

use crate::clock::Clock;
use crate::config::QueueKeys;
use crate::frontier::{SetStore, StoreError, StoreResult};
use chrono::NaiveDate;
use std::sync::Arc;

/// Date format of the refill marker
pub const MARKER_FORMAT: &str = "%Y-%m-%d";

/// How the refill marker relates to today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// No marker has ever been written
    Never,
    /// The marker holds today's date
    Today,
    /// The marker holds any other date, or is unreadable
    Stale,
}

/// Classifies a refill marker against today's date
pub fn staleness(marker: Option<&str>, today: NaiveDate) -> Staleness {
    let Some(marker) = marker else {
        return Staleness::Never;
    };

    match NaiveDate::parse_from_str(marker.trim(), MARKER_FORMAT) {
        Ok(date) if date == today => Staleness::Today,
        Ok(_) => Staleness::Stale,
        Err(_) => {
            tracing::warn!("Unreadable refill marker '{}', treating as stale", marker);
            Staleness::Stale
        }
    }
}

/// Result of one refill decision
#[derive(Debug)]
pub enum RefillOutcome {
    /// Workers still have items to drain
    WorkingQueueNotEmpty,

    /// The master queue was already copied today
    AlreadyRefilledToday,

    /// The master queue was copied and the marker set to `date`
    Refilled { copied: usize, date: NaiveDate },

    /// Checking or copying failed; the marker was left untouched
    Failed { error: StoreError },
}

impl RefillOutcome {
    pub fn is_refilled(&self) -> bool {
        matches!(self, Self::Refilled { .. })
    }
}

/// Copies the remote master queue into the local working queue
pub struct RefillCoordinator {
    remote: Arc<dyn SetStore>,
    local: Arc<dyn SetStore>,
    master_key: String,
    working_key: String,
    state_key: String,
    chunk_size: usize,
    clock: Arc<dyn Clock>,
}

impl RefillCoordinator {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `remote` - Store holding the master queue
    /// * `local` - Store holding the working queue and the refill marker
    /// * `keys` - Resolved queue and marker keys
    /// * `chunk_size` - Members requested per scan page
    /// * `clock` - Source of today's date
    pub fn new(
        remote: Arc<dyn SetStore>,
        local: Arc<dyn SetStore>,
        keys: &QueueKeys,
        chunk_size: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            remote,
            local,
            master_key: keys.master.clone(),
            working_key: keys.working.clone(),
            state_key: keys.state.clone(),
            chunk_size: chunk_size.max(1),
            clock,
        }
    }

    /// Runs the refill decision once
    ///
    /// Never returns an error; failures are logged and reported as
    /// [`RefillOutcome::Failed`].
    pub async fn run(&self) -> RefillOutcome {
        match self.try_run().await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!("Refill of {} failed: {}", self.working_key, error);
                RefillOutcome::Failed { error }
            }
        }
    }

    async fn try_run(&self) -> StoreResult<RefillOutcome> {
        let pending = self.local.cardinality(&self.working_key).await?;
        if pending > 0 {
            tracing::info!(
                "Working queue {} still holds {} items, skipping refill",
                self.working_key,
                pending
            );
            return Ok(RefillOutcome::WorkingQueueNotEmpty);
        }

        let today = self.clock.today();
        let marker = self.local.get_value(&self.state_key).await?;

        match staleness(marker.as_deref(), today) {
            Staleness::Today => {
                tracing::info!("Working queue already refilled on {}", today);
                return Ok(RefillOutcome::AlreadyRefilledToday);
            }
            Staleness::Never => tracing::info!("No refill marker found, starting first refill"),
            Staleness::Stale => tracing::info!(
                "Last refill was {}, refilling",
                marker.as_deref().unwrap_or_default()
            ),
        }

        let copied = self.copy_master().await?;

        self.local
            .set_value(&self.state_key, &today.format(MARKER_FORMAT).to_string())
            .await?;

        tracing::info!(
            "Refilled {} with {} items from {}",
            self.working_key,
            copied,
            self.master_key
        );
        Ok(RefillOutcome::Refilled {
            copied,
            date: today,
        })
    }

    async fn copy_master(&self) -> StoreResult<usize> {
        let mut cursor = 0;
        let mut copied = 0;

        loop {
            let page = self
                .remote
                .scan(&self.master_key, cursor, self.chunk_size)
                .await?;
            copied += self.local.add(&self.working_key, &page.members).await?;
            tracing::debug!(
                "Copied chunk of {} members (cursor {})",
                page.members.len(),
                page.cursor
            );

            if page.is_last() {
                break;
            }
            cursor = page.cursor;
        }

        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::frontier::{MemorySetStore, ScanPage};
    use async_trait::async_trait;

    fn keys() -> QueueKeys {
        QueueKeys {
            master: "acme_sitemap_urls_master".to_string(),
            working: "acme_urls_temp".to_string(),
            state: "acme_scraping_state".to_string(),
            proxies: "acme_proxies".to_string(),
            test: "acme_test_set".to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://shop.example/p/{}", i)).collect()
    }

    fn coordinator(
        remote: Arc<dyn SetStore>,
        local: Arc<dyn SetStore>,
        today: NaiveDate,
    ) -> RefillCoordinator {
        RefillCoordinator::new(remote, local, &keys(), 4, Arc::new(FixedClock::on_date(today)))
    }

    /// Delegates to a memory store but fails every scan after the first page
    struct FlakyMaster {
        inner: MemorySetStore,
    }

    #[async_trait]
    impl SetStore for FlakyMaster {
        async fn pop(&self, key: &str, count: usize) -> StoreResult<Vec<String>> {
            self.inner.pop(key, count).await
        }
        async fn add(&self, key: &str, members: &[String]) -> StoreResult<usize> {
            self.inner.add(key, members).await
        }
        async fn cardinality(&self, key: &str) -> StoreResult<usize> {
            self.inner.cardinality(key).await
        }
        async fn scan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
            if cursor != 0 {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            self.inner.scan(key, cursor, count).await
        }
        async fn members(&self, key: &str) -> StoreResult<Vec<String>> {
            self.inner.members(key).await
        }
        async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get_value(key).await
        }
        async fn set_value(&self, key: &str, value: &str) -> StoreResult<()> {
            self.inner.set_value(key, value).await
        }
    }

    #[test]
    fn test_staleness() {
        let today = date(2024, 3, 7);
        assert_eq!(staleness(None, today), Staleness::Never);
        assert_eq!(staleness(Some("2024-03-07"), today), Staleness::Today);
        assert_eq!(staleness(Some("2024-03-06"), today), Staleness::Stale);
        assert_eq!(staleness(Some("2024-03-08"), today), Staleness::Stale);
        assert_eq!(staleness(Some("yesterday"), today), Staleness::Stale);
    }

    #[tokio::test]
    async fn test_stale_marker_triggers_full_copy() {
        let remote = Arc::new(MemorySetStore::new());
        let local = Arc::new(MemorySetStore::new());
        remote.add(&keys().master, &urls(10)).await.unwrap();
        local.set_value(&keys().state, "2024-03-06").await.unwrap();

        let outcome = coordinator(remote, local.clone(), date(2024, 3, 7)).run().await;

        assert!(matches!(
            outcome,
            RefillOutcome::Refilled { copied: 10, date: d } if d == date(2024, 3, 7)
        ));
        assert_eq!(local.cardinality(&keys().working).await.unwrap(), 10);
        assert_eq!(
            local.get_value(&keys().state).await.unwrap().as_deref(),
            Some("2024-03-07")
        );
    }

    #[tokio::test]
    async fn test_missing_marker_triggers_copy() {
        let remote = Arc::new(MemorySetStore::new());
        let local = Arc::new(MemorySetStore::new());
        remote.add(&keys().master, &urls(3)).await.unwrap();

        let outcome = coordinator(remote, local.clone(), date(2024, 3, 7)).run().await;

        assert!(outcome.is_refilled());
        assert_eq!(local.cardinality(&keys().working).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_second_run_same_day_is_noop() {
        let remote = Arc::new(MemorySetStore::new());
        let local = Arc::new(MemorySetStore::new());
        remote.add(&keys().master, &urls(5)).await.unwrap();
        let refill = coordinator(remote, local.clone(), date(2024, 3, 7));

        assert!(refill.run().await.is_refilled());

        // Drain the working queue as the workers would
        local.pop(&keys().working, 100).await.unwrap();

        let outcome = refill.run().await;
        assert!(matches!(outcome, RefillOutcome::AlreadyRefilledToday));
        assert_eq!(local.cardinality(&keys().working).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_empty_working_queue_is_left_alone() {
        let remote = Arc::new(MemorySetStore::new());
        let local = Arc::new(MemorySetStore::new());
        remote.add(&keys().master, &urls(5)).await.unwrap();
        local
            .add(&keys().working, &["https://shop.example/left-over".to_string()])
            .await
            .unwrap();

        let outcome = coordinator(remote, local.clone(), date(2024, 3, 7)).run().await;

        assert!(matches!(outcome, RefillOutcome::WorkingQueueNotEmpty));
        assert_eq!(local.cardinality(&keys().working).await.unwrap(), 1);
        assert_eq!(local.get_value(&keys().state).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_failure_leaves_marker_untouched() {
        let remote = Arc::new(FlakyMaster {
            inner: MemorySetStore::new(),
        });
        remote.add(&keys().master, &urls(10)).await.unwrap();
        let local = Arc::new(MemorySetStore::new());
        local.set_value(&keys().state, "2024-03-06").await.unwrap();

        let outcome = coordinator(remote, local.clone(), date(2024, 3, 7)).run().await;

        assert!(matches!(outcome, RefillOutcome::Failed { .. }));
        assert_eq!(
            local.get_value(&keys().state).await.unwrap().as_deref(),
            Some("2024-03-06")
        );
    }
}
