//! Harvest coordinator - run orchestration
//!
//! This module wires the collaborators together for one run:
//! - Opening the local and remote queue stores
//! - Loading the proxy pool and seeding test URLs
//! - Running the refill decision once
//! - Spawning the worker pool and collecting its reports

use super::proxy::ProxyPool;
use super::refill::{RefillCoordinator, RefillOutcome};
use super::worker::{Worker, WorkerContext, WorkerReport, WorkerSettings};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, QueueKeys};
use crate::fetch::{FetchSettings, HttpFetcher, PageFetcher, RecordExtractor, SelectorExtractor};
use crate::frontier::{open_store, Frontier, SetStore, StoreResult};
use crate::output::{BatchSink, DiscardSink, LocalDirStore, ObjectBatchSink};
use crate::record::{ValidationMode, Validator};
use crate::HarvestError;
use std::sync::Arc;

/// Run switches that do not live in the configuration file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestOptions {
    /// Drain whatever is in the working queue without consulting the master queue
    pub skip_refill: bool,
}

/// Everything a run talks to
pub struct HarvestComponents {
    /// Store holding the working queue, refill marker, proxies and test queue
    pub local: Arc<dyn SetStore>,
    /// Store holding the master queue
    pub remote: Arc<dyn SetStore>,
    pub proxies: ProxyPool,
    pub fetcher: Arc<dyn PageFetcher>,
    pub extractor: Arc<dyn RecordExtractor>,
    pub sink: Arc<dyn BatchSink>,
    pub clock: Arc<dyn Clock>,
}

/// Outcome of a completed run
#[derive(Debug)]
pub struct HarvestSummary {
    /// Queue the workers drained
    pub queue: String,
    /// Refill decision, `None` when refill was skipped
    pub refill: Option<RefillOutcome>,
    /// One report per worker, ordered by worker id
    pub workers: Vec<WorkerReport>,
}

impl HarvestSummary {
    /// Sum of every worker's counters
    pub fn totals(&self) -> WorkerReport {
        self.workers
            .iter()
            .fold(WorkerReport::default(), |mut acc, report| {
                acc.urls_processed += report.urls_processed;
                acc.fetch_failures += report.fetch_failures;
                acc.rejected += report.rejected;
                acc.accepted += report.accepted;
                acc.batches_flushed += report.batches_flushed;
                acc.records_flushed += report.records_flushed;
                acc
            })
    }
}

/// Sizes of the queues behind one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    pub master: usize,
    pub working: usize,
    pub last_refill: Option<String>,
    pub proxies: usize,
}

/// Reads queue sizes and the refill marker without changing anything
pub async fn queue_status(
    local: &dyn SetStore,
    remote: &dyn SetStore,
    keys: &QueueKeys,
) -> StoreResult<QueueStatus> {
    Ok(QueueStatus {
        master: remote.cardinality(&keys.master).await?,
        working: local.cardinality(&keys.working).await?,
        last_refill: local.get_value(&keys.state).await?,
        proxies: local.cardinality(&keys.proxies).await?,
    })
}

/// Runs one harvest: refill, then drain with a fixed worker pool
pub struct Harvester {
    config: Config,
    components: HarvestComponents,
    options: HarvestOptions,
}

impl Harvester {
    /// Creates a harvester from explicit collaborators
    pub fn new(config: Config, components: HarvestComponents, options: HarvestOptions) -> Self {
        Self {
            config,
            components,
            options,
        }
    }

    /// Builds the production collaborators described by `config`
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Stores connected and clients built
    /// * `Err(HarvestError)` - A store is unreachable or a client could not be built
    pub async fn connect(config: Config, options: HarvestOptions) -> Result<Self, HarvestError> {
        let keys = config.queue_keys();
        let test_mode = config.is_test_mode();

        let local = open_store(&config.store.local).await?;
        let remote = open_store(&config.store.remote).await?;

        let proxies = ProxyPool::load(local.as_ref(), config.proxy.enabled, &keys.proxies).await;

        let mut routes: Vec<&str> = proxies.addresses().iter().map(String::as_str).collect();
        if test_mode {
            routes.extend(config.test.proxy.as_deref());
        }
        let fetcher = HttpFetcher::new(FetchSettings::from_config(&config.workers), routes)?;

        let extractor = SelectorExtractor::new(&config.source.retailer, &config.extractor)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let sink: Arc<dyn BatchSink> = if test_mode {
            tracing::info!("Test mode: records are logged, not written");
            Arc::new(DiscardSink)
        } else {
            tracing::info!("Writing batches below {}", config.output.bucket);
            Arc::new(ObjectBatchSink::new(
                &config.source.name,
                Arc::new(LocalDirStore::new(&config.output.bucket)),
                clock.clone(),
            ))
        };

        let components = HarvestComponents {
            local,
            remote,
            proxies,
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            sink,
            clock,
        };

        Ok(Self::new(config, components, options))
    }

    /// Runs the harvest to completion
    ///
    /// Every worker is awaited before returning. If any worker failed, the
    /// first failure (by worker id) is returned.
    pub async fn run(self) -> Result<HarvestSummary, HarvestError> {
        let keys = self.config.queue_keys();
        let test_mode = self.config.is_test_mode();

        let queue = if test_mode && !self.config.test.urls.is_empty() {
            let added = self
                .components
                .local
                .add(&keys.test, &self.config.test.urls)
                .await?;
            tracing::info!("Seeded {} test URLs into {}", added, keys.test);
            keys.test.clone()
        } else {
            keys.working.clone()
        };

        let refill = if self.options.skip_refill {
            tracing::info!("Refill skipped");
            None
        } else if queue != keys.working {
            tracing::info!("Draining test queue {}, refill not needed", queue);
            None
        } else {
            let coordinator = RefillCoordinator::new(
                self.components.remote.clone(),
                self.components.local.clone(),
                &keys,
                self.config.refill.chunk_size as usize,
                self.components.clock.clone(),
            );
            Some(coordinator.run().await)
        };

        let workers = self.spawn_workers(&queue).await?;

        Ok(HarvestSummary {
            queue,
            refill,
            workers,
        })
    }

    async fn spawn_workers(&self, queue: &str) -> Result<Vec<WorkerReport>, HarvestError> {
        let test_mode = self.config.is_test_mode();
        let validation = if test_mode {
            ValidationMode::Test
        } else {
            ValidationMode::Strict
        };

        let ctx = Arc::new(WorkerContext {
            frontier: Frontier::new(self.components.local.clone()),
            queue: queue.to_string(),
            proxies: Arc::new(self.components.proxies.clone()),
            proxy_override: self.config.test.proxy.clone().filter(|_| test_mode),
            fetcher: self.components.fetcher.clone(),
            extractor: self.components.extractor.clone(),
            validator: Validator::new(validation),
            sink: self.components.sink.clone(),
            settings: WorkerSettings {
                urls_per_batch: self.config.workers.urls_per_batch as usize,
                bulk_size: self.config.workers.bulk_size as usize,
                max_items: test_mode.then_some(self.config.test.sample_size as usize),
            },
        });

        let concurrency = self.config.workers.concurrency as usize;
        tracing::info!("Starting {} workers on {}", concurrency, queue);

        let handles: Vec<_> = (0..concurrency)
            .map(|id| (id, tokio::spawn(Worker::new(id, ctx.clone()).run())))
            .collect();

        let mut reports = Vec::with_capacity(concurrency);
        let mut first_error = None;

        for (id, handle) in handles {
            let error = match handle.await {
                Ok(Ok(report)) => {
                    reports.push(report);
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => HarvestError::Worker {
                    worker_id: id,
                    message: e.to_string(),
                },
            };

            tracing::error!("Worker {} failed: {}", id, error);
            if first_error.is_none() {
                first_error = Some(error);
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(reports),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::parse_config;
    use crate::fetch::FetchError;
    use crate::frontier::MemorySetStore;
    use crate::output::{parse_batch, MemoryObjectStore};
    use crate::record::{CandidateRecord, RawPrice};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    const CONFIG: &str = r#"
[source]
name = "acme"
retailer = "acme.example"

[workers]
concurrency = 3
urls-per-batch = 4
bulk-size = 5

[refill]
chunk-size = 7

[output]
bucket = "./unused"

[store.local]
backend = "memory"

[store.remote]
backend = "memory"
"#;

    struct EchoFetcher;

    #[async_trait]
    impl PageFetcher for EchoFetcher {
        async fn fetch(&self, url: &str, _proxy: Option<&str>) -> Result<String, FetchError> {
            Ok(url.to_string())
        }
    }

    struct FixedExtractor;

    impl RecordExtractor for FixedExtractor {
        fn extract(&self, url: &str, _html: &str) -> CandidateRecord {
            CandidateRecord {
                retailer: Some("acme.example".to_string()),
                product_url: Some(url.to_string()),
                retailers_brand: Some("Bosch".to_string()),
                price: Some(RawPrice::Number(9.99)),
                title: Some("Oil Filter".to_string()),
                retailers_mpn: Some("3323".to_string()),
                ..CandidateRecord::default()
            }
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://acme.example/p/{}", i)).collect()
    }

    fn harvester(
        config: Config,
        local: Arc<MemorySetStore>,
        remote: Arc<MemorySetStore>,
        objects: Arc<MemoryObjectStore>,
        options: HarvestOptions,
    ) -> Harvester {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::on_date(
            NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
        ));
        let components = HarvestComponents {
            local,
            remote,
            proxies: ProxyPool::empty(),
            fetcher: Arc::new(EchoFetcher),
            extractor: Arc::new(FixedExtractor),
            sink: Arc::new(ObjectBatchSink::new("acme", objects, clock.clone())),
            clock,
        };
        Harvester::new(config, components, options)
    }

    #[tokio::test]
    async fn test_run_refills_then_drains_everything() {
        let config = parse_config(CONFIG).unwrap();
        let keys = config.queue_keys();
        let local = Arc::new(MemorySetStore::new());
        let remote = Arc::new(MemorySetStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        remote.add(&keys.master, &urls(23)).await.unwrap();

        let summary = harvester(
            config,
            local.clone(),
            remote.clone(),
            objects.clone(),
            HarvestOptions::default(),
        )
        .run()
        .await
        .unwrap();

        assert!(matches!(
            summary.refill,
            Some(RefillOutcome::Refilled { copied: 23, .. })
        ));
        assert_eq!(summary.workers.len(), 3);
        assert_eq!(summary.totals().urls_processed, 23);
        assert_eq!(summary.totals().records_flushed, 23);
        assert_eq!(local.cardinality(&keys.working).await.unwrap(), 0);
        assert_eq!(remote.cardinality(&keys.master).await.unwrap(), 23);

        let mut written: Vec<String> = objects
            .objects()
            .values()
            .flat_map(|payload| parse_batch(std::str::from_utf8(payload).unwrap()).unwrap())
            .map(|record| record.product_url)
            .collect();
        written.sort();
        let mut expected = urls(23);
        expected.sort();
        assert_eq!(written, expected);

        assert!(objects
            .objects()
            .keys()
            .all(|key| key.starts_with("acme/2024/03/07/")));
    }

    #[tokio::test]
    async fn test_skip_refill_leaves_master_alone() {
        let config = parse_config(CONFIG).unwrap();
        let keys = config.queue_keys();
        let local = Arc::new(MemorySetStore::new());
        let remote = Arc::new(MemorySetStore::new());
        remote.add(&keys.master, &urls(5)).await.unwrap();

        let summary = harvester(
            config,
            local.clone(),
            remote,
            Arc::new(MemoryObjectStore::new()),
            HarvestOptions { skip_refill: true },
        )
        .run()
        .await
        .unwrap();

        assert!(summary.refill.is_none());
        assert_eq!(summary.totals().urls_processed, 0);
        assert_eq!(local.get_value(&keys.state).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_test_urls_drain_test_queue_only() {
        let mut config = parse_config(CONFIG).unwrap();
        config.test.enabled = true;
        config.test.urls = urls(2);
        config.test.sample_size = 5;
        let keys = config.queue_keys();

        let local = Arc::new(MemorySetStore::new());
        let remote = Arc::new(MemorySetStore::new());
        remote.add(&keys.master, &urls(10)).await.unwrap();

        let summary = harvester(
            config,
            local.clone(),
            remote,
            Arc::new(MemoryObjectStore::new()),
            HarvestOptions::default(),
        )
        .run()
        .await
        .unwrap();

        assert_eq!(summary.queue, keys.test);
        assert!(summary.refill.is_none());
        assert_eq!(summary.totals().urls_processed, 2);
        assert_eq!(local.cardinality(&keys.working).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_queue_status() {
        let config = parse_config(CONFIG).unwrap();
        let keys = config.queue_keys();
        let local = MemorySetStore::new();
        let remote = MemorySetStore::new();
        remote.add(&keys.master, &urls(4)).await.unwrap();
        local.add(&keys.working, &urls(2)).await.unwrap();
        local.set_value(&keys.state, "2024-03-06").await.unwrap();

        let status = queue_status(&local, &remote, &keys).await.unwrap();

        assert_eq!(
            status,
            QueueStatus {
                master: 4,
                working: 2,
                last_refill: Some("2024-03-06".to_string()),
                proxies: 0,
            }
        );
    }
}
