//! Harvest worker loop
//!
//! Each worker is a sequential loop: pop a batch of URLs, process each one
//! (proxy, fetch, extract, validate), buffer accepted records and flush the
//! buffer whenever it fills. An empty pop ends the loop after a final flush.

use super::buffer::RecordBuffer;
use super::proxy::ProxyPool;
use crate::fetch::{PageFetcher, RecordExtractor};
use crate::frontier::Frontier;
use crate::output::BatchSink;
use crate::record::Validator;
use crate::HarvestError;
use std::sync::Arc;

/// Per-worker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// URLs requested per pop
    pub urls_per_batch: usize,

    /// Buffered records that trigger a flush
    pub bulk_size: usize,

    /// Stop after this many URLs (test sampling); `None` drains the queue
    pub max_items: Option<usize>,
}

/// Collaborators shared by every worker of a run
pub struct WorkerContext {
    pub frontier: Frontier,
    pub queue: String,
    pub proxies: Arc<ProxyPool>,
    pub proxy_override: Option<String>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub extractor: Arc<dyn RecordExtractor>,
    pub validator: Validator,
    pub sink: Arc<dyn BatchSink>,
    pub settings: WorkerSettings,
}

/// Counters for one worker's run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub urls_processed: usize,
    pub fetch_failures: usize,
    pub rejected: usize,
    pub accepted: usize,
    pub batches_flushed: usize,
    pub records_flushed: usize,
}

impl WorkerReport {
    fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Self::default()
        }
    }
}

/// One harvest worker
pub struct Worker {
    id: usize,
    ctx: Arc<WorkerContext>,
    buffer: RecordBuffer,
    report: WorkerReport,
}

impl Worker {
    pub fn new(id: usize, ctx: Arc<WorkerContext>) -> Self {
        let buffer = RecordBuffer::new(ctx.settings.bulk_size);
        Self {
            id,
            ctx,
            buffer,
            report: WorkerReport::new(id),
        }
    }

    /// Drains the queue until it is empty or the item cap is reached
    ///
    /// # Returns
    ///
    /// * `Ok(WorkerReport)` - The queue ran dry (or the cap was hit) and the
    ///   buffer was flushed
    /// * `Err(HarvestError)` - A flush failed, or a pop failed (after the
    ///   buffer was flushed)
    pub async fn run(mut self) -> Result<WorkerReport, HarvestError> {
        tracing::debug!("Worker {} started on {}", self.id, self.ctx.queue);

        loop {
            let Some(request) = self.next_batch_size() else {
                tracing::info!(
                    "Worker {} reached its limit of {} items",
                    self.id,
                    self.report.urls_processed
                );
                break;
            };

            let batch = match self.ctx.frontier.pop_batch(&self.ctx.queue, request).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!(
                        "Worker {} failed to pop from {}: {}",
                        self.id,
                        self.ctx.queue,
                        e
                    );
                    self.flush().await?;
                    return Err(e.into());
                }
            };

            if batch.is_empty() {
                tracing::debug!("Worker {} found {} empty", self.id, self.ctx.queue);
                break;
            }

            for url in batch {
                self.process(&url).await?;
            }
        }

        self.flush().await?;

        tracing::info!(
            "Worker {} finished: {} urls, {} fetch failures, {} rejected, {} accepted, \
             {} records written in {} batches",
            self.id,
            self.report.urls_processed,
            self.report.fetch_failures,
            self.report.rejected,
            self.report.accepted,
            self.report.records_flushed,
            self.report.batches_flushed
        );
        Ok(self.report)
    }

    /// Size of the next pop, or `None` once the item cap is used up
    fn next_batch_size(&self) -> Option<usize> {
        let per_batch = self.ctx.settings.urls_per_batch.max(1);
        match self.ctx.settings.max_items {
            None => Some(per_batch),
            Some(max) => {
                let remaining = max.saturating_sub(self.report.urls_processed);
                (remaining > 0).then(|| per_batch.min(remaining))
            }
        }
    }

    async fn process(&mut self, url: &str) -> Result<(), HarvestError> {
        self.report.urls_processed += 1;

        let proxy = self.ctx.proxies.select(self.ctx.proxy_override.as_deref());
        let html = match self.ctx.fetcher.fetch(url, proxy.as_deref()).await {
            Ok(html) => html,
            Err(e) => {
                self.report.fetch_failures += 1;
                tracing::warn!(worker = self.id, url, proxy = ?proxy, "Fetch failed: {}", e);
                return Ok(());
            }
        };

        let candidate = self.ctx.extractor.extract(url, &html);
        match self.ctx.validator.validate(candidate) {
            Ok(record) => {
                self.report.accepted += 1;
                self.buffer.push(record);
            }
            Err(rejection) => {
                self.report.rejected += 1;
                tracing::warn!(
                    worker = self.id,
                    url,
                    field = rejection.field,
                    reason = %rejection.reason,
                    "Record rejected"
                );
                return Ok(());
            }
        }

        if self.buffer.is_full() {
            self.flush().await?;
        }
        Ok(())
    }

    /// Writes the buffer through the sink; the buffer is kept if the write fails
    ///
    /// Only batches the sink actually stored count towards the flush totals.
    async fn flush(&mut self) -> Result<(), HarvestError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let count = self.buffer.len();
        let written = match self.ctx.sink.flush(self.buffer.records()).await {
            Ok(key) => key.is_some(),
            Err(e) => {
                tracing::error!("Worker {} failed to flush {} records: {}", self.id, count, e);
                return Err(e.into());
            }
        };

        self.buffer.clear();
        if written {
            self.report.batches_flushed += 1;
            self.report.records_flushed += count;
        }
        Ok(())
    }
}
