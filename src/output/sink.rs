//! Batch sinks
//!
//! A sink receives a worker's buffered records once the buffer fills or the
//! queue runs dry. Each flush becomes exactly one write attempt.

use super::batch::{content_hash, object_key, serialize_batch};
use super::object_store::ObjectStore;
use crate::clock::Clock;
use crate::record::ProductRecord;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while flushing a batch
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write object {key}: {message}")]
    Write { key: String, message: String },
}

/// Destination for flushed batches
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Persists `records` as one batch
    ///
    /// # Returns
    ///
    /// * `Ok(Some(key))` - The batch was written under `key`
    /// * `Ok(None)` - Nothing was written (empty input or a discarding sink)
    /// * `Err(SinkError)` - Serialization or the write failed
    async fn flush(&self, records: &[ProductRecord]) -> Result<Option<String>, SinkError>;
}

/// Writes each batch as a content-addressed JSON Lines object
pub struct ObjectBatchSink {
    source: String,
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl ObjectBatchSink {
    /// Creates a sink that writes under the `source` prefix
    pub fn new(source: &str, store: Arc<dyn ObjectStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source: source.to_string(),
            store,
            clock,
        }
    }
}

#[async_trait]
impl BatchSink for ObjectBatchSink {
    async fn flush(&self, records: &[ProductRecord]) -> Result<Option<String>, SinkError> {
        if records.is_empty() {
            return Ok(None);
        }

        let payload = serialize_batch(records)?;
        let hash = content_hash(payload.as_bytes());
        let key = object_key(&self.source, self.clock.now_utc(), &hash);

        self.store.put(&key, payload.into_bytes()).await?;
        tracing::info!(key = %key, records = records.len(), "Flushed batch");

        Ok(Some(key))
    }
}

/// Logs records instead of writing them (test mode)
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

#[async_trait]
impl BatchSink for DiscardSink {
    async fn flush(&self, records: &[ProductRecord]) -> Result<Option<String>, SinkError> {
        for record in records {
            tracing::info!(
                url = %record.product_url,
                title = ?record.title,
                price = ?record.price,
                "Test record (not written)"
            );
        }
        Ok(None)
    }
}
