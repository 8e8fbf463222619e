//! Worker-local record buffer

use crate::record::ProductRecord;

/// Ordered, append-only buffer flushed once it reaches its threshold
///
/// The buffer is owned by a single worker and never shared. Its contents are
/// lost if the process dies before a flush.
#[derive(Debug)]
pub struct RecordBuffer {
    records: Vec<ProductRecord>,
    threshold: usize,
}

impl RecordBuffer {
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            records: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Appends a record; callers flush as soon as [`is_full`](Self::is_full) holds
    pub fn push(&mut self, record: ProductRecord) {
        debug_assert!(self.records.len() < self.threshold);
        self.records.push(record);
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.threshold
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
