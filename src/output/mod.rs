//! Output module for flushed record batches
//!
//! This module handles:
//! - Encoding batches as JSON Lines and naming them by content hash
//! - The [`BatchSink`] seam workers flush through
//! - Object store backends the sink writes to

mod batch;
mod object_store;
mod sink;

pub use batch::{content_hash, object_key, parse_batch, serialize_batch};
pub use object_store::{LocalDirStore, MemoryObjectStore, ObjectStore};
pub use sink::{BatchSink, DiscardSink, ObjectBatchSink, SinkError};
