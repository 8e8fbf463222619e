//! Harvest module - worker pool and refill orchestration
//!
//! This module contains:
//! - [`RefillCoordinator`]: the day-gated master → working queue copy
//! - [`ProxyPool`]: per-fetch proxy selection
//! - [`Worker`]: the per-task pop/process/flush loop
//! - [`Harvester`]: one complete run

mod buffer;
mod coordinator;
mod proxy;
mod refill;
mod worker;

pub use buffer::RecordBuffer;
pub use coordinator::{
    queue_status, HarvestComponents, HarvestOptions, HarvestSummary, Harvester, QueueStatus,
};
pub use proxy::ProxyPool;
pub use refill::{staleness, RefillCoordinator, RefillOutcome, Staleness, MARKER_FORMAT};
pub use worker::{Worker, WorkerContext, WorkerReport, WorkerSettings};
