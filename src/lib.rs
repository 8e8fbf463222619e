//! Shelf-Harvest: a queue-driven product harvesting pipeline
//!
//! This crate drains product URLs from a shared working queue with a pool of
//! concurrent workers, extracts and validates product records, and flushes
//! them in batches to content-addressed objects. A day-gated refill protocol
//! keeps the local working queue topped up from a remote master queue.

pub mod clock;
pub mod config;
pub mod fetch;
pub mod frontier;
pub mod harvest;
pub mod output;
pub mod record;

use thiserror::Error;

/// Main error type for Shelf-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue store error: {0}")]
    Store(#[from] frontier::StoreError),

    #[error("Batch sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Worker {worker_id} did not finish: {message}")]
    Worker { worker_id: usize, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Shelf-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use frontier::{Frontier, SetStore, WorkItem};
pub use harvest::{Harvester, RefillCoordinator, RefillOutcome, Worker, WorkerReport};
pub use record::{CandidateRecord, ProductRecord, ValidationMode, Validator};
