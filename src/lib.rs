// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod stats;

// ---- Re-exports for stable public API ----
pub use crate::config::{PipelineConfig, TrackerConfig};
pub use crate::error::{ConfigError, FetchError};
pub use crate::ingest::{Fetcher, Post};
pub use crate::pipeline::run;
pub use crate::stats::{AggregateStore, LogReporter, Report, Reporter};
