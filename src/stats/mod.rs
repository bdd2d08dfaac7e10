// src/stats/mod.rs
pub mod report;
pub mod store;

pub use report::{LogReporter, Report, Reporter};
pub use store::{AggregateStore, ApplyOutcome, Snapshot};
