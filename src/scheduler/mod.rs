//! Scheduled Strategy Runner
//!
//! Hour-slot gated execution of discovery strategies with persisted
//! execution history and cross-strategy data sharing.

pub mod history;
pub mod runner;

pub use history::{slot_key, ExecutionHistory, ExecutionRecord, HistoryError};
pub use runner::{SchedulerConfig, StrategyScheduler};
