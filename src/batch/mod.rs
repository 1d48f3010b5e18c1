//! Batch Fetch Orchestration
//!
//! Everything between "here is a list of addresses" and "here is a map
//! of fetched data": TTL caching, request throttling, batch capability
//! detection and the manager that ties them together.

pub mod cache;
pub mod rate_limiter;
pub mod strategy_select;
pub mod manager;

pub use cache::{TtlCache, TtlCacheStats};
pub use rate_limiter::RateLimiter;
pub use strategy_select::{BatchStrategy, BatchSupport, DataKind, StrategySelector};
pub use manager::{BatchApiManager, BatchConfig, BatchStats, PerformanceReport};
