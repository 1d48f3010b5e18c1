//! Strategy Layer - Built-in Discovery Strategies
//!
//! Discovery strategies implement `ports::strategy::DiscoveryStrategy`
//! and are registered with the scheduler. The watchlist strategy is the
//! built-in reference implementation; production deployments register
//! additional heuristics through the same trait.

pub mod watchlist;

pub use watchlist::{WatchlistConfig, WatchlistStrategy};
