//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, these traits abstract:
//! - Upstream token data providers (prices, metadata, overview, security)
//! - Discovery strategies registered with the scheduler

pub mod provider;
pub mod strategy;
pub mod mocks;

pub use provider::{
    ProviderError, TokenDataProvider, TokenMetadata, TokenOverview, TokenPrice, TokenSecurity,
};
pub use strategy::{DiscoveryStrategy, StrategyError};
