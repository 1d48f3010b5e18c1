#![allow(dead_code, unused_imports, unused_variables)]
//! GemScout - Early-Gem Discovery for Solana Meme Coins
//!
//! Aggregates token data from third-party APIs with adaptive batch fetching
//! and surfaces early-gem candidates from scheduled discovery strategies.
//!
//! # Modules
//!
//! - `domain`: Core business logic (TokenValidator, TokenCandidate, merging)
//! - `ports`: Trait abstractions (TokenDataProvider, DiscoveryStrategy)
//! - `batch`: Batch fetch orchestration (TtlCache, RateLimiter, BatchApiManager)
//! - `scheduler`: Hourly strategy runner with persisted execution history
//! - `strategy`: Built-in discovery strategies (Watchlist)
//! - `adapters`: External implementations (HTTP provider, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: ScanOrchestrator wiring it all together

pub mod domain;
pub mod ports;
pub mod batch;
pub mod scheduler;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
