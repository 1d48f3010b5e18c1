//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - HTTP Provider: JSON data gateway client
//! - CLI: Command-line argument definitions

pub mod http_provider;
pub mod cli;

pub use http_provider::{HttpProvider, HttpProviderConfig};
pub use cli::CliApp;
