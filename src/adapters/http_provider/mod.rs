//! HTTP Data Provider Adapter
//!
//! One configurable JSON gateway client implementing the provider
//! port. Vendor-specific connectors live behind the same gateway and
//! are not part of this crate.

pub mod client;
pub mod types;

pub use client::{HttpProvider, HttpProviderConfig};
