//! Application Layer
//!
//! Use-case wiring: the ScanOrchestrator builds the provider, batch
//! manager and scheduler from configuration and drives the loop.

pub mod orchestrator;

pub use orchestrator::ScanOrchestrator;
