//! CLI Adapter
//!
//! Command-line interface for GemScout.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, RunCmd, ScanCmd, ValidateCmd};
