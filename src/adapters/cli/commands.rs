//! CLI Command Definitions
//!
//! Argument structs for the GemScout binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// GemScout - Early-Gem Discovery for Solana Meme Coins
#[derive(Parser, Debug)]
#[command(
    name = "gemscout",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Early-gem discovery for Solana meme coins",
    long_about = "GemScout aggregates token data from third-party APIs with adaptive \
                  batch fetching, TTL caching and scheduled discovery strategies, and \
                  surfaces early-gem candidates."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the scheduled discovery loop
    Run(RunCmd),

    /// One-shot fetch of prices and metadata for addresses
    Scan(ScanCmd),

    /// Validate a list of token addresses without any network call
    Validate(ValidateCmd),
}

/// Start the scheduled discovery loop
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/gemscout.toml")]
    pub config: PathBuf,

    /// Seconds between scheduler polls
    #[arg(long, value_name = "SECS", default_value = "60")]
    pub poll_secs: u64,
}

/// One-shot scan of specific addresses
#[derive(Parser, Debug)]
pub struct ScanCmd {
    /// Token addresses to fetch
    #[arg(value_name = "ADDRESS", required = true)]
    pub addresses: Vec<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/gemscout.toml")]
    pub config: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, value_name = "FORMAT", default_value = "text")]
    pub format: String,
}

/// Validate addresses locally
#[derive(Parser, Debug)]
pub struct ValidateCmd {
    /// Token addresses to validate
    #[arg(value_name = "ADDRESS", required = true)]
    pub addresses: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let args = vec!["gemscout", "run", "--config", "test.toml"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("test.toml"));
                assert_eq!(cmd.poll_secs, 60);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_run_with_poll() {
        let args = vec!["gemscout", "run", "--poll-secs", "30"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => assert_eq!(cmd.poll_secs, 30),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_scan() {
        let args = vec!["gemscout", "scan", "mintA", "mintB", "--format", "json"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Scan(cmd) => {
                assert_eq!(cmd.addresses, vec!["mintA", "mintB"]);
                assert_eq!(cmd.format, "json");
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_scan_requires_addresses() {
        let args = vec!["gemscout", "scan"];
        assert!(CliApp::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_validate() {
        let args = vec!["gemscout", "validate", "mintA"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Validate(cmd) => assert_eq!(cmd.addresses, vec!["mintA"]),
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = vec!["gemscout", "-v", "--debug", "validate", "mintA"];
        let app = CliApp::try_parse_from(args).unwrap();

        assert!(app.verbose);
        assert!(app.debug);
    }

    #[test]
    fn test_default_config_path() {
        let args = vec!["gemscout", "run"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("config/gemscout.toml"));
            }
            _ => panic!("Expected Run command"),
        }
    }
}
