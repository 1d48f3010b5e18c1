//! GemScout - Early-Gem Discovery for Solana Meme Coins
//!
//! Aggregates token data with adaptive batch fetching and runs
//! scheduled discovery strategies over a shared data pool.

mod domain;
mod ports;
mod batch;
mod scheduler;
mod strategy;
mod adapters;
mod config;
mod application;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::cli::{CliApp, Command, RunCmd, ScanCmd, ValidateCmd};
use crate::application::ScanOrchestrator;
use crate::config::load_config;
use crate::domain::validator::TokenValidator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (API keys go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug);

    match app.command {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Scan(cmd) => scan_command(cmd).await,
        Command::Validate(cmd) => validate_command(cmd),
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn run_command(cmd: RunCmd) -> Result<()> {
    tracing::info!("Starting GemScout discovery loop...");

    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let orchestrator = ScanOrchestrator::from_config(&config, Duration::from_secs(cmd.poll_secs))
        .context("Failed to build orchestrator")?;

    // Ctrl+C stops the loop after the current iteration
    let orch = orchestrator.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        orch.stop();
    });

    orchestrator.run().await?;
    tracing::info!("GemScout stopped");
    Ok(())
}

async fn scan_command(cmd: ScanCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let orchestrator = ScanOrchestrator::from_config(&config, Duration::from_secs(60))
        .context("Failed to build orchestrator")?;

    let (prices, metadata) = orchestrator.scan_once(&cmd.addresses).await;

    match cmd.format.as_str() {
        "json" => {
            let output = serde_json::json!({
                "prices": prices,
                "metadata": metadata,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            for address in &cmd.addresses {
                let symbol = metadata
                    .get(address)
                    .and_then(|m| m.symbol.as_deref())
                    .unwrap_or("?");
                match prices.get(address) {
                    Some(price) => {
                        println!("{address}  {symbol}  ${:.8}", price.price_usd);
                    }
                    None => {
                        println!("{address}  {symbol}  (no data)");
                    }
                }
            }
        }
    }

    let report = orchestrator.manager().get_performance_stats().await;
    tracing::info!(
        made = report.api_calls.made,
        saved = report.api_calls.saved,
        "api call usage"
    );
    Ok(())
}

fn validate_command(cmd: ValidateCmd) -> Result<()> {
    let mut validator = TokenValidator::new();
    let (valid, report) = validator.validate_batch(&cmd.addresses);

    println!("Input:      {}", report.input_count);
    println!("Valid:      {}", report.valid_count);
    println!("Filtered:   {}", report.filtered_count);
    println!("Duplicates: {}", report.duplicates_removed);

    if !report.invalid_format.is_empty() {
        println!("\nInvalid format:");
        for address in &report.invalid_format {
            println!("  {address}");
        }
    }
    if !report.excluded_tokens.is_empty() {
        println!("\nExcluded (major/stablecoin):");
        for address in &report.excluded_tokens {
            println!("  {address}");
        }
    }
    if !valid.is_empty() {
        println!("\nValid addresses:");
        for address in &valid {
            println!("  {address}");
        }
    }
    Ok(())
}
