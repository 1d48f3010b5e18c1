//! Scan Orchestrator
//!
//! Wires config, provider, batch manager and scheduler together and
//! drives the periodic discovery loop. Also backs the one-shot CLI
//! scan path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::adapters::http_provider::{HttpProvider, HttpProviderConfig};
use crate::batch::manager::BatchApiManager;
use crate::config::Config;
use crate::domain::candidate::TokenCandidate;
use crate::ports::provider::{TokenDataProvider, TokenMetadata, TokenPrice};
use crate::scheduler::runner::StrategyScheduler;
use crate::strategy::watchlist::WatchlistStrategy;

/// Coordinates the scheduled discovery loop
#[derive(Clone)]
pub struct ScanOrchestrator {
    provider: Arc<dyn TokenDataProvider>,
    manager: Arc<BatchApiManager>,
    scheduler: Arc<StrategyScheduler>,
    poll_interval: Duration,
    is_running: Arc<AtomicBool>,
}

impl ScanOrchestrator {
    /// Create an orchestrator from already-built components
    pub fn new(
        provider: Arc<dyn TokenDataProvider>,
        manager: Arc<BatchApiManager>,
        scheduler: Arc<StrategyScheduler>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            manager,
            scheduler,
            poll_interval,
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build the whole stack from configuration
    pub fn from_config(config: &Config, poll_interval: Duration) -> Result<Self> {
        let provider_config = HttpProviderConfig {
            base_url: config.provider.base_url.clone(),
            api_key: config.provider.get_api_key(),
            timeout: Duration::from_secs(config.provider.timeout_secs),
            max_retries: config.provider.max_retries,
            retry_base_delay_ms: config.provider.retry_base_delay_ms,
            max_batch_size: config.batch.max_batch_size,
        };
        let provider: Arc<dyn TokenDataProvider> = Arc::new(
            HttpProvider::with_config(provider_config)
                .context("Failed to create HTTP provider")?,
        );

        let batch_config = config
            .batch
            .to_batch_config()
            .context("Invalid batch configuration")?;
        let manager = Arc::new(BatchApiManager::with_config(
            Arc::clone(&provider),
            batch_config,
        ));

        let mut scheduler = StrategyScheduler::new(config.scheduler.to_scheduler_config());
        if !config.watchlist.addresses.is_empty() {
            scheduler.register(Arc::new(WatchlistStrategy::from_addresses(
                config.watchlist.addresses.clone(),
            )));
        }

        Ok(Self::new(
            provider,
            manager,
            Arc::new(scheduler),
            poll_interval,
        ))
    }

    /// Drive the discovery loop until stopped
    pub async fn run(&self) -> Result<()> {
        self.is_running.store(true, Ordering::SeqCst);
        tracing::info!(
            strategies = self.scheduler.strategy_count(),
            poll_secs = self.poll_interval.as_secs(),
            "discovery loop started"
        );

        while self.is_running.load(Ordering::SeqCst) {
            let now = Utc::now();
            let scan_id = format!("scan-{}", now.timestamp());

            let candidates = self
                .scheduler
                .run_due_with_sharing(&self.manager, Arc::clone(&self.provider), now, Some(&scan_id))
                .await;

            if !candidates.is_empty() {
                self.report_candidates(&scan_id, &candidates);
                self.scheduler.clean_expired(now).await;

                let report = self.manager.get_performance_stats().await;
                tracing::info!(
                    api_calls_made = report.api_calls.made,
                    api_calls_saved = report.api_calls.saved,
                    savings_ratio = format!("{:.2}", report.api_calls.savings_ratio),
                    "batch performance"
                );
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::info!("discovery loop stopped");
        Ok(())
    }

    /// Signal the loop to stop after the current iteration
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    /// Whether the loop is currently running
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// One-shot fetch of prices and metadata for specific addresses
    pub async fn scan_once(
        &self,
        addresses: &[String],
    ) -> (
        std::collections::HashMap<String, TokenPrice>,
        std::collections::HashMap<String, TokenMetadata>,
    ) {
        let scan_id = format!("scan-{}", Utc::now().timestamp());
        let prices = self.manager.fetch_prices(addresses, Some(&scan_id)).await;
        let metadata = self.manager.fetch_metadata(addresses, Some(&scan_id)).await;
        (prices, metadata)
    }

    /// The batch manager, for stats reporting
    pub fn manager(&self) -> &Arc<BatchApiManager> {
        &self.manager
    }

    fn report_candidates(&self, scan_id: &str, candidates: &[TokenCandidate]) {
        tracing::info!(scan_id, count = candidates.len(), "early-gem candidates");
        for candidate in candidates {
            tracing::info!(
                address = %candidate.address,
                symbol = candidate.symbol.as_deref().unwrap_or("?"),
                strategy = candidate.source_strategy.as_deref().unwrap_or("?"),
                appearances = candidate.strategy_data.consecutive_appearances,
                price = candidate.price.as_ref().map(|p| p.price_usd),
                "candidate"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::manager::BatchConfig;
    use crate::ports::mocks::{MockProvider, MockStrategy};
    use crate::scheduler::runner::SchedulerConfig;

    const MINT_A: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    fn orchestrator(dir: &tempfile::TempDir) -> (ScanOrchestrator, Arc<MockProvider>) {
        let mock = Arc::new(
            MockProvider::new()
                .with_price(MINT_A, 0.25)
                .with_metadata(MINT_A, "GEM"),
        );
        let provider: Arc<dyn TokenDataProvider> = mock.clone();
        let manager = Arc::new(BatchApiManager::with_config(
            mock.clone(),
            BatchConfig {
                requests_per_minute: 60_000,
                ..Default::default()
            },
        ));

        let mut scheduler = StrategyScheduler::new(SchedulerConfig {
            check_interval: Duration::ZERO,
            history_path: dir.path().join("history.json"),
            ..Default::default()
        });
        scheduler.register(Arc::new(MockStrategy::new("volume").with_candidate(MINT_A, 1)));

        (
            ScanOrchestrator::new(
                provider,
                manager,
                Arc::new(scheduler),
                Duration::from_millis(10),
            ),
            mock,
        )
    }

    #[tokio::test]
    async fn test_scan_once() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, _mock) = orchestrator(&dir);

        let (prices, metadata) = orchestrator.scan_once(&[MINT_A.to_string()]).await;

        assert_eq!(prices[MINT_A].price_usd, 0.25);
        assert_eq!(metadata[MINT_A].symbol.as_deref(), Some("GEM"));
    }

    #[tokio::test]
    async fn test_stop_ends_run_loop() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, _mock) = orchestrator(&dir);

        let handle = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(orchestrator.is_running());

        orchestrator.stop();
        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok());
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_from_config() {
        let toml = r#"
[provider]
base_url = "https://gateway.example.com/v1"
timeout_secs = 15
max_retries = 3
retry_base_delay_ms = 500

[batch]
enable_validation = true
max_batch_size = 50
max_concurrent_requests = 5
requests_per_minute = 800
metadata_ttl_secs = 600
price_ttl_secs = 30
retry_individual_on_batch_failure = true
sequential_delay_ms = 200
default_strategy = "parallel_individual"

[scheduler]
enabled = true
run_hours = [0, 6, 12, 18]
check_interval_secs = 300
history_file = "data/strategy_executions/execution_history.json"
max_record_age_days = 30

[watchlist]
addresses = ["DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"]

[logging]
level = "info"
log_to_file = false
log_file = "logs/gemscout.log"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let orchestrator = ScanOrchestrator::from_config(&config, Duration::from_secs(60));
        assert!(orchestrator.is_ok());
    }
}
