//! Discovery Strategy Port
//!
//! Strategies surface early-gem candidates. The scheduler runs each one
//! in isolation so a failing strategy never blocks the others.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::candidate::TokenCandidate;
use crate::ports::provider::{ProviderError, TokenDataProvider};

/// Errors a discovery strategy may surface
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A discovery heuristic registered with the scheduler
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    /// Strategy name, used in logs and execution records
    fn name(&self) -> &str;

    /// Pure discovery phase: surface candidates without fetching any
    /// enrichment data. The shared-pool scheduler path runs only this
    /// and attaches enrichment from one batch fetch afterwards.
    async fn discover(
        &self,
        provider: Arc<dyn TokenDataProvider>,
        scan_id: Option<&str>,
    ) -> Result<Vec<TokenCandidate>, StrategyError>;

    /// Full run: discovery plus whatever enrichment the strategy does
    /// on its own. Defaults to the pure discovery phase.
    async fn execute(
        &self,
        provider: Arc<dyn TokenDataProvider>,
        scan_id: Option<&str>,
    ) -> Result<Vec<TokenCandidate>, StrategyError> {
        self.discover(provider, scan_id).await
    }

    /// Drop per-strategy tracking state older than the cutoff.
    /// Invoked by the scheduler's cleanup pass; no-op by default.
    async fn prune_history(&self, max_age_days: u32) {
        let _ = max_age_days;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStrategy;

    #[async_trait]
    impl DiscoveryStrategy for FixedStrategy {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn discover(
            &self,
            _provider: Arc<dyn TokenDataProvider>,
            _scan_id: Option<&str>,
        ) -> Result<Vec<TokenCandidate>, StrategyError> {
            Ok(vec![TokenCandidate::from_strategy("mint1", self.name())])
        }
    }

    #[tokio::test]
    async fn test_execute_defaults_to_discover() {
        use crate::ports::mocks::MockProvider;

        let provider: Arc<dyn TokenDataProvider> = Arc::new(MockProvider::new());
        let strategy = FixedStrategy;

        let discovered = strategy.discover(provider.clone(), None).await.unwrap();
        let executed = strategy.execute(provider, Some("scan-1")).await.unwrap();

        assert_eq!(discovered.len(), 1);
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].address, "mint1");
    }

    #[test]
    fn test_strategy_error_display() {
        let err = StrategyError::Config("missing watchlist".into());
        assert!(err.to_string().contains("missing watchlist"));

        let err: StrategyError = ProviderError::Timeout("10s".into()).into();
        assert!(err.to_string().contains("Provider error"));
    }
}
