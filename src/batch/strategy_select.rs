//! Batch Fetch Strategy Selection
//!
//! Runtime detection of true-batch endpoint support, cached per data
//! kind for the lifetime of the manager. A probe failure that is not a
//! clear "endpoint missing" leaves the capability unknown so one
//! transient error never permanently disables batch usage.

use std::sync::Arc;

use crate::domain::validator::WSOL_MINT;
use crate::ports::provider::TokenDataProvider;

/// How a batch of addresses is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStrategy {
    /// One HTTP call per chunk of addresses
    TrueBatch,
    /// Individual calls fanned out under bounded concurrency
    ParallelIndividual,
    /// Individual calls one at a time with an extra delay
    SequentialSafe,
}

impl BatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStrategy::TrueBatch => "true_batch",
            BatchStrategy::ParallelIndividual => "parallel_individual",
            BatchStrategy::SequentialSafe => "sequential_safe",
        }
    }
}

/// Detected batch capability for one data kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSupport {
    /// Not yet detected; probe again on the next call
    Unknown,
    Supported,
    Unsupported,
}

/// The data kinds the manager fetches in batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Metadata,
    Price,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Metadata => "metadata",
            DataKind::Price => "price",
        }
    }
}

/// Probes batch capability and picks a fetch strategy per data kind
#[derive(Debug)]
pub struct StrategySelector {
    default_strategy: BatchStrategy,
    probe_address: String,
    metadata_support: BatchSupport,
    price_support: BatchSupport,
}

impl StrategySelector {
    /// Create a selector falling back to `default_strategy` while a
    /// kind's capability is still unknown
    pub fn new(default_strategy: BatchStrategy) -> Self {
        Self {
            default_strategy,
            probe_address: WSOL_MINT.to_string(),
            metadata_support: BatchSupport::Unknown,
            price_support: BatchSupport::Unknown,
        }
    }

    /// Current detected capability for a kind
    pub fn support(&self, kind: DataKind) -> BatchSupport {
        match kind {
            DataKind::Metadata => self.metadata_support,
            DataKind::Price => self.price_support,
        }
    }

    /// Forget the detected capability so the next call re-probes.
    /// The only way a capability flips over the process lifetime.
    pub fn reset(&mut self, kind: DataKind) {
        self.set_support(kind, BatchSupport::Unknown);
    }

    /// Pick the strategy for a data kind, probing on first use
    pub async fn determine_strategy(
        &mut self,
        kind: DataKind,
        provider: &Arc<dyn TokenDataProvider>,
    ) -> BatchStrategy {
        if self.support(kind) == BatchSupport::Unknown {
            self.probe(kind, provider).await;
        }

        match self.support(kind) {
            BatchSupport::Supported => BatchStrategy::TrueBatch,
            BatchSupport::Unsupported => BatchStrategy::ParallelIndividual,
            BatchSupport::Unknown => {
                tracing::debug!(
                    kind = kind.as_str(),
                    fallback = self.default_strategy.as_str(),
                    "batch capability still unknown, using default strategy"
                );
                self.default_strategy
            }
        }
    }

    /// One lightweight probe against the batch endpoint
    async fn probe(&mut self, kind: DataKind, provider: &Arc<dyn TokenDataProvider>) {
        let addresses = vec![self.probe_address.clone()];

        let outcome = match kind {
            DataKind::Price => provider
                .get_multi_token_price(&addresses)
                .await
                .map(|r| r.is_some()),
            DataKind::Metadata => provider
                .get_batch_token_metadata(&addresses)
                .await
                .map(|r| r.is_some()),
        };

        match outcome {
            Ok(true) => {
                tracing::info!(kind = kind.as_str(), "batch endpoint detected");
                self.set_support(kind, BatchSupport::Supported);
            }
            Ok(false) => {
                // Soft miss on the probe address is ambiguous
                tracing::debug!(kind = kind.as_str(), "probe returned no data, capability stays unknown");
            }
            Err(err) if err.is_endpoint_missing() => {
                tracing::info!(kind = kind.as_str(), "batch endpoint not available");
                self.set_support(kind, BatchSupport::Unsupported);
            }
            Err(err) => {
                tracing::debug!(
                    kind = kind.as_str(),
                    error = %err,
                    "probe failed ambiguously, capability stays unknown"
                );
            }
        }
    }

    fn set_support(&mut self, kind: DataKind, support: BatchSupport) {
        match kind {
            DataKind::Metadata => self.metadata_support = support,
            DataKind::Price => self.price_support = support,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::{BatchMode, MockProvider};

    fn provider(mode: BatchMode) -> Arc<dyn TokenDataProvider> {
        Arc::new(MockProvider::new().with_price_batch_mode(mode))
    }

    #[tokio::test]
    async fn test_working_endpoint_selects_true_batch() {
        let provider = provider(BatchMode::Working);
        let mut selector = StrategySelector::new(BatchStrategy::ParallelIndividual);

        let strategy = selector.determine_strategy(DataKind::Price, &provider).await;
        assert_eq!(strategy, BatchStrategy::TrueBatch);
        assert_eq!(selector.support(DataKind::Price), BatchSupport::Supported);
    }

    #[tokio::test]
    async fn test_missing_endpoint_selects_parallel() {
        let provider = provider(BatchMode::Missing);
        let mut selector = StrategySelector::new(BatchStrategy::SequentialSafe);

        let strategy = selector.determine_strategy(DataKind::Price, &provider).await;
        assert_eq!(strategy, BatchStrategy::ParallelIndividual);
        assert_eq!(selector.support(DataKind::Price), BatchSupport::Unsupported);
    }

    #[tokio::test]
    async fn test_ambiguous_failure_uses_default_and_reprobes() {
        let mock = Arc::new(MockProvider::new().with_price_batch_mode(BatchMode::Failing));
        let provider: Arc<dyn TokenDataProvider> = mock.clone();
        let mut selector = StrategySelector::new(BatchStrategy::SequentialSafe);

        let strategy = selector.determine_strategy(DataKind::Price, &provider).await;
        assert_eq!(strategy, BatchStrategy::SequentialSafe);
        assert_eq!(selector.support(DataKind::Price), BatchSupport::Unknown);

        // Unknown capability probes again on the next call
        selector.determine_strategy(DataKind::Price, &provider).await;
        assert_eq!(mock.call_count("multi_price:"), 2);

        // Once the endpoint recovers, detection sticks
        mock.set_price_batch_mode(BatchMode::Working);
        let strategy = selector.determine_strategy(DataKind::Price, &provider).await;
        assert_eq!(strategy, BatchStrategy::TrueBatch);
    }

    #[tokio::test]
    async fn test_probe_runs_once_when_detected() {
        let mock = Arc::new(MockProvider::new());
        let provider: Arc<dyn TokenDataProvider> = mock.clone();
        let mut selector = StrategySelector::new(BatchStrategy::ParallelIndividual);

        selector.determine_strategy(DataKind::Price, &provider).await;
        selector.determine_strategy(DataKind::Price, &provider).await;
        selector.determine_strategy(DataKind::Price, &provider).await;

        assert_eq!(mock.call_count("multi_price:"), 1);
    }

    #[tokio::test]
    async fn test_kinds_probe_independently() {
        let mock = Arc::new(
            MockProvider::new()
                .with_price_batch_mode(BatchMode::Working)
                .with_metadata_batch_mode(BatchMode::Missing),
        );
        let provider: Arc<dyn TokenDataProvider> = mock.clone();
        let mut selector = StrategySelector::new(BatchStrategy::ParallelIndividual);

        let price = selector.determine_strategy(DataKind::Price, &provider).await;
        let metadata = selector
            .determine_strategy(DataKind::Metadata, &provider)
            .await;

        assert_eq!(price, BatchStrategy::TrueBatch);
        assert_eq!(metadata, BatchStrategy::ParallelIndividual);
    }

    #[tokio::test]
    async fn test_reset_forces_reprobe() {
        let mock = Arc::new(MockProvider::new());
        let provider: Arc<dyn TokenDataProvider> = mock.clone();
        let mut selector = StrategySelector::new(BatchStrategy::ParallelIndividual);

        selector.determine_strategy(DataKind::Price, &provider).await;
        selector.reset(DataKind::Price);
        assert_eq!(selector.support(DataKind::Price), BatchSupport::Unknown);

        selector.determine_strategy(DataKind::Price, &provider).await;
        assert_eq!(mock.call_count("multi_price:"), 2);
    }
}
