//! Batch API Manager
//!
//! The orchestrator behind every outbound token-data fetch: validates
//! input, serves what it can from cache, picks a fetch strategy for the
//! rest (true batch, bounded-parallel individual calls, or throttled
//! sequential calls), writes results back with kind-specific TTLs and
//! accumulates performance statistics.
//!
//! No error escapes the public fetch methods: per-item failures are
//! caught at the smallest scope, logged and excluded from the result
//! map. A missing key means "could not be fetched this round".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::batch::cache::TtlCache;
use crate::batch::rate_limiter::RateLimiter;
use crate::batch::strategy_select::{BatchStrategy, BatchSupport, DataKind, StrategySelector};
use crate::domain::validator::{TokenValidator, ValidationStats, ValidatorConfig};
use crate::ports::provider::{
    ProviderError, TokenDataProvider, TokenMetadata, TokenOverview, TokenPrice, TokenSecurity,
};

/// Batch manager configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Run TokenValidator on every fetch call
    pub enable_validation: bool,
    /// Upper bound on addresses per true-batch chunk
    pub max_batch_size: usize,
    /// Bounded-concurrency gate for the parallel path
    pub max_concurrent_requests: usize,
    /// Requests-per-minute ceiling fed to the rate limiter
    pub requests_per_minute: u32,
    /// TTL for metadata cache entries (slow-moving data)
    pub metadata_ttl: Duration,
    /// TTL for price cache entries (volatile data)
    pub price_ttl: Duration,
    /// On a chunk-level batch failure, refetch that chunk individually
    pub retry_individual_on_batch_failure: bool,
    /// Extra delay between requests on the sequential path
    pub sequential_delay: Duration,
    /// Strategy used while batch capability is still unknown
    pub default_strategy: BatchStrategy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            max_batch_size: 50,
            max_concurrent_requests: 5,
            requests_per_minute: 800,
            metadata_ttl: Duration::from_secs(600),
            price_ttl: Duration::from_secs(30),
            retry_individual_on_batch_failure: true,
            sequential_delay: Duration::from_millis(200),
            default_strategy: BatchStrategy::ParallelIndividual,
        }
    }
}

/// Monotonically accumulating fetch counters
///
/// Reset only by an explicit `reset_stats` call.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub tokens_processed: u64,
    pub tokens_validated: u64,
    pub tokens_filtered: u64,
    pub cache_hits: u64,
    pub api_calls_made: u64,
    pub api_calls_saved: u64,
    pub fetch_failures: u64,
    pub total_fetch_time: Duration,
}

/// Nested counters/ratios for logging and dashboards
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub requests: RequestCounters,
    pub tokens: TokenCounters,
    pub api_calls: ApiCallCounters,
    pub cache: CacheCounters,
    pub avg_request_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestCounters {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenCounters {
    pub processed: u64,
    pub validated: u64,
    pub filtered: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiCallCounters {
    pub made: u64,
    pub saved: u64,
    /// saved / (made + saved)
    pub savings_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheCounters {
    pub metadata_entries: usize,
    pub price_entries: usize,
    pub hits: u64,
}

/// Orchestrates validated, cached, strategy-dispatched batch fetches
pub struct BatchApiManager {
    provider: Arc<dyn TokenDataProvider>,
    config: BatchConfig,
    validator: Mutex<TokenValidator>,
    metadata_cache: Mutex<TtlCache<TokenMetadata>>,
    price_cache: Mutex<TtlCache<TokenPrice>>,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    selector: Mutex<StrategySelector>,
    semaphore: Arc<Semaphore>,
    stats: Mutex<BatchStats>,
}

impl BatchApiManager {
    /// Create a manager over a provider with default configuration
    pub fn new(provider: Arc<dyn TokenDataProvider>) -> Self {
        Self::with_config(provider, BatchConfig::default())
    }

    /// Create a manager with custom configuration
    pub fn with_config(provider: Arc<dyn TokenDataProvider>, config: BatchConfig) -> Self {
        let permits = config.max_concurrent_requests.max(1);
        Self {
            validator: Mutex::new(TokenValidator::with_config(ValidatorConfig::default())),
            metadata_cache: Mutex::new(TtlCache::new(config.metadata_ttl)),
            price_cache: Mutex::new(TtlCache::new(config.price_ttl)),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(config.requests_per_minute))),
            selector: Mutex::new(StrategySelector::new(config.default_strategy)),
            semaphore: Arc::new(Semaphore::new(permits)),
            stats: Mutex::new(BatchStats::default()),
            provider,
            config,
        }
    }

    /// Fetch prices for a list of addresses
    ///
    /// Returns a map of address -> price; a missing key means the price
    /// could not be fetched this round. Never errors.
    pub async fn fetch_prices(
        &self,
        addresses: &[String],
        scan_id: Option<&str>,
    ) -> HashMap<String, TokenPrice> {
        if addresses.is_empty() {
            return HashMap::new();
        }
        let started = Instant::now();

        let (valid, filtered) = self.validate(addresses).await;
        if valid.is_empty() {
            self.record_filtered_out(addresses.len(), filtered).await;
            return HashMap::new();
        }

        // Cache partition; `seen` keeps to_fetch duplicate-free even
        // when validation (and its dedup) is disabled
        let mut cached: HashMap<String, TokenPrice> = HashMap::new();
        let mut to_fetch: Vec<String> = Vec::new();
        {
            let mut cache = self.price_cache.lock().await;
            let mut seen: HashSet<&str> = HashSet::new();
            for address in &valid {
                if !seen.insert(address.as_str()) {
                    continue;
                }
                match cache.get(address) {
                    Some(price) => {
                        cached.insert(address.clone(), price);
                    }
                    None => to_fetch.push(address.clone()),
                }
            }
        }
        let cache_hits = cached.len();
        let fetch_count = to_fetch.len();

        let fetched = if to_fetch.is_empty() {
            HashMap::new()
        } else {
            let strategy = self
                .selector
                .lock()
                .await
                .determine_strategy(DataKind::Price, &self.provider)
                .await;
            tracing::debug!(
                scan_id = scan_id.unwrap_or("-"),
                strategy = strategy.as_str(),
                count = fetch_count,
                "fetching prices"
            );

            match strategy {
                BatchStrategy::TrueBatch => self.fetch_prices_true_batch(&to_fetch).await,
                BatchStrategy::ParallelIndividual => self.fetch_prices_parallel(&to_fetch).await,
                BatchStrategy::SequentialSafe => self.fetch_prices_sequential(&to_fetch).await,
            }
        };

        if !fetched.is_empty() {
            let mut cache = self.price_cache.lock().await;
            for (address, price) in &fetched {
                cache.set(address.clone(), price.clone(), Some(self.config.price_ttl));
            }
        }

        self.record_fetch(
            addresses.len(),
            valid.len(),
            filtered,
            cache_hits,
            fetch_count,
            fetched.len(),
            started.elapsed(),
        )
        .await;

        // Fetched results win, though to_fetch excluded cached keys
        let mut results = cached;
        results.extend(fetched);
        results
    }

    /// Fetch metadata for a list of addresses
    ///
    /// Same pipeline as `fetch_prices` with the longer metadata TTL.
    pub async fn fetch_metadata(
        &self,
        addresses: &[String],
        scan_id: Option<&str>,
    ) -> HashMap<String, TokenMetadata> {
        if addresses.is_empty() {
            return HashMap::new();
        }
        let started = Instant::now();

        let (valid, filtered) = self.validate(addresses).await;
        if valid.is_empty() {
            self.record_filtered_out(addresses.len(), filtered).await;
            return HashMap::new();
        }

        let mut cached: HashMap<String, TokenMetadata> = HashMap::new();
        let mut to_fetch: Vec<String> = Vec::new();
        {
            let mut cache = self.metadata_cache.lock().await;
            let mut seen: HashSet<&str> = HashSet::new();
            for address in &valid {
                if !seen.insert(address.as_str()) {
                    continue;
                }
                match cache.get(address) {
                    Some(metadata) => {
                        cached.insert(address.clone(), metadata);
                    }
                    None => to_fetch.push(address.clone()),
                }
            }
        }
        let cache_hits = cached.len();
        let fetch_count = to_fetch.len();

        let fetched = if to_fetch.is_empty() {
            HashMap::new()
        } else {
            let strategy = self
                .selector
                .lock()
                .await
                .determine_strategy(DataKind::Metadata, &self.provider)
                .await;
            tracing::debug!(
                scan_id = scan_id.unwrap_or("-"),
                strategy = strategy.as_str(),
                count = fetch_count,
                "fetching metadata"
            );

            match strategy {
                BatchStrategy::TrueBatch => self.fetch_metadata_true_batch(&to_fetch).await,
                BatchStrategy::ParallelIndividual => self.fetch_metadata_parallel(&to_fetch).await,
                BatchStrategy::SequentialSafe => self.fetch_metadata_sequential(&to_fetch).await,
            }
        };

        if !fetched.is_empty() {
            let mut cache = self.metadata_cache.lock().await;
            for (address, metadata) in &fetched {
                cache.set(
                    address.clone(),
                    metadata.clone(),
                    Some(self.config.metadata_ttl),
                );
            }
        }

        self.record_fetch(
            addresses.len(),
            valid.len(),
            filtered,
            cache_hits,
            fetch_count,
            fetched.len(),
            started.elapsed(),
        )
        .await;

        let mut results = cached;
        results.extend(fetched);
        results
    }

    /// Fetch market overviews, one call per address under the gate.
    /// Overviews have no batch endpoint upstream and are not cached.
    pub async fn fetch_overviews(
        &self,
        addresses: &[String],
        scan_id: Option<&str>,
    ) -> HashMap<String, TokenOverview> {
        if addresses.is_empty() {
            return HashMap::new();
        }
        tracing::debug!(
            scan_id = scan_id.unwrap_or("-"),
            count = addresses.len(),
            "fetching overviews"
        );
        let results = self
            .fan_out(addresses, |provider, address| async move {
                provider.get_token_overview(&address).await
            })
            .await;
        self.stats.lock().await.api_calls_made += addresses.len() as u64;
        results
    }

    /// Fetch security assessments, one call per address under the gate.
    /// Not cached; security reports change as holders move.
    pub async fn fetch_securities(
        &self,
        addresses: &[String],
        scan_id: Option<&str>,
    ) -> HashMap<String, TokenSecurity> {
        if addresses.is_empty() {
            return HashMap::new();
        }
        tracing::debug!(
            scan_id = scan_id.unwrap_or("-"),
            count = addresses.len(),
            "fetching security reports"
        );
        let results = self
            .fan_out(addresses, |provider, address| async move {
                provider.get_token_security(&address).await
            })
            .await;
        self.stats.lock().await.api_calls_made += addresses.len() as u64;
        results
    }

    /// Add an address to the validator's exclusion set
    pub async fn add_exclusion_token(&self, address: &str) {
        self.validator.lock().await.add_exclusion_token(address);
    }

    /// Remove an address from the validator's exclusion set
    pub async fn remove_exclusion_token(&self, address: &str) -> bool {
        self.validator.lock().await.remove_exclusion_token(address)
    }

    /// Forget detected batch capability for a kind (forces re-probe)
    pub async fn reset_capability(&self, kind: DataKind) {
        self.selector.lock().await.reset(kind);
    }

    /// Detected batch capability for a kind
    pub async fn batch_support(&self, kind: DataKind) -> BatchSupport {
        self.selector.lock().await.support(kind)
    }

    /// Snapshot of the raw counters
    pub async fn stats(&self) -> BatchStats {
        self.stats.lock().await.clone()
    }

    /// Validator session statistics
    pub async fn validation_stats(&self) -> ValidationStats {
        self.validator.lock().await.get_validation_stats().clone()
    }

    /// Nested report for logging/dashboards
    pub async fn get_performance_stats(&self) -> PerformanceReport {
        let stats = self.stats.lock().await.clone();
        let metadata_entries = self.metadata_cache.lock().await.len();
        let price_entries = self.price_cache.lock().await.len();

        let denominator = stats.api_calls_made + stats.api_calls_saved;
        let savings_ratio = if denominator == 0 {
            0.0
        } else {
            stats.api_calls_saved as f64 / denominator as f64
        };
        let avg_request_ms = if stats.total_requests == 0 {
            0.0
        } else {
            stats.total_fetch_time.as_secs_f64() * 1000.0 / stats.total_requests as f64
        };

        PerformanceReport {
            requests: RequestCounters {
                total: stats.total_requests,
                successful: stats.successful_requests,
                failed: stats.failed_requests,
            },
            tokens: TokenCounters {
                processed: stats.tokens_processed,
                validated: stats.tokens_validated,
                filtered: stats.tokens_filtered,
            },
            api_calls: ApiCallCounters {
                made: stats.api_calls_made,
                saved: stats.api_calls_saved,
                savings_ratio,
            },
            cache: CacheCounters {
                metadata_entries,
                price_entries,
                hits: stats.cache_hits,
            },
            avg_request_ms,
        }
    }

    /// Zero all counters (validator session stats included)
    pub async fn reset_stats(&self) {
        *self.stats.lock().await = BatchStats::default();
        self.validator.lock().await.reset_stats();
    }

    // ---- pipeline pieces ----

    async fn validate(&self, addresses: &[String]) -> (Vec<String>, usize) {
        if !self.config.enable_validation {
            return (addresses.to_vec(), 0);
        }
        let (valid, report) = self.validator.lock().await.validate_batch(addresses);
        (valid, report.filtered_count)
    }

    async fn record_filtered_out(&self, input: usize, filtered: usize) {
        let mut stats = self.stats.lock().await;
        stats.total_requests += 1;
        stats.tokens_processed += input as u64;
        stats.tokens_filtered += filtered as u64;
        stats.api_calls_saved += filtered as u64;
        tracing::warn!(input, filtered, "no valid addresses left after validation");
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_fetch(
        &self,
        input: usize,
        validated: usize,
        filtered: usize,
        cache_hits: usize,
        fetch_count: usize,
        fetched: usize,
        elapsed: Duration,
    ) {
        let mut stats = self.stats.lock().await;
        stats.total_requests += 1;
        stats.tokens_processed += input as u64;
        stats.tokens_validated += validated as u64;
        stats.tokens_filtered += filtered as u64;
        stats.cache_hits += cache_hits as u64;
        stats.api_calls_made += fetch_count as u64;
        stats.api_calls_saved += (cache_hits + filtered) as u64;
        stats.total_fetch_time += elapsed;
        if fetch_count > 0 && fetched == 0 {
            stats.failed_requests += 1;
        } else {
            stats.successful_requests += 1;
        }
    }

    async fn fetch_prices_true_batch(&self, addresses: &[String]) -> HashMap<String, TokenPrice> {
        let chunk_size = self
            .config
            .max_batch_size
            .min(self.provider.max_batch_size())
            .max(1);
        let mut results = HashMap::new();

        // Chunks run in input order; a failed chunk falls back to
        // individual fetches without touching its siblings
        for chunk in addresses.chunks(chunk_size) {
            self.rate_limiter.lock().await.throttle().await;
            match self.provider.get_multi_token_price(chunk).await {
                Ok(Some(batch)) => results.extend(batch),
                Ok(None) => {
                    tracing::debug!(chunk = chunk.len(), "batch price call returned no data");
                }
                Err(err) => {
                    tracing::warn!(chunk = chunk.len(), error = %err, "batch price call failed");
                    self.stats.lock().await.fetch_failures += 1;
                    if self.config.retry_individual_on_batch_failure {
                        results.extend(self.fetch_prices_parallel(chunk).await);
                    }
                }
            }
        }
        results
    }

    async fn fetch_prices_parallel(&self, addresses: &[String]) -> HashMap<String, TokenPrice> {
        self.fan_out(addresses, |provider, address| async move {
            provider.get_token_price(&address).await
        })
        .await
    }

    async fn fetch_prices_sequential(&self, addresses: &[String]) -> HashMap<String, TokenPrice> {
        let mut results = HashMap::new();
        for address in addresses {
            self.rate_limiter.lock().await.throttle().await;
            match self.provider.get_token_price(address).await {
                Ok(Some(price)) => {
                    results.insert(address.clone(), price);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(address = %address, error = %err, "price fetch failed");
                    self.stats.lock().await.fetch_failures += 1;
                }
            }
            tokio::time::sleep(self.config.sequential_delay).await;
        }
        results
    }

    async fn fetch_metadata_true_batch(
        &self,
        addresses: &[String],
    ) -> HashMap<String, TokenMetadata> {
        let chunk_size = self
            .config
            .max_batch_size
            .min(self.provider.max_batch_size())
            .max(1);
        let mut results = HashMap::new();

        for chunk in addresses.chunks(chunk_size) {
            self.rate_limiter.lock().await.throttle().await;
            match self.provider.get_batch_token_metadata(chunk).await {
                Ok(Some(batch)) => results.extend(batch),
                Ok(None) => {
                    tracing::debug!(chunk = chunk.len(), "batch metadata call returned no data");
                }
                Err(err) => {
                    tracing::warn!(chunk = chunk.len(), error = %err, "batch metadata call failed");
                    self.stats.lock().await.fetch_failures += 1;
                    if self.config.retry_individual_on_batch_failure {
                        results.extend(self.fetch_metadata_parallel(chunk).await);
                    }
                }
            }
        }
        results
    }

    async fn fetch_metadata_parallel(&self, addresses: &[String]) -> HashMap<String, TokenMetadata> {
        self.fan_out(addresses, |provider, address| async move {
            provider.get_token_metadata(&address).await
        })
        .await
    }

    async fn fetch_metadata_sequential(
        &self,
        addresses: &[String],
    ) -> HashMap<String, TokenMetadata> {
        let mut results = HashMap::new();
        for address in addresses {
            self.rate_limiter.lock().await.throttle().await;
            match self.provider.get_token_metadata(address).await {
                Ok(Some(metadata)) => {
                    results.insert(address.clone(), metadata);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(address = %address, error = %err, "metadata fetch failed");
                    self.stats.lock().await.fetch_failures += 1;
                }
            }
            tokio::time::sleep(self.config.sequential_delay).await;
        }
        results
    }

    /// Individual fetches fanned out under the concurrency gate.
    ///
    /// Addresses are unique by construction, so the upstream fetch runs
    /// at most once per address. Completion order is unspecified; one
    /// failing address is logged and excluded, never fails the batch.
    async fn fan_out<V, F, Fut>(&self, addresses: &[String], fetch: F) -> HashMap<String, V>
    where
        V: Send + 'static,
        F: Fn(Arc<dyn TokenDataProvider>, String) -> Fut,
        Fut: std::future::Future<Output = Result<Option<V>, ProviderError>> + Send + 'static,
    {
        let mut set: JoinSet<(String, Result<Option<V>, ProviderError>)> = JoinSet::new();

        for address in addresses {
            let semaphore = Arc::clone(&self.semaphore);
            let limiter = Arc::clone(&self.rate_limiter);
            let future = fetch(Arc::clone(&self.provider), address.clone());
            let address = address.clone();
            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            address,
                            Err(ProviderError::Network("concurrency gate closed".into())),
                        )
                    }
                };
                limiter.lock().await.throttle().await;
                let result = future.await;
                (address, result)
            });
        }

        let mut results = HashMap::new();
        let mut failures = 0u64;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((address, Ok(Some(value)))) => {
                    results.insert(address, value);
                }
                Ok((address, Ok(None))) => {
                    tracing::trace!(address = %address, "no data for address");
                }
                Ok((address, Err(err))) => {
                    failures += 1;
                    tracing::debug!(address = %address, error = %err, "individual fetch failed");
                }
                Err(err) => {
                    failures += 1;
                    tracing::warn!(error = %err, "fetch task panicked");
                }
            }
        }
        if failures > 0 {
            self.stats.lock().await.fetch_failures += failures;
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::{BatchMode, MockProvider};
    use approx::assert_relative_eq;

    // Well-formed base58 mints for validator-enabled tests
    const MINT_A: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
    const MINT_B: &str = "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm";
    const MINT_C: &str = "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr";

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fast_config() -> BatchConfig {
        BatchConfig {
            requests_per_minute: 60_000,
            sequential_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_input_returns_empty_without_network() {
        let mock = Arc::new(MockProvider::new());
        let manager = BatchApiManager::with_config(mock.clone(), fast_config());

        let prices = manager.fetch_prices(&[], None).await;
        let metadata = manager.fetch_metadata(&[], None).await;

        assert!(prices.is_empty());
        assert!(metadata.is_empty());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_only_input_returns_empty_without_network() {
        let mock = Arc::new(MockProvider::new());
        let manager = BatchApiManager::with_config(mock.clone(), fast_config());

        let input = strings(&["junk", "also-junk"]);
        let prices = manager.fetch_prices(&input, None).await;

        assert!(prices.is_empty());
        assert!(mock.calls().is_empty());

        let stats = manager.stats().await;
        assert_eq!(stats.tokens_filtered, 2);
        assert_eq!(stats.api_calls_saved, 2);
    }

    #[tokio::test]
    async fn test_true_batch_path() {
        let mock = Arc::new(
            MockProvider::new()
                .with_price(MINT_A, 1.0)
                .with_price(MINT_B, 2.0),
        );
        let manager = BatchApiManager::with_config(mock.clone(), fast_config());

        let prices = manager
            .fetch_prices(&strings(&[MINT_A, MINT_B]), Some("scan-1"))
            .await;

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[MINT_A].price_usd, 1.0);
        // One probe plus one chunk call, no individual calls
        assert_eq!(mock.call_count("multi_price:"), 2);
        assert_eq!(mock.call_count("price:"), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_prevents_refetch() {
        let mock = Arc::new(MockProvider::new().with_price(MINT_A, 1.0));
        let manager = BatchApiManager::with_config(mock.clone(), fast_config());

        manager.fetch_prices(&strings(&[MINT_A]), None).await;
        let second = manager.fetch_prices(&strings(&[MINT_A]), None).await;

        assert_eq!(second.len(), 1);
        // Probe + first chunk only; the second call is served from cache
        assert_eq!(mock.call_count("multi_price:"), 2);

        let stats = manager.stats().await;
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.api_calls_saved, 1);
    }

    #[tokio::test]
    async fn test_duplicate_addresses_fetch_once() {
        let mock = Arc::new(
            MockProvider::new()
                .with_price(MINT_A, 1.0)
                .with_price_batch_mode(BatchMode::Missing),
        );
        let manager = BatchApiManager::with_config(mock.clone(), fast_config());

        let prices = manager
            .fetch_prices(&strings(&[MINT_A, MINT_A, MINT_A]), None)
            .await;

        assert_eq!(prices.len(), 1);
        assert_eq!(mock.call_count(&format!("price:{MINT_A}")), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_containment() {
        // Batch endpoint missing forces the parallel-individual path;
        // one failing address must not fail its siblings.
        let mut mock = MockProvider::new().with_price_batch_mode(BatchMode::Missing);
        for i in 0..10 {
            mock = mock.with_price(&format!("mint{i}"), i as f64 + 1.0);
        }
        let mock = Arc::new(mock.with_failing_address("mint7"));

        let config = BatchConfig {
            enable_validation: false,
            ..fast_config()
        };
        let manager = BatchApiManager::with_config(mock.clone(), config);

        let input: Vec<String> = (0..10).map(|i| format!("mint{i}")).collect();
        let prices = manager.fetch_prices(&input, None).await;

        assert_eq!(prices.len(), 9);
        assert!(!prices.contains_key("mint7"));
        assert_eq!(manager.stats().await.fetch_failures, 1);
    }

    #[tokio::test]
    async fn test_chunk_failure_falls_back_to_individual() {
        let mock = Arc::new(
            MockProvider::new()
                .with_price(MINT_A, 1.0)
                .with_price(MINT_B, 2.0),
        );
        let manager = BatchApiManager::with_config(mock.clone(), fast_config());

        // First fetch detects batch support
        manager.fetch_prices(&strings(&[MINT_A]), None).await;
        assert_eq!(
            manager.batch_support(DataKind::Price).await,
            BatchSupport::Supported
        );

        // Endpoint starts failing; the chunk falls back to individual
        // fetches instead of dropping its addresses
        mock.set_price_batch_mode(BatchMode::Failing);
        let prices = manager.fetch_prices(&strings(&[MINT_B]), None).await;

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[MINT_B].price_usd, 2.0);
        assert_eq!(mock.call_count(&format!("price:{MINT_B}")), 1);
    }

    #[tokio::test]
    async fn test_chunk_failure_without_retry_drops_chunk() {
        let mock = Arc::new(MockProvider::new().with_price(MINT_A, 1.0));
        let config = BatchConfig {
            retry_individual_on_batch_failure: false,
            ..fast_config()
        };
        let manager = BatchApiManager::with_config(mock.clone(), config);

        manager.fetch_prices(&strings(&[MINT_A]), None).await;
        mock.set_price_batch_mode(BatchMode::Failing);

        let prices = manager.fetch_prices(&strings(&[MINT_B]), None).await;
        assert!(prices.is_empty());
        assert_eq!(mock.call_count("price:"), 0);
    }

    #[tokio::test]
    async fn test_sequential_path() {
        let mock = Arc::new(
            MockProvider::new()
                .with_price(MINT_A, 1.0)
                .with_price(MINT_B, 2.0)
                .with_price_batch_mode(BatchMode::Failing),
        );
        let config = BatchConfig {
            default_strategy: BatchStrategy::SequentialSafe,
            ..fast_config()
        };
        let manager = BatchApiManager::with_config(mock.clone(), config);

        let prices = manager.fetch_prices(&strings(&[MINT_A, MINT_B]), None).await;

        assert_eq!(prices.len(), 2);
        assert_eq!(mock.call_count("price:"), 2);
    }

    #[tokio::test]
    async fn test_price_ttl_shorter_than_metadata_ttl() {
        let mock = Arc::new(
            MockProvider::new()
                .with_price(MINT_A, 1.0)
                .with_metadata(MINT_A, "GEM")
                .with_price_batch_mode(BatchMode::Missing)
                .with_metadata_batch_mode(BatchMode::Missing),
        );
        let config = BatchConfig {
            price_ttl: Duration::from_millis(30),
            metadata_ttl: Duration::from_secs(600),
            ..fast_config()
        };
        let manager = BatchApiManager::with_config(mock.clone(), config);

        let input = strings(&[MINT_A]);
        manager.fetch_prices(&input, None).await;
        manager.fetch_metadata(&input, None).await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        // Price expired and refetches; metadata is still cached
        manager.fetch_prices(&input, None).await;
        manager.fetch_metadata(&input, None).await;

        assert_eq!(mock.call_count(&format!("price:{MINT_A}")), 2);
        assert_eq!(mock.call_count(&format!("metadata:{MINT_A}")), 1);
    }

    #[tokio::test]
    async fn test_metadata_pipeline() {
        let mock = Arc::new(
            MockProvider::new()
                .with_metadata(MINT_A, "GEM")
                .with_metadata(MINT_B, "MOON"),
        );
        let manager = BatchApiManager::with_config(mock.clone(), fast_config());

        let metadata = manager
            .fetch_metadata(&strings(&[MINT_A, MINT_B, MINT_C]), None)
            .await;

        // MINT_C is a soft miss: absent, not an error
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[MINT_A].symbol.as_deref(), Some("GEM"));
    }

    #[tokio::test]
    async fn test_overview_and_security_fan_out() {
        let mock = Arc::new(
            MockProvider::new()
                .with_overview(MINT_A, 50_000.0)
                .with_security(MINT_A, true)
                .with_failing_address(MINT_B),
        );
        let manager = BatchApiManager::with_config(mock.clone(), fast_config());

        let input = strings(&[MINT_A, MINT_B]);
        let overviews = manager.fetch_overviews(&input, None).await;
        let securities = manager.fetch_securities(&input, None).await;

        assert_eq!(overviews.len(), 1);
        assert_eq!(securities.len(), 1);
        assert!(securities[MINT_A].looks_safe());
    }

    #[tokio::test]
    async fn test_performance_report() {
        let mock = Arc::new(MockProvider::new().with_price(MINT_A, 1.0));
        let manager = BatchApiManager::with_config(mock, fast_config());

        let input = strings(&[MINT_A, "junk"]);
        manager.fetch_prices(&input, None).await;
        manager.fetch_prices(&input, None).await;

        let report = manager.get_performance_stats().await;
        assert_eq!(report.requests.total, 2);
        assert_eq!(report.tokens.processed, 4);
        assert_eq!(report.tokens.filtered, 2);
        assert_eq!(report.api_calls.made, 1);
        // Saved: 2 filtered + 1 cache hit
        assert_eq!(report.api_calls.saved, 3);
        assert_relative_eq!(report.api_calls.savings_ratio, 0.75);
        assert_eq!(report.cache.price_entries, 1);
    }

    #[tokio::test]
    async fn test_reset_stats() {
        let mock = Arc::new(MockProvider::new().with_price(MINT_A, 1.0));
        let manager = BatchApiManager::with_config(mock, fast_config());

        manager.fetch_prices(&strings(&[MINT_A]), None).await;
        assert!(manager.stats().await.total_requests > 0);

        manager.reset_stats().await;
        assert_eq!(manager.stats().await.total_requests, 0);
        assert_eq!(manager.validation_stats().await.batches_validated, 0);
    }

    #[tokio::test]
    async fn test_exclusion_passthrough() {
        let mock = Arc::new(MockProvider::new().with_price(MINT_A, 1.0));
        let manager = BatchApiManager::with_config(mock.clone(), fast_config());

        manager.add_exclusion_token(MINT_A).await;
        let prices = manager.fetch_prices(&strings(&[MINT_A]), None).await;
        assert!(prices.is_empty());
        assert!(mock.calls().is_empty());

        assert!(manager.remove_exclusion_token(MINT_A).await);
        let prices = manager.fetch_prices(&strings(&[MINT_A]), None).await;
        assert_eq!(prices.len(), 1);
    }
}
