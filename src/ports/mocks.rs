//! Mock ports for tests
//!
//! Call-recording mocks with controlled responses. Used by unit tests
//! and the integration suite; no network access anywhere.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::candidate::TokenCandidate;
use crate::ports::provider::{
    ProviderError, TokenDataProvider, TokenMetadata, TokenOverview, TokenPrice, TokenSecurity,
};
use crate::ports::strategy::{DiscoveryStrategy, StrategyError};

/// Behavior of a mock batch endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Batch calls succeed and return all known addresses
    Working,
    /// Batch calls fail as if the endpoint does not exist (HTTP 404)
    Missing,
    /// Batch calls fail with an ambiguous network error
    Failing,
}

/// Mock provider that records calls and serves configured responses
pub struct MockProvider {
    prices: Mutex<HashMap<String, TokenPrice>>,
    metadata: Mutex<HashMap<String, TokenMetadata>>,
    overviews: Mutex<HashMap<String, TokenOverview>>,
    securities: Mutex<HashMap<String, TokenSecurity>>,
    failing: Mutex<HashSet<String>>,
    price_batch_mode: Mutex<BatchMode>,
    metadata_batch_mode: Mutex<BatchMode>,
    calls: Mutex<Vec<String>>,
    max_batch: usize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
            metadata: Mutex::new(HashMap::new()),
            overviews: Mutex::new(HashMap::new()),
            securities: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            price_batch_mode: Mutex::new(BatchMode::Working),
            metadata_batch_mode: Mutex::new(BatchMode::Working),
            calls: Mutex::new(Vec::new()),
            max_batch: 100,
        }
    }

    /// Builder: register a price for an address
    pub fn with_price(self, address: &str, price_usd: f64) -> Self {
        self.prices
            .lock()
            .unwrap()
            .insert(address.to_string(), TokenPrice::new(address, price_usd));
        self
    }

    /// Builder: register metadata for an address
    pub fn with_metadata(self, address: &str, symbol: &str) -> Self {
        self.metadata.lock().unwrap().insert(
            address.to_string(),
            TokenMetadata::new(address).with_symbol(symbol),
        );
        self
    }

    /// Builder: register an overview for an address
    pub fn with_overview(self, address: &str, volume_24h_usd: f64) -> Self {
        self.overviews.lock().unwrap().insert(
            address.to_string(),
            TokenOverview {
                address: address.to_string(),
                market_cap_usd: None,
                volume_24h_usd: Some(volume_24h_usd),
                price_change_24h_pct: None,
                holder_count: None,
                trade_count_24h: None,
            },
        );
        self
    }

    /// Builder: register a security assessment for an address
    pub fn with_security(self, address: &str, revoked: bool) -> Self {
        self.securities.lock().unwrap().insert(
            address.to_string(),
            TokenSecurity {
                address: address.to_string(),
                mint_authority_revoked: Some(revoked),
                freeze_authority_revoked: Some(revoked),
                top10_holder_pct: None,
                lp_locked_pct: None,
            },
        );
        self
    }

    /// Builder: make individual fetches for an address fail
    pub fn with_failing_address(self, address: &str) -> Self {
        self.failing.lock().unwrap().insert(address.to_string());
        self
    }

    /// Builder: set the batch price endpoint behavior
    pub fn with_price_batch_mode(self, mode: BatchMode) -> Self {
        *self.price_batch_mode.lock().unwrap() = mode;
        self
    }

    /// Builder: set the batch metadata endpoint behavior
    pub fn with_metadata_batch_mode(self, mode: BatchMode) -> Self {
        *self.metadata_batch_mode.lock().unwrap() = mode;
        self
    }

    /// Builder: cap the advertised batch size
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Change the batch price behavior after construction
    pub fn set_price_batch_mode(&self, mode: BatchMode) {
        *self.price_batch_mode.lock().unwrap() = mode;
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls whose label starts with `prefix`
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn fails(&self, address: &str) -> bool {
        self.failing.lock().unwrap().contains(address)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenDataProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_token_price(&self, address: &str) -> Result<Option<TokenPrice>, ProviderError> {
        self.log(format!("price:{address}"));
        if self.fails(address) {
            return Err(ProviderError::Network("simulated failure".into()));
        }
        Ok(self.prices.lock().unwrap().get(address).cloned())
    }

    async fn get_multi_token_price(
        &self,
        addresses: &[String],
    ) -> Result<Option<HashMap<String, TokenPrice>>, ProviderError> {
        self.log(format!("multi_price:{}", addresses.len()));
        match *self.price_batch_mode.lock().unwrap() {
            BatchMode::Missing => Err(ProviderError::EndpointNotFound(
                "multi_price not found".into(),
            )),
            BatchMode::Failing => Err(ProviderError::Network("simulated batch failure".into())),
            BatchMode::Working => {
                let prices = self.prices.lock().unwrap();
                let found: HashMap<String, TokenPrice> = addresses
                    .iter()
                    .filter_map(|a| prices.get(a).map(|p| (a.clone(), p.clone())))
                    .collect();
                Ok(Some(found))
            }
        }
    }

    async fn get_token_metadata(
        &self,
        address: &str,
    ) -> Result<Option<TokenMetadata>, ProviderError> {
        self.log(format!("metadata:{address}"));
        if self.fails(address) {
            return Err(ProviderError::Network("simulated failure".into()));
        }
        Ok(self.metadata.lock().unwrap().get(address).cloned())
    }

    async fn get_batch_token_metadata(
        &self,
        addresses: &[String],
    ) -> Result<Option<HashMap<String, TokenMetadata>>, ProviderError> {
        self.log(format!("batch_metadata:{}", addresses.len()));
        match *self.metadata_batch_mode.lock().unwrap() {
            BatchMode::Missing => Err(ProviderError::EndpointNotFound(
                "batch_metadata not found".into(),
            )),
            BatchMode::Failing => Err(ProviderError::Network("simulated batch failure".into())),
            BatchMode::Working => {
                let metadata = self.metadata.lock().unwrap();
                let found: HashMap<String, TokenMetadata> = addresses
                    .iter()
                    .filter_map(|a| metadata.get(a).map(|m| (a.clone(), m.clone())))
                    .collect();
                Ok(Some(found))
            }
        }
    }

    async fn get_token_overview(
        &self,
        address: &str,
    ) -> Result<Option<TokenOverview>, ProviderError> {
        self.log(format!("overview:{address}"));
        if self.fails(address) {
            return Err(ProviderError::Network("simulated failure".into()));
        }
        Ok(self.overviews.lock().unwrap().get(address).cloned())
    }

    async fn get_token_security(
        &self,
        address: &str,
    ) -> Result<Option<TokenSecurity>, ProviderError> {
        self.log(format!("security:{address}"));
        if self.fails(address) {
            return Err(ProviderError::Network("simulated failure".into()));
        }
        Ok(self.securities.lock().unwrap().get(address).cloned())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }
}

/// Mock discovery strategy returning a fixed candidate list
pub struct MockStrategy {
    name: String,
    candidates: Vec<TokenCandidate>,
    fail: bool,
    runs: Mutex<u32>,
    prune_calls: Mutex<Vec<u32>>,
}

impl MockStrategy {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            candidates: Vec::new(),
            fail: false,
            runs: Mutex::new(0),
            prune_calls: Mutex::new(Vec::new()),
        }
    }

    /// Builder: add a candidate with an appearance counter
    pub fn with_candidate(mut self, address: &str, appearances: u32) -> Self {
        self.candidates.push(
            TokenCandidate::from_strategy(address, self.name.clone()).with_appearances(appearances),
        );
        self
    }

    /// Builder: make every run fail
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of completed discovery runs
    pub fn run_count(&self) -> u32 {
        *self.runs.lock().unwrap()
    }

    /// Cutoffs passed to prune_history
    pub fn prune_calls(&self) -> Vec<u32> {
        self.prune_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscoveryStrategy for MockStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn discover(
        &self,
        _provider: Arc<dyn TokenDataProvider>,
        _scan_id: Option<&str>,
    ) -> Result<Vec<TokenCandidate>, StrategyError> {
        *self.runs.lock().unwrap() += 1;
        if self.fail {
            return Err(StrategyError::Internal("simulated strategy failure".into()));
        }
        Ok(self.candidates.clone())
    }

    async fn prune_history(&self, max_age_days: u32) {
        self.prune_calls.lock().unwrap().push(max_age_days);
    }
}
