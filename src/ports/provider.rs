//! Upstream Data Provider Port
//!
//! Trait abstraction over third-party token data APIs. Implementations
//! return `Ok(None)` for a soft miss (no data for that address) and an
//! error only for real failures; the batch manager never lets either
//! escape to its callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Provider error type
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// True when the error means the endpoint itself does not exist.
    ///
    /// The capability probe maps this to "batch unsupported"; any other
    /// failure leaves the capability unknown so a transient error never
    /// permanently disables true-batch usage.
    pub fn is_endpoint_missing(&self) -> bool {
        match self {
            ProviderError::EndpointNotFound(_) => true,
            ProviderError::Network(msg) | ProviderError::Parse(msg) => {
                msg.to_lowercase().contains("not found") || msg.contains("404")
            }
            _ => false,
        }
    }
}

/// Spot price for one token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPrice {
    /// Token mint address
    pub address: String,
    /// Price in USD
    pub price_usd: f64,
    /// Pool liquidity in USD, when the provider reports it
    pub liquidity_usd: Option<f64>,
    /// 24h volume in USD, when the provider reports it
    pub volume_24h_usd: Option<f64>,
    /// When the price was observed
    pub updated_at: DateTime<Utc>,
}

impl TokenPrice {
    pub fn new(address: impl Into<String>, price_usd: f64) -> Self {
        Self {
            address: address.into(),
            price_usd,
            liquidity_usd: None,
            volume_24h_usd: None,
            updated_at: Utc::now(),
        }
    }
}

/// Static token metadata
///
/// Every field except the address is optional; providers routinely omit
/// fields and the pipeline tolerates that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Token mint address
    pub address: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<f64>,
    pub logo_uri: Option<String>,
}

impl TokenMetadata {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            symbol: None,
            name: None,
            decimals: None,
            total_supply: None,
            logo_uri: None,
        }
    }

    /// Builder used by tests and adapters
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

/// Market overview for one token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenOverview {
    pub address: String,
    pub market_cap_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub price_change_24h_pct: Option<f64>,
    pub holder_count: Option<u64>,
    pub trade_count_24h: Option<u64>,
}

/// Security assessment for one token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSecurity {
    pub address: String,
    pub mint_authority_revoked: Option<bool>,
    pub freeze_authority_revoked: Option<bool>,
    pub top10_holder_pct: Option<f64>,
    pub lp_locked_pct: Option<f64>,
}

impl TokenSecurity {
    /// Both authorities revoked and not obviously concentrated
    pub fn looks_safe(&self) -> bool {
        self.mint_authority_revoked.unwrap_or(false)
            && self.freeze_authority_revoked.unwrap_or(false)
    }
}

/// Port over upstream token data APIs
///
/// Batch functions return a map keyed by the same address strings that
/// were passed in. `Ok(None)` signals "no data, not an error".
#[async_trait]
pub trait TokenDataProvider: Send + Sync {
    /// Provider name, used in logs
    fn name(&self) -> &str;

    /// Fetch the price of a single token
    async fn get_token_price(&self, address: &str) -> Result<Option<TokenPrice>, ProviderError>;

    /// Fetch prices for several tokens in one call (true batch)
    async fn get_multi_token_price(
        &self,
        addresses: &[String],
    ) -> Result<Option<HashMap<String, TokenPrice>>, ProviderError>;

    /// Fetch metadata for a single token
    async fn get_token_metadata(
        &self,
        address: &str,
    ) -> Result<Option<TokenMetadata>, ProviderError>;

    /// Fetch metadata for several tokens in one call (true batch)
    async fn get_batch_token_metadata(
        &self,
        addresses: &[String],
    ) -> Result<Option<HashMap<String, TokenMetadata>>, ProviderError>;

    /// Fetch the market overview for a single token
    async fn get_token_overview(
        &self,
        address: &str,
    ) -> Result<Option<TokenOverview>, ProviderError>;

    /// Fetch the security assessment for a single token
    async fn get_token_security(
        &self,
        address: &str,
    ) -> Result<Option<TokenSecurity>, ProviderError>;

    /// Largest batch the provider accepts in one call
    fn max_batch_size(&self) -> usize {
        100
    }
}
