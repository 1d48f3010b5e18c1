//! HTTP Provider Response Types
//!
//! Wire payloads for the JSON data gateway. Every market field is
//! optional; the gateway omits what it does not know and the port
//! types carry that through as `None`.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::ports::provider::{TokenMetadata, TokenOverview, TokenPrice, TokenSecurity};

/// Envelope every gateway endpoint responds with
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
}

/// Price payload for one token
#[derive(Debug, Clone, Deserialize)]
pub struct PricePayload {
    pub value: f64,
    #[serde(default)]
    pub liquidity: Option<f64>,
    #[serde(rename = "v24hUSD", default)]
    pub volume_24h_usd: Option<f64>,
    #[serde(rename = "updateUnixTime", default)]
    pub update_unix_time: Option<i64>,
}

impl PricePayload {
    pub fn into_price(self, address: &str) -> TokenPrice {
        let updated_at = self
            .update_unix_time
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);
        TokenPrice {
            address: address.to_string(),
            price_usd: self.value,
            liquidity_usd: self.liquidity,
            volume_24h_usd: self.volume_24h_usd,
            updated_at,
        }
    }
}

/// Batch price payload keyed by address
pub type MultiPricePayload = HashMap<String, PricePayload>;

/// Metadata payload for one token
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataPayload {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub supply: Option<f64>,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
}

impl MetadataPayload {
    pub fn into_metadata(self, address: &str) -> TokenMetadata {
        TokenMetadata {
            address: address.to_string(),
            symbol: self.symbol,
            name: self.name,
            decimals: self.decimals,
            total_supply: self.supply,
            logo_uri: self.logo_uri,
        }
    }
}

/// Batch metadata payload keyed by address
pub type MultiMetadataPayload = HashMap<String, MetadataPayload>;

/// Overview payload for one token
#[derive(Debug, Clone, Deserialize)]
pub struct OverviewPayload {
    #[serde(rename = "marketCap", default)]
    pub market_cap: Option<f64>,
    #[serde(rename = "v24hUSD", default)]
    pub volume_24h_usd: Option<f64>,
    #[serde(rename = "priceChange24hPercent", default)]
    pub price_change_24h_pct: Option<f64>,
    #[serde(default)]
    pub holder: Option<u64>,
    #[serde(rename = "trade24h", default)]
    pub trade_24h: Option<u64>,
}

impl OverviewPayload {
    pub fn into_overview(self, address: &str) -> TokenOverview {
        TokenOverview {
            address: address.to_string(),
            market_cap_usd: self.market_cap,
            volume_24h_usd: self.volume_24h_usd,
            price_change_24h_pct: self.price_change_24h_pct,
            holder_count: self.holder,
            trade_count_24h: self.trade_24h,
        }
    }
}

/// Security payload for one token
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityPayload {
    #[serde(rename = "mintAuthorityRevoked", default)]
    pub mint_authority_revoked: Option<bool>,
    #[serde(rename = "freezeAuthorityRevoked", default)]
    pub freeze_authority_revoked: Option<bool>,
    #[serde(rename = "top10HolderPercent", default)]
    pub top10_holder_pct: Option<f64>,
    #[serde(rename = "lpLockedPercent", default)]
    pub lp_locked_pct: Option<f64>,
}

impl SecurityPayload {
    pub fn into_security(self, address: &str) -> TokenSecurity {
        TokenSecurity {
            address: address.to_string(),
            mint_authority_revoked: self.mint_authority_revoked,
            freeze_authority_revoked: self.freeze_authority_revoked,
            top10_holder_pct: self.top10_holder_pct,
            lp_locked_pct: self.lp_locked_pct,
        }
    }
}
