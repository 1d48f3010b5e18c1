//! HTTP Data Provider
//!
//! Generic JSON-over-HTTP implementation of `TokenDataProvider` for a
//! configurable data gateway. Classifies HTTP statuses into the port's
//! error taxonomy (404 -> endpoint missing, 429 -> rate limited) and
//! retries transient server errors with linear backoff.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{
    ApiResponse, MetadataPayload, MultiMetadataPayload, MultiPricePayload, OverviewPayload,
    PricePayload, SecurityPayload,
};
use crate::ports::provider::{
    ProviderError, TokenDataProvider, TokenMetadata, TokenOverview, TokenPrice, TokenSecurity,
};

/// Configuration for the HTTP provider
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// Gateway base URL
    pub base_url: String,
    /// API key sent as the X-API-KEY header
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry attempts for transient failures
    pub max_retries: u32,
    /// Base delay for retry backoff (milliseconds)
    pub retry_base_delay_ms: u64,
    /// Largest batch the gateway accepts per call
    pub max_batch_size: usize,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_key: None,
            timeout: Duration::from_secs(15),
            max_retries: 3,
            retry_base_delay_ms: 500,
            max_batch_size: 100,
        }
    }
}

impl HttpProviderConfig {
    /// Create config pointed at a custom gateway
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// JSON-over-HTTP token data client
#[derive(Debug, Clone)]
pub struct HttpProvider {
    config: HttpProviderConfig,
    http: Client,
}

impl HttpProvider {
    /// Create a provider with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(HttpProviderConfig::with_base_url(base_url))
    }

    /// Create a provider with custom configuration
    pub fn with_config(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// The configured gateway base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// GET an envelope-wrapped payload with retry on transient failures
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ProviderError> {
        let url = self.endpoint(path);
        let mut last_error = ProviderError::Network("no attempts made".into());

        for attempt in 0..self.config.max_retries.max(1) {
            let mut request = self.http.get(&url).query(query);
            if let Some(key) = &self.config.api_key {
                request = request.header("X-API-KEY", key);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    last_error = classify_reqwest_error(err);
                    self.backoff(attempt).await;
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(ProviderError::EndpointNotFound(path.to_string()));
            }
            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(path, attempt, "rate limited by gateway (429)");
                last_error = ProviderError::RateLimited(format!("429 on {path}"));
                self.backoff(attempt + 1).await;
                continue;
            }
            if status.is_server_error() {
                last_error = ProviderError::Network(format!("server error {status} on {path}"));
                self.backoff(attempt).await;
                continue;
            }
            if !status.is_success() {
                return Err(ProviderError::Network(format!(
                    "unexpected status {status} on {path}"
                )));
            }

            let envelope: ApiResponse<T> = response
                .json()
                .await
                .map_err(|e| ProviderError::Parse(e.to_string()))?;
            return Ok(envelope.data);
        }

        Err(last_error)
    }

    async fn backoff(&self, attempt: u32) {
        let delay = Duration::from_millis(self.config.retry_base_delay_ms * (attempt as u64 + 1));
        tokio::time::sleep(delay).await;
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else if err.is_decode() {
        ProviderError::Parse(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

#[async_trait]
impl TokenDataProvider for HttpProvider {
    fn name(&self) -> &str {
        "http-gateway"
    }

    async fn get_token_price(&self, address: &str) -> Result<Option<TokenPrice>, ProviderError> {
        let payload: Option<PricePayload> = self
            .get_json("token/price", &[("address", address.to_string())])
            .await?;
        Ok(payload.map(|p| p.into_price(address)))
    }

    async fn get_multi_token_price(
        &self,
        addresses: &[String],
    ) -> Result<Option<HashMap<String, TokenPrice>>, ProviderError> {
        let ids = addresses.join(",");
        let payload: Option<MultiPricePayload> = self
            .get_json("token/multi_price", &[("addresses", ids)])
            .await?;
        Ok(payload.map(|map| {
            map.into_iter()
                .map(|(address, p)| {
                    let price = p.into_price(&address);
                    (address, price)
                })
                .collect()
        }))
    }

    async fn get_token_metadata(
        &self,
        address: &str,
    ) -> Result<Option<TokenMetadata>, ProviderError> {
        let payload: Option<MetadataPayload> = self
            .get_json("token/metadata", &[("address", address.to_string())])
            .await?;
        Ok(payload.map(|m| m.into_metadata(address)))
    }

    async fn get_batch_token_metadata(
        &self,
        addresses: &[String],
    ) -> Result<Option<HashMap<String, TokenMetadata>>, ProviderError> {
        let ids = addresses.join(",");
        let payload: Option<MultiMetadataPayload> = self
            .get_json("token/meta_multiple", &[("addresses", ids)])
            .await?;
        Ok(payload.map(|map| {
            map.into_iter()
                .map(|(address, m)| {
                    let metadata = m.into_metadata(&address);
                    (address, metadata)
                })
                .collect()
        }))
    }

    async fn get_token_overview(
        &self,
        address: &str,
    ) -> Result<Option<TokenOverview>, ProviderError> {
        let payload: Option<OverviewPayload> = self
            .get_json("token/overview", &[("address", address.to_string())])
            .await?;
        Ok(payload.map(|o| o.into_overview(address)))
    }

    async fn get_token_security(
        &self,
        address: &str,
    ) -> Result<Option<TokenSecurity>, ProviderError> {
        let payload: Option<SecurityPayload> = self
            .get_json("token/security", &[("address", address.to_string())])
            .await?;
        Ok(payload.map(|s| s.into_security(address)))
    }

    fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HttpProviderConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_batch_size, 100);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_with_base_url() {
        let config = HttpProviderConfig::with_base_url("https://gateway.example.com/v1");
        assert_eq!(config.base_url, "https://gateway.example.com/v1");
    }

    #[test]
    fn test_client_creation() {
        let provider = HttpProvider::new("https://gateway.example.com");
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().name(), "http-gateway");
    }

    #[test]
    fn test_endpoint_joining() {
        let provider = HttpProvider::new("https://gateway.example.com/").unwrap();
        assert_eq!(
            provider.endpoint("/token/price"),
            "https://gateway.example.com/token/price"
        );
        assert_eq!(
            provider.endpoint("token/overview"),
            "https://gateway.example.com/token/overview"
        );
    }

    #[test]
    fn test_max_batch_size_from_config() {
        let config = HttpProviderConfig {
            max_batch_size: 25,
            ..HttpProviderConfig::with_base_url("https://gateway.example.com")
        };
        let provider = HttpProvider::with_config(config).unwrap();
        assert_eq!(provider.max_batch_size(), 25);
    }
}
