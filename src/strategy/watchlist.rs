//! Watchlist Discovery Strategy
//!
//! The built-in reference strategy: re-surfaces a configured list of
//! token addresses on every run and tracks how many consecutive runs
//! each address has appeared in. The appearance counter is what gives
//! watchlist candidates their merge priority over one-off discoveries.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;

use crate::domain::candidate::TokenCandidate;
use crate::ports::provider::TokenDataProvider;
use crate::ports::strategy::{DiscoveryStrategy, StrategyError};

/// Watchlist configuration
#[derive(Debug, Clone, Default)]
pub struct WatchlistConfig {
    /// Addresses surfaced on every run
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone)]
struct TrackedToken {
    consecutive_appearances: u32,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

/// Surfaces watchlisted addresses with consecutive-appearance tracking
pub struct WatchlistStrategy {
    config: WatchlistConfig,
    tracker: Mutex<HashMap<String, TrackedToken>>,
}

impl WatchlistStrategy {
    pub fn new(config: WatchlistConfig) -> Self {
        Self {
            config,
            tracker: Mutex::new(HashMap::new()),
        }
    }

    /// Create a strategy from a plain address list
    pub fn from_addresses(addresses: Vec<String>) -> Self {
        Self::new(WatchlistConfig { addresses })
    }

    /// Number of addresses currently tracked
    pub async fn tracked_count(&self) -> usize {
        self.tracker.lock().await.len()
    }

    #[cfg(test)]
    async fn backdate(&self, address: &str, days: i64) {
        if let Some(tracked) = self.tracker.lock().await.get_mut(address) {
            tracked.last_seen = tracked.last_seen - ChronoDuration::days(days);
        }
    }
}

#[async_trait]
impl DiscoveryStrategy for WatchlistStrategy {
    fn name(&self) -> &str {
        "watchlist"
    }

    async fn discover(
        &self,
        _provider: Arc<dyn TokenDataProvider>,
        scan_id: Option<&str>,
    ) -> Result<Vec<TokenCandidate>, StrategyError> {
        let now = Utc::now();
        let mut tracker = self.tracker.lock().await;
        let mut candidates = Vec::with_capacity(self.config.addresses.len());

        for address in &self.config.addresses {
            let tracked = tracker
                .entry(address.clone())
                .and_modify(|t| {
                    t.consecutive_appearances += 1;
                    t.last_seen = now;
                })
                .or_insert(TrackedToken {
                    consecutive_appearances: 1,
                    first_seen: now,
                    last_seen: now,
                });

            let mut candidate = TokenCandidate::from_strategy(address.clone(), self.name());
            candidate.strategy_data.consecutive_appearances = tracked.consecutive_appearances;
            candidate.strategy_data.first_seen = Some(tracked.first_seen);
            candidate.strategy_data.last_seen = Some(tracked.last_seen);
            candidates.push(candidate);
        }

        tracing::debug!(
            scan_id = scan_id.unwrap_or("-"),
            candidates = candidates.len(),
            "watchlist discovery completed"
        );
        Ok(candidates)
    }

    async fn prune_history(&self, max_age_days: u32) {
        let cutoff = Utc::now() - ChronoDuration::days(max_age_days as i64);
        let mut tracker = self.tracker.lock().await;
        let before = tracker.len();
        tracker.retain(|_, tracked| tracked.last_seen >= cutoff);
        let removed = before - tracker.len();
        if removed > 0 {
            tracing::debug!(removed, "pruned stale watchlist tracking entries");
        }
    }
}
