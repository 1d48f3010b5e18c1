//! Token Candidate Model
//!
//! The unit exchanged between discovery strategies and the scheduler,
//! plus the cross-strategy merge that deduplicates candidates by
//! address.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::provider::{TokenMetadata, TokenOverview, TokenPrice, TokenSecurity};

/// Per-strategy tracking data attached to a candidate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyData {
    /// How many consecutive scheduler runs have surfaced this token.
    ///
    /// Used as the tie-break when the same address is reported by more
    /// than one strategy; a strategy that does not track appearances
    /// leaves this at 0 and yields the merge to any strategy that does.
    pub consecutive_appearances: u32,
    /// First time any run surfaced this token
    pub first_seen: Option<DateTime<Utc>>,
    /// Most recent time a run surfaced this token
    pub last_seen: Option<DateTime<Utc>>,
    /// Strategy-specific score, higher is better
    pub score: Option<f64>,
}

/// A discovered early-gem candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCandidate {
    /// Token mint address
    pub address: String,
    /// Symbol when known
    pub symbol: Option<String>,
    /// Name when known
    pub name: Option<String>,
    /// Name of the strategy that produced this candidate
    pub source_strategy: Option<String>,
    /// When the candidate was produced
    pub discovered_at: DateTime<Utc>,
    /// Shared-pool enrichment, attached by the scheduler
    pub price: Option<TokenPrice>,
    pub metadata: Option<TokenMetadata>,
    pub overview: Option<TokenOverview>,
    pub security: Option<TokenSecurity>,
    /// Strategy tracking data
    pub strategy_data: StrategyData,
}

impl TokenCandidate {
    /// Create a bare candidate for an address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            symbol: None,
            name: None,
            source_strategy: None,
            discovered_at: Utc::now(),
            price: None,
            metadata: None,
            overview: None,
            security: None,
            strategy_data: StrategyData::default(),
        }
    }

    /// Create a candidate attributed to a strategy
    pub fn from_strategy(address: impl Into<String>, strategy: impl Into<String>) -> Self {
        let mut candidate = Self::new(address);
        candidate.source_strategy = Some(strategy.into());
        candidate
    }

    /// Set the consecutive-appearance counter
    pub fn with_appearances(mut self, count: u32) -> Self {
        self.strategy_data.consecutive_appearances = count;
        self
    }
}

/// Merge candidate lists from several strategies by address
///
/// When the same address appears more than once, the candidate with the
/// higher `consecutive_appearances` wins; on a tie the first-seen entry
/// is kept. Output preserves first-seen order.
pub fn merge_candidates(lists: Vec<Vec<TokenCandidate>>) -> Vec<TokenCandidate> {
    let mut merged: Vec<TokenCandidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for candidate in list {
            match index.get(&candidate.address).copied() {
                Some(slot) => {
                    if candidate.strategy_data.consecutive_appearances
                        > merged[slot].strategy_data.consecutive_appearances
                    {
                        merged[slot] = candidate;
                    }
                }
                None => {
                    index.insert(candidate.address.clone(), merged.len());
                    merged.push(candidate);
                }
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(address: &str, strategy: &str, appearances: u32) -> TokenCandidate {
        TokenCandidate::from_strategy(address, strategy).with_appearances(appearances)
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_candidates(vec![]).is_empty());
        assert!(merge_candidates(vec![vec![], vec![]]).is_empty());
    }

    #[test]
    fn test_merge_keeps_higher_appearances() {
        let merged = merge_candidates(vec![
            vec![candidate("mint1", "volume", 2)],
            vec![candidate("mint1", "momentum", 5)],
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].strategy_data.consecutive_appearances, 5);
        assert_eq!(merged[0].source_strategy.as_deref(), Some("momentum"));
    }

    #[test]
    fn test_merge_tie_keeps_first_seen() {
        let merged = merge_candidates(vec![
            vec![candidate("mint1", "volume", 3)],
            vec![candidate("mint1", "momentum", 3)],
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source_strategy.as_deref(), Some("volume"));
    }

    #[test]
    fn test_merge_untracked_counter_loses() {
        // A strategy that never sets the counter defaults to 0 and
        // yields to any strategy that reports one.
        let merged = merge_candidates(vec![
            vec![TokenCandidate::from_strategy("mint1", "fresh")],
            vec![candidate("mint1", "tracked", 1)],
        ]);

        assert_eq!(merged[0].source_strategy.as_deref(), Some("tracked"));
    }

    #[test]
    fn test_merge_preserves_first_seen_order() {
        let merged = merge_candidates(vec![
            vec![candidate("mint1", "a", 1), candidate("mint2", "a", 1)],
            vec![candidate("mint3", "b", 1), candidate("mint1", "b", 9)],
        ]);

        let order: Vec<&str> = merged.iter().map(|c| c.address.as_str()).collect();
        assert_eq!(order, vec!["mint1", "mint2", "mint3"]);
        assert_eq!(merged[0].strategy_data.consecutive_appearances, 9);
    }
}
