//! Strategy Scheduler
//!
//! Runs registered discovery strategies on a fixed hourly schedule.
//! Each UTC hour-slot runs at most once (enforced through the persisted
//! execution history), one failing strategy never blocks the others,
//! and candidate lists are merged by address with the
//! consecutive-appearances tie-break.
//!
//! The sharing variant runs all discovery phases first, then performs a
//! single batch fetch pass for the union of discovered addresses and
//! re-attaches the shared data to every candidate - one fetch, reused
//! everywhere, instead of per-strategy enrichment.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::batch::manager::BatchApiManager;
use crate::domain::candidate::{merge_candidates, TokenCandidate};
use crate::ports::provider::TokenDataProvider;
use crate::ports::strategy::DiscoveryStrategy;
use crate::scheduler::history::ExecutionHistory;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Master switch; a disabled scheduler is never due
    pub enabled: bool,
    /// UTC hours of day at which runs are due
    pub run_hours: Vec<u32>,
    /// Minimum spacing between due-checks (debounce)
    pub check_interval: Duration,
    /// Path of the persisted execution history
    pub history_path: PathBuf,
    /// Execution records older than this are pruned by clean_expired
    pub max_record_age_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            run_hours: vec![0, 6, 12, 18],
            check_interval: Duration::from_secs(300),
            history_path: PathBuf::from("data/strategy_executions/execution_history.json"),
            max_record_age_days: 30,
        }
    }
}

/// Hourly runner over registered discovery strategies
pub struct StrategyScheduler {
    config: SchedulerConfig,
    strategies: Vec<Arc<dyn DiscoveryStrategy>>,
    history: Mutex<ExecutionHistory>,
}

impl StrategyScheduler {
    /// Create a scheduler, loading any existing execution history.
    /// A corrupted history file is logged and treated as empty - the
    /// slot re-runs rather than the scheduler crashing.
    pub fn new(config: SchedulerConfig) -> Self {
        let history = match ExecutionHistory::load(&config.history_path) {
            Ok(history) => history,
            Err(err) => {
                tracing::warn!(error = %err, "could not load execution history, starting fresh");
                ExecutionHistory::default()
            }
        };

        Self {
            config,
            strategies: Vec::new(),
            history: Mutex::new(history),
        }
    }

    /// Register a discovery strategy
    pub fn register(&mut self, strategy: Arc<dyn DiscoveryStrategy>) {
        tracing::info!(strategy = strategy.name(), "registered discovery strategy");
        self.strategies.push(strategy);
    }

    /// Number of registered strategies
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// True iff a scheduled run is due at `now`
    ///
    /// Checks, in order: scheduler enabled, debounce interval since the
    /// last check, `now`'s UTC hour in the configured run-hour set, and
    /// no execution record for the current hour-slot.
    pub async fn should_run(&self, now: DateTime<Utc>) -> bool {
        if !self.config.enabled {
            return false;
        }

        let mut history = self.history.lock().await;
        if let Some(last_check) = history.last_check_time {
            let since = now.timestamp() - last_check;
            if since >= 0 && (since as u64) < self.config.check_interval.as_secs() {
                return false;
            }
        }
        history.last_check_time = Some(now.timestamp());

        if !self.config.run_hours.contains(&now.hour()) {
            return false;
        }

        !history.slot_executed(now)
    }

    /// Run all registered strategies if a run is due
    ///
    /// Not due is a no-op returning an empty list. Each strategy runs
    /// its full `execute` path; a failing strategy contributes zero
    /// candidates and is logged, the others are unaffected.
    pub async fn run_due(
        &self,
        provider: Arc<dyn TokenDataProvider>,
        now: DateTime<Utc>,
        scan_id: Option<&str>,
    ) -> Vec<TokenCandidate> {
        if !self.should_run(now).await {
            return Vec::new();
        }

        let mut lists = Vec::new();
        let mut ran = Vec::new();
        for strategy in &self.strategies {
            match strategy.execute(Arc::clone(&provider), scan_id).await {
                Ok(candidates) => {
                    tracing::info!(
                        strategy = strategy.name(),
                        candidates = candidates.len(),
                        "strategy completed"
                    );
                    ran.push(strategy.name().to_string());
                    lists.push(candidates);
                }
                Err(err) => {
                    tracing::error!(strategy = strategy.name(), error = %err, "strategy failed");
                }
            }
        }

        let merged = merge_candidates(lists);
        self.persist_run(now, ran, merged.len()).await;
        merged
    }

    /// Run all strategies with one shared batch-fetched data pool
    ///
    /// Discovery phases run concurrently; the union of discovered
    /// addresses is fetched exactly once through the batch manager
    /// (prices, metadata, overviews, security) and re-attached to every
    /// strategy's candidates before the merge. This replaces
    /// per-strategy enrichment fetches with one shared pass.
    pub async fn run_due_with_sharing(
        &self,
        manager: &BatchApiManager,
        provider: Arc<dyn TokenDataProvider>,
        now: DateTime<Utc>,
        scan_id: Option<&str>,
    ) -> Vec<TokenCandidate> {
        if !self.should_run(now).await {
            return Vec::new();
        }

        // Concurrent pure-discovery phase
        let mut set: JoinSet<(usize, Result<Vec<TokenCandidate>, String>)> = JoinSet::new();
        for (index, strategy) in self.strategies.iter().enumerate() {
            let strategy = Arc::clone(strategy);
            let provider = Arc::clone(&provider);
            let scan_id = scan_id.map(|s| s.to_string());
            set.spawn(async move {
                let result = strategy
                    .discover(provider, scan_id.as_deref())
                    .await
                    .map_err(|e| e.to_string());
                (index, result)
            });
        }

        // Collected back into registration order so the merge
        // tie-break stays deterministic
        let mut by_index: BTreeMap<usize, Vec<TokenCandidate>> = BTreeMap::new();
        let mut ran = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(candidates))) => {
                    ran.push(self.strategies[index].name().to_string());
                    by_index.insert(index, candidates);
                }
                Ok((index, Err(err))) => {
                    tracing::error!(
                        strategy = self.strategies[index].name(),
                        error = %err,
                        "discovery phase failed"
                    );
                }
                Err(err) => {
                    tracing::error!(error = %err, "discovery task panicked");
                }
            }
        }
        ran.sort();

        // Union of unique addresses across all strategies, first-seen order
        let mut union = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for candidates in by_index.values() {
            for candidate in candidates {
                if seen.insert(candidate.address.as_str()) {
                    union.push(candidate.address.clone());
                }
            }
        }

        tracing::info!(
            scan_id = scan_id.unwrap_or("-"),
            strategies = ran.len(),
            unique_tokens = union.len(),
            "fetching shared data pool"
        );

        // One shared fetch pass for the whole union
        let prices = manager.fetch_prices(&union, scan_id).await;
        let metadata = manager.fetch_metadata(&union, scan_id).await;
        let overviews = manager.fetch_overviews(&union, scan_id).await;
        let securities = manager.fetch_securities(&union, scan_id).await;

        let lists: Vec<Vec<TokenCandidate>> = by_index
            .into_values()
            .map(|candidates| {
                candidates
                    .into_iter()
                    .map(|mut candidate| {
                        candidate.price = prices.get(&candidate.address).cloned();
                        candidate.overview = overviews.get(&candidate.address).cloned();
                        candidate.security = securities.get(&candidate.address).cloned();
                        if let Some(meta) = metadata.get(&candidate.address) {
                            if candidate.symbol.is_none() {
                                candidate.symbol = meta.symbol.clone();
                            }
                            if candidate.name.is_none() {
                                candidate.name = meta.name.clone();
                            }
                            candidate.metadata = Some(meta.clone());
                        }
                        candidate
                    })
                    .collect()
            })
            .collect();

        let merged = merge_candidates(lists);
        self.persist_run(now, ran, merged.len()).await;
        merged
    }

    /// Prune execution records older than the configured age and let
    /// each strategy prune its own tracking data. Returns the number of
    /// records removed.
    pub async fn clean_expired(&self, now: DateTime<Utc>) -> usize {
        let removed = {
            let mut history = self.history.lock().await;
            let removed = history.prune(now, self.config.max_record_age_days);
            if let Err(err) = history.save(&self.config.history_path) {
                tracing::warn!(error = %err, "could not save execution history after cleanup");
            }
            removed
        };

        for strategy in &self.strategies {
            strategy.prune_history(self.config.max_record_age_days).await;
        }

        if removed > 0 {
            tracing::info!(removed, "pruned old execution records");
        }
        removed
    }

    /// Number of recorded hour-slots
    pub async fn recorded_slots(&self) -> usize {
        self.history.lock().await.len()
    }

    async fn persist_run(&self, now: DateTime<Utc>, ran: Vec<String>, tokens_found: usize) {
        let mut history = self.history.lock().await;
        history.record_run(now, ran, tokens_found);
        if let Err(err) = history.save(&self.config.history_path) {
            tracing::warn!(error = %err, "could not save execution history");
        }
    }
}
