//! Strategy Execution History
//!
//! The one piece of state that survives restarts: a JSON file with at
//! most one record per `"<date>_<hour>"` slot, used to prevent the
//! scheduler from running the same hour-slot twice. Saved as a
//! whole-file overwrite after each run and after cleanup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key format for one scheduler hour-slot, kept stable for
/// compatibility with prior runs
pub const SLOT_KEY_FORMAT: &str = "%Y-%m-%d_%H";

/// Build the slot key for a point in time (UTC)
pub fn slot_key(now: DateTime<Utc>) -> String {
    now.format(SLOT_KEY_FORMAT).to_string()
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to read history file: {0}")]
    ReadError(String),

    #[error("Failed to write history file: {0}")]
    WriteError(String),

    #[error("History file is corrupted: {0}")]
    CorruptedFile(String),
}

/// One scheduled run, recorded per hour-slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unix seconds when the run completed
    pub timestamp: i64,
    /// Names of the strategies that ran
    pub strategies_run: Vec<String>,
    /// Number of merged candidates the run produced
    pub tokens_found: usize,
}

/// Persisted execution history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionHistory {
    /// Slot key -> record, at most one record per slot
    #[serde(default)]
    pub executions: HashMap<String, ExecutionRecord>,
    /// Unix seconds of the last should_run debounce check
    #[serde(default)]
    pub last_check_time: Option<i64>,
}

impl ExecutionHistory {
    /// Load from a file; a missing file is an empty history
    ///
    /// A corrupted file is reported so the caller can decide to start
    /// fresh (the scheduler re-runs the slot rather than crashing).
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            fs::read_to_string(path).map_err(|e| HistoryError::ReadError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| HistoryError::CorruptedFile(e.to_string()))
    }

    /// Save to a file, overwriting the whole file
    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| HistoryError::WriteError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| HistoryError::WriteError(e.to_string()))?;
        fs::write(path, content).map_err(|e| HistoryError::WriteError(e.to_string()))
    }

    /// True if the slot for `now` already has a record
    pub fn slot_executed(&self, now: DateTime<Utc>) -> bool {
        self.executions.contains_key(&slot_key(now))
    }

    /// Record a run for the slot of `now`
    pub fn record_run(
        &mut self,
        now: DateTime<Utc>,
        strategies_run: Vec<String>,
        tokens_found: usize,
    ) {
        self.executions.insert(
            slot_key(now),
            ExecutionRecord {
                timestamp: now.timestamp(),
                strategies_run,
                tokens_found,
            },
        );
    }

    /// Remove records older than `max_age_days`, returning the count
    pub fn prune(&mut self, now: DateTime<Utc>, max_age_days: u32) -> usize {
        let cutoff = (now - ChronoDuration::days(max_age_days as i64)).timestamp();
        let before = self.executions.len();
        self.executions.retain(|_, record| record.timestamp >= cutoff);
        before - self.executions.len()
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    #[test]
    fn test_slot_key_format() {
        let now = at(2025, 3, 9, 6);
        assert_eq!(slot_key(now), "2025-03-09_06");
    }

    #[test]
    fn test_record_and_check_slot() {
        let mut history = ExecutionHistory::default();
        let now = at(2025, 3, 9, 12);

        assert!(!history.slot_executed(now));
        history.record_run(now, vec!["watchlist".into()], 4);
        assert!(history.slot_executed(now));

        // Same hour, different minute: still the same slot
        let later = Utc.with_ymd_and_hms(2025, 3, 9, 12, 55, 0).unwrap();
        assert!(history.slot_executed(later));

        // Next hour is a fresh slot
        assert!(!history.slot_executed(at(2025, 3, 9, 13)));
    }

    #[test]
    fn test_record_overwrites_same_slot() {
        let mut history = ExecutionHistory::default();
        let now = at(2025, 3, 9, 12);

        history.record_run(now, vec!["a".into()], 1);
        history.record_run(now, vec!["b".into()], 2);

        assert_eq!(history.len(), 1);
        let record = &history.executions[&slot_key(now)];
        assert_eq!(record.tokens_found, 2);
    }

    #[test]
    fn test_prune_old_records() {
        let mut history = ExecutionHistory::default();
        let now = at(2025, 3, 9, 12);

        history.record_run(at(2025, 3, 1, 6), vec![], 0);
        history.record_run(at(2025, 3, 8, 6), vec![], 0);
        history.record_run(now, vec![], 0);

        let removed = history.prune(now, 7);
        assert_eq!(removed, 1);
        assert_eq!(history.len(), 2);
        assert!(!history.slot_executed(at(2025, 3, 1, 6)));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execution_history.json");

        let history = ExecutionHistory::load(&path).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("execution_history.json");
        let now = at(2025, 3, 9, 18);

        let mut history = ExecutionHistory::default();
        history.record_run(now, vec!["watchlist".into(), "volume".into()], 7);
        history.last_check_time = Some(now.timestamp());
        history.save(&path).unwrap();

        let loaded = ExecutionHistory::load(&path).unwrap();
        assert!(loaded.slot_executed(now));
        assert_eq!(loaded.last_check_time, Some(now.timestamp()));

        let record = &loaded.executions[&slot_key(now)];
        assert_eq!(record.strategies_run.len(), 2);
        assert_eq!(record.tokens_found, 7);
    }

    #[test]
    fn test_load_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execution_history.json");
        fs::write(&path, "{not json").unwrap();

        let result = ExecutionHistory::load(&path);
        assert!(matches!(result, Err(HistoryError::CorruptedFile(_))));
    }

    #[test]
    fn test_wire_format_compatibility() {
        // Shape shared with prior runs: executions keyed by slot,
        // last_check_time at the top level
        let json = r#"{
            "executions": {
                "2025-03-09_06": {
                    "timestamp": 1741500000,
                    "strategies_run": ["watchlist"],
                    "tokens_found": 3
                }
            },
            "last_check_time": 1741500000
        }"#;

        let history: ExecutionHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history
            .executions
            .contains_key("2025-03-09_06"));
    }
}
