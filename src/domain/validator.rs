//! Token Address Validation
//!
//! Filters token address lists before any network call is made:
//! duplicate removal, Solana base58 format checks and exclusion of
//! major tokens / stablecoins that are never early-gem candidates.

use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Wrapped SOL mint
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";
/// Wrapped BTC (Sollet) mint
pub const WBTC_MINT: &str = "9n4nbM75f5Ui33ZbPYXn59EwSgE8CGsHtAeTH5YFeJ9E";
/// Wrapped ETH (Wormhole) mint
pub const WETH_MINT: &str = "7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs";
/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
/// USDT mint
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
/// USDH mint
pub const USDH_MINT: &str = "USDH1SM1ojwWUga67PGrgFWUHibbjqMvuMaDkRJTgkX";

/// Major tokens that are never early-gem candidates
const MAJOR_TOKENS: &[&str] = &[WSOL_MINT, WBTC_MINT, WETH_MINT];

/// Known stablecoins and variants
const STABLECOINS: &[&str] = &[USDC_MINT, USDT_MINT, USDH_MINT];

/// Validator configuration - each check can be toggled independently
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Reject addresses that are not valid Solana base58 mints
    pub enable_format_check: bool,
    /// Reject major tokens and stablecoins
    pub enable_exclusion_check: bool,
    /// Remove exact string duplicates (first-seen wins)
    pub enable_duplicate_check: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            enable_format_check: true,
            enable_exclusion_check: true,
            enable_duplicate_check: true,
        }
    }
}

/// Per-call validation outcome
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Number of addresses supplied
    pub input_count: usize,
    /// Number of addresses that survived all checks
    pub valid_count: usize,
    /// Number of addresses removed by any check
    pub filtered_count: usize,
    /// Addresses rejected by the format check
    pub invalid_format: Vec<String>,
    /// Addresses rejected by the exclusion check
    pub excluded_tokens: Vec<String>,
    /// Count of exact duplicates removed
    pub duplicates_removed: usize,
    /// Wall-clock time spent validating
    pub elapsed: Duration,
    /// Set when the input itself was unusable (e.g. empty list)
    pub error: Option<String>,
}

/// Running session statistics across validate_batch calls
#[derive(Debug, Clone, Default)]
pub struct ValidationStats {
    pub batches_validated: u64,
    pub tokens_seen: u64,
    pub tokens_valid: u64,
    pub tokens_filtered: u64,
    pub total_validation_time: Duration,
}

impl ValidationStats {
    /// Fraction of seen tokens that survived validation
    pub fn pass_rate(&self) -> f64 {
        if self.tokens_seen == 0 {
            return 0.0;
        }
        self.tokens_valid as f64 / self.tokens_seen as f64
    }
}

/// Validates, dedups and filters token address lists
#[derive(Debug)]
pub struct TokenValidator {
    config: ValidatorConfig,
    excluded: HashSet<String>,
    stats: ValidationStats,
}

impl TokenValidator {
    /// Create a validator with default configuration and exclusion sets
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    /// Create a validator with custom configuration
    pub fn with_config(config: ValidatorConfig) -> Self {
        let excluded = MAJOR_TOKENS
            .iter()
            .chain(STABLECOINS.iter())
            .map(|s| s.to_string())
            .collect();

        Self {
            config,
            excluded,
            stats: ValidationStats::default(),
        }
    }

    /// Validate a batch of addresses
    ///
    /// Checks run in order: duplicate removal, format, exclusion.
    /// The returned list preserves the input relative order minus
    /// removed entries. An empty input yields an empty valid list and
    /// a report with `error` set; nothing is ever raised.
    pub fn validate_batch(&mut self, addresses: &[String]) -> (Vec<String>, ValidationReport) {
        let started = Instant::now();
        let mut report = ValidationReport {
            input_count: addresses.len(),
            ..Default::default()
        };

        if addresses.is_empty() {
            report.error = Some("empty address list".to_string());
            report.elapsed = started.elapsed();
            self.record(&report);
            return (Vec::new(), report);
        }

        // Duplicates go first so the same bad address is reported once
        let mut working: Vec<&str> = Vec::with_capacity(addresses.len());
        if self.config.enable_duplicate_check {
            let mut seen: HashSet<&str> = HashSet::with_capacity(addresses.len());
            for address in addresses {
                if seen.insert(address.as_str()) {
                    working.push(address.as_str());
                } else {
                    report.duplicates_removed += 1;
                }
            }
        } else {
            working.extend(addresses.iter().map(|a| a.as_str()));
        }

        let mut valid = Vec::with_capacity(working.len());
        for address in working {
            if self.config.enable_format_check && !is_valid_solana_address(address) {
                report.invalid_format.push(address.to_string());
                continue;
            }
            if self.config.enable_exclusion_check && self.excluded.contains(address) {
                report.excluded_tokens.push(address.to_string());
                continue;
            }
            valid.push(address.to_string());
        }

        report.valid_count = valid.len();
        report.filtered_count = report.input_count - report.valid_count;
        report.elapsed = started.elapsed();
        self.record(&report);

        if report.valid_count == 0 {
            tracing::warn!(
                input = report.input_count,
                invalid = report.invalid_format.len(),
                excluded = report.excluded_tokens.len(),
                duplicates = report.duplicates_removed,
                "validation filtered out every address"
            );
        }

        (valid, report)
    }

    /// Add an address to the exclusion set
    pub fn add_exclusion_token(&mut self, address: impl Into<String>) {
        self.excluded.insert(address.into());
    }

    /// Remove an address from the exclusion set, returns true if it was present
    pub fn remove_exclusion_token(&mut self, address: &str) -> bool {
        self.excluded.remove(address)
    }

    /// Check membership in the exclusion set
    pub fn is_excluded(&self, address: &str) -> bool {
        self.excluded.contains(address)
    }

    /// Number of excluded addresses
    pub fn exclusion_count(&self) -> usize {
        self.excluded.len()
    }

    /// Running session statistics
    pub fn get_validation_stats(&self) -> &ValidationStats {
        &self.stats
    }

    /// Reset session statistics to zero
    pub fn reset_stats(&mut self) {
        self.stats = ValidationStats::default();
    }

    fn record(&mut self, report: &ValidationReport) {
        self.stats.batches_validated += 1;
        self.stats.tokens_seen += report.input_count as u64;
        self.stats.tokens_valid += report.valid_count as u64;
        self.stats.tokens_filtered += report.filtered_count as u64;
        self.stats.total_validation_time += report.elapsed;
    }
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Check whether a string is a plausible Solana mint address
///
/// Valid means: decodes as base58, 32-44 characters, and is not an
/// Ethereum-style `0x` + 40-hex address (guards against cross-chain
/// confusion when callers mix address lists).
pub fn is_valid_solana_address(address: &str) -> bool {
    if is_evm_address(address) {
        return false;
    }
    if !(32..=44).contains(&address.len()) {
        return false;
    }
    bs58::decode(address).into_vec().is_ok()
}

fn is_evm_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}
