// Configuration for latency breakdown runs
//
// Defaults reproduce the experiment tooling: nanosecond clocks, a 100 ms
// residual sanity threshold and p50/p90/p95/p99 latency percentiles.

use crate::error::{DesgloseError, Result};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Benchmark workload that produced the traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    Ycsb,
    Tpcc,
    Movr,
    Movie,
    Pps,
    Dsh,
    Smallbank,
}

impl Workload {
    /// Whether aborted attempts are dropped before aggregation by default
    ///
    /// Only `pps` retries heavily enough for aborts to skew the breakdown.
    pub fn excludes_aborted(self) -> bool {
        matches!(self, Workload::Pps)
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Workload::Ycsb => "ycsb",
            Workload::Tpcc => "tpcc",
            Workload::Movr => "movr",
            Workload::Movie => "movie",
            Workload::Pps => "pps",
            Workload::Dsh => "dsh",
            Workload::Smallbank => "smallbank",
        };
        f.write_str(name)
    }
}

/// Configuration for a breakdown run
///
/// # Example
/// ```
/// use desglose::config::BreakdownConfig;
///
/// let config = BreakdownConfig::default();
/// assert_eq!(config.residual_warning_ms, 100.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownConfig {
    /// Unattributed remainder (ms) above which a transaction is reported
    ///
    /// Default: 100 ms
    pub residual_warning_ms: f64,

    /// Multiplier converting trace clock units to milliseconds
    ///
    /// Default: 1e-6 (nanosecond clocks)
    pub time_unit_to_ms: f64,

    /// Drop aborted attempts before aggregation
    ///
    /// `None` lets the workload decide (see [`Workload::excludes_aborted`]).
    pub exclude_aborted: Option<bool>,

    /// Duration percentiles reported per locality class, in [0, 100]
    pub percentiles: Vec<f64>,

    /// Regular expression; matching system directories are skipped
    pub exclude_pattern: String,

    /// Decimal places for emitted millisecond values
    pub decimals: usize,

    /// Worker threads for attribution (`None` = one per core)
    pub threads: Option<usize>,
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            residual_warning_ms: 100.0,
            time_unit_to_ms: 1e-6,
            exclude_aborted: None,
            percentiles: vec![50.0, 90.0, 95.0, 99.0],
            exclude_pattern: r"\.|ddr_only".to_string(),
            decimals: 5,
            threads: None,
        }
    }
}

impl BreakdownConfig {
    /// Tight residual threshold, for hunting uncovered transitions
    pub fn strict() -> Self {
        Self {
            residual_warning_ms: 10.0,
            ..Self::default()
        }
    }

    /// Loose residual threshold, for noisy wide-area deployments
    pub fn permissive() -> Self {
        Self {
            residual_warning_ms: 1000.0,
            ..Self::default()
        }
    }

    /// Load from a TOML file; missing keys keep their defaults
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| DesgloseError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| DesgloseError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve whether aborted attempts are dropped for a workload
    pub fn excludes_aborted(&self, workload: Option<Workload>) -> bool {
        self.exclude_aborted
            .unwrap_or_else(|| workload.map(Workload::excludes_aborted).unwrap_or(false))
    }

    /// Compiled directory exclusion pattern (empty pattern excludes nothing)
    pub fn exclude_regex(&self) -> Result<Option<Regex>> {
        if self.exclude_pattern.is_empty() {
            return Ok(None);
        }
        Regex::new(&self.exclude_pattern).map(Some).map_err(|e| {
            DesgloseError::InvalidConfig(format!(
                "exclude_pattern '{}' is not a valid regex: {}",
                self.exclude_pattern, e
            ))
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.residual_warning_ms > 0.0) {
            return Err(DesgloseError::InvalidConfig(format!(
                "residual_warning_ms must be positive, got {}",
                self.residual_warning_ms
            )));
        }

        if !(self.time_unit_to_ms > 0.0) {
            return Err(DesgloseError::InvalidConfig(format!(
                "time_unit_to_ms must be positive, got {}",
                self.time_unit_to_ms
            )));
        }

        if let Some(p) = self
            .percentiles
            .iter()
            .find(|p| !(0.0..=100.0).contains(*p))
        {
            return Err(DesgloseError::InvalidConfig(format!(
                "percentiles must be in [0, 100], got {}",
                p
            )));
        }

        if self.threads == Some(0) {
            return Err(DesgloseError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }

        self.exclude_regex()?;
        Ok(())
    }
}
