//! CLI argument parsing for desglose

use crate::config::Workload;
use crate::pipeline::SummaryFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "desglose")]
#[command(version)]
#[command(
    about = "Decompose distributed transaction latency into pipeline stages",
    long_about = None
)]
pub struct Cli {
    /// Experiment directory (<system>/[<run>/]client/<client>/...)
    #[arg(short, long, value_name = "DIR")]
    pub input: PathBuf,

    /// Directory for breakdown and summary tables (default: the input directory)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Workload that produced the traces (pps drops aborted attempts)
    #[arg(short, long, value_enum)]
    pub workload: Option<Workload>,

    /// Drop aborted attempts regardless of workload
    #[arg(long = "exclude-aborted", conflicts_with = "include_aborted")]
    pub exclude_aborted: bool,

    /// Keep aborted attempts regardless of workload
    #[arg(long = "include-aborted")]
    pub include_aborted: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Summary format
    #[arg(long = "format", value_enum, default_value = "csv")]
    pub format: SummaryFormat,

    /// Only process these system directories (comma-separated)
    #[arg(long = "systems", value_name = "NAMES", value_delimiter = ',')]
    pub systems: Vec<String>,

    /// Override the variant of a system directory (e.g. --variant ddr_ts=detock)
    #[arg(long = "variant", value_name = "DIR=VARIANT")]
    pub variants: Vec<String>,

    /// Write every diagnostic as JSON lines to this file
    #[arg(long = "diagnostics", value_name = "FILE")]
    pub diagnostics: Option<PathBuf>,

    /// Residual (ms) above which a transaction is reported
    #[arg(long = "residual-threshold", value_name = "MS")]
    pub residual_threshold: Option<f64>,

    /// Multiplier from trace time units to milliseconds (default: 1e-6, ns)
    #[arg(long = "time-unit-to-ms", value_name = "SCALE")]
    pub time_unit_to_ms: Option<f64>,

    /// Duration percentiles to report (comma-separated, e.g. 50,99)
    #[arg(long = "percentiles", value_name = "LIST", value_delimiter = ',')]
    pub percentiles: Vec<f64>,

    /// Regex of system directories to skip
    #[arg(long = "exclude-pattern", value_name = "REGEX")]
    pub exclude_pattern: Option<String>,

    /// Decimal places for emitted millisecond values
    #[arg(long = "decimals", value_name = "N")]
    pub decimals: Option<usize>,

    /// Worker threads for attribution (default: one per core)
    #[arg(short = 'j', long = "threads", value_name = "N")]
    pub threads: Option<usize>,

    /// Do not print the console report
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Abort-exclusion flag given on the command line, if any
    pub fn exclude_aborted_flag(&self) -> Option<bool> {
        if self.exclude_aborted {
            Some(true)
        } else if self.include_aborted {
            Some(false)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_minimal() {
        let cli = Cli::parse_from(["desglose", "--input", "runs"]);
        assert_eq!(cli.input, PathBuf::from("runs"));
        assert!(cli.output.is_none());
        assert_eq!(cli.format, SummaryFormat::Csv);
        assert_eq!(cli.exclude_aborted_flag(), None);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_requires_input() {
        assert!(Cli::try_parse_from(["desglose"]).is_err());
    }

    #[test]
    fn test_cli_workload() {
        let cli = Cli::parse_from(["desglose", "-i", "runs", "--workload", "pps"]);
        assert_eq!(cli.workload, Some(Workload::Pps));
        assert!(Cli::try_parse_from(["desglose", "-i", "runs", "-w", "bogus"]).is_err());
    }

    #[test]
    fn test_cli_systems_list() {
        let cli = Cli::parse_from(["desglose", "-i", "runs", "--systems", "slog,calvin"]);
        assert_eq!(cli.systems, vec!["slog", "calvin"]);
    }

    #[test]
    fn test_cli_variant_overrides_repeat() {
        let cli = Cli::parse_from([
            "desglose",
            "-i",
            "runs",
            "--variant",
            "ddr_ts=detock",
            "--variant",
            "x=generic",
        ]);
        assert_eq!(cli.variants.len(), 2);
    }

    #[test]
    fn test_cli_abort_flags_conflict() {
        assert!(Cli::try_parse_from([
            "desglose",
            "-i",
            "runs",
            "--exclude-aborted",
            "--include-aborted"
        ])
        .is_err());
        let cli = Cli::parse_from(["desglose", "-i", "runs", "--include-aborted"]);
        assert_eq!(cli.exclude_aborted_flag(), Some(false));
    }

    #[test]
    fn test_cli_format_and_threads() {
        let cli = Cli::parse_from(["desglose", "-i", "runs", "--format", "both", "-j", "4"]);
        assert_eq!(cli.format, SummaryFormat::Both);
        assert_eq!(cli.threads, Some(4));
    }

    #[test]
    fn test_cli_config_overrides() {
        let cli = Cli::parse_from([
            "desglose",
            "-i",
            "runs",
            "--percentiles",
            "50,99.9",
            "--decimals",
            "3",
            "--exclude-pattern",
            "^tmp",
            "--residual-threshold",
            "10",
        ]);
        assert_eq!(cli.percentiles, vec![50.0, 99.9]);
        assert_eq!(cli.decimals, Some(3));
        assert_eq!(cli.exclude_pattern.as_deref(), Some("^tmp"));
        assert_eq!(cli.residual_threshold, Some(10.0));
        assert!(cli.time_unit_to_ms.is_none());
    }
}
