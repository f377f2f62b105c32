use anyhow::{Context, Result};
use clap::Parser;
use desglose::cli::Cli;
use desglose::config::BreakdownConfig;
use desglose::pipeline::{run_pipeline, write_outputs, PipelineOptions};
use desglose::report;
use desglose::variant::SystemVariant;
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; warnings by default, everything with --debug
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse `DIR=VARIANT` overrides
fn parse_variant_overrides(specs: &[String]) -> Result<BTreeMap<String, SystemVariant>> {
    let mut overrides = BTreeMap::new();
    for spec in specs {
        let Some((dir, variant)) = spec.split_once('=') else {
            anyhow::bail!("Invalid --variant '{}': expected DIR=VARIANT", spec);
        };
        if dir.is_empty() {
            anyhow::bail!("Invalid --variant '{}': empty directory name", spec);
        }
        let variant: SystemVariant = variant
            .parse()
            .with_context(|| format!("Invalid --variant '{}'", spec))?;
        overrides.insert(dir.to_string(), variant);
    }
    Ok(overrides)
}

/// Build the configuration: file (or defaults), then command-line overrides
fn load_config(args: &Cli) -> Result<BreakdownConfig> {
    let mut config = match &args.config {
        Some(path) => BreakdownConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BreakdownConfig::default(),
    };

    if let Some(threshold) = args.residual_threshold {
        config.residual_warning_ms = threshold;
    }
    if let Some(exclude) = args.exclude_aborted_flag() {
        config.exclude_aborted = Some(exclude);
    }
    if let Some(scale) = args.time_unit_to_ms {
        config.time_unit_to_ms = scale;
    }
    if !args.percentiles.is_empty() {
        config.percentiles = args.percentiles.clone();
    }
    if let Some(pattern) = &args.exclude_pattern {
        config.exclude_pattern = pattern.clone();
    }
    if let Some(decimals) = args.decimals {
        config.decimals = decimals;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let mut options = PipelineOptions::new(load_config(&args)?);
    options.workload = args.workload;
    options.systems = args.systems.clone();
    options.variants = parse_variant_overrides(&args.variants)?;

    let output = run_pipeline(&args.input, &options)
        .with_context(|| format!("Failed to process {}", args.input.display()))?;

    let output_dir = args.output.clone().unwrap_or_else(|| args.input.clone());
    let written = write_outputs(&output_dir, &output, &options, args.format)
        .with_context(|| format!("Failed to write outputs to {}", output_dir.display()))?;

    if let Some(path) = &args.diagnostics {
        let lines = output.diagnostics.to_json_lines()?;
        std::fs::write(path, lines)
            .with_context(|| format!("Failed to write diagnostics to {}", path.display()))?;
    }

    tracing::info!(
        transactions = output.index.len(),
        files = written.len(),
        diagnostics = %report::render_diagnostic_counts(&output.diagnostics),
        "done"
    );

    if !args.quiet {
        report::print_summary(&output.summary);
    }

    Ok(())
}
