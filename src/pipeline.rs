//! End-to-end breakdown pipeline
//!
//! discover → load (per system/run) → attribute + build records in
//! parallel → index → summarise → write. Inputs are fully loaded before
//! attribution starts; each transaction is attributed independently.

use crate::aggregate::{summarize, SummaryRow};
use crate::attribution::TransitionPolicy;
use crate::breakdown::{build_record, BreakdownIndex, RecordContext, RunBreakdown, RunKey};
use crate::config::{BreakdownConfig, Workload};
use crate::csv_input::{discover, ExperimentRun};
use crate::csv_output::{self, CsvBreakdownOutput, CsvSummaryOutput};
use crate::diagnostics::Diagnostics;
use crate::error::{DesgloseError, Result};
use crate::json_output::{self, JsonSummary};
use crate::locality::classify;
use crate::variant::SystemVariant;
use clap::ValueEnum;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Summary table format(s) to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SummaryFormat {
    #[default]
    Csv,
    Json,
    Both,
}

impl SummaryFormat {
    fn csv(self) -> bool {
        matches!(self, SummaryFormat::Csv | SummaryFormat::Both)
    }

    fn json(self) -> bool {
        matches!(self, SummaryFormat::Json | SummaryFormat::Both)
    }
}

/// Options for one pipeline invocation
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub config: BreakdownConfig,
    pub workload: Option<Workload>,
    /// Restrict to these system directories (empty = all)
    pub systems: Vec<String>,
    /// Per-directory variant overrides
    pub variants: BTreeMap<String, SystemVariant>,
}

impl PipelineOptions {
    pub fn new(config: BreakdownConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Variant for a system directory, honouring overrides
    pub fn variant_for(&self, system: &str) -> SystemVariant {
        self.variants
            .get(system)
            .copied()
            .unwrap_or_else(|| SystemVariant::from_dir_name(system))
    }

    pub fn exclude_aborted(&self) -> bool {
        self.config.excludes_aborted(self.workload)
    }
}

/// Everything a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub index: BreakdownIndex,
    pub summary: Vec<SummaryRow>,
    pub diagnostics: Diagnostics,
}

/// Attribute every transaction of one (system, run)
pub fn process_run(
    run: &ExperimentRun,
    variant: SystemVariant,
    config: &BreakdownConfig,
    exclude_aborted: bool,
) -> Result<(RunBreakdown, Diagnostics)> {
    let data = run.load()?;
    let policy = TransitionPolicy::for_variant(variant);
    let ctx = RecordContext {
        variant,
        policy: &policy,
        unit_to_ms: config.time_unit_to_ms,
        residual_warning_ms: config.residual_warning_ms,
    };

    let mut breakdown = RunBreakdown::new(variant);
    for txn in data.transactions.iter().filter(|t| !t.is_completed()) {
        breakdown.count_aborted(classify(txn, variant));
    }

    let results: Vec<_> = data
        .transactions
        .par_iter()
        .filter(|txn| !exclude_aborted || txn.is_completed())
        .map(|txn| {
            let mut diagnostics = Diagnostics::for_system(&run.system);
            let events = data.events.get(&txn.txn_id).map(Vec::as_slice);
            let record = build_record(&ctx, txn, events, &mut diagnostics);
            (record, diagnostics)
        })
        .collect();

    let mut diagnostics = Diagnostics::new();
    for (record, record_diagnostics) in results {
        breakdown.insert(record);
        diagnostics.extend(record_diagnostics);
    }

    tracing::info!(
        system = %run.system,
        run = run.run.as_deref().unwrap_or("all"),
        variant = %variant,
        txns = breakdown.records.len(),
        anomalies = diagnostics.anomaly_count(),
        "attributed"
    );
    Ok((breakdown, diagnostics))
}

/// Run discovery, attribution and aggregation over an experiment directory
pub fn run_pipeline(input: &Path, options: &PipelineOptions) -> Result<PipelineOutput> {
    options.config.validate()?;
    let exclude = options.config.exclude_regex()?;
    let runs = discover(input, exclude.as_ref(), &options.systems)?;
    let exclude_aborted = options.exclude_aborted();

    let process = || -> Result<(BreakdownIndex, Diagnostics)> {
        let mut index = BreakdownIndex::new();
        let mut diagnostics = Diagnostics::new();
        for run in &runs {
            let variant = options.variant_for(&run.system);
            let (breakdown, run_diagnostics) =
                process_run(run, variant, &options.config, exclude_aborted)?;
            index.insert_run(RunKey::new(&run.system, run.run.clone()), breakdown);
            diagnostics.extend(run_diagnostics);
        }
        Ok((index, diagnostics))
    };

    let (index, diagnostics) = match options.config.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| DesgloseError::InvalidConfig(format!("thread pool: {}", e)))?
            .install(process)?,
        None => process()?,
    };

    let summary = summarize(&index, &options.config.percentiles);
    Ok(PipelineOutput {
        index,
        summary,
        diagnostics,
    })
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| DesgloseError::io(path, e))
}

/// Write per-transaction tables and the summary; returns the written paths
pub fn write_outputs(
    output_dir: &Path,
    output: &PipelineOutput,
    options: &PipelineOptions,
    format: SummaryFormat,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).map_err(|e| DesgloseError::io(output_dir, e))?;
    let decimals = options.config.decimals;
    let mut written = Vec::new();

    let breakdown_csv = CsvBreakdownOutput::new(decimals);
    for (key, run) in output.index.runs() {
        let path = output_dir.join(format!("{}.csv", key.file_stem()));
        write_file(&path, &breakdown_csv.to_csv(run.records.values()))?;
        written.push(path);
    }

    if format.csv() {
        let path = output_dir.join(csv_output::SUMMARY_FILE);
        let csv = CsvSummaryOutput::new(decimals, &options.config.percentiles);
        write_file(&path, &csv.to_csv(&output.summary))?;
        written.push(path);
    }

    if format.json() {
        let path = output_dir.join(json_output::SUMMARY_FILE);
        let mut summary = JsonSummary::new(output.summary.clone(), options.exclude_aborted())
            .with_diagnostics(output.diagnostics.counts_by_kind());
        if let Some(workload) = options.workload {
            summary = summary.with_workload(workload.to_string());
        }
        write_file(&path, &summary.to_json()?)?;
        written.push(path);
    }

    for path in &written {
        tracing::debug!(path = %path.display(), "wrote");
    }
    Ok(written)
}
