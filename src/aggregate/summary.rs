// Per (system, run, locality class) summary rows

use super::merge::MergedShares;
use super::statistics::{moments, percentile, Moments};
use crate::attribution::Stage;
use crate::breakdown::{BreakdownIndex, RunBreakdown, RunKey, TxnBreakdown};
use crate::locality::LocalityClass;
use crate::variant::{report_order, SystemVariant};
use serde::Serialize;
use std::fmt;

/// Whether a summary row carries numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowStatus {
    #[serde(rename = "ok")]
    Ok,
    /// No completed transactions in the class
    #[serde(rename = "empty")]
    Empty,
    /// The class does not exist for this design
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl RowStatus {
    pub fn label(self) -> &'static str {
        match self {
            RowStatus::Ok => "ok",
            RowStatus::Empty => "empty",
            RowStatus::NotApplicable => "n/a",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Statistics of one stage column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub mean_ms: Option<f64>,
    pub std_ms: Option<f64>,
    /// `mean(stage) / mean(duration)`, in percent
    pub share: Option<f64>,
}

/// One duration percentile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileValue {
    pub p: f64,
    pub ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Report name (SLOG, Detock, or the directory name for generic systems)
    pub system: String,
    pub variant: SystemVariant,
    pub run: String,
    pub class: LocalityClass,
    pub status: RowStatus,
    /// Completed transactions included in the statistics
    pub txns: usize,
    /// Aborted attempts seen in the class
    pub aborted: usize,
    pub duration_mean_ms: Option<f64>,
    pub duration_std_ms: Option<f64>,
    pub stages: Vec<StageSummary>,
    pub percentiles: Vec<PercentileValue>,
    pub merged: Option<MergedShares>,
}

impl SummaryRow {
    fn undefined(
        key: &RunKey,
        run: &RunBreakdown,
        class: LocalityClass,
        status: RowStatus,
        percentiles: &[f64],
    ) -> Self {
        Self {
            system: run.variant.display_name(&key.system),
            variant: run.variant,
            run: key.run_label().to_string(),
            class,
            status,
            txns: 0,
            aborted: run.aborted_in(class),
            duration_mean_ms: None,
            duration_std_ms: None,
            stages: Stage::ALL
                .iter()
                .map(|s| StageSummary {
                    stage: *s,
                    mean_ms: None,
                    std_ms: None,
                    share: None,
                })
                .collect(),
            percentiles: percentiles
                .iter()
                .map(|p| PercentileValue { p: *p, ms: None })
                .collect(),
            merged: None,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageSummary> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Sum of the fine-grained shares (100 when every ms is attributed)
    pub fn share_total(&self) -> Option<f64> {
        self.stages.iter().map(|s| s.share).sum()
    }
}

/// Summarise one locality class of one (system, run)
pub fn summarize_class(
    key: &RunKey,
    run: &RunBreakdown,
    class: LocalityClass,
    percentiles: &[f64],
) -> SummaryRow {
    if class == LocalityClass::MultiHome && !run.variant.has_home() {
        return SummaryRow::undefined(key, run, class, RowStatus::NotApplicable, percentiles);
    }

    let completed: Vec<&TxnBreakdown> = run
        .class_records(class)
        .filter(|r| r.duration_ms.is_some())
        .collect();
    let durations: Vec<f64> = completed.iter().filter_map(|r| r.duration_ms).collect();

    let Some(duration) = moments(&durations) else {
        return SummaryRow::undefined(key, run, class, RowStatus::Empty, percentiles);
    };

    let stages: Vec<StageSummary> = Stage::ALL
        .iter()
        .map(|stage| {
            let column: Vec<f64> = completed.iter().map(|r| r.stage(*stage)).collect();
            let m: Option<Moments> = moments(&column);
            let mean_ms = m.map(|m| m.mean);
            let share = match mean_ms {
                Some(mean) if duration.mean > 0.0 => Some(mean / duration.mean * 100.0),
                _ => None,
            };
            StageSummary {
                stage: *stage,
                mean_ms,
                std_ms: m.and_then(|m| m.std),
                share,
            }
        })
        .collect();

    let merged = MergedShares::from_fine(
        stages
            .iter()
            .filter_map(|s| s.share.map(|share| (s.stage, share))),
    );

    SummaryRow {
        system: run.variant.display_name(&key.system),
        variant: run.variant,
        run: key.run_label().to_string(),
        class,
        status: RowStatus::Ok,
        txns: durations.len(),
        aborted: run.aborted_in(class),
        duration_mean_ms: Some(duration.mean),
        duration_std_ms: duration.std,
        stages,
        percentiles: percentiles
            .iter()
            .map(|p| PercentileValue {
                p: *p,
                ms: percentile(&durations, *p),
            })
            .collect(),
        merged,
    }
}

/// Summarise every (system, run, class)
///
/// Rows come out in report order: systems by [`report_order`], then run,
/// then locality class.
pub fn summarize(index: &BreakdownIndex, percentiles: &[f64]) -> Vec<SummaryRow> {
    let mut runs: Vec<(&RunKey, &RunBreakdown)> = index.runs().collect();
    runs.sort_by(|a, b| {
        report_order((a.1.variant, &a.0.system), (b.1.variant, &b.0.system))
            .then_with(|| a.0.run.cmp(&b.0.run))
    });

    runs.into_iter()
        .flat_map(|(key, run)| {
            LocalityClass::ALL
                .iter()
                .map(move |class| summarize_class(key, run, *class, percentiles))
        })
        .collect()
}
