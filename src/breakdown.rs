//! Per-transaction breakdown records and the (system, run, txn) index
//!
//! A record joins a transaction's client-side metadata with the stage
//! durations attributed from its events, then applies the residual and
//! clamping policy so that named stages never exceed the end-to-end
//! duration and `Other` is never negative.

use crate::attribution::{attribute, Stage, StageDurations, TransitionPolicy};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::events::EventRecord;
use crate::locality::{classify, LocalityClass};
use crate::transactions::TransactionRecord;
use crate::variant::SystemVariant;
use serde::Serialize;
use std::collections::BTreeMap;

/// Breakdown of one transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxnBreakdown {
    pub txn_id: u64,
    pub is_multi_partition: bool,
    pub is_multi_home: bool,
    pub class: LocalityClass,
    /// Submission timestamp (raw clock units)
    pub start_time: i64,
    /// Completion timestamp, absent for aborted attempts
    pub end_time: Option<i64>,
    /// End-to-end latency; `None` when the attempt never completed
    pub duration_ms: Option<f64>,
    #[serde(skip)]
    pub stages: StageDurations,
    pub aborted: bool,
}

impl TxnBreakdown {
    pub fn stage(&self, stage: Stage) -> f64 {
        self.stages[stage]
    }
}

/// Everything the record builder needs besides the transaction itself
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub variant: SystemVariant,
    pub policy: &'a TransitionPolicy,
    pub unit_to_ms: f64,
    pub residual_warning_ms: f64,
}

/// Build the breakdown record for one transaction
///
/// `events` is the transaction's event group in file order, or `None`
/// when no events were recorded for it.
pub fn build_record(
    ctx: &RecordContext<'_>,
    txn: &TransactionRecord,
    events: Option<&[EventRecord]>,
    diagnostics: &mut Diagnostics,
) -> TxnBreakdown {
    // same boundary as the aborted count: completion strictly after submission
    let duration_ms = txn
        .duration_ms(ctx.unit_to_ms)
        .filter(|_| txn.is_completed());

    let events = events.filter(|e| !e.is_empty());
    let mut stages = match events {
        Some(events) => {
            attribute(ctx.policy, txn.txn_id, events, ctx.unit_to_ms, diagnostics).stages
        }
        None => {
            diagnostics.warn(
                txn.txn_id,
                DiagnosticKind::MissingEvents,
                "no events recorded, duration goes to Other",
            );
            StageDurations::new()
        }
    };

    if let Some(duration) = duration_ms {
        let named = stages.named_total();
        if named > duration {
            diagnostics.warn(
                txn.txn_id,
                DiagnosticKind::OverAttributed,
                format!(
                    "named stages sum to {:.3} ms, more than the {:.3} ms duration; scaling down",
                    named, duration
                ),
            );
            stages.scale_named(if named > 0.0 { duration / named } else { 0.0 });
        }
    }

    // Designs with a full table close Other themselves; everything else
    // gets the unattributed remainder
    if events.is_none() || !ctx.variant.attributes_other() {
        let other = duration_ms.map_or(0.0, |d| d - stages.named_total());
        stages.set(Stage::Other, other);
    }

    if let Some(duration) = duration_ms {
        let residual = duration - stages.total();
        let unexplained = if ctx.variant.attributes_other() && events.is_some() {
            residual
        } else {
            stages[Stage::Other]
        };
        if unexplained > ctx.residual_warning_ms {
            diagnostics.warn(
                txn.txn_id,
                DiagnosticKind::ExcessiveResidual,
                format!(
                    "{:.3} ms of {:.3} ms not attributed to any stage",
                    unexplained, duration
                ),
            );
        }
    }

    TxnBreakdown {
        txn_id: txn.txn_id,
        is_multi_partition: txn.is_multi_partition(),
        is_multi_home: txn.is_multi_home(),
        class: classify(txn, ctx.variant),
        start_time: txn.sent_at,
        end_time: txn.received_at,
        duration_ms,
        stages,
        aborted: !txn.is_completed(),
    }
}

/// (system, run) part of the composite key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunKey {
    pub system: String,
    /// Run-parameter directory, `None` without that layout level
    pub run: Option<String>,
}

impl RunKey {
    pub fn new(system: impl Into<String>, run: Option<String>) -> Self {
        Self {
            system: system.into(),
            run,
        }
    }

    /// Run label used in reports
    pub fn run_label(&self) -> &str {
        self.run.as_deref().unwrap_or("all")
    }

    /// File-name stem for the per-transaction table
    pub fn file_stem(&self) -> String {
        match &self.run {
            Some(run) => format!("latency_breakdown_{}_{}", self.system, run),
            None => format!("latency_breakdown_{}", self.system),
        }
    }
}

/// All breakdown records of one (system, run)
#[derive(Debug, Clone)]
pub struct RunBreakdown {
    pub variant: SystemVariant,
    /// Records keyed by transaction id
    pub records: BTreeMap<u64, TxnBreakdown>,
    /// Aborted attempts seen per class, including ones excluded from `records`
    pub aborted: BTreeMap<LocalityClass, usize>,
}

impl RunBreakdown {
    pub fn new(variant: SystemVariant) -> Self {
        Self {
            variant,
            records: BTreeMap::new(),
            aborted: BTreeMap::new(),
        }
    }

    /// Insert a record; a repeated transaction id keeps the first record
    pub fn insert(&mut self, record: TxnBreakdown) -> bool {
        if self.records.contains_key(&record.txn_id) {
            tracing::warn!(txn_id = record.txn_id, "duplicate transaction id, keeping the first");
            return false;
        }
        self.records.insert(record.txn_id, record);
        true
    }

    pub fn count_aborted(&mut self, class: LocalityClass) {
        *self.aborted.entry(class).or_default() += 1;
    }

    pub fn aborted_in(&self, class: LocalityClass) -> usize {
        self.aborted.get(&class).copied().unwrap_or(0)
    }

    /// Records of one locality class, in transaction id order
    pub fn class_records(&self, class: LocalityClass) -> impl Iterator<Item = &TxnBreakdown> + '_ {
        self.records.values().filter(move |r| r.class == class)
    }
}

/// Composite (system, run, transaction id) index over immutable records
#[derive(Debug, Clone, Default)]
pub struct BreakdownIndex {
    runs: BTreeMap<RunKey, RunBreakdown>,
}

impl BreakdownIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_run(&mut self, key: RunKey, run: RunBreakdown) {
        self.runs.insert(key, run);
    }

    pub fn get(&self, system: &str, run: Option<&str>, txn_id: u64) -> Option<&TxnBreakdown> {
        let key = RunKey::new(system, run.map(str::to_string));
        self.runs.get(&key)?.records.get(&txn_id)
    }

    pub fn run(&self, key: &RunKey) -> Option<&RunBreakdown> {
        self.runs.get(key)
    }

    /// Runs in key order
    pub fn runs(&self) -> impl Iterator<Item = (&RunKey, &RunBreakdown)> + '_ {
        self.runs.iter()
    }

    pub fn len(&self) -> usize {
        self.runs.values().map(|r| r.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
