//! JSON output for the summary table
//!
//! Undefined statistics serialise as `null`.

use crate::aggregate::SummaryRow;
use crate::diagnostics::DiagnosticKind;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SUMMARY_FILE: &str = "latency_summary.json";

/// Root JSON document
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Format version
    pub version: String,
    /// Tool that produced the summary
    pub generator: String,
    /// Workload tag, when given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload: Option<String>,
    /// Whether aborted attempts were dropped before aggregation
    pub exclude_aborted: bool,
    /// Diagnostic counts by kind
    pub diagnostics: BTreeMap<DiagnosticKind, usize>,
    pub rows: Vec<SummaryRow>,
}

impl JsonSummary {
    pub fn new(rows: Vec<SummaryRow>, exclude_aborted: bool) -> Self {
        Self {
            version: "1.0".to_string(),
            generator: format!("desglose {}", env!("CARGO_PKG_VERSION")),
            workload: None,
            exclude_aborted,
            diagnostics: BTreeMap::new(),
            rows,
        }
    }

    pub fn with_workload(mut self, workload: impl Into<String>) -> Self {
        self.workload = Some(workload.into());
        self
    }

    pub fn with_diagnostics(mut self, counts: BTreeMap<DiagnosticKind, usize>) -> Self {
        self.diagnostics = counts;
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
