//! Structured data-quality diagnostics
//!
//! Anomalies never abort a run. Each one is logged through `tracing` and
//! also kept as a `Diagnostic` so callers can count and filter them.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Trace does not open with the start marker
    StrangeStart,
    /// Marker follows a predecessor the transition table does not expect
    UnexpectedPredecessor,
    /// Start marker seen again after time moved forward
    StrangeRestart,
    /// Marker has no entry in the active transition table
    UncoveredTransition,
    /// Marker outside the known vocabulary
    UnknownMarker,
    /// Interval with negative elapsed time, discarded
    NegativeInterval,
    /// Unattributed remainder above the sanity threshold
    ExcessiveResidual,
    /// Named stages add up to more than the end-to-end duration
    OverAttributed,
    /// Transaction has no recorded events
    MissingEvents,
}

impl DiagnosticKind {
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::StrangeStart => "strange_start",
            DiagnosticKind::UnexpectedPredecessor => "unexpected_predecessor",
            DiagnosticKind::StrangeRestart => "strange_restart",
            DiagnosticKind::UncoveredTransition => "uncovered_transition",
            DiagnosticKind::UnknownMarker => "unknown_marker",
            DiagnosticKind::NegativeInterval => "negative_interval",
            DiagnosticKind::ExcessiveResidual => "excessive_residual",
            DiagnosticKind::OverAttributed => "over_attributed",
            DiagnosticKind::MissingEvents => "missing_events",
        }
    }

    /// Kinds that count as anomalous transitions
    pub fn is_anomaly(self) -> bool {
        matches!(
            self,
            DiagnosticKind::StrangeStart
                | DiagnosticKind::UnexpectedPredecessor
                | DiagnosticKind::StrangeRestart
                | DiagnosticKind::UncoveredTransition
                | DiagnosticKind::UnknownMarker
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One diagnostic about one transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// System directory the transaction belongs to, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub txn_id: u64,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(txn_id: u64, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            system: None,
            txn_id,
            kind,
            message: message.into(),
        }
    }

    pub fn info(txn_id: u64, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            system: None,
            txn_id,
            kind,
            message: message.into(),
        }
    }

    /// Forward to the log at a level matching the severity
    fn log(&self) {
        let system = self.system.as_deref().unwrap_or("-");
        match self.severity {
            Severity::Warning => tracing::warn!(
                system,
                txn_id = self.txn_id,
                kind = self.kind.name(),
                "{}",
                self.message
            ),
            Severity::Info => tracing::debug!(
                system,
                txn_id = self.txn_id,
                kind = self.kind.name(),
                "{}",
                self.message
            ),
        }
    }
}

/// Per-transaction diagnostic collector
///
/// Each attribution task owns one; results are merged after the pass.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    system: Option<String>,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector that tags every diagnostic with a system name
    pub fn for_system(system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            entries: Vec::new(),
        }
    }

    /// Record and log a diagnostic
    pub fn push(&mut self, mut diagnostic: Diagnostic) {
        if diagnostic.system.is_none() {
            diagnostic.system = self.system.clone();
        }
        diagnostic.log();
        self.entries.push(diagnostic);
    }

    pub fn warn(&mut self, txn_id: u64, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Diagnostic::warning(txn_id, kind, message));
    }

    pub fn note(&mut self, txn_id: u64, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Diagnostic::info(txn_id, kind, message));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of anomalous-transition diagnostics
    pub fn anomaly_count(&self) -> usize {
        self.entries.iter().filter(|d| d.kind.is_anomaly()).count()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Counts per kind, in a stable order
    pub fn counts_by_kind(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.entries {
            *counts.entry(d.kind).or_default() += 1;
        }
        counts
    }

    /// Render as JSON lines
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for d in &self.entries {
            out.push_str(&serde_json::to_string(d)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut diags = Diagnostics::new();
        diags.warn(1, DiagnosticKind::UnexpectedPredecessor, "x");
        diags.warn(1, DiagnosticKind::UnexpectedPredecessor, "y");
        diags.warn(2, DiagnosticKind::ExcessiveResidual, "z");
        diags.note(3, DiagnosticKind::NegativeInterval, "n");

        assert_eq!(diags.len(), 4);
        assert_eq!(diags.anomaly_count(), 2);
        assert_eq!(diags.count_of(DiagnosticKind::ExcessiveResidual), 1);
        let counts = diags.counts_by_kind();
        assert_eq!(counts[&DiagnosticKind::UnexpectedPredecessor], 2);
        assert_eq!(counts[&DiagnosticKind::NegativeInterval], 1);
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut a = Diagnostics::new();
        a.warn(1, DiagnosticKind::StrangeStart, "a");
        let mut b = Diagnostics::new();
        b.warn(2, DiagnosticKind::MissingEvents, "b");
        a.extend(b);
        let ids: Vec<_> = a.entries().iter().map(|d| d.txn_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_json_lines() {
        let mut diags = Diagnostics::new();
        diags.warn(42, DiagnosticKind::ExcessiveResidual, "lots of residual");
        let json = diags.to_json_lines().unwrap();
        assert!(json.contains("\"txn_id\":42"));
        assert!(json.contains("\"kind\":\"excessive_residual\""));
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.ends_with('\n'));
        assert!(!json.contains("\"system\""));
    }

    #[test]
    fn test_system_tag() {
        let mut diags = Diagnostics::for_system("slog");
        diags.warn(7, DiagnosticKind::StrangeRestart, "again");
        assert_eq!(diags.entries()[0].system.as_deref(), Some("slog"));

        let mut merged = Diagnostics::new();
        merged.extend(diags);
        assert_eq!(merged.entries()[0].system.as_deref(), Some("slog"));
        let json = merged.to_json_lines().unwrap();
        assert!(json.contains("\"system\":\"slog\""));
    }
}
