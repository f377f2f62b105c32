// Event-transition state machine
//
// Walks one transaction's time-ordered markers and charges each interval
// to a stage bucket. Anomalies go to the diagnostics sink; the walk never
// stops early.

use super::stage::{Stage, StageDurations};
use super::table::{SpanTable, TransitionPolicy, TransitionTable};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::events::{EventKind, EventRecord};

/// Stage durations attributed from one transaction's events
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attribution {
    /// Milliseconds per stage
    pub stages: StageDurations,

    /// Milliseconds between the first and last marker
    pub trace_span_ms: f64,

    /// Markers considered (duplicates included)
    pub event_count: usize,
}

/// Attribute a transaction's events under the given policy
///
/// `events` must be ordered by time, ties kept in file order. Timestamps
/// are converted with `unit_to_ms`.
pub fn attribute(
    policy: &TransitionPolicy,
    txn_id: u64,
    events: &[EventRecord],
    unit_to_ms: f64,
    diagnostics: &mut Diagnostics,
) -> Attribution {
    let stages = match policy {
        TransitionPolicy::Sequential(table) => {
            walk_sequential(table, txn_id, events, unit_to_ms, diagnostics)
        }
        TransitionPolicy::Spans(table) => walk_spans(table, txn_id, events, unit_to_ms, diagnostics),
    };

    let trace_span_ms = match (events.first(), events.last()) {
        (Some(first), Some(last)) => interval_ms(first.time, last.time, unit_to_ms).unwrap_or(0.0),
        _ => 0.0,
    };

    Attribution {
        stages,
        trace_span_ms,
        event_count: events.len(),
    }
}

/// `end - start` in milliseconds, `None` when the raw difference overflows
fn interval_ms(start: i64, end: i64, unit_to_ms: f64) -> Option<f64> {
    end.checked_sub(start).map(|d| d as f64 * unit_to_ms)
}

fn check_start(txn_id: u64, first: &EventRecord, diagnostics: &mut Diagnostics) {
    if first.kind != EventKind::START {
        diagnostics.warn(
            txn_id,
            DiagnosticKind::StrangeStart,
            format!("trace starts with {} instead of {}", first.raw, EventKind::START),
        );
    }
}

fn check_known(txn_id: u64, event: &EventRecord, diagnostics: &mut Diagnostics) -> bool {
    if event.kind == EventKind::Unknown {
        diagnostics.warn(
            txn_id,
            DiagnosticKind::UnknownMarker,
            format!("unknown marker '{}' at {}", event.raw, event.time),
        );
        return false;
    }
    true
}

fn walk_sequential(
    table: &TransitionTable,
    txn_id: u64,
    events: &[EventRecord],
    unit_to_ms: f64,
    diagnostics: &mut Diagnostics,
) -> StageDurations {
    let mut stages = StageDurations::new();
    let Some(first) = events.first() else {
        return stages;
    };
    check_start(txn_id, first, diagnostics);
    check_known(txn_id, first, diagnostics);

    let mut last_event = first.kind;
    let mut last_time = first.time;

    for event in &events[1..] {
        let known = check_known(txn_id, event, diagnostics);
        let Some(elapsed_ms) = interval_ms(last_time, event.time, unit_to_ms) else {
            diagnostics.note(
                txn_id,
                DiagnosticKind::NegativeInterval,
                format!("{} -> {} interval overflows, discarded", last_event, event.raw),
            );
            last_event = event.kind;
            last_time = event.time;
            continue;
        };

        if elapsed_ms < 0.0 && event.kind != EventKind::START {
            diagnostics.note(
                txn_id,
                DiagnosticKind::NegativeInterval,
                format!(
                    "{} -> {} goes back {:.3} ms, discarded",
                    last_event, event.raw, -elapsed_ms
                ),
            );
            last_event = event.kind;
            last_time = event.time;
            continue;
        }

        if event.kind == EventKind::START {
            if event.time > last_time {
                diagnostics.warn(
                    txn_id,
                    DiagnosticKind::StrangeRestart,
                    format!("{} again {:.3} ms after {}", event.raw, elapsed_ms, last_event),
                );
            }
            last_event = event.kind;
            last_time = event.time;
            continue;
        }

        // Repeated marker: keep measuring from the first occurrence
        if event.kind == last_event {
            continue;
        }

        // Zero-length hop: nothing to charge, but the next lookup sees this marker
        if event.time == last_time {
            last_event = event.kind;
            continue;
        }

        if known {
            match table.lookup(last_event, event.kind) {
                Some(lookup) => {
                    if !lookup.expected {
                        diagnostics.warn(
                            txn_id,
                            DiagnosticKind::UnexpectedPredecessor,
                            format!(
                                "{} follows {}, charging {:.3} ms to {}",
                                event.kind, last_event, elapsed_ms, lookup.stage
                            ),
                        );
                    }
                    stages.add(lookup.stage, elapsed_ms);
                }
                None => diagnostics.warn(
                    txn_id,
                    DiagnosticKind::UncoveredTransition,
                    format!("no rule for {} after {}", event.kind, last_event),
                ),
            }
        }

        last_event = event.kind;
        last_time = event.time;
    }

    stages
}

fn walk_spans(
    table: &SpanTable,
    txn_id: u64,
    events: &[EventRecord],
    unit_to_ms: f64,
    diagnostics: &mut Diagnostics,
) -> StageDurations {
    let mut stages = StageDurations::new();
    let Some(first) = events.first() else {
        return stages;
    };
    check_start(txn_id, first, diagnostics);

    let mut open: Option<(Stage, i64)> = None;
    let mut last_event: Option<EventKind> = None;

    let mut close = |stage: Stage, start: i64, end: i64, diagnostics: &mut Diagnostics| {
        match interval_ms(start, end, unit_to_ms) {
            Some(elapsed_ms) if elapsed_ms >= 0.0 => stages.add(stage, elapsed_ms),
            Some(elapsed_ms) => diagnostics.note(
                txn_id,
                DiagnosticKind::NegativeInterval,
                format!("{} span goes back {:.3} ms, discarded", stage, -elapsed_ms),
            ),
            None => diagnostics.note(
                txn_id,
                DiagnosticKind::NegativeInterval,
                format!("{} span overflows, discarded", stage),
            ),
        }
    };

    for event in events {
        if !check_known(txn_id, event, diagnostics) {
            continue;
        }
        if last_event == Some(event.kind) {
            continue;
        }
        last_event = Some(event.kind);

        if let Some((stage, start)) = open {
            if table.is_self_closing(stage) {
                close(stage, start, event.time, diagnostics);
                open = None;
            }
        }

        if let Some((stage, start)) = open {
            if table.exits(event.kind) == Some(stage) {
                close(stage, start, event.time, diagnostics);
                open = None;
            }
        }

        if open.is_none() {
            if let Some(stage) = table.enters(event.kind) {
                open = Some((stage, event.time));
            }
        }
    }

    stages
}
