// Scenario tests for the attribution state machine
//
// Timestamps are in nanoseconds and converted at 1e-6 ms per unit, so
// `ms(10)` below is ten milliseconds.

use super::*;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::events::{EventKind, EventRecord};
use crate::variant::SystemVariant;

const NS_TO_MS: f64 = 1e-6;

fn ms(v: i64) -> i64 {
    v * 1_000_000
}

fn trace(steps: &[(EventKind, i64)]) -> Vec<EventRecord> {
    steps
        .iter()
        .map(|(kind, t)| EventRecord::new(7, *kind, ms(*t)))
        .collect()
}

fn run(variant: SystemVariant, events: &[EventRecord]) -> (Attribution, Diagnostics) {
    let policy = TransitionPolicy::for_variant(variant);
    let mut diags = Diagnostics::new();
    let attribution = attribute(&policy, 7, events, NS_TO_MS, &mut diags);
    (attribution, diags)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Generic trace: server 10ms, zero-length forwarder hop, worker 15ms
#[test]
fn test_generic_server_forwarder_worker() {
    use EventKind as E;
    let events = trace(&[
        (E::EnterServer, 0),
        (E::ExitServerToForwarder, 10),
        (E::EnterWorker, 10),
        (E::ExitWorker, 25),
    ]);
    let (a, diags) = run(SystemVariant::Generic, &events);

    assert!(approx(a.stages[Stage::Server], 10.0));
    assert!(approx(a.stages[Stage::Forwarder], 0.0));
    assert!(approx(a.stages[Stage::Worker], 15.0));
    assert!(approx(a.stages[Stage::Idle], 0.0));
    assert!(approx(a.trace_span_ms, 25.0));
    assert_eq!(diags.anomaly_count(), 0);
}

/// Same trace under Janus: the same-timestamp hop charges nothing
#[test]
fn test_janus_same_timestamp_hop_is_skipped() {
    use EventKind as E;
    let events = trace(&[
        (E::EnterServer, 0),
        (E::ExitServerToForwarder, 10),
        (E::EnterWorker, 10),
        (E::ExitWorker, 25),
    ]);
    let (a, diags) = run(SystemVariant::Janus, &events);

    assert!(approx(a.stages[Stage::Server], 25.0));
    assert!(approx(a.stages[Stage::Idle], 0.0));
    assert_eq!(diags.anomaly_count(), 0);
}

#[test]
fn test_janus_full_trace_has_no_anomalies() {
    use EventKind as E;
    let events = trace(&[
        (E::EnterServer, 0),
        (E::ExitServerToForwarder, 2),
        (E::EnterWorker, 5),
        (E::GotRemoteReads, 9),
        (E::ExitWorker, 12),
        (E::ReturnToServer, 13),
        (E::ExitServerToClient, 14),
    ]);
    let (a, diags) = run(SystemVariant::Janus, &events);

    assert!(diags.is_empty());
    assert!(approx(a.stages[Stage::Server], 2.0 + 3.0 + 1.0));
    assert!(approx(a.stages[Stage::Idle], 3.0 + 4.0));
    assert!(approx(a.stages[Stage::Other], 1.0));
    assert!(approx(a.stages.total(), 14.0));
}

#[test]
fn test_calvin_full_trace_accounts_for_every_interval() {
    use EventKind as E;
    let steps = [
        E::EnterServer,
        E::ExitServerToForwarder,
        E::EnterForwarder,
        E::ExitForwarderToSequencer,
        E::EnterSequencer,
        E::EnterLocalBatch,
        E::ExitSequencerInBatch,
        E::EnterLogManagerInBatch,
        E::EnterLogManagerOrder,
        E::ExitLogManager,
        E::EnterScheduler,
        E::EnterLockManager,
        E::DispatchedFast,
        E::EnterWorker,
        E::ExitWorker,
        E::ReturnToServer,
        E::ExitServerToClient,
    ];
    let timed: Vec<_> = steps
        .iter()
        .enumerate()
        .map(|(i, k)| (*k, i as i64))
        .collect();
    let (a, diags) = run(SystemVariant::Calvin, &trace(&timed));

    assert_eq!(diags.anomaly_count(), 0);
    assert!(approx(a.stages.total(), (steps.len() - 1) as f64));
    assert!(approx(a.stages[Stage::Sequencer], 2.0));
    assert!(approx(a.stages[Stage::Scheduler], 1.0));
    assert!(approx(a.stages[Stage::Server], 4.0));
}

#[test]
fn test_slog_multi_home_path() {
    use EventKind as E;
    let events = trace(&[
        (E::EnterServer, 0),
        (E::ExitServerToForwarder, 1),
        (E::EnterForwarder, 2),
        (E::ExitForwarderToMultiHomeOrderer, 3),
        (E::EnterMultiHomeOrderer, 4),
        (E::EnterMultiHomeOrdererInBatch, 6),
        (E::EnterLogManagerOrder, 9),
        (E::ExitMultiHomeOrderer, 10),
        (E::EnterSequencer, 11),
        (E::EnterLocalBatch, 13),
        (E::ExitSequencerInBatch, 14),
        (E::EnterLogManagerInBatch, 15),
    ]);
    let (a, diags) = run(SystemVariant::Slog, &events);

    assert_eq!(diags.anomaly_count(), 0);
    assert!(approx(a.stages[Stage::Sequencer], 2.0));
    assert!(approx(a.stages[Stage::Idle], 2.0 + 3.0 + 1.0 + 1.0 + 1.0));
}

#[test]
fn test_slog_lock_manager_override() {
    use EventKind as E;
    let via_scheduler = trace(&[
        (E::EnterServer, 0),
        (E::EnterScheduler, 1),
        (E::EnterLockManager, 4),
    ]);
    let (a, _) = run(SystemVariant::Slog, &via_scheduler);
    assert!(approx(a.stages[Stage::Scheduler], 3.0));

    let direct = trace(&[
        (E::EnterServer, 0),
        (E::ExitLogManager, 1),
        (E::EnterLockManager, 4),
    ]);
    let (a, _) = run(SystemVariant::Slog, &direct);
    assert!(approx(a.stages[Stage::Scheduler], 0.0));
    assert!(approx(a.stages[Stage::Other], 3.0));
}

#[test]
fn test_duplicate_marker_measures_from_first_occurrence() {
    use EventKind as E;
    let events = trace(&[
        (E::EnterServer, 0),
        (E::ExitServerToForwarder, 2),
        (E::EnterWorker, 4),
        (E::EnterWorker, 6),
        (E::ExitWorker, 10),
    ]);
    let (a, diags) = run(SystemVariant::Janus, &events);

    assert!(approx(a.stages[Stage::Server], 2.0 + 6.0));
    assert!(approx(a.stages[Stage::Idle], 2.0));
    assert_eq!(diags.anomaly_count(), 0);
}

#[test]
fn test_negative_interval_is_discarded() {
    use EventKind as E;
    let events = trace(&[
        (E::EnterServer, 10),
        (E::ExitServerToForwarder, 8),
        (E::EnterWorker, 12),
    ]);
    let (a, diags) = run(SystemVariant::Janus, &events);

    assert!(approx(a.stages[Stage::Server], 0.0));
    // measured from the discarded marker's timestamp
    assert!(approx(a.stages[Stage::Idle], 4.0));
    assert_eq!(diags.count_of(DiagnosticKind::NegativeInterval), 1);
    assert_eq!(diags.anomaly_count(), 0);
}

#[test]
fn test_overflowing_interval_is_discarded() {
    use EventKind as E;
    let events = [
        EventRecord::new(7, E::EnterServer, i64::MIN + 1),
        EventRecord::new(7, E::ExitServerToForwarder, i64::MAX),
        EventRecord::new(7, E::EnterWorker, i64::MAX),
    ];
    for variant in [SystemVariant::Janus, SystemVariant::Generic] {
        let (a, diags) = run(variant, &events);
        assert_eq!(a.stages.total(), 0.0, "{:?}", variant);
        assert_eq!(a.trace_span_ms, 0.0);
        assert_eq!(diags.count_of(DiagnosticKind::NegativeInterval), 1);
    }
}

#[test]
fn test_unexpected_predecessor_still_accumulates() {
    use EventKind as E;
    let events = trace(&[(E::EnterServer, 0), (E::EnterWorker, 5)]);
    let (a, diags) = run(SystemVariant::Janus, &events);

    assert!(approx(a.stages[Stage::Idle], 5.0));
    assert_eq!(diags.count_of(DiagnosticKind::UnexpectedPredecessor), 1);
}

#[test]
fn test_strange_start_is_reported() {
    use EventKind as E;
    let events = trace(&[(E::EnterWorker, 0), (E::ExitWorker, 5)]);
    let (a, diags) = run(SystemVariant::Janus, &events);

    assert_eq!(diags.count_of(DiagnosticKind::StrangeStart), 1);
    assert!(approx(a.stages[Stage::Server], 5.0));
}

#[test]
fn test_restart_rebaselines_the_clock() {
    use EventKind as E;
    let events = trace(&[
        (E::EnterServer, 0),
        (E::ExitServerToForwarder, 3),
        (E::EnterServer, 20),
        (E::ExitServerToForwarder, 22),
    ]);
    let (a, diags) = run(SystemVariant::Janus, &events);

    assert_eq!(diags.count_of(DiagnosticKind::StrangeRestart), 1);
    assert!(approx(a.stages[Stage::Server], 3.0 + 2.0));
}

#[test]
fn test_uncovered_and_unknown_markers_advance_state() {
    use EventKind as E;
    let mut events = trace(&[
        (E::EnterServer, 0),
        (E::EnterSequencer, 4),
        (E::ExitServerToForwarder, 6),
    ]);
    let (a, diags) = run(SystemVariant::Janus, &events);
    assert_eq!(diags.count_of(DiagnosticKind::UncoveredTransition), 1);
    // the uncovered marker still moves the clock, so only 2ms are charged
    assert!(approx(a.stages[Stage::Server], 2.0));

    events[1].kind = E::Unknown;
    events[1].raw = "ENTER_NOWHERE".to_string();
    let (_, diags) = run(SystemVariant::Janus, &events);
    assert_eq!(diags.count_of(DiagnosticKind::UnknownMarker), 1);
}

#[test]
fn test_generic_lock_manager_closes_on_next_marker() {
    use EventKind as E;
    let events = trace(&[
        (E::EnterServer, 0),
        (E::ExitServerToForwarder, 1),
        (E::EnterWorker, 2),
        (E::ExitWorker, 3),
        (E::EnterScheduler, 10),
        (E::EnterLockManager, 14),
        (E::DispatchedFast, 17),
    ]);
    let (a, _) = run(SystemVariant::Generic, &events);

    assert!(approx(a.stages[Stage::Scheduler], 4.0));
    assert!(approx(a.stages[Stage::LockManager], 3.0));
}

#[test]
fn test_generic_ignores_exit_of_another_stage() {
    use EventKind as E;
    let events = trace(&[
        (E::EnterServer, 0),
        (E::ExitWorker, 4),
        (E::ExitServerToClient, 9),
    ]);
    let (a, diags) = run(SystemVariant::Generic, &events);

    assert!(approx(a.stages[Stage::Server], 9.0));
    assert!(approx(a.stages[Stage::Worker], 0.0));
    assert_eq!(diags.anomaly_count(), 0);
}

#[test]
fn test_empty_trace() {
    for variant in [SystemVariant::Detock, SystemVariant::Generic] {
        let (a, diags) = run(variant, &[]);
        assert_eq!(a.stages.total(), 0.0);
        assert_eq!(a.event_count, 0);
        assert!(diags.is_empty());
    }
}
