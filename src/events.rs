//! Transaction lifecycle markers
//!
//! The platform under test stamps each transaction as it moves through the
//! server, forwarder, orderers, sequencer, log manager, scheduler and
//! workers. Marker names are spelled exactly as they appear in
//! `txn_events.csv`.

use serde::Serialize;
use std::fmt;

/// Closed vocabulary of lifecycle markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EventKind {
    EnterServer,
    ExitServerToForwarder,
    EnterForwarder,
    ExitForwarderToSequencer,
    ExitForwarderToMultiHomeOrderer,
    EnterMultiHomeOrderer,
    EnterMultiHomeOrdererInBatch,
    ExitMultiHomeOrdererInBatch,
    ExitMultiHomeOrderer,
    EnterSequencer,
    EnterSequencerInBatch,
    EnterLocalBatch,
    ExitSequencerInBatch,
    EnterLogManagerInBatch,
    EnterLogManagerOrder,
    ExitLogManager,
    EnterScheduler,
    EnterSchedulerLo,
    EnterLockManager,
    Dispatched,
    DispatchedFast,
    DispatchedSlow,
    EnterWorker,
    GotRemoteReads,
    ExitWorker,
    ReturnToServer,
    ExitServerToClient,
    /// Marker outside the known vocabulary
    Unknown,
}

impl EventKind {
    /// Marker that opens every well-formed trace
    pub const START: EventKind = EventKind::EnterServer;

    /// Every known marker, in pipeline order
    pub const ALL: [EventKind; 27] = [
        EventKind::EnterServer,
        EventKind::ExitServerToForwarder,
        EventKind::EnterForwarder,
        EventKind::ExitForwarderToSequencer,
        EventKind::ExitForwarderToMultiHomeOrderer,
        EventKind::EnterMultiHomeOrderer,
        EventKind::EnterMultiHomeOrdererInBatch,
        EventKind::ExitMultiHomeOrdererInBatch,
        EventKind::ExitMultiHomeOrderer,
        EventKind::EnterSequencer,
        EventKind::EnterSequencerInBatch,
        EventKind::EnterLocalBatch,
        EventKind::ExitSequencerInBatch,
        EventKind::EnterLogManagerInBatch,
        EventKind::EnterLogManagerOrder,
        EventKind::ExitLogManager,
        EventKind::EnterScheduler,
        EventKind::EnterSchedulerLo,
        EventKind::EnterLockManager,
        EventKind::Dispatched,
        EventKind::DispatchedFast,
        EventKind::DispatchedSlow,
        EventKind::EnterWorker,
        EventKind::GotRemoteReads,
        EventKind::ExitWorker,
        EventKind::ReturnToServer,
        EventKind::ExitServerToClient,
    ];

    /// Resolve a marker name; unrecognised names map to `Unknown`
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "ENTER_SERVER" => EventKind::EnterServer,
            "EXIT_SERVER_TO_FORWARDER" => EventKind::ExitServerToForwarder,
            "ENTER_FORWARDER" => EventKind::EnterForwarder,
            "EXIT_FORWARDER_TO_SEQUENCER" => EventKind::ExitForwarderToSequencer,
            "EXIT_FORWARDER_TO_MULTI_HOME_ORDERER" => EventKind::ExitForwarderToMultiHomeOrderer,
            "ENTER_MULTI_HOME_ORDERER" => EventKind::EnterMultiHomeOrderer,
            "ENTER_MULTI_HOME_ORDERER_IN_BATCH" => EventKind::EnterMultiHomeOrdererInBatch,
            "EXIT_MULTI_HOME_ORDERER_IN_BATCH" => EventKind::ExitMultiHomeOrdererInBatch,
            "EXIT_MULTI_HOME_ORDERER" => EventKind::ExitMultiHomeOrderer,
            "ENTER_SEQUENCER" => EventKind::EnterSequencer,
            "ENTER_SEQUENCER_IN_BATCH" => EventKind::EnterSequencerInBatch,
            "ENTER_LOCAL_BATCH" => EventKind::EnterLocalBatch,
            "EXIT_SEQUENCER_IN_BATCH" => EventKind::ExitSequencerInBatch,
            "ENTER_LOG_MANAGER_IN_BATCH" => EventKind::EnterLogManagerInBatch,
            "ENTER_LOG_MANAGER_ORDER" => EventKind::EnterLogManagerOrder,
            "EXIT_LOG_MANAGER" => EventKind::ExitLogManager,
            "ENTER_SCHEDULER" => EventKind::EnterScheduler,
            "ENTER_SCHEDULER_LO" => EventKind::EnterSchedulerLo,
            "ENTER_LOCK_MANAGER" => EventKind::EnterLockManager,
            "DISPATCHED" => EventKind::Dispatched,
            "DISPATCHED_FAST" => EventKind::DispatchedFast,
            "DISPATCHED_SLOW" => EventKind::DispatchedSlow,
            "ENTER_WORKER" => EventKind::EnterWorker,
            "GOT_REMOTE_READS" => EventKind::GotRemoteReads,
            "EXIT_WORKER" => EventKind::ExitWorker,
            "RETURN_TO_SERVER" => EventKind::ReturnToServer,
            "EXIT_SERVER_TO_CLIENT" => EventKind::ExitServerToClient,
            _ => EventKind::Unknown,
        }
    }

    /// Marker name as written in trace files
    pub fn name(self) -> &'static str {
        match self {
            EventKind::EnterServer => "ENTER_SERVER",
            EventKind::ExitServerToForwarder => "EXIT_SERVER_TO_FORWARDER",
            EventKind::EnterForwarder => "ENTER_FORWARDER",
            EventKind::ExitForwarderToSequencer => "EXIT_FORWARDER_TO_SEQUENCER",
            EventKind::ExitForwarderToMultiHomeOrderer => "EXIT_FORWARDER_TO_MULTI_HOME_ORDERER",
            EventKind::EnterMultiHomeOrderer => "ENTER_MULTI_HOME_ORDERER",
            EventKind::EnterMultiHomeOrdererInBatch => "ENTER_MULTI_HOME_ORDERER_IN_BATCH",
            EventKind::ExitMultiHomeOrdererInBatch => "EXIT_MULTI_HOME_ORDERER_IN_BATCH",
            EventKind::ExitMultiHomeOrderer => "EXIT_MULTI_HOME_ORDERER",
            EventKind::EnterSequencer => "ENTER_SEQUENCER",
            EventKind::EnterSequencerInBatch => "ENTER_SEQUENCER_IN_BATCH",
            EventKind::EnterLocalBatch => "ENTER_LOCAL_BATCH",
            EventKind::ExitSequencerInBatch => "EXIT_SEQUENCER_IN_BATCH",
            EventKind::EnterLogManagerInBatch => "ENTER_LOG_MANAGER_IN_BATCH",
            EventKind::EnterLogManagerOrder => "ENTER_LOG_MANAGER_ORDER",
            EventKind::ExitLogManager => "EXIT_LOG_MANAGER",
            EventKind::EnterScheduler => "ENTER_SCHEDULER",
            EventKind::EnterSchedulerLo => "ENTER_SCHEDULER_LO",
            EventKind::EnterLockManager => "ENTER_LOCK_MANAGER",
            EventKind::Dispatched => "DISPATCHED",
            EventKind::DispatchedFast => "DISPATCHED_FAST",
            EventKind::DispatchedSlow => "DISPATCHED_SLOW",
            EventKind::EnterWorker => "ENTER_WORKER",
            EventKind::GotRemoteReads => "GOT_REMOTE_READS",
            EventKind::ExitWorker => "EXIT_WORKER",
            EventKind::ReturnToServer => "RETURN_TO_SERVER",
            EventKind::ExitServerToClient => "EXIT_SERVER_TO_CLIENT",
            EventKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One lifecycle marker observed for a transaction (a `txn_events.csv` row)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub txn_id: u64,
    pub kind: EventKind,
    /// Marker text as it appeared in the file (kept for unknown markers)
    pub raw: String,
    /// Monotonic clock reading, nanosecond scale
    pub time: i64,
    pub machine: String,
    pub home: String,
}

impl EventRecord {
    /// Build a record from a known marker (mostly useful in tests and benches)
    pub fn new(txn_id: u64, kind: EventKind, time: i64) -> Self {
        Self {
            txn_id,
            kind,
            raw: kind.name().to_string(),
            time,
            machine: String::new(),
            home: String::new(),
        }
    }
}
