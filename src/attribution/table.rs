// Declarative transition tables, one per system variant
//
// Sequential tables map (previous marker, marker) to a stage bucket and
// record which predecessors are expected. The generic table is an
// enter/exit span map with a list of self-closing stages.

use super::stage::Stage;
use crate::events::EventKind;
use crate::variant::SystemVariant;
use std::collections::HashMap;

/// How time leading up to one marker is attributed
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRule {
    /// Bucket charged when no override matches
    pub stage: Stage,
    /// Predecessors the pipeline is expected to produce
    pub expected: Vec<EventKind>,
    /// Predecessor-specific buckets, checked before the default
    pub overrides: Vec<(EventKind, Stage)>,
}

impl TransitionRule {
    fn new(stage: Stage, expected: &[EventKind]) -> Self {
        Self {
            stage,
            expected: expected.to_vec(),
            overrides: Vec::new(),
        }
    }

    fn with_override(mut self, prev: EventKind, stage: Stage) -> Self {
        self.overrides.push((prev, stage));
        self
    }
}

/// Result of looking up a `(prev, event)` transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    pub stage: Stage,
    /// Whether `prev` is one of the expected predecessors
    pub expected: bool,
}

/// Hand-enumerated transition graph of a named system design
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    rules: HashMap<EventKind, TransitionRule>,
}

impl TransitionTable {
    fn insert(&mut self, event: EventKind, rule: TransitionRule) {
        self.rules.insert(event, rule);
    }

    fn insert_all(&mut self, events: &[EventKind], rule: TransitionRule) {
        for event in events {
            self.rules.insert(*event, rule.clone());
        }
    }

    /// Look up the bucket for the interval ending at `event`
    pub fn lookup(&self, prev: EventKind, event: EventKind) -> Option<Lookup> {
        let rule = self.rules.get(&event)?;
        let stage = rule
            .overrides
            .iter()
            .find(|(p, _)| *p == prev)
            .map(|(_, s)| *s)
            .unwrap_or(rule.stage);
        Some(Lookup {
            stage,
            expected: rule.expected.contains(&prev),
        })
    }

    pub fn rule(&self, event: EventKind) -> Option<&TransitionRule> {
        self.rules.get(&event)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Janus: server, worker and the way back, nothing in between
    pub fn janus() -> Self {
        use EventKind as E;
        let mut t = Self::default();
        t.insert(
            E::ExitServerToForwarder,
            TransitionRule::new(Stage::Server, &[E::EnterServer]),
        );
        t.insert(
            E::EnterWorker,
            TransitionRule::new(Stage::Idle, &[E::ExitServerToForwarder]),
        );
        t.insert_worker_tail();
        t
    }

    /// Calvin: forwarder, global sequencer, log manager and lock-based scheduler
    pub fn calvin() -> Self {
        use EventKind as E;
        let mut t = Self::default();
        t.insert(
            E::ExitServerToForwarder,
            TransitionRule::new(Stage::Server, &[E::EnterServer]),
        );
        t.insert(
            E::EnterForwarder,
            TransitionRule::new(Stage::Other, &[E::ExitServerToForwarder]),
        );
        t.insert(
            E::ExitForwarderToSequencer,
            TransitionRule::new(Stage::Server, &[E::EnterForwarder]),
        );
        t.insert(
            E::EnterSequencer,
            TransitionRule::new(Stage::Other, &[E::ExitForwarderToSequencer]),
        );
        t.insert(
            E::EnterLocalBatch,
            TransitionRule::new(Stage::Sequencer, &[E::EnterSequencer]),
        );
        t.insert(
            E::ExitSequencerInBatch,
            TransitionRule::new(Stage::Sequencer, &[E::EnterLocalBatch]),
        );
        t.insert(
            E::EnterLogManagerInBatch,
            TransitionRule::new(Stage::Other, &[E::ExitSequencerInBatch]),
        );
        t.insert(
            E::EnterLogManagerOrder,
            TransitionRule::new(Stage::Idle, &[E::EnterLogManagerInBatch]),
        );
        t.insert(
            E::ExitLogManager,
            TransitionRule::new(Stage::Idle, &[E::EnterLogManagerOrder]),
        );
        t.insert(
            E::EnterScheduler,
            TransitionRule::new(Stage::Other, &[E::ExitLogManager]),
        );
        t.insert(
            E::EnterLockManager,
            TransitionRule::new(Stage::Scheduler, &[E::EnterScheduler]),
        );
        t.insert_all(
            &[E::DispatchedFast, E::DispatchedSlow],
            TransitionRule::new(Stage::Idle, &[E::EnterLockManager]),
        );
        t.insert(
            E::EnterWorker,
            TransitionRule::new(Stage::Other, &[E::DispatchedFast, E::DispatchedSlow]),
        );
        t.insert_worker_tail();
        t
    }

    /// SLOG: home regions, multi-home orderer and a low-ordering scheduler queue
    pub fn slog() -> Self {
        use EventKind as E;
        let mut t = Self::default();
        t.insert(
            E::ExitServerToForwarder,
            TransitionRule::new(Stage::Server, &[E::EnterServer]),
        );
        t.insert(
            E::EnterForwarder,
            TransitionRule::new(Stage::Other, &[E::ExitServerToForwarder]),
        );
        t.insert_all(
            &[E::ExitForwarderToMultiHomeOrderer, E::ExitForwarderToSequencer],
            TransitionRule::new(Stage::Server, &[E::EnterForwarder]),
        );
        t.insert(
            E::EnterMultiHomeOrderer,
            TransitionRule::new(Stage::Other, &[E::ExitForwarderToMultiHomeOrderer]),
        );
        t.insert(
            E::EnterMultiHomeOrdererInBatch,
            TransitionRule::new(
                Stage::Idle,
                &[E::EnterMultiHomeOrderer, E::GotRemoteReads, E::EnterWorker],
            ),
        );
        t.insert(
            E::EnterLogManagerOrder,
            TransitionRule::new(
                Stage::Idle,
                &[E::EnterMultiHomeOrdererInBatch, E::EnterLogManagerInBatch],
            ),
        );
        t.insert(
            E::ExitMultiHomeOrderer,
            TransitionRule::new(Stage::Idle, &[E::EnterLogManagerOrder]),
        );
        t.insert(
            E::EnterSequencer,
            TransitionRule::new(
                Stage::Other,
                &[E::ExitMultiHomeOrderer, E::ExitForwarderToSequencer],
            ),
        );
        t.insert(
            E::EnterLocalBatch,
            TransitionRule::new(Stage::Sequencer, &[E::EnterSequencer]),
        );
        t.insert(
            E::ExitSequencerInBatch,
            TransitionRule::new(Stage::Idle, &[E::EnterLocalBatch]),
        );
        t.insert(
            E::EnterLogManagerInBatch,
            TransitionRule::new(Stage::Idle, &[E::ExitSequencerInBatch]),
        );
        t.insert(
            E::ExitLogManager,
            TransitionRule::new(Stage::Idle, &[E::EnterLogManagerOrder]),
        );
        t.insert(
            E::EnterScheduler,
            TransitionRule::new(Stage::Other, &[E::ExitLogManager]),
        );
        t.insert(
            E::EnterLockManager,
            TransitionRule::new(Stage::Other, &[E::EnterScheduler, E::ExitLogManager])
                .with_override(E::EnterScheduler, Stage::Scheduler),
        );
        t.insert(
            E::EnterSchedulerLo,
            TransitionRule::new(Stage::Idle, &[E::EnterLockManager]),
        );
        t.insert_all(
            &[E::DispatchedFast, E::DispatchedSlow],
            TransitionRule::new(Stage::Idle, &[E::EnterSchedulerLo, E::EnterLockManager])
                .with_override(E::EnterSchedulerLo, Stage::Scheduler),
        );
        t.insert(
            E::EnterWorker,
            TransitionRule::new(Stage::Other, &[E::DispatchedFast, E::DispatchedSlow]),
        );
        t.insert_worker_tail();
        t.insert(
            E::ExitWorker,
            TransitionRule::new(
                Stage::Server,
                &[E::EnterLockManager, E::EnterWorker, E::GotRemoteReads],
            )
            .with_override(E::EnterLockManager, Stage::Idle),
        );
        t
    }

    /// Detock: the SLOG pipeline, plus a direct forwarder-to-sequencer hop
    /// for multi-home transactions
    pub fn detock() -> Self {
        use EventKind as E;
        let mut t = Self::slog();
        t.insert(
            E::EnterSequencer,
            TransitionRule::new(
                Stage::Other,
                &[
                    E::ExitMultiHomeOrderer,
                    E::ExitForwarderToSequencer,
                    E::ExitForwarderToMultiHomeOrderer,
                ],
            ),
        );
        t
    }

    /// Worker execution and the return to the client, shared by every design
    fn insert_worker_tail(&mut self) {
        use EventKind as E;
        self.insert(
            E::GotRemoteReads,
            TransitionRule::new(Stage::Idle, &[E::EnterWorker]),
        );
        self.insert(
            E::ExitWorker,
            TransitionRule::new(Stage::Server, &[E::EnterWorker, E::GotRemoteReads]),
        );
        self.insert(
            E::ReturnToServer,
            TransitionRule::new(Stage::Other, &[E::ExitWorker]),
        );
        self.insert(
            E::ExitServerToClient,
            TransitionRule::new(Stage::Server, &[E::ReturnToServer]),
        );
    }
}

/// Enter/exit span map used for systems without a hand-written table
#[derive(Debug, Clone, Default)]
pub struct SpanTable {
    enter: HashMap<EventKind, Stage>,
    exit: HashMap<EventKind, Stage>,
    self_closing: Vec<Stage>,
}

impl SpanTable {
    /// Stage opened by `event` when nothing is open
    pub fn enters(&self, event: EventKind) -> Option<Stage> {
        self.enter.get(&event).copied()
    }

    /// Stage closed by `event`
    pub fn exits(&self, event: EventKind) -> Option<Stage> {
        self.exit.get(&event).copied()
    }

    /// Stages measured as a single hop, closed by whatever marker comes next
    pub fn is_self_closing(&self, stage: Stage) -> bool {
        self.self_closing.contains(&stage)
    }

    pub fn generic() -> Self {
        use EventKind as E;
        let enter = [
            (E::EnterServer, Stage::Server),
            (E::ReturnToServer, Stage::Server),
            (E::ExitServerToForwarder, Stage::Forwarder),
            (E::EnterForwarder, Stage::Forwarder),
            (E::EnterMultiHomeOrderer, Stage::MultiHomeOrderer),
            (E::EnterMultiHomeOrdererInBatch, Stage::MultiHomeOrderer),
            (E::EnterSequencer, Stage::Sequencer),
            (E::EnterSequencerInBatch, Stage::Sequencer),
            (E::ExitSequencerInBatch, Stage::Idle),
            (E::EnterLogManagerInBatch, Stage::LogManager),
            (E::EnterLogManagerOrder, Stage::LogManager),
            (E::EnterScheduler, Stage::Scheduler),
            (E::EnterSchedulerLo, Stage::Scheduler),
            (E::EnterLockManager, Stage::LockManager),
            (E::EnterWorker, Stage::Worker),
        ];
        let exit = [
            (E::ExitServerToClient, Stage::Server),
            (E::ExitServerToForwarder, Stage::Server),
            (E::ExitForwarderToSequencer, Stage::Forwarder),
            (E::EnterWorker, Stage::Forwarder),
            (E::ExitForwarderToMultiHomeOrderer, Stage::Forwarder),
            (E::ExitMultiHomeOrdererInBatch, Stage::MultiHomeOrderer),
            (E::ExitMultiHomeOrderer, Stage::MultiHomeOrderer),
            (E::ExitSequencerInBatch, Stage::Sequencer),
            (E::EnterLogManagerInBatch, Stage::Idle),
            (E::ExitLogManager, Stage::LogManager),
            (E::Dispatched, Stage::Scheduler),
            (E::DispatchedFast, Stage::Scheduler),
            (E::DispatchedSlow, Stage::Scheduler),
            (E::EnterLockManager, Stage::Scheduler),
            (E::ExitWorker, Stage::Worker),
        ];
        Self {
            enter: enter.into_iter().collect(),
            exit: exit.into_iter().collect(),
            self_closing: vec![Stage::LockManager],
        }
    }
}

/// Attribution policy selected by the system variant
#[derive(Debug, Clone)]
pub enum TransitionPolicy {
    /// Predecessor-checked transition table
    Sequential(TransitionTable),
    /// Enter/exit spans; residual left to the record builder
    Spans(SpanTable),
}

impl TransitionPolicy {
    pub fn for_variant(variant: SystemVariant) -> Self {
        match variant {
            SystemVariant::Janus => TransitionPolicy::Sequential(TransitionTable::janus()),
            SystemVariant::Calvin => TransitionPolicy::Sequential(TransitionTable::calvin()),
            SystemVariant::Slog => TransitionPolicy::Sequential(TransitionTable::slog()),
            SystemVariant::Detock => TransitionPolicy::Sequential(TransitionTable::detock()),
            SystemVariant::Generic => TransitionPolicy::Spans(SpanTable::generic()),
        }
    }
}
