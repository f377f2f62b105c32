// Stage buckets and the per-transaction duration accumulator

use serde::Serialize;
use std::fmt;
use std::ops::Index;

/// Named category of elapsed time within a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Server,
    Forwarder,
    MultiHomeOrderer,
    Sequencer,
    LogManager,
    Scheduler,
    LockManager,
    Worker,
    Idle,
    Other,
}

impl Stage {
    /// All stages in column order
    pub const ALL: [Stage; 10] = [
        Stage::Server,
        Stage::Forwarder,
        Stage::MultiHomeOrderer,
        Stage::Sequencer,
        Stage::LogManager,
        Stage::Scheduler,
        Stage::LockManager,
        Stage::Worker,
        Stage::Idle,
        Stage::Other,
    ];

    /// Stages that are attributed from events (everything but `Other`)
    pub const NAMED: [Stage; 9] = [
        Stage::Server,
        Stage::Forwarder,
        Stage::MultiHomeOrderer,
        Stage::Sequencer,
        Stage::LogManager,
        Stage::Scheduler,
        Stage::LockManager,
        Stage::Worker,
        Stage::Idle,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Column label used in breakdown and summary tables
    pub fn label(self) -> &'static str {
        match self {
            Stage::Server => "Server",
            Stage::Forwarder => "Fwd",
            Stage::MultiHomeOrderer => "MH orderer",
            Stage::Sequencer => "Seq",
            Stage::LogManager => "Log man",
            Stage::Scheduler => "Sched",
            Stage::LockManager => "Lck man",
            Stage::Worker => "Worker",
            Stage::Idle => "Idle",
            Stage::Other => "Other",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Milliseconds accumulated per stage for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageDurations {
    ms: [f64; 10],
}

impl StageDurations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add elapsed time to a stage; negative amounts are ignored
    pub fn add(&mut self, stage: Stage, ms: f64) {
        if ms > 0.0 {
            self.ms[stage.index()] += ms;
        }
    }

    /// Overwrite a stage (used for the residual)
    pub fn set(&mut self, stage: Stage, ms: f64) {
        self.ms[stage.index()] = ms.max(0.0);
    }

    pub fn get(&self, stage: Stage) -> f64 {
        self.ms[stage.index()]
    }

    /// Sum of every stage except `Other`
    pub fn named_total(&self) -> f64 {
        Stage::NAMED.iter().map(|s| self.get(*s)).sum()
    }

    /// Sum of every stage, `Other` included
    pub fn total(&self) -> f64 {
        self.ms.iter().sum()
    }

    /// Multiply every named stage by `factor`, leaving `Other` untouched
    pub fn scale_named(&mut self, factor: f64) {
        for stage in Stage::NAMED {
            self.ms[stage.index()] *= factor;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, f64)> + '_ {
        Stage::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

impl Index<Stage> for StageDurations {
    type Output = f64;

    fn index(&self, stage: Stage) -> &f64 {
        &self.ms[stage.index()]
    }
}
