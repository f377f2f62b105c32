// Coarse super-categories for comparative reporting

use crate::attribution::Stage;
use serde::Serialize;
use std::fmt;

/// Many-to-one grouping of stage buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuperCategory {
    Server,
    Sequencer,
    Scheduler,
    Idle,
    Other,
}

impl SuperCategory {
    pub const ALL: [SuperCategory; 5] = [
        SuperCategory::Server,
        SuperCategory::Sequencer,
        SuperCategory::Scheduler,
        SuperCategory::Idle,
        SuperCategory::Other,
    ];

    pub fn of(stage: Stage) -> Self {
        match stage {
            Stage::Server | Stage::Forwarder | Stage::Worker => SuperCategory::Server,
            Stage::Sequencer | Stage::MultiHomeOrderer | Stage::LogManager => {
                SuperCategory::Sequencer
            }
            Stage::Scheduler | Stage::LockManager => SuperCategory::Scheduler,
            Stage::Idle => SuperCategory::Idle,
            Stage::Other => SuperCategory::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SuperCategory::Server => "Server",
            SuperCategory::Sequencer => "Sequencer",
            SuperCategory::Scheduler => "Scheduler",
            SuperCategory::Idle => "Idle",
            SuperCategory::Other => "Other",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SuperCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Merged percentage shares, summing to 100
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedShares {
    percent: [f64; 5],
}

impl MergedShares {
    /// Merge fine-grained shares and renormalise to 100%
    ///
    /// Returns `None` when nothing was attributed (zero or non-finite total).
    pub fn from_fine(shares: impl IntoIterator<Item = (Stage, f64)>) -> Option<Self> {
        let mut sums = [0.0; 5];
        for (stage, share) in shares {
            if share.is_finite() && share > 0.0 {
                sums[SuperCategory::of(stage).index()] += share;
            }
        }
        let total: f64 = sums.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return None;
        }
        Some(Self {
            percent: sums.map(|s| s / total * 100.0),
        })
    }

    pub fn get(&self, category: SuperCategory) -> f64 {
        self.percent[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SuperCategory, f64)> + '_ {
        SuperCategory::ALL.iter().map(move |c| (*c, self.get(*c)))
    }

    pub fn total(&self) -> f64 {
        self.percent.iter().sum()
    }
}

impl Serialize for MergedShares {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(SuperCategory::ALL.len()))?;
        for (category, share) in self.iter() {
            map.serialize_entry(category.label(), &share)?;
        }
        map.end()
    }
}
