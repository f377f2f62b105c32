//! Structural classification of transactions by partition/region footprint

use crate::transactions::TransactionRecord;
use crate::variant::SystemVariant;
use serde::Serialize;
use std::fmt;

/// Locality class of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalityClass {
    /// Single partition
    SingleHome,
    /// Several partitions, one region (or a design without homes)
    ForwardedSingleHome,
    /// Several partitions across several regions
    MultiHome,
}

impl LocalityClass {
    pub const ALL: [LocalityClass; 3] = [
        LocalityClass::SingleHome,
        LocalityClass::ForwardedSingleHome,
        LocalityClass::MultiHome,
    ];

    /// Short label used in reports
    pub fn label(self) -> &'static str {
        match self {
            LocalityClass::SingleHome => "SP_SH",
            LocalityClass::ForwardedSingleHome => "MP_SH",
            LocalityClass::MultiHome => "MP_MH",
        }
    }
}

impl fmt::Display for LocalityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify from raw counts
///
/// Partition count decides first: one partition is single-home even when
/// several regions are listed. Designs without homes ignore the region
/// count, so their multi-partition transactions stay forwarded single-home.
pub fn classify_counts(partitions: usize, regions: usize, variant: SystemVariant) -> LocalityClass {
    if partitions <= 1 {
        LocalityClass::SingleHome
    } else if regions <= 1 || !variant.has_home() {
        LocalityClass::ForwardedSingleHome
    } else {
        LocalityClass::MultiHome
    }
}

/// Classify a transaction under the given system variant
pub fn classify(txn: &TransactionRecord, variant: SystemVariant) -> LocalityClass {
    classify_counts(txn.partitions.len(), txn.regions.len(), variant)
}
