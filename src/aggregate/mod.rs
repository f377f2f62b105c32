// Aggregation of per-transaction breakdowns
//
// Groups records by (system, run, locality class), reports mean/std of the
// duration and of every stage, each stage's share of the mean duration and
// the coarse Server/Sequencer/Scheduler/Idle/Other split.
//
// Undefined groups (no completed transactions, or a class the design does
// not have) produce rows with missing values instead of zeros.

mod merge;
mod statistics;
mod summary;

pub use merge::{MergedShares, SuperCategory};
pub use statistics::{moments, percentile, Moments};
pub use summary::{
    summarize, summarize_class, PercentileValue, RowStatus, StageSummary, SummaryRow,
};
