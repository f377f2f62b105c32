//! Per-transaction metadata reported by the benchmarking client

/// One completed or aborted transaction attempt (a `transactions.csv` row)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub txn_id: u64,
    pub coordinator: String,
    /// Regions touched, in file order
    pub regions: Vec<String>,
    /// Partitions touched, in file order
    pub partitions: Vec<String>,
    pub generator: String,
    pub restarts: u32,
    /// Submission timestamp (client clock, nanosecond scale)
    pub sent_at: i64,
    /// Completion timestamp; absent for aborted attempts
    pub received_at: Option<i64>,
}

impl TransactionRecord {
    /// Split a `;`-joined list cell; an empty cell is the empty set
    pub fn split_list(cell: &str) -> Vec<String> {
        cell.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Raw end-to-end duration in clock units
    ///
    /// `None` without a completion, or when the timestamps are too far
    /// apart to subtract.
    pub fn duration_raw(&self) -> Option<i64> {
        self.received_at
            .and_then(|end| end.checked_sub(self.sent_at))
    }

    /// Duration in milliseconds given the clock-to-ms scale
    pub fn duration_ms(&self, unit_to_ms: f64) -> Option<f64> {
        self.duration_raw().map(|d| d as f64 * unit_to_ms)
    }

    /// Completed attempts have a completion strictly after submission
    pub fn is_completed(&self) -> bool {
        matches!(self.duration_raw(), Some(d) if d > 0)
    }

    pub fn is_multi_partition(&self) -> bool {
        self.partitions.len() > 1
    }

    pub fn is_multi_home(&self) -> bool {
        self.regions.len() > 1
    }
}
