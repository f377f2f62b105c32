//! CSV output for breakdown and summary tables
//!
//! Per-transaction rows go to `latency_breakdown_<system>[_<run>].csv`,
//! summary rows to `latency_summary.csv`. Undefined values are empty cells.

use crate::aggregate::{SummaryRow, SuperCategory};
use crate::attribution::Stage;
use crate::breakdown::TxnBreakdown;

pub const SUMMARY_FILE: &str = "latency_summary.csv";

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn fixed(value: f64, decimals: usize) -> String {
    // avoid "-0.00000" for tiny negative rounding noise
    let rounded = format!("{:.*}", decimals, value);
    if rounded.starts_with('-') && rounded[1..].chars().all(|c| c == '0' || c == '.') {
        rounded[1..].to_string()
    } else {
        rounded
    }
}

fn optional(value: Option<f64>, decimals: usize) -> String {
    value.map(|v| fixed(v, decimals)).unwrap_or_default()
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Per-transaction breakdown table formatter
#[derive(Debug)]
pub struct CsvBreakdownOutput {
    decimals: usize,
}

impl CsvBreakdownOutput {
    pub fn new(decimals: usize) -> Self {
        Self { decimals }
    }

    fn header() -> String {
        let mut headers = vec![
            "Txn_ID".to_string(),
            "Is MP".to_string(),
            "Is MH".to_string(),
            "Class".to_string(),
            "Start time".to_string(),
            "End time".to_string(),
            "Duration (ms)".to_string(),
        ];
        headers.extend(Stage::ALL.iter().map(|s| format!("{} (ms)", s.label())));
        headers.join(",")
    }

    fn format_record(&self, record: &TxnBreakdown) -> String {
        let mut fields = vec![
            record.txn_id.to_string(),
            flag(record.is_multi_partition).to_string(),
            flag(record.is_multi_home).to_string(),
            record.class.label().to_string(),
            record.start_time.to_string(),
            record.end_time.map(|t| t.to_string()).unwrap_or_default(),
            optional(record.duration_ms, self.decimals),
        ];
        fields.extend(
            Stage::ALL
                .iter()
                .map(|s| fixed(record.stage(*s), self.decimals)),
        );
        fields.join(",")
    }

    /// Render records in the given order
    pub fn to_csv<'a>(&self, records: impl IntoIterator<Item = &'a TxnBreakdown>) -> String {
        let mut output = String::new();
        output.push_str(&Self::header());
        output.push('\n');
        for record in records {
            output.push_str(&self.format_record(record));
            output.push('\n');
        }
        output
    }
}

/// Summary table formatter
#[derive(Debug)]
pub struct CsvSummaryOutput {
    decimals: usize,
    percentiles: Vec<f64>,
}

impl CsvSummaryOutput {
    pub fn new(decimals: usize, percentiles: &[f64]) -> Self {
        Self {
            decimals,
            percentiles: percentiles.to_vec(),
        }
    }

    fn header(&self) -> String {
        let mut headers: Vec<String> = [
            "System",
            "Variant",
            "Run",
            "Class",
            "Status",
            "Txns",
            "Aborted",
            "Avg Duration (ms)",
            "Std Duration (ms)",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        for stage in Stage::ALL {
            headers.push(format!("Avg {} (ms)", stage.label()));
            headers.push(format!("Std {} (ms)", stage.label()));
            headers.push(format!("{} (%)", stage.label()));
        }
        for p in &self.percentiles {
            headers.push(format!("P{} (ms)", p));
        }
        for category in SuperCategory::ALL {
            headers.push(format!("{} (merged %)", category.label()));
        }
        headers.join(",")
    }

    fn format_row(&self, row: &SummaryRow) -> String {
        let d = self.decimals;
        let mut fields = vec![
            escape_field(&row.system),
            row.variant.tag().to_string(),
            escape_field(&row.run),
            row.class.label().to_string(),
            row.status.label().to_string(),
            row.txns.to_string(),
            row.aborted.to_string(),
            optional(row.duration_mean_ms, d),
            optional(row.duration_std_ms, d),
        ];

        for stage in Stage::ALL {
            let summary = row.stage(stage);
            fields.push(optional(summary.and_then(|s| s.mean_ms), d));
            fields.push(optional(summary.and_then(|s| s.std_ms), d));
            fields.push(optional(summary.and_then(|s| s.share), d));
        }

        for p in &self.percentiles {
            let value = row
                .percentiles
                .iter()
                .find(|v| v.p == *p)
                .and_then(|v| v.ms);
            fields.push(optional(value, d));
        }

        for category in SuperCategory::ALL {
            fields.push(optional(row.merged.map(|m| m.get(category)), d));
        }
        fields.join(",")
    }

    pub fn to_csv(&self, rows: &[SummaryRow]) -> String {
        let mut output = String::new();
        output.push_str(&self.header());
        output.push('\n');
        for row in rows {
            output.push_str(&self.format_row(row));
            output.push('\n');
        }
        output
    }
}
