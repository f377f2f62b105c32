//! Console report of the coarse latency split

use crate::aggregate::{RowStatus, SummaryRow, SuperCategory};
use crate::diagnostics::Diagnostics;

/// Render the merged-share table as fixed-width text
pub fn render_summary(rows: &[SummaryRow]) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        out.push_str("No transactions found.\n");
        return out;
    }

    let system_width = rows
        .iter()
        .map(|r| r.system.len())
        .max()
        .unwrap_or(0)
        .max("system".len());
    let run_width = rows
        .iter()
        .map(|r| r.run.len())
        .max()
        .unwrap_or(0)
        .max("run".len());

    out.push_str(&format!(
        "{:<sw$} {:<rw$} {:<5} {:>8} {:>10}",
        "system",
        "run",
        "class",
        "txns",
        "avg ms",
        sw = system_width,
        rw = run_width
    ));
    for category in SuperCategory::ALL {
        out.push_str(&format!(" {:>9}", category.label()));
    }
    out.push('\n');
    out.push_str(&format!(
        "{} {} ----- -------- ----------",
        "-".repeat(system_width),
        "-".repeat(run_width)
    ));
    for _ in SuperCategory::ALL {
        out.push_str(" ---------");
    }
    out.push('\n');

    for row in rows {
        let avg = row
            .duration_mean_ms
            .map(|v| format!("{:.3}", v))
            .unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!(
            "{:<sw$} {:<rw$} {:<5} {:>8} {:>10}",
            row.system,
            row.run,
            row.class.label(),
            row.txns,
            avg,
            sw = system_width,
            rw = run_width
        ));
        for category in SuperCategory::ALL {
            let cell = match (row.status, row.merged) {
                (RowStatus::Ok, Some(merged)) => format!("{:.2}%", merged.get(category)),
                _ => "N/A".to_string(),
            };
            out.push_str(&format!(" {:>9}", cell));
        }
        out.push('\n');
    }
    out
}

/// One line per diagnostic kind, for the end-of-run note
pub fn render_diagnostic_counts(diagnostics: &Diagnostics) -> String {
    let counts = diagnostics.counts_by_kind();
    if counts.is_empty() {
        return "no diagnostics".to_string();
    }
    counts
        .iter()
        .map(|(kind, n)| format!("{}={}", kind, n))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_summary(rows: &[SummaryRow]) {
    print!("{}", render_summary(rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::summarize_class;
    use crate::attribution::{Stage, StageDurations};
    use crate::breakdown::{RunBreakdown, RunKey, TxnBreakdown};
    use crate::diagnostics::DiagnosticKind;
    use crate::locality::LocalityClass;
    use crate::variant::SystemVariant;

    fn rows() -> Vec<SummaryRow> {
        let mut stages = StageDurations::new();
        stages.add(Stage::Server, 3.0);
        stages.add(Stage::Idle, 1.0);
        let mut run = RunBreakdown::new(SystemVariant::Janus);
        run.insert(TxnBreakdown {
            txn_id: 1,
            is_multi_partition: false,
            is_multi_home: false,
            class: LocalityClass::SingleHome,
            start_time: 0,
            end_time: Some(4_000_000),
            duration_ms: Some(4.0),
            stages,
            aborted: false,
        });
        let key = RunKey::new("janus", None);
        LocalityClass::ALL
            .iter()
            .map(|c| summarize_class(&key, &run, *c, &[]))
            .collect()
    }

    #[test]
    fn test_render_shares_and_na() {
        let text = render_summary(&rows());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2 + 3);
        assert!(lines[0].contains("Sequencer"));
        assert!(lines[2].starts_with("Janus"));
        assert!(lines[2].contains("75.00%"));
        assert!(lines[2].contains("25.00%"));
        assert!(lines[4].contains("MP_MH"));
        assert!(lines[4].contains("N/A"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_summary(&[]), "No transactions found.\n");
    }

    #[test]
    fn test_diagnostic_counts_line() {
        let mut diags = Diagnostics::new();
        diags.warn(1, DiagnosticKind::StrangeStart, "x");
        diags.warn(2, DiagnosticKind::StrangeStart, "y");
        assert_eq!(render_diagnostic_counts(&diags), "strange_start=2");
        assert_eq!(render_diagnostic_counts(&Diagnostics::new()), "no diagnostics");
    }
}
