//! CSV input and experiment discovery
//!
//! Reads the `transactions.csv` and `txn_events.csv` tables written by the
//! benchmarking client. Columns are located by header name. Any malformed
//! cell is a hard error carrying the file path and 1-based line number.
//!
//! Experiment layout:
//!
//! ```text
//! <input>/<system>/client/<client>/{transactions.csv, txn_events.csv}
//! <input>/<system>/<run>/client/<client>/{transactions.csv, txn_events.csv}
//! ```

use crate::error::{DesgloseError, Result};
use crate::events::{EventKind, EventRecord};
use crate::transactions::TransactionRecord;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const EVENTS_FILE: &str = "txn_events.csv";
const CLIENT_DIR: &str = "client";

/// One parsed CSV record and the line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Split CSV text into records
///
/// Quoted fields may contain commas, newlines and `""` escapes. Blank
/// lines are skipped. On an unterminated quote, returns the line the
/// quoted field started on.
pub fn parse_records(content: &str) -> std::result::Result<Vec<CsvRecord>, usize> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_line = 0;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(quote_line);
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_record(&mut records, record_line, fields);
    }
    Ok(records)
}

fn push_record(records: &mut Vec<CsvRecord>, line: usize, fields: Vec<String>) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        records.push(CsvRecord { line, fields });
    }
}

/// Header-indexed view of a parsed table
struct Table<'a> {
    path: &'a Path,
    columns: HashMap<String, usize>,
    rows: Vec<CsvRecord>,
}

impl<'a> Table<'a> {
    fn parse(path: &'a Path, content: &str) -> Result<Self> {
        let mut records = parse_records(content).map_err(|line| {
            DesgloseError::UnterminatedQuote {
                path: path.to_path_buf(),
                line,
            }
        })?;
        if records.is_empty() {
            return Ok(Self {
                path,
                columns: HashMap::new(),
                rows: Vec::new(),
            });
        }
        let header = records.remove(0);
        let columns = header
            .fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Ok(Self {
            path,
            columns,
            rows: records,
        })
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| DesgloseError::MissingColumn {
                path: self.path.to_path_buf(),
                column: name.to_string(),
            })
    }

    fn cell<'r>(record: &'r CsvRecord, index: usize) -> &'r str {
        record.fields.get(index).map(|s| s.trim()).unwrap_or("")
    }

    fn invalid(&self, record: &CsvRecord, column: &str, value: &str) -> DesgloseError {
        DesgloseError::InvalidField {
            path: self.path.to_path_buf(),
            line: record.line,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    fn number<T: std::str::FromStr>(&self, record: &CsvRecord, index: usize, column: &str) -> Result<T> {
        let value = Self::cell(record, index);
        value.parse().map_err(|_| self.invalid(record, column, value))
    }
}

/// Parse `transactions.csv` content
pub fn parse_transactions(path: &Path, content: &str) -> Result<Vec<TransactionRecord>> {
    let table = Table::parse(path, content)?;
    if table.rows.is_empty() && table.columns.is_empty() {
        return Ok(Vec::new());
    }
    let txn_id = table.column("txn_id")?;
    let coordinator = table.column("coordinator")?;
    let regions = table.column("regions")?;
    let partitions = table.column("partitions")?;
    let generator = table.column("generator")?;
    let restarts = table.column("restarts")?;
    let sent_at = table.column("sent_at")?;
    let received_at = table.column("received_at")?;

    table
        .rows
        .iter()
        .map(|record| -> Result<TransactionRecord> {
            let restarts_cell = Table::cell(record, restarts);
            let restarts = if restarts_cell.is_empty() {
                0
            } else {
                table.number(record, restarts, "restarts")?
            };
            let received_cell = Table::cell(record, received_at);
            let received_at = match received_cell {
                "" | "0" => None,
                _ => Some(table.number(record, received_at, "received_at")?),
            };
            Ok(TransactionRecord {
                txn_id: table.number(record, txn_id, "txn_id")?,
                coordinator: Table::cell(record, coordinator).to_string(),
                regions: TransactionRecord::split_list(Table::cell(record, regions)),
                partitions: TransactionRecord::split_list(Table::cell(record, partitions)),
                generator: Table::cell(record, generator).to_string(),
                restarts,
                sent_at: table.number(record, sent_at, "sent_at")?,
                received_at,
            })
        })
        .collect()
}

/// Parse `txn_events.csv` content, keeping file order
pub fn parse_events(path: &Path, content: &str) -> Result<Vec<EventRecord>> {
    let table = Table::parse(path, content)?;
    if table.rows.is_empty() && table.columns.is_empty() {
        return Ok(Vec::new());
    }
    let txn_id = table.column("txn_id")?;
    let event = table.column("event")?;
    let time = table.column("time")?;
    let machine = table.column("machine")?;
    let home = table.column("home")?;

    table
        .rows
        .iter()
        .map(|record| -> Result<EventRecord> {
            let raw = Table::cell(record, event);
            Ok(EventRecord {
                txn_id: table.number(record, txn_id, "txn_id")?,
                kind: EventKind::from_name(raw),
                raw: raw.to_string(),
                time: table.number(record, time, "time")?,
                machine: Table::cell(record, machine).to_string(),
                home: Table::cell(record, home).to_string(),
            })
        })
        .collect()
}

fn read(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "reading");
    fs::read_to_string(path).map_err(|e| DesgloseError::io(path, e))
}

pub fn load_transactions(path: &Path) -> Result<Vec<TransactionRecord>> {
    parse_transactions(path, &read(path)?)
}

pub fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
    parse_events(path, &read(path)?)
}

/// One (system, run) directory with its client subdirectories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentRun {
    /// System directory name
    pub system: String,
    /// Run-parameter directory name, if the layout has that level
    pub run: Option<String>,
    /// Client directories, sorted by name
    pub clients: Vec<PathBuf>,
}

/// Transactions and their events for one (system, run)
#[derive(Debug, Clone, Default)]
pub struct RunData {
    /// All clients' transactions, clients in sorted order
    pub transactions: Vec<TransactionRecord>,
    /// Events grouped by transaction id, file order within each group
    pub events: BTreeMap<u64, Vec<EventRecord>>,
}

impl ExperimentRun {
    /// Load and concatenate every client's tables
    pub fn load(&self) -> Result<RunData> {
        let mut data = RunData::default();
        for client in &self.clients {
            data.transactions
                .extend(load_transactions(&client.join(TRANSACTIONS_FILE))?);
            let events_path = client.join(EVENTS_FILE);
            if !events_path.exists() {
                tracing::debug!(path = %events_path.display(), "no event file");
                continue;
            }
            for event in load_events(&events_path)? {
                data.events.entry(event.txn_id).or_default().push(event);
            }
        }
        Ok(data)
    }
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| DesgloseError::io(dir, e))? {
        let entry = entry.map_err(|e| DesgloseError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn client_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_subdirs(&dir.join(CLIENT_DIR))?
        .into_iter()
        .filter(|c| c.join(TRANSACTIONS_FILE).is_file())
        .collect())
}

/// Find every (system, run) under `input`
///
/// System directories matching `exclude` are skipped, and when `only` is
/// non-empty only the named systems are kept. Results are sorted by
/// system then run name.
pub fn discover(input: &Path, exclude: Option<&Regex>, only: &[String]) -> Result<Vec<ExperimentRun>> {
    if !input.is_dir() {
        return Err(DesgloseError::InvalidLayout(format!(
            "{} is not a directory",
            input.display()
        )));
    }

    let mut runs = Vec::new();
    for system_dir in sorted_subdirs(input)? {
        let system = dir_name(&system_dir);
        if exclude.is_some_and(|re| re.is_match(&system)) {
            tracing::debug!(system = %system, "excluded");
            continue;
        }
        if !only.is_empty() && !only.iter().any(|s| s == &system) {
            continue;
        }

        if system_dir.join(CLIENT_DIR).is_dir() {
            runs.push(ExperimentRun {
                system: system.clone(),
                run: None,
                clients: client_dirs(&system_dir)?,
            });
            continue;
        }

        let mut found = false;
        for run_dir in sorted_subdirs(&system_dir)? {
            if run_dir.join(CLIENT_DIR).is_dir() {
                found = true;
                runs.push(ExperimentRun {
                    system: system.clone(),
                    run: Some(dir_name(&run_dir)),
                    clients: client_dirs(&run_dir)?,
                });
            }
        }
        if !found {
            tracing::warn!(system = %system, "no client data found, skipping");
        }
    }

    if runs.is_empty() {
        return Err(DesgloseError::InvalidLayout(format!(
            "no <system>/[<run>/]client/<client> directories under {}",
            input.display()
        )));
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TXNS: &str = "txn_id,coordinator,regions,partitions,generator,restarts,global_log_pos,sent_at,received_at\n\
1,0,0,0,0,0,,1000000,51000000\n\
2,1,0;1,0;1;2,0,1,,2000000,\n";

    const EVENTS: &str = "txn_id,event,time,machine,home\n\
1,ENTER_SERVER,1000000,0,0\n\
1,EXIT_SERVER_TO_CLIENT,51000000,0,0\n\
2,ENTER_SERVER,2000000,1,-1\n";

    #[test]
    fn test_parse_records_quotes() {
        let records = parse_records("a,\"b,c\",\"say \"\"hi\"\"\"\n1,2,3\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields, vec!["a", "b,c", "say \"hi\""]);
        assert_eq!(records[1].line, 2);
    }

    #[test]
    fn test_parse_records_multiline_field() {
        let records = parse_records("x,y\n\"one\ntwo\",3\nlast,4").unwrap();
        assert_eq!(records[1].fields[0], "one\ntwo");
        assert_eq!(records[1].line, 2);
        assert_eq!(records[2].line, 4);
    }

    #[test]
    fn test_parse_records_crlf_and_blank_lines() {
        let records = parse_records("a,b\r\n\r\n1,2\r\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].fields, vec!["1", "2"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(parse_records("a,b\n1,\"oops\n"), Err(2));
    }

    #[test]
    fn test_parse_transactions() {
        let txns = parse_transactions(Path::new("t.csv"), TXNS).unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].received_at, Some(51_000_000));
        assert_eq!(txns[1].partitions.len(), 3);
        assert_eq!(txns[1].regions.len(), 2);
        assert_eq!(txns[1].received_at, None);
        assert_eq!(txns[1].restarts, 1);
    }

    #[test]
    fn test_columns_found_by_name() {
        let shuffled = "sent_at,received_at,txn_id,regions,partitions,coordinator,generator,restarts\n\
5,15,9,0,0,0,0,0\n";
        let txns = parse_transactions(Path::new("t.csv"), shuffled).unwrap();
        assert_eq!(txns[0].txn_id, 9);
        assert_eq!(txns[0].duration_raw(), Some(10));
    }

    #[test]
    fn test_missing_column() {
        let err = parse_events(Path::new("e.csv"), "txn_id,event,machine,home\n1,X,0,0\n")
            .unwrap_err();
        assert!(matches!(err, DesgloseError::MissingColumn { ref column, .. } if column == "time"));
    }

    #[test]
    fn test_invalid_field_reports_line() {
        let bad = "txn_id,event,time,machine,home\n1,ENTER_SERVER,10,0,0\n1,EXIT_WORKER,soon,0,0\n";
        let err = parse_events(Path::new("e.csv"), bad).unwrap_err();
        match err {
            DesgloseError::InvalidField { line, column, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "time");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_marker_keeps_raw_text() {
        let events = parse_events(
            Path::new("e.csv"),
            "txn_id,event,time,machine,home\n3,ENTER_NOWHERE,1,0,0\n",
        )
        .unwrap();
        assert_eq!(events[0].kind, EventKind::Unknown);
        assert_eq!(events[0].raw, "ENTER_NOWHERE");
    }

    fn write_client(dir: &Path, txns: &str, events: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(TRANSACTIONS_FILE), txns).unwrap();
        fs::write(dir.join(EVENTS_FILE), events).unwrap();
    }

    #[test]
    fn test_discover_with_and_without_run_level() {
        let tmp = TempDir::new().unwrap();
        write_client(&tmp.path().join("slog/client/0"), TXNS, EVENTS);
        write_client(&tmp.path().join("calvin/hot_10/client/0"), TXNS, EVENTS);
        write_client(&tmp.path().join("calvin/hot_90/client/0"), TXNS, EVENTS);
        write_client(&tmp.path().join("slog.bak/client/0"), TXNS, EVENTS);
        write_client(&tmp.path().join("ddr_only/client/0"), TXNS, EVENTS);

        let exclude = Regex::new(r"\.|ddr_only").unwrap();
        let runs = discover(tmp.path(), Some(&exclude), &[]).unwrap();
        let keys: Vec<_> = runs
            .iter()
            .map(|r| (r.system.as_str(), r.run.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("calvin", Some("hot_10")),
                ("calvin", Some("hot_90")),
                ("slog", None)
            ]
        );

        let only = discover(tmp.path(), Some(&exclude), &["slog".to_string()]).unwrap();
        assert_eq!(only.len(), 1);
    }

    #[test]
    fn test_load_concatenates_clients_in_order() {
        let tmp = TempDir::new().unwrap();
        write_client(&tmp.path().join("detock/client/1"), TXNS, EVENTS);
        write_client(
            &tmp.path().join("detock/client/0"),
            "txn_id,coordinator,regions,partitions,generator,restarts,sent_at,received_at\n7,0,0,0,0,0,1,2\n",
            "txn_id,event,time,machine,home\n7,ENTER_SERVER,1,0,0\n1,EXIT_WORKER,40000000,0,0\n",
        );
        let runs = discover(tmp.path(), None, &[]).unwrap();
        let data = runs[0].load().unwrap();

        let ids: Vec<_> = data.transactions.iter().map(|t| t.txn_id).collect();
        assert_eq!(ids, vec![7, 1, 2]);
        // client 0's event for txn 1 comes before client 1's events
        let kinds: Vec<_> = data.events[&1].iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ExitWorker,
                EventKind::EnterServer,
                EventKind::ExitServerToClient
            ]
        );
    }

    #[test]
    fn test_discover_empty_input_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover(tmp.path(), None, &[]),
            Err(DesgloseError::InvalidLayout(_))
        ));
    }
}
