#![no_main]

use desglose::csv_input::{parse_events, parse_records, parse_transactions};
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed tables must surface as errors, never panics
        let _ = parse_records(input);
        let _ = parse_transactions(Path::new("transactions.csv"), input);
        let _ = parse_events(Path::new("txn_events.csv"), input);
    }
});
