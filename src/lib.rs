//! Desglose - latency breakdown for distributed transaction traces
//!
//! This library decomposes the end-to-end latency of every transaction
//! recorded by a geo-distributed database benchmark into pipeline stages
//! (server, forwarder, sequencer, orderers, log manager, scheduler, lock
//! manager, worker, idle, other), classifies transactions by locality and
//! aggregates per-class statistics across systems and runs.

pub mod aggregate;
pub mod attribution;
pub mod breakdown;
pub mod cli;
pub mod config;
pub mod csv_input;
pub mod csv_output;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod json_output;
pub mod locality;
pub mod pipeline;
pub mod report;
pub mod transactions;
pub mod variant;

pub use error::{DesgloseError, Result};
