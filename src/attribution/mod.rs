// Latency attribution for transaction lifecycle traces
//
// Objective: charge every millisecond between two lifecycle markers to the
// component that held the transaction, using a transition table chosen by
// the system design.
//
// A bad trace never stops the pass. It yields a best-effort breakdown plus
// diagnostics describing what looked wrong.

mod attributor;
mod stage;
mod table;

pub use attributor::{attribute, Attribution};
pub use stage::{Stage, StageDurations};
pub use table::{Lookup, SpanTable, TransitionPolicy, TransitionRule, TransitionTable};

#[cfg(test)]
mod tests;
