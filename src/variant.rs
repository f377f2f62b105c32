//! Transaction-processing designs whose traces we know how to decompose
//!
//! The variant picks the transition table used by the attributor and the
//! locality overrides used by the classifier.

use crate::error::{DesgloseError, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Known system designs plus a table-driven fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemVariant {
    /// Deterministic, no sequencer and no home regions
    Janus,
    /// Global sequencing, no home regions
    Calvin,
    /// Home regions with a multi-home orderer
    Slog,
    /// Home regions with deadlock-resolving ordering
    Detock,
    /// Anything else, decomposed from the generic enter/exit map
    Generic,
}

impl SystemVariant {
    /// Resolve the variant from an experiment directory name
    ///
    /// Matching is case-insensitive; `ddr_ts` is a historical name for Detock.
    pub fn from_dir_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "janus" => SystemVariant::Janus,
            "calvin" => SystemVariant::Calvin,
            "slog" => SystemVariant::Slog,
            "detock" | "ddr_ts" => SystemVariant::Detock,
            _ => SystemVariant::Generic,
        }
    }

    /// Whether the design assigns transactions a home region
    ///
    /// Without homes every transaction is single-home and the multi-home
    /// class is not applicable.
    pub fn has_home(self) -> bool {
        !matches!(self, SystemVariant::Janus | SystemVariant::Calvin)
    }

    /// Whether the attributor closes every bucket itself, `Other` included
    pub fn attributes_other(self) -> bool {
        !matches!(self, SystemVariant::Generic)
    }

    /// Position in reports; the generic systems come last
    fn report_rank(self) -> u8 {
        match self {
            SystemVariant::Calvin => 0,
            SystemVariant::Slog => 1,
            SystemVariant::Detock => 2,
            SystemVariant::Janus => 3,
            SystemVariant::Generic => 4,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            SystemVariant::Janus => "janus",
            SystemVariant::Calvin => "calvin",
            SystemVariant::Slog => "slog",
            SystemVariant::Detock => "detock",
            SystemVariant::Generic => "generic",
        }
    }

    /// Name used in reports, falling back to the directory name for generic systems
    pub fn display_name(self, dir_name: &str) -> String {
        match self {
            SystemVariant::Janus => "Janus".to_string(),
            SystemVariant::Calvin => "Calvin".to_string(),
            SystemVariant::Slog => "SLOG".to_string(),
            SystemVariant::Detock => "Detock".to_string(),
            SystemVariant::Generic => dir_name.to_string(),
        }
    }
}

impl FromStr for SystemVariant {
    type Err = DesgloseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "janus" | "a" => Ok(SystemVariant::Janus),
            "calvin" | "b" => Ok(SystemVariant::Calvin),
            "slog" | "c" => Ok(SystemVariant::Slog),
            "detock" | "ddr_ts" | "d" => Ok(SystemVariant::Detock),
            "generic" => Ok(SystemVariant::Generic),
            _ => Err(DesgloseError::UnknownVariant(s.to_string())),
        }
    }
}

impl fmt::Display for SystemVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Report order for (variant, directory name) pairs
pub fn report_order(a: (SystemVariant, &str), b: (SystemVariant, &str)) -> Ordering {
    a.0.report_rank()
        .cmp(&b.0.report_rank())
        .then_with(|| a.1.cmp(b.1))
}
