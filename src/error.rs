//! Hard failures at the tabular boundary
//!
//! Everything past input loading degrades to diagnostics instead of
//! failing; only malformed inputs, layouts and configuration end up here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the caller of the breakdown pipeline
#[derive(Error, Debug)]
pub enum DesgloseError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}:{line}: invalid value '{value}' for column '{column}'")]
    InvalidField {
        path: PathBuf,
        line: usize,
        column: String,
        value: String,
    },

    #[error("{path}:{line}: unterminated quoted field")]
    UnterminatedQuote { path: PathBuf, line: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid experiment layout: {0}")]
    InvalidLayout(String),

    #[error("Unknown system variant: {0}")]
    UnknownVariant(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DesgloseError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for breakdown operations
pub type Result<T> = std::result::Result<T, DesgloseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_field_message_carries_location() {
        let err = DesgloseError::InvalidField {
            path: PathBuf::from("client/0/transactions.csv"),
            line: 7,
            column: "sent_at".to_string(),
            value: "abc".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("transactions.csv:7"));
        assert!(msg.contains("sent_at"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn test_io_helper() {
        let err = DesgloseError::io(
            "missing.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.csv"));
    }
}
