//! Error types for the scoring pipeline.
//!
//! One enum per concern, `thiserror` only. Fatal errors (`ScoringError`)
//! abort a run with no partial output; `MalformedRecordError` is per-record
//! and is collected alongside the records that were accepted.

use std::fmt;

use serde::Serialize;

/// Errors that abort a scoring run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    /// A weight was negative or not a finite number.
    #[error("invalid {name} weight {value}: weights must be finite and non-negative")]
    InvalidWeight { name: &'static str, value: f64 },

    /// No systems were supplied.
    #[error("no systems to score")]
    EmptyInput,
}

/// Which input stream a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    System,
    LoreConnection,
    Anomaly,
    JumpEvent,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::System => "system",
            RecordKind::LoreConnection => "lore connection",
            RecordKind::Anomaly => "anomaly",
            RecordKind::JumpEvent => "jump event",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single input record that could not be turned into a strict record.
///
/// `index` is the zero-based position of the record in its source
/// (data row for CSV, line for JSONL, element for JSON arrays).
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("malformed {kind} record #{index}: {reason}")]
pub struct MalformedRecordError {
    pub kind: RecordKind,
    pub index: usize,
    pub reason: String,
}

impl MalformedRecordError {
    pub fn new(kind: RecordKind, index: usize, reason: impl Into<String>) -> Self {
        Self {
            kind,
            index,
            reason: reason.into(),
        }
    }
}

/// Whole-document failures while reading an input stream.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CSV document: {0}")]
    Csv(#[from] csv::Error),
}

/// Geometry queries that need a named center system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("center system '{0}' not found")]
    CenterNotFound(String),

    #[error("center system '{0}' has no coordinates")]
    CenterWithoutPosition(String),
}

/// Serialization failures while exporting results.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_message() {
        let err = MalformedRecordError::new(RecordKind::LoreConnection, 3, "missing id");
        assert_eq!(
            err.to_string(),
            "malformed lore connection record #3: missing id"
        );
    }

    #[test]
    fn test_invalid_weight_message_names_weight() {
        let err = ScoringError::InvalidWeight {
            name: "lore",
            value: -0.5,
        };
        assert!(err.to_string().contains("lore"));
        assert!(err.to_string().contains("-0.5"));
    }
}
