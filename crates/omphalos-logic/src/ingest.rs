//! Ingestion boundary: loosely structured input → strict records.
//!
//! Input files are hand-edited CSV and JSON, so every record is validated
//! here once. A record missing its identity field is rejected with a
//! [`MalformedRecordError`] and reported; the rest of the batch continues.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, MalformedRecordError, RecordKind};
use crate::records::{AnomalyRecord, LoreConnection, Position, System, UNKNOWN_CATEGORY};

/// Confidence assigned to lore connections that do not state one.
pub const DEFAULT_LORE_CONFIDENCE: f64 = 1.0;

/// Kind assigned to anomaly records that do not state one.
pub const UNKNOWN_ANOMALY_KIND: &str = "unknown";

/// Records accepted from one input stream plus the ones that were rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<MalformedRecordError>,
}

impl<T> Default for Ingested<T> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Ingested<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap records that are already known to be valid.
    pub fn from_accepted(accepted: Vec<T>) -> Self {
        Self {
            accepted,
            rejected: Vec::new(),
        }
    }

    pub fn push(&mut self, record: Result<T, MalformedRecordError>) {
        match record {
            Ok(r) => self.accepted.push(r),
            Err(e) => {
                tracing::warn!(
                    kind = %e.kind,
                    index = e.index,
                    reason = %e.reason,
                    "rejected malformed record"
                );
                self.rejected.push(e);
            }
        }
    }

    /// True when nothing was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Number of records seen, accepted or not.
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }
}

impl<T> FromIterator<Result<T, MalformedRecordError>> for Ingested<T> {
    fn from_iter<I: IntoIterator<Item = Result<T, MalformedRecordError>>>(iter: I) -> Self {
        let mut out = Ingested::new();
        for r in iter {
            out.push(r);
        }
        out
    }
}

// ── Raw shapes ─────────────────────────────────────────────────────────

/// One row of the coordinate store, exactly as read.
///
/// Unparseable coordinates read as absent rather than failing the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSystemRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub z: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub faction: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLoreConnection {
    #[serde(default, alias = "source")]
    pub id: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub systems: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawAnomaly {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// ── Validation ─────────────────────────────────────────────────────────

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_system(index: usize, raw: RawSystemRow) -> Result<System, MalformedRecordError> {
    let key = clean(raw.name)
        .ok_or_else(|| MalformedRecordError::new(RecordKind::System, index, "missing name"))?;

    let position = Position::from_parts(raw.x, raw.y, raw.z);
    let any_coord = raw.x.is_some() || raw.y.is_some() || raw.z.is_some();
    if position.is_none() && any_coord {
        tracing::warn!(
            system = %key,
            "incomplete or non-finite coordinates, treating position as unknown"
        );
    }

    Ok(System {
        key,
        position,
        category: clean(raw.category).unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
        region: clean(raw.region),
        faction: clean(raw.faction),
        notes: clean(raw.notes),
    })
}

/// Validate coordinate store rows. Keys must be unique; a row repeating an
/// earlier key is rejected.
pub fn ingest_systems<I>(rows: I) -> Ingested<System>
where
    I: IntoIterator<Item = RawSystemRow>,
{
    ingest_indexed_systems(rows.into_iter().enumerate().map(|(i, row)| (i, Ok(row))))
}

/// Same as [`ingest_systems`] for rows that may already have failed to
/// decode, each tagged with its source index.
pub(crate) fn ingest_indexed_systems<I>(rows: I) -> Ingested<System>
where
    I: IntoIterator<Item = (usize, Result<RawSystemRow, MalformedRecordError>)>,
{
    let mut seen = HashSet::new();
    rows.into_iter()
        .map(|(index, row)| {
            let system = validate_system(index, row?)?;
            if !seen.insert(system.key.clone()) {
                return Err(MalformedRecordError::new(
                    RecordKind::System,
                    index,
                    format!("duplicate system key '{}'", system.key),
                ));
            }
            Ok(system)
        })
        .collect()
}

fn validate_lore(
    index: usize,
    raw: RawLoreConnection,
) -> Result<LoreConnection, MalformedRecordError> {
    let id = clean(raw.id)
        .ok_or_else(|| MalformedRecordError::new(RecordKind::LoreConnection, index, "missing id"))?;

    let confidence = match raw.confidence {
        None => DEFAULT_LORE_CONFIDENCE,
        Some(c) if c.is_finite() && c >= 0.0 => c,
        Some(c) => {
            tracing::warn!(lore = %id, confidence = c, "invalid confidence, using default");
            DEFAULT_LORE_CONFIDENCE
        }
    };

    let systems = raw
        .systems
        .into_iter()
        .filter_map(|s| clean(Some(s)))
        .collect();

    Ok(LoreConnection {
        id,
        confidence,
        systems,
    })
}

pub fn ingest_lore<I>(raw: I) -> Ingested<LoreConnection>
where
    I: IntoIterator<Item = RawLoreConnection>,
{
    raw.into_iter()
        .enumerate()
        .map(|(index, r)| validate_lore(index, r))
        .collect()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(timestamp = value, error = %e, "ignoring unparseable timestamp");
            None
        }
    }
}

fn validate_anomaly(index: usize, raw: RawAnomaly) -> Result<AnomalyRecord, MalformedRecordError> {
    let id = clean(raw.id)
        .ok_or_else(|| MalformedRecordError::new(RecordKind::Anomaly, index, "missing id"))?;
    let system = clean(raw.system).ok_or_else(|| {
        MalformedRecordError::new(RecordKind::Anomaly, index, "missing system key")
    })?;

    Ok(AnomalyRecord {
        id,
        system,
        kind: clean(raw.kind).unwrap_or_else(|| UNKNOWN_ANOMALY_KIND.to_string()),
        timestamp: clean(raw.timestamp).and_then(|t| parse_timestamp(&t)),
    })
}

pub fn ingest_anomalies<I>(raw: I) -> Ingested<AnomalyRecord>
where
    I: IntoIterator<Item = RawAnomaly>,
{
    raw.into_iter()
        .enumerate()
        .map(|(index, r)| validate_anomaly(index, r))
        .collect()
}

// ── Document parsing ───────────────────────────────────────────────────

/// Decode each non-blank line of a JSONL document. The index is the
/// zero-based line number.
pub(crate) fn jsonl_records<T: DeserializeOwned>(
    text: &str,
    kind: RecordKind,
) -> impl Iterator<Item = (usize, Result<T, MalformedRecordError>)> + '_ {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(move |(index, line)| {
            let decoded = serde_json::from_str::<T>(line)
                .map_err(|e| MalformedRecordError::new(kind, index, e.to_string()));
            (index, decoded)
        })
}

/// Parse a lore index: a JSON array of `{id, confidence?, systems[]}`.
///
/// A document that is not a JSON array fails as a whole; individual
/// elements of the wrong shape are rejected one by one.
pub fn parse_lore_json(text: &str) -> Result<Ingested<LoreConnection>, IngestError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
    let mut out = Ingested::new();
    for (index, value) in values.into_iter().enumerate() {
        let record = serde_json::from_value::<RawLoreConnection>(value)
            .map_err(|e| MalformedRecordError::new(RecordKind::LoreConnection, index, e.to_string()))
            .and_then(|raw| validate_lore(index, raw));
        out.push(record);
    }
    Ok(out)
}

/// Parse an anomaly log: one `{id, system, type?, timestamp?}` per line.
pub fn parse_anomaly_jsonl(text: &str) -> Ingested<AnomalyRecord> {
    jsonl_records::<RawAnomaly>(text, RecordKind::Anomaly)
        .map(|(index, raw)| raw.and_then(|r| validate_anomaly(index, r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, x: Option<f64>, y: Option<f64>, z: Option<f64>) -> RawSystemRow {
        RawSystemRow {
            name: Some(name.to_string()),
            x,
            y,
            z,
            ..RawSystemRow::default()
        }
    }

    #[test]
    fn test_missing_name_rejected_rest_kept() {
        let rows = vec![
            row("Sol", Some(0.0), Some(0.0), Some(0.0)),
            row("   ", Some(1.0), Some(1.0), Some(1.0)),
            row("Polaris", None, None, None),
        ];
        let out = ingest_systems(rows);
        assert_eq!(out.accepted.len(), 2);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].index, 1);
        assert_eq!(out.rejected[0].kind, RecordKind::System);
        assert_eq!(out.total(), 3);
    }

    #[test]
    fn test_partial_position_becomes_unknown() {
        let out = ingest_systems(vec![row("LFT 509", Some(1.0), None, Some(2.0))]);
        assert!(out.is_clean());
        assert_eq!(out.accepted[0].position, None);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let out = ingest_systems(vec![
            row("Sol", Some(0.0), Some(0.0), Some(0.0)),
            row("Sol", Some(5.0), Some(5.0), Some(5.0)),
        ]);
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.accepted[0].position, Some(Position::ORIGIN));
        assert!(out.rejected[0].reason.contains("duplicate"));
    }

    #[test]
    fn test_system_fields_trimmed_and_defaulted() {
        let out = ingest_systems(vec![RawSystemRow {
            name: Some("  Nefertem ".into()),
            category: Some("".into()),
            notes: Some(" Thetis ".into()),
            ..RawSystemRow::default()
        }]);
        let s = &out.accepted[0];
        assert_eq!(s.key, "Nefertem");
        assert_eq!(s.category, UNKNOWN_CATEGORY);
        assert_eq!(s.notes.as_deref(), Some("Thetis"));
    }

    #[test]
    fn test_parse_lore_json_mixed() {
        let text = r#"[
            {"id": "toast", "confidence": 0.8, "systems": ["Shinrarta Dezhra", "Sol"]},
            {"systems": ["Sol"]},
            {"source": "codex", "systems": ["Polaris", " ", "Polaris"]},
            {"id": "bad", "systems": "Sol"}
        ]"#;
        let out = parse_lore_json(text).unwrap();
        assert_eq!(out.accepted.len(), 2);
        assert_eq!(out.rejected.len(), 2);
        assert_eq!(out.rejected[0].index, 1);
        assert_eq!(out.rejected[1].index, 3);

        let codex = &out.accepted[1];
        assert_eq!(codex.id, "codex");
        assert_eq!(codex.confidence, DEFAULT_LORE_CONFIDENCE);
        assert_eq!(codex.systems.len(), 1);
    }

    #[test]
    fn test_parse_lore_json_not_array_is_fatal() {
        assert!(parse_lore_json(r#"{"id": "x"}"#).is_err());
    }

    #[test]
    fn test_negative_confidence_defaults() {
        let out = ingest_lore(vec![RawLoreConnection {
            id: Some("x".into()),
            confidence: Some(-2.0),
            systems: vec![],
        }]);
        assert_eq!(out.accepted[0].confidence, DEFAULT_LORE_CONFIDENCE);
    }

    #[test]
    fn test_parse_anomaly_jsonl() {
        let text = concat!(
            r#"{"id": "a1", "system": "Sol", "type": "visual", "timestamp": "3305-01-05T12:00:00Z"}"#,
            "\n\n",
            r#"{"id": "a2", "type": "audio"}"#,
            "\n",
            "not json\n",
            r#"{"id": "a3", "system": "Polaris", "timestamp": "yesterday"}"#,
            "\n",
        );
        let out = parse_anomaly_jsonl(text);
        assert_eq!(out.accepted.len(), 2);
        assert_eq!(out.rejected.len(), 2);
        assert_eq!(out.rejected[0].index, 2);
        assert!(out.rejected[0].reason.contains("system"));
        assert_eq!(out.rejected[1].index, 3);

        assert_eq!(out.accepted[0].kind, "visual");
        assert!(out.accepted[0].timestamp.is_some());
        assert_eq!(out.accepted[1].kind, UNKNOWN_ANOMALY_KIND);
        assert!(out.accepted[1].timestamp.is_none());
    }
}
