//! Witch-space jump log.
//!
//! Jumps are accumulated in a JSONL file, one [`JumpEvent`] per line. A jump
//! flagged with any anomaly becomes anomaly evidence for both of its
//! endpoints via [`anomalies_from_jumps`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordKind;
use crate::ingest::{jsonl_records, Ingested};
use crate::records::AnomalyRecord;

/// A single witch-space jump and whatever was observed during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpEvent {
    pub timestamp_utc: DateTime<Utc>,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub origin_coords: Option<[f64; 3]>,
    #[serde(default)]
    pub destination_coords: Option<[f64; 3]>,
    #[serde(default)]
    pub cargo: Option<Vec<String>>,
    #[serde(default)]
    pub ship: Option<String>,
    #[serde(default)]
    pub fsd_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub anomaly_visual: bool,
    #[serde(default)]
    pub anomaly_audio: bool,
    #[serde(default)]
    pub anomaly_duration: bool,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

/// The three anomaly flags a jump can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Visual,
    Audio,
    Duration,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 3] = [AnomalyKind::Visual, AnomalyKind::Audio, AnomalyKind::Duration];

    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyKind::Visual => "visual",
            AnomalyKind::Audio => "audio",
            AnomalyKind::Duration => "duration",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JumpEvent {
    pub fn new(
        timestamp_utc: DateTime<Utc>,
        origin: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_utc,
            origin: origin.into(),
            destination: destination.into(),
            origin_coords: None,
            destination_coords: None,
            cargo: None,
            ship: None,
            fsd_type: None,
            notes: None,
            anomaly_visual: false,
            anomaly_audio: false,
            anomaly_duration: false,
            extra: None,
        }
    }

    pub fn has(&self, kind: AnomalyKind) -> bool {
        match kind {
            AnomalyKind::Visual => self.anomaly_visual,
            AnomalyKind::Audio => self.anomaly_audio,
            AnomalyKind::Duration => self.anomaly_duration,
        }
    }

    pub fn flag(&mut self, kind: AnomalyKind) {
        match kind {
            AnomalyKind::Visual => self.anomaly_visual = true,
            AnomalyKind::Audio => self.anomaly_audio = true,
            AnomalyKind::Duration => self.anomaly_duration = true,
        }
    }

    /// Flags set on this jump, in [`AnomalyKind::ALL`] order.
    pub fn anomaly_kinds(&self) -> Vec<AnomalyKind> {
        AnomalyKind::ALL
            .into_iter()
            .filter(|k| self.has(*k))
            .collect()
    }

    pub fn is_anomalous(&self) -> bool {
        self.anomaly_visual || self.anomaly_audio || self.anomaly_duration
    }

    /// Serialize as one JSONL line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Parse a jump log. Lines that do not decode are rejected individually.
pub fn parse_jump_log(text: &str) -> Ingested<JumpEvent> {
    jsonl_records::<JumpEvent>(text, RecordKind::JumpEvent)
        .map(|(_, r)| r)
        .collect()
}

/// Anomaly records for every flagged jump: one per flag per endpoint.
///
/// Ids are `"{timestamp}|{origin}->{destination}|{kind}"`, so re-reading
/// the same log never double counts. Blank endpoints are skipped.
pub fn anomalies_from_jumps(events: &[JumpEvent]) -> Vec<AnomalyRecord> {
    let mut out = Vec::new();
    for e in events.iter().filter(|e| e.is_anomalous()) {
        let stamp = e.timestamp_utc.to_rfc3339_opts(SecondsFormat::Secs, true);
        for kind in e.anomaly_kinds() {
            let id = format!("{}|{}->{}|{}", stamp, e.origin, e.destination, kind);
            for endpoint in [&e.origin, &e.destination] {
                if endpoint.trim().is_empty() {
                    continue;
                }
                out.push(AnomalyRecord {
                    id: id.clone(),
                    system: endpoint.trim().to_string(),
                    kind: kind.as_str().to_string(),
                    timestamp: Some(e.timestamp_utc),
                });
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct JumpSummary {
    pub total: usize,
    pub anomalous: usize,
    pub by_kind: BTreeMap<AnomalyKind, usize>,
}

pub fn summarize_jumps(events: &[JumpEvent]) -> JumpSummary {
    let mut summary = JumpSummary {
        total: events.len(),
        ..JumpSummary::default()
    };
    for e in events {
        if e.is_anomalous() {
            summary.anomalous += 1;
        }
        for kind in e.anomaly_kinds() {
            *summary.by_kind.entry(kind).or_insert(0) += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(3310, 4, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_jump_log_minimal_lines() {
        let text = concat!(
            r#"{"timestamp_utc": "3310-04-01T10:00:00Z", "origin": "Sol", "destination": "Polaris", "anomaly_audio": true}"#,
            "\n",
            "{broken\n",
            "\n",
            r#"{"timestamp_utc": "3310-04-01T11:00:00Z", "origin": "Polaris", "destination": "HIP 22460"}"#,
            "\n",
        );
        let log = parse_jump_log(text);
        assert_eq!(log.accepted.len(), 2);
        assert_eq!(log.rejected.len(), 1);
        assert_eq!(log.rejected[0].index, 1);
        assert!(log.accepted[0].anomaly_audio);
        assert!(!log.accepted[1].is_anomalous());
    }

    #[test]
    fn test_json_line_roundtrip_is_single_line() {
        let mut e = JumpEvent::new(ts(10), "Sol", "Nefertem");
        e.cargo = Some(vec!["Guardian Relic".into()]);
        e.flag(AnomalyKind::Visual);
        let line = e.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        let parsed = parse_jump_log(&line);
        assert_eq!(parsed.accepted, vec![e]);
    }

    #[test]
    fn test_anomalies_from_jumps() {
        let mut flagged = JumpEvent::new(ts(10), "Sol", "Polaris");
        flagged.flag(AnomalyKind::Visual);
        flagged.flag(AnomalyKind::Duration);
        let quiet = JumpEvent::new(ts(11), "Polaris", "Sol");

        let records = anomalies_from_jumps(&[flagged, quiet]);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].system, "Sol");
        assert_eq!(records[1].system, "Polaris");
        assert_eq!(records[0].id, records[1].id);
        assert_eq!(records[0].kind, "visual");
        assert_eq!(records[2].kind, "duration");
        assert_eq!(records[0].id, "3310-04-01T10:00:00Z|Sol->Polaris|visual");
    }

    #[test]
    fn test_blank_endpoint_skipped() {
        let mut e = JumpEvent::new(ts(10), "", "Polaris");
        e.flag(AnomalyKind::Audio);
        let records = anomalies_from_jumps(&[e]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].system, "Polaris");
    }

    #[test]
    fn test_summarize_jumps() {
        let mut a = JumpEvent::new(ts(1), "Sol", "Polaris");
        a.flag(AnomalyKind::Audio);
        a.flag(AnomalyKind::Visual);
        let mut b = JumpEvent::new(ts(2), "Polaris", "Sol");
        b.flag(AnomalyKind::Audio);
        let c = JumpEvent::new(ts(3), "Sol", "LFT 509");

        let s = summarize_jumps(&[a, b, c]);
        assert_eq!(s.total, 3);
        assert_eq!(s.anomalous, 2);
        assert_eq!(s.by_kind.get(&AnomalyKind::Audio), Some(&2));
        assert_eq!(s.by_kind.get(&AnomalyKind::Visual), Some(&1));
        assert_eq!(s.by_kind.get(&AnomalyKind::Duration), None);
    }
}
