//! Full scoring run: snapshot → features → ranking.
//!
//! A run is a pure function of its [`Snapshot`] and [`PipelineConfig`];
//! it holds no state between calls.

use serde::{Deserialize, Serialize};

use crate::error::{MalformedRecordError, ScoringError};
use crate::features::{extract_features, GeometryReference};
use crate::ingest::Ingested;
use crate::jumps::{anomalies_from_jumps, JumpEvent};
use crate::records::{AnomalyRecord, LoreConnection, System};
use crate::scoring::{score_systems, ScoredSystem, Weights};

/// Everything one run reads, already ingested.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub systems: Ingested<System>,
    pub lore: Ingested<LoreConnection>,
    pub anomalies: Ingested<AnomalyRecord>,
    pub jumps: Ingested<JumpEvent>,
}

impl Snapshot {
    /// Snapshot of records that are already valid.
    pub fn from_records(
        systems: Vec<System>,
        lore: Vec<LoreConnection>,
        anomalies: Vec<AnomalyRecord>,
    ) -> Self {
        Self {
            systems: Ingested::from_accepted(systems),
            lore: Ingested::from_accepted(lore),
            anomalies: Ingested::from_accepted(anomalies),
            jumps: Ingested::default(),
        }
    }

    /// Every record rejected at ingestion, across all streams.
    pub fn rejected(&self) -> impl Iterator<Item = &MalformedRecordError> {
        self.systems
            .rejected
            .iter()
            .chain(&self.lore.rejected)
            .chain(&self.anomalies.rejected)
            .chain(&self.jumps.rejected)
    }
}

/// Immutable settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub weights: Weights,
    pub reference: GeometryReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// One entry per accepted system, rank order.
    pub ranking: Vec<ScoredSystem>,
    /// Records rejected at ingestion; not part of the ranking.
    pub rejected: Vec<MalformedRecordError>,
    /// Anomaly records derived from flagged jumps.
    pub derived_anomalies: usize,
}

/// Score every accepted system in the snapshot.
///
/// Jump-log anomalies are merged with the anomaly log before extraction.
/// Fails without partial output on invalid weights or when no system was
/// accepted.
pub fn run_pipeline(
    snapshot: &Snapshot,
    config: &PipelineConfig,
) -> Result<PipelineOutput, ScoringError> {
    config.weights.validate()?;

    let derived = anomalies_from_jumps(&snapshot.jumps.accepted);
    let derived_anomalies = derived.len();
    let mut anomalies = snapshot.anomalies.accepted.clone();
    anomalies.extend(derived);

    let features = extract_features(
        &snapshot.systems.accepted,
        &snapshot.lore.accepted,
        &anomalies,
        config.reference,
    );
    let ranking = score_systems(&features, &config.weights)?;

    let rejected: Vec<_> = snapshot.rejected().cloned().collect();
    tracing::info!(
        scored = ranking.len(),
        rejected = rejected.len(),
        derived_anomalies,
        "pipeline run complete"
    );

    Ok(PipelineOutput {
        ranking,
        rejected,
        derived_anomalies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MalformedRecordError, RecordKind};
    use crate::jumps::AnomalyKind;
    use crate::records::Position;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_rejected_records_reported_not_scored() {
        let mut snapshot = Snapshot::from_records(
            vec![
                System::new("Sol", Some(Position::ORIGIN)),
                System::new("Polaris", Some(Position::new(10.0, 0.0, 0.0))),
            ],
            vec![],
            vec![],
        );
        snapshot
            .lore
            .rejected
            .push(MalformedRecordError::new(RecordKind::LoreConnection, 0, "missing id"));

        let out = run_pipeline(&snapshot, &PipelineConfig::default()).unwrap();
        assert_eq!(out.ranking.len(), 2);
        assert_eq!(out.rejected.len(), 1);
    }

    #[test]
    fn test_jump_anomalies_count() {
        let mut jump = JumpEvent::new(
            Utc.with_ymd_and_hms(3310, 1, 1, 0, 0, 0).unwrap(),
            "Sol",
            "Polaris",
        );
        jump.flag(AnomalyKind::Audio);

        let mut snapshot = Snapshot::from_records(
            vec![
                System::new("Sol", None),
                System::new("Polaris", None),
                System::new("Nefertem", None),
            ],
            vec![],
            vec![AnomalyRecord::new("log-1", "Polaris", "visual")],
        );
        snapshot.jumps = Ingested::from_accepted(vec![jump]);

        let out = run_pipeline(&snapshot, &PipelineConfig::default()).unwrap();
        assert_eq!(out.derived_anomalies, 2);
        assert_eq!(out.ranking[0].key, "Polaris");
        assert_eq!(out.ranking[0].features.anomalies, 2);
        assert_eq!(out.ranking[1].key, "Sol");
        assert_eq!(out.ranking[2].key, "Nefertem");
    }

    #[test]
    fn test_no_accepted_systems_is_empty_input() {
        let snapshot = Snapshot::default();
        assert_eq!(
            run_pipeline(&snapshot, &PipelineConfig::default()),
            Err(ScoringError::EmptyInput)
        );
    }

    #[test]
    fn test_invalid_weight_fails_whole_run() {
        let snapshot = Snapshot::from_records(vec![System::new("Sol", None)], vec![], vec![]);
        let config = PipelineConfig {
            weights: Weights::new(1.0, 1.0, -1.0),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            run_pipeline(&snapshot, &config),
            Err(ScoringError::InvalidWeight { name: "anomaly", .. })
        ));
    }
}
