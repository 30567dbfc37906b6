//! Ranked result export.
//!
//! Scores are rounded to a fixed number of decimal places so identical
//! inputs produce byte-identical output. Records keep rank order.

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::features::FeatureVector;
use crate::scoring::ScoredSystem;

/// Decimal places kept for exported scores.
pub const DEFAULT_PRECISION: u32 = 4;

/// One exported result: key, rounded score, rank and the raw features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub system: String,
    pub score: f64,
    pub rank: usize,
    pub features: FeatureVector,
}

/// Flat CSV row; the `csv` writer does not nest structs.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    rank: usize,
    system: &'a str,
    score: f64,
    geometric_deviation: f64,
    lore_connections: u32,
    anomalies: u32,
}

/// Round `value` to `places` decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // Avoid emitting "-0.0".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn export_records(ranked: &[ScoredSystem], precision: u32) -> Vec<ExportRecord> {
    ranked
        .iter()
        .map(|s| ExportRecord {
            system: s.key.clone(),
            score: round_to(s.score, precision),
            rank: s.rank,
            features: s.features,
        })
        .collect()
}

/// Pretty-printed JSON array of [`ExportRecord`]s, in rank order.
pub fn to_json(ranked: &[ScoredSystem], precision: u32) -> Result<String, ExportError> {
    let records = export_records(ranked, precision);
    Ok(serde_json::to_string_pretty(&records)?)
}

/// CSV table `rank,system,score,geometric_deviation,lore_connections,anomalies`.
pub fn to_csv(ranked: &[ScoredSystem], precision: u32) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for s in ranked {
        writer.serialize(CsvRow {
            rank: s.rank,
            system: &s.key,
            score: round_to(s.score, precision),
            geometric_deviation: s.features.geometric_deviation,
            lore_connections: s.features.lore_connections,
            anomalies: s.features.anomalies,
        })?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::NormalizedFeatures;

    fn scored(key: &str, score: f64, rank: usize) -> ScoredSystem {
        ScoredSystem {
            key: key.to_string(),
            features: FeatureVector {
                geometric_deviation: 12.5,
                lore_connections: 2,
                anomalies: 1,
            },
            normalized: NormalizedFeatures::default(),
            score,
            rank,
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(0.7000000000000001, 4), 0.7);
        assert_eq!(round_to(2.0 / 3.0, 2), 0.67);
        assert_eq!(round_to(-0.00001, 4), 0.0);
        assert!(round_to(-0.00001, 4).is_sign_positive());
    }

    #[test]
    fn test_json_preserves_rank_order() {
        let ranked = vec![scored("Zeta", 0.9, 1), scored("Alpha", 0.1, 2)];
        let json = to_json(&ranked, DEFAULT_PRECISION).unwrap();
        let parsed: Vec<ExportRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].system, "Zeta");
        assert_eq!(parsed[1].system, "Alpha");
        assert_eq!(parsed[0].features.lore_connections, 2);
        assert!(json.find("Zeta").unwrap() < json.find("Alpha").unwrap());
    }

    #[test]
    fn test_json_rounds_scores() {
        let json = to_json(&[scored("C", 0.7000000000000001, 1)], 4).unwrap();
        assert!(json.contains("\"score\": 0.7"));
        assert!(!json.contains("0.7000000000000001"));
    }

    #[test]
    fn test_csv_layout() {
        let csv = to_csv(&[scored("Sol", 0.56789, 1)], 3).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("rank,system,score,geometric_deviation,lore_connections,anomalies")
        );
        assert_eq!(lines.next(), Some("1,Sol,0.568,12.5,2,1"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_ranking_exports_empty_array() {
        assert_eq!(to_json(&[], DEFAULT_PRECISION).unwrap(), "[]");
    }
}
