//! Per-system feature extraction.
//!
//! Turns the coordinate store, lore index and anomaly log into one
//! [`FeatureVector`] per system. Every input system yields exactly one
//! vector, in input order; nothing is dropped.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::geometry::centroid;
use crate::records::{AnomalyRecord, LoreConnection, Position, System};

/// Geometric deviation assigned to systems whose position is unknown.
///
/// Zero places them at the reference point, so after min-max normalization
/// they never outrank a positioned system on geometry alone.
pub const UNKNOWN_POSITION_DEVIATION: f64 = 0.0;

/// Point that geometric deviation is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryReference {
    /// Centroid of all systems in the batch with a known position.
    #[default]
    Centroid,
    /// A fixed point, e.g. Sol at the origin.
    Point(Position),
}

/// Raw (un-normalized) features for one system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Distance (ly) from the reference point.
    pub geometric_deviation: f64,
    /// Unique lore connections mentioning the system.
    pub lore_connections: u32,
    /// Unique anomaly records logged for the system.
    pub anomalies: u32,
}

/// Features for one system, keyed by the system's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemFeatures {
    pub key: String,
    pub features: FeatureVector,
    /// False when the deviation is the [`UNKNOWN_POSITION_DEVIATION`] sentinel.
    pub position_known: bool,
}

/// Resolve the reference point for a batch. `None` only when the reference
/// is the centroid and no system has a position.
pub fn reference_point(systems: &[System], reference: GeometryReference) -> Option<Position> {
    match reference {
        GeometryReference::Point(p) => Some(p),
        GeometryReference::Centroid => centroid(systems.iter().filter_map(|s| s.position.as_ref())),
    }
}

/// Count unique record ids per system key, ignoring unknown systems.
fn unique_ids_per_system<'a, I>(links: I, known: &HashSet<&str>) -> HashMap<&'a str, usize>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut ids: HashMap<&'a str, HashSet<&'a str>> = HashMap::new();
    for (system, id) in links {
        if !known.contains(system) {
            tracing::debug!(system, id, "reference to unknown system ignored");
            continue;
        }
        ids.entry(system).or_default().insert(id);
    }
    ids.into_iter().map(|(k, v)| (k, v.len())).collect()
}

/// Derive one feature vector per system.
///
/// Lore and anomaly counts are per unique identifier: a record repeated in
/// the source is counted once.
pub fn extract_features(
    systems: &[System],
    lore: &[LoreConnection],
    anomalies: &[AnomalyRecord],
    reference: GeometryReference,
) -> Vec<SystemFeatures> {
    let known: HashSet<&str> = systems.iter().map(|s| s.key.as_str()).collect();
    let origin = reference_point(systems, reference);

    let lore_counts = unique_ids_per_system(
        lore.iter()
            .flat_map(|c| c.systems.iter().map(move |s| (s.as_str(), c.id.as_str()))),
        &known,
    );
    let anomaly_counts = unique_ids_per_system(
        anomalies.iter().map(|a| (a.system.as_str(), a.id.as_str())),
        &known,
    );

    systems
        .iter()
        .map(|s| {
            let deviation = match (s.position, origin) {
                (Some(p), Some(o)) => Some(p.distance(&o)),
                _ => None,
            };
            let deviation = deviation.filter(|d| {
                if !d.is_finite() {
                    tracing::warn!(system = %s.key, "deviation overflowed, treating position as unknown");
                }
                d.is_finite()
            });
            let key = s.key.as_str();
            SystemFeatures {
                key: s.key.clone(),
                features: FeatureVector {
                    geometric_deviation: deviation.unwrap_or(UNKNOWN_POSITION_DEVIATION),
                    lore_connections: lore_counts.get(key).copied().unwrap_or(0) as u32,
                    anomalies: anomaly_counts.get(key).copied().unwrap_or(0) as u32,
                },
                position_known: deviation.is_some(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sys(key: &str, pos: Option<(f64, f64, f64)>) -> System {
        System::new(key, pos.map(|(x, y, z)| Position::new(x, y, z)))
    }

    #[test]
    fn test_one_vector_per_system_in_order() {
        let systems = vec![
            sys("B", Some((1.0, 0.0, 0.0))),
            sys("A", None),
            sys("C", Some((-1.0, 0.0, 0.0))),
        ];
        let f = extract_features(&systems, &[], &[], GeometryReference::Centroid);
        let keys: Vec<_> = f.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_deviation_from_centroid() {
        let systems = vec![
            sys("A", Some((0.0, 0.0, 0.0))),
            sys("B", Some((10.0, 0.0, 0.0))),
        ];
        let f = extract_features(&systems, &[], &[], GeometryReference::Centroid);
        assert!((f[0].features.geometric_deviation - 5.0).abs() < 1e-12);
        assert!((f[1].features.geometric_deviation - 5.0).abs() < 1e-12);
        assert!(f.iter().all(|f| f.position_known));
    }

    #[test]
    fn test_deviation_from_fixed_point() {
        let systems = vec![sys("A", Some((3.0, 4.0, 0.0)))];
        let f = extract_features(
            &systems,
            &[],
            &[],
            GeometryReference::Point(Position::ORIGIN),
        );
        assert!((f[0].features.geometric_deviation - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_position_gets_sentinel() {
        let systems = vec![sys("A", Some((3.0, 4.0, 0.0))), sys("B", None)];
        let f = extract_features(&systems, &[], &[], GeometryReference::Centroid);
        assert_eq!(f[1].features.geometric_deviation, UNKNOWN_POSITION_DEVIATION);
        assert!(!f[1].position_known);
    }

    #[test]
    fn test_overflowing_deviation_gets_sentinel() {
        let systems = vec![
            sys("A", Some((1e200, 0.0, 0.0))),
            sys("B", Some((-1e200, 0.0, 0.0))),
            sys("C", Some((0.0, 0.0, 0.0))),
        ];
        let f = extract_features(&systems, &[], &[], GeometryReference::Centroid);
        assert!(f.iter().all(|f| f.features.geometric_deviation.is_finite()));
        assert_eq!(f[0].features.geometric_deviation, UNKNOWN_POSITION_DEVIATION);
        assert!(!f[0].position_known);
        assert!(!f[1].position_known);
        assert!(f[2].position_known);
    }

    #[test]
    fn test_no_positions_at_all() {
        let systems = vec![sys("A", None), sys("B", None)];
        let f = extract_features(&systems, &[], &[], GeometryReference::Centroid);
        assert_eq!(f.len(), 2);
        assert!(f.iter().all(|f| !f.position_known));
    }

    #[test]
    fn test_counts_unique_ids() {
        let systems = vec![sys("Sol", None), sys("Polaris", None)];
        let lore = vec![
            LoreConnection::new("toast", 1.0, ["Sol", "Polaris"]),
            LoreConnection::new("toast", 1.0, ["Sol"]),
            LoreConnection::new("codex", 0.5, ["Sol", "Raxxla"]),
        ];
        let anomalies = vec![
            AnomalyRecord::new("j1", "Polaris", "visual"),
            AnomalyRecord::new("j1", "Polaris", "visual"),
            AnomalyRecord::new("j2", "Polaris", "audio"),
            AnomalyRecord::new("j3", "Nowhere", "audio"),
        ];
        let f = extract_features(&systems, &lore, &anomalies, GeometryReference::Centroid);
        assert_eq!(f[0].features.lore_connections, 2);
        assert_eq!(f[0].features.anomalies, 0);
        assert_eq!(f[1].features.lore_connections, 1);
        assert_eq!(f[1].features.anomalies, 2);
    }
}
