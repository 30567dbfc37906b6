//! Core data model: star systems, lore connections and anomaly records.
//!
//! These are the strict, validated shapes. Loose input is converted into
//! them by [`crate::ingest`]; nothing downstream sees untyped data.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default category for systems that have none recorded.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// A point in galactic coordinates (light years, Sol-centric).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build a position only when all three components are present and finite.
    pub fn from_parts(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Option<Self> {
        match (x, y, z) {
            (Some(x), Some(y), Some(z)) if x.is_finite() && y.is_finite() && z.is_finite() => {
                Some(Self { x, y, z })
            }
            _ => None,
        }
    }

    pub fn sub(&self, other: &Position) -> Position {
        Position::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(&self, other: &Position) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Position) -> Position {
        Position::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Euclidean distance in light years.
    pub fn distance(&self, other: &Position) -> f64 {
        self.sub(other).length()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Position {
    fn from(v: [f64; 3]) -> Self {
        Position::new(v[0], v[1], v[2])
    }
}

/// A candidate star system.
///
/// `position` is `None` when the coordinates are unknown; a system is never
/// partially positioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub key: String,
    pub position: Option<Position>,
    /// Free-form classification, e.g. `permit_locked`, `lore_hub`, `ghost_ship`.
    pub category: String,
    pub region: Option<String>,
    pub faction: Option<String>,
    pub notes: Option<String>,
}

impl System {
    pub fn new(key: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            key: key.into(),
            position,
            category: UNKNOWN_CATEGORY.to_string(),
            region: None,
            faction: None,
            notes: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_faction(mut self, faction: impl Into<String>) -> Self {
        self.faction = Some(faction.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }
}

/// A textual reference linking one or more systems to hunt evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoreConnection {
    /// Source-text reference (file name, codex entry, ...).
    pub id: String,
    pub confidence: f64,
    /// Keys of the systems this connection mentions.
    pub systems: BTreeSet<String>,
}

impl LoreConnection {
    pub fn new<I, S>(id: impl Into<String>, confidence: f64, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            confidence,
            systems: systems.into_iter().map(Into::into).collect(),
        }
    }

    pub fn mentions(&self, key: &str) -> bool {
        self.systems.contains(key)
    }
}

/// A logged in-game anomaly tied to one system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Log-entry reference.
    pub id: String,
    pub system: String,
    pub kind: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl AnomalyRecord {
    pub fn new(id: impl Into<String>, system: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            system: system.into(),
            kind: kind.into(),
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_parts_requires_all_three() {
        assert_eq!(
            Position::from_parts(Some(1.0), Some(2.0), Some(3.0)),
            Some(Position::new(1.0, 2.0, 3.0))
        );
        assert_eq!(Position::from_parts(Some(1.0), None, Some(3.0)), None);
        assert_eq!(Position::from_parts(None, None, None), None);
    }

    #[test]
    fn test_position_rejects_non_finite() {
        assert_eq!(Position::from_parts(Some(f64::NAN), Some(0.0), Some(0.0)), None);
        assert_eq!(
            Position::from_parts(Some(0.0), Some(f64::INFINITY), Some(0.0)),
            None
        );
    }

    #[test]
    fn test_distance_pythagorean() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 12.0);
        assert!((a.distance(&b) - 13.0).abs() < 1e-12);
        assert!((b.distance(&a) - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_cross_product_orthogonal() {
        let x = Position::new(1.0, 0.0, 0.0);
        let y = Position::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Position::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_lore_connection_dedups_systems() {
        let conn = LoreConnection::new("toast", 1.0, ["Sol", "Sol", "Polaris"]);
        assert_eq!(conn.systems.len(), 2);
        assert!(conn.mentions("Polaris"));
        assert!(!conn.mentions("Raxxla"));
    }

    #[test]
    fn test_system_builder_defaults() {
        let s = System::new("Nefertem", None).with_category("ghost_ship");
        assert_eq!(s.category, "ghost_ship");
        assert!(!s.has_position());
        assert!(s.region.is_none());
    }
}
