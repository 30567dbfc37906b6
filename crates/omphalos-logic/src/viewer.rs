//! Node/link document consumed by the browser-side 3D point cloud.
//!
//! Nodes carry every system (positioned or not, with `null` coordinates for
//! unknown ones). Links join each positioned system to its nearest
//! neighbours. When a ranking is supplied, nodes also carry their RLI score
//! and rank.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::export::round_to;
use crate::geometry::knn_links;
use crate::records::System;
use crate::scoring::ScoredSystem;

pub const VIEWER_DESCRIPTION: &str = "Hunt visualization export";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerNode {
    pub id: String,
    pub name: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub category: String,
    pub region: Option<String>,
    pub faction: Option<String>,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rli: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerLink {
    pub source: String,
    pub target: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerMeta {
    pub description: String,
    pub node_count: usize,
    pub link_count: usize,
    pub layer: String,
    pub k_neighbors: usize,
    pub center: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerDocument {
    pub meta: ViewerMeta,
    pub nodes: Vec<ViewerNode>,
    pub links: Vec<ViewerLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerOptions {
    /// Layer name shown by the viewer, e.g. `omphalos` or `guardian`.
    pub layer: String,
    pub k_neighbors: usize,
    /// Optional center system, recorded in `meta` only.
    pub center: Option<String>,
    /// Decimal places for `rli`.
    pub precision: u32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            layer: "omphalos".to_string(),
            k_neighbors: 3,
            center: None,
            precision: crate::export::DEFAULT_PRECISION,
        }
    }
}

pub fn build_viewer_document(
    systems: &[System],
    ranking: Option<&[ScoredSystem]>,
    options: &ViewerOptions,
) -> ViewerDocument {
    let by_key: HashMap<&str, &ScoredSystem> = ranking
        .unwrap_or_default()
        .iter()
        .map(|s| (s.key.as_str(), s))
        .collect();

    let nodes: Vec<ViewerNode> = systems
        .iter()
        .map(|s| {
            let scored = by_key.get(s.key.as_str());
            ViewerNode {
                id: s.key.clone(),
                name: s.key.clone(),
                x: s.position.map(|p| p.x),
                y: s.position.map(|p| p.y),
                z: s.position.map(|p| p.z),
                category: s.category.clone(),
                region: s.region.clone(),
                faction: s.faction.clone(),
                notes: s.notes.clone(),
                rli: scored.map(|r| round_to(r.score, options.precision)),
                rank: scored.map(|r| r.rank),
            }
        })
        .collect();

    let links: Vec<ViewerLink> = knn_links(systems, options.k_neighbors)
        .into_iter()
        .map(|d| ViewerLink {
            source: d.a,
            target: d.b,
            distance: d.distance,
        })
        .collect();

    ViewerDocument {
        meta: ViewerMeta {
            description: VIEWER_DESCRIPTION.to_string(),
            node_count: nodes.len(),
            link_count: links.len(),
            layer: options.layer.clone(),
            k_neighbors: options.k_neighbors,
            center: options.center.clone(),
        },
        nodes,
        links,
    }
}

impl ViewerDocument {
    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{extract_features, GeometryReference};
    use crate::records::Position;
    use crate::scoring::{score_systems, Weights};

    fn systems() -> Vec<System> {
        vec![
            System::new("Sol", Some(Position::ORIGIN)).with_category("reference"),
            System::new("Alpha Centauri", Some(Position::new(3.0, 0.0, 3.2))),
            System::new("Barnard's Star", Some(Position::new(-3.0, 1.4, 4.9))),
            System::new("LFT 509", None).with_category("permit_locked"),
        ]
    }

    #[test]
    fn test_document_without_ranking() {
        let doc = build_viewer_document(&systems(), None, &ViewerOptions::default());
        assert_eq!(doc.meta.node_count, 4);
        assert_eq!(doc.meta.link_count, doc.links.len());
        assert!(doc.nodes.iter().all(|n| n.rli.is_none() && n.rank.is_none()));

        let lft = &doc.nodes[3];
        assert_eq!(lft.x, None);
        assert_eq!(lft.category, "permit_locked");
        // Three positioned systems, k=3: every pair linked once.
        assert_eq!(doc.links.len(), 3);
        assert!(doc.links.iter().all(|l| l.source < l.target));
    }

    #[test]
    fn test_document_with_ranking() {
        let systems = systems();
        let features = extract_features(&systems, &[], &[], GeometryReference::Centroid);
        let ranked = score_systems(&features, &Weights::default()).unwrap();
        let options = ViewerOptions {
            center: Some("Sol".into()),
            ..ViewerOptions::default()
        };
        let doc = build_viewer_document(&systems, Some(&ranked), &options);
        assert!(doc.nodes.iter().all(|n| n.rank.is_some()));
        assert_eq!(doc.meta.center.as_deref(), Some("Sol"));
    }

    #[test]
    fn test_json_omits_absent_scores() {
        let doc = build_viewer_document(&systems()[..1], None, &ViewerOptions::default());
        let json = doc.to_json_pretty().unwrap();
        assert!(!json.contains("\"rli\""));
        assert!(json.contains("\"layer\": \"omphalos\""));
    }
}
