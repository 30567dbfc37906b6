//! Pure scoring logic for the Omphalos / Raxxla hunt toolkit.
//!
//! This crate contains everything that turns loaded hunt data into a ranked
//! Raxxla Likelihood Index (RLI). Functions take plain data (or any
//! `io::Read`) and return results; nothing here touches the file system or
//! the network, so every step is unit-testable and safe to call from several
//! threads at once with separate inputs.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`error`] | Error taxonomy (invalid weights, empty input, malformed records) |
//! | [`export`] | Ranked result records as fixed-precision JSON / CSV |
//! | [`features`] | Per-system feature vectors (deviation, lore, anomalies) |
//! | [`geometry`] | Distances, centroids, repeated distances, colinear triplets, spokes, kNN |
//! | [`ingest`] | Loose input records → strict types, with per-record rejection |
//! | [`jumps`] | Witch-space jump log and anomaly records derived from it |
//! | [`lore`] | Cipher-style analysis of one lore text (acrostics, numbers, word counts) |
//! | [`pipeline`] | Snapshot → features → ranking in one call |
//! | [`records`] | Core data model: systems, lore connections, anomaly records |
//! | [`scoring`] | Weights, two-pass min-max normalization and ranking |
//! | [`store`] | Coordinate store CSV read/write and the starter system list |
//! | [`viewer`] | Node/link document for the 3D point-cloud viewer |
//!
//! # Usage
//!
//! ```
//! use omphalos_logic::features::{extract_features, GeometryReference};
//! use omphalos_logic::records::{Position, System};
//! use omphalos_logic::scoring::{score_systems, Weights};
//!
//! let systems = vec![
//!     System::new("Sol", Some(Position::new(0.0, 0.0, 0.0))),
//!     System::new("Polaris", Some(Position::new(-22.4, 279.6, -300.0))),
//! ];
//! let features = extract_features(&systems, &[], &[], GeometryReference::Centroid);
//! let ranked = score_systems(&features, &Weights::default()).unwrap();
//! assert_eq!(ranked.len(), 2);
//! assert_eq!(ranked[0].rank, 1);
//! ```

pub mod error;
pub mod export;
pub mod features;
pub mod geometry;
pub mod ingest;
pub mod jumps;
pub mod lore;
pub mod pipeline;
pub mod records;
pub mod scoring;
pub mod store;
pub mod viewer;
