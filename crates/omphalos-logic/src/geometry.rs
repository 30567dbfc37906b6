//! Spatial pattern analysis over systems with known positions.
//!
//! Pure functions over `&[System]`. Systems without coordinates are skipped
//! everywhere except [`radial_spokes`], which fails if its center has none.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::records::{Position, System};

/// Tolerance (ly) for treating two distances as equal.
pub const DISTANCE_EPSILON: f64 = 0.01;
/// Triangle area below which three systems count as colinear.
pub const COLINEAR_EPSILON: f64 = 0.001;
/// Default angular tolerance for radial spokes, in degrees.
pub const DEFAULT_ANGLE_TOLERANCE_DEG: f64 = 1.0;

/// Distance between two named systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub a: String,
    pub b: String,
    pub distance: f64,
}

/// Pairs whose distances fall in the same tolerance bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceGroup {
    /// Representative distance of the bucket (`bucket * tolerance`).
    pub distance: f64,
    pub pairs: Vec<(String, String)>,
}

fn positioned(systems: &[System]) -> impl Iterator<Item = (&str, Position)> {
    systems
        .iter()
        .filter_map(|s| s.position.map(|p| (s.key.as_str(), p)))
}

/// Mean of a set of positions, `None` when the set is empty.
pub fn centroid<'a, I>(points: I) -> Option<Position>
where
    I: IntoIterator<Item = &'a Position>,
{
    let mut sum = Position::ORIGIN;
    let mut n = 0usize;
    for p in points {
        sum.x += p.x;
        sum.y += p.y;
        sum.z += p.z;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    let n = n as f64;
    Some(Position::new(sum.x / n, sum.y / n, sum.z / n))
}

/// Every unordered pair of positioned systems, in input order.
pub fn pair_distances(systems: &[System]) -> Vec<DistanceRecord> {
    let pts: Vec<_> = positioned(systems).collect();
    let mut out = Vec::with_capacity(pts.len() * pts.len().saturating_sub(1) / 2);
    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            out.push(DistanceRecord {
                a: pts[i].0.to_string(),
                b: pts[j].0.to_string(),
                distance: pts[i].1.distance(&pts[j].1),
            });
        }
    }
    out
}

/// Group pairs with approximately equal distances.
///
/// Distances are bucketed by `round(d / tolerance)`. Only buckets holding
/// more than one pair are returned, ordered by distance.
pub fn repeated_distances(records: &[DistanceRecord], tolerance: f64) -> Vec<DistanceGroup> {
    if tolerance <= 0.0 {
        return Vec::new();
    }
    let mut buckets: BTreeMap<i64, Vec<(String, String)>> = BTreeMap::new();
    for rec in records {
        let bucket = (rec.distance / tolerance).round() as i64;
        buckets
            .entry(bucket)
            .or_default()
            .push((rec.a.clone(), rec.b.clone()));
    }
    buckets
        .into_iter()
        .filter(|(_, pairs)| pairs.len() > 1)
        .map(|(bucket, pairs)| DistanceGroup {
            distance: bucket as f64 * tolerance,
            pairs,
        })
        .collect()
}

/// Area of the triangle `abc`: `0.5 * |(b - a) × (c - a)|`.
pub fn triangle_area(a: &Position, b: &Position, c: &Position) -> f64 {
    0.5 * b.sub(a).cross(&c.sub(a)).length()
}

/// Triplets of systems lying (nearly) on one line.
pub fn colinear_triplets(systems: &[System], epsilon: f64) -> Vec<[String; 3]> {
    let pts: Vec<_> = positioned(systems).collect();
    let n = pts.len();
    let mut out = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if triangle_area(&pts[i].1, &pts[j].1, &pts[k].1) < epsilon {
                    out.push([
                        pts[i].0.to_string(),
                        pts[j].0.to_string(),
                        pts[k].0.to_string(),
                    ]);
                }
            }
        }
    }
    out
}

/// Pairs of systems that lie in nearly the same direction from `center`.
///
/// Two systems form a spoke when the angle between their direction vectors
/// from the center is at most `angle_tolerance_deg`. Systems at the center's
/// exact position have no direction and are skipped.
pub fn radial_spokes(
    systems: &[System],
    center: &str,
    angle_tolerance_deg: f64,
) -> Result<Vec<(String, String)>, GeometryError> {
    let center_system = systems
        .iter()
        .find(|s| s.key == center)
        .ok_or_else(|| GeometryError::CenterNotFound(center.to_string()))?;
    let origin = center_system
        .position
        .ok_or_else(|| GeometryError::CenterWithoutPosition(center.to_string()))?;

    let directions: Vec<(&str, Position)> = positioned(systems)
        .filter(|(key, _)| *key != center)
        .filter_map(|(key, p)| {
            let v = p.sub(&origin);
            let mag = v.length();
            (mag > 0.0).then(|| (key, Position::new(v.x / mag, v.y / mag, v.z / mag)))
        })
        .collect();

    let cos_tol = angle_tolerance_deg.to_radians().cos();
    let mut spokes = Vec::new();
    for i in 0..directions.len() {
        for j in (i + 1)..directions.len() {
            if directions[i].1.dot(&directions[j].1) >= cos_tol {
                spokes.push((directions[i].0.to_string(), directions[j].0.to_string()));
            }
        }
    }
    Ok(spokes)
}

/// Links from each positioned system to its `k` nearest neighbours.
///
/// Links are undirected: `a` is the lexically smaller key and each pair
/// appears once, in the order it was first found. Ties in distance are
/// broken by neighbour key so output is deterministic.
pub fn knn_links(systems: &[System], k: usize) -> Vec<DistanceRecord> {
    let pts: Vec<_> = positioned(systems).collect();
    let mut links = Vec::new();
    if pts.len() < 2 || k == 0 {
        return links;
    }

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for (i, (key, pos)) in pts.iter().enumerate() {
        let mut neighbours: Vec<(f64, &str)> = pts
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (other, p))| (pos.distance(p), *other))
            .collect();
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        for (distance, other) in neighbours.into_iter().take(k) {
            let (a, b) = if *key <= other {
                (*key, other)
            } else {
                (other, *key)
            };
            if seen.insert((a, b)) {
                links.push(DistanceRecord {
                    a: a.to_string(),
                    b: b.to_string(),
                    distance,
                });
            }
        }
    }
    links
}
