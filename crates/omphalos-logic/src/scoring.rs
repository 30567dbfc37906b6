//! Raxxla Likelihood Index (RLI) scoring.
//!
//! Combines the three features from [`crate::features`] into one score per
//! system and ranks the batch.
//!
//! Scoring is two-pass: pass 1 scans the whole batch for each feature's
//! min/max, pass 2 min-max normalizes every feature to [0, 1] and takes the
//! weighted sum. A feature whose range is zero contributes 0 to every
//! system. Ranks are 1-based, descending by score, ties broken by system key
//! ascending so the same input always yields the same order.

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::features::{FeatureVector, SystemFeatures};

/// Feature weights. Non-negative; they need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub geometry: f64,
    pub lore: f64,
    pub anomaly: f64,
}

impl Default for Weights {
    /// Equal weighting across the three signals.
    fn default() -> Self {
        Self {
            geometry: 1.0,
            lore: 1.0,
            anomaly: 1.0,
        }
    }
}

impl Weights {
    pub fn new(geometry: f64, lore: f64, anomaly: f64) -> Self {
        Self {
            geometry,
            lore,
            anomaly,
        }
    }

    /// Reject negative, NaN or infinite weights.
    pub fn validate(&self) -> Result<(), ScoringError> {
        for (name, value) in [
            ("geometry", self.geometry),
            ("lore", self.lore),
            ("anomaly", self.anomaly),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoringError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }
}

/// Features after min-max normalization, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedFeatures {
    pub geometry: f64,
    pub lore: f64,
    pub anomaly: f64,
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSystem {
    pub key: String,
    pub features: FeatureVector,
    pub normalized: NormalizedFeatures,
    pub score: f64,
    /// 1 = most likely.
    pub rank: usize,
}

/// Min/max of one feature across a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FeatureRange {
    min: f64,
    max: f64,
}

impl FeatureRange {
    fn scan(values: impl Iterator<Item = f64>) -> Self {
        let mut range = FeatureRange {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        };
        for v in values {
            range.min = range.min.min(v);
            range.max = range.max.max(v);
        }
        range
    }

    fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 {
            (value - self.min) / span
        } else {
            0.0
        }
    }
}

/// Per-feature ranges for a whole batch (pass 1).
#[derive(Debug, Clone, Copy, PartialEq)]
struct BatchRanges {
    geometry: FeatureRange,
    lore: FeatureRange,
    anomaly: FeatureRange,
}

impl BatchRanges {
    fn scan(batch: &[SystemFeatures]) -> Self {
        Self {
            geometry: FeatureRange::scan(batch.iter().map(|f| f.features.geometric_deviation)),
            lore: FeatureRange::scan(batch.iter().map(|f| f.features.lore_connections as f64)),
            anomaly: FeatureRange::scan(batch.iter().map(|f| f.features.anomalies as f64)),
        }
    }

    fn normalize(&self, f: &FeatureVector) -> NormalizedFeatures {
        NormalizedFeatures {
            geometry: self.geometry.normalize(f.geometric_deviation),
            lore: self.lore.normalize(f.lore_connections as f64),
            anomaly: self.anomaly.normalize(f.anomalies as f64),
        }
    }
}

/// Weighted sum of normalized features.
pub fn weighted_score(n: &NormalizedFeatures, w: &Weights) -> f64 {
    w.geometry * n.geometry + w.lore * n.lore + w.anomaly * n.anomaly
}

/// Score and rank a batch of feature vectors.
///
/// Fails with [`ScoringError::InvalidWeight`] on a bad weight and with
/// [`ScoringError::EmptyInput`] on an empty batch; no partial output is
/// returned on failure. The output is a permutation of the input.
pub fn score_systems(
    batch: &[SystemFeatures],
    weights: &Weights,
) -> Result<Vec<ScoredSystem>, ScoringError> {
    weights.validate()?;
    if batch.is_empty() {
        return Err(ScoringError::EmptyInput);
    }

    let ranges = BatchRanges::scan(batch);

    let mut scored: Vec<ScoredSystem> = batch
        .iter()
        .map(|f| {
            let normalized = ranges.normalize(&f.features);
            ScoredSystem {
                key: f.key.clone(),
                features: f.features,
                normalized,
                score: weighted_score(&normalized, weights),
                rank: 0,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
    for (i, s) in scored.iter_mut().enumerate() {
        s.rank = i + 1;
    }

    tracing::debug!(
        systems = scored.len(),
        top = scored.first().map(|s| s.key.as_str()).unwrap_or(""),
        "scored batch"
    );
    Ok(scored)
}
