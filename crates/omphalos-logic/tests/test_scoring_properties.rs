//! Property tests for the scorer's ranking invariants.

use std::collections::BTreeSet;

use omphalos_logic::error::ScoringError;
use omphalos_logic::export::{to_json, DEFAULT_PRECISION};
use omphalos_logic::features::{FeatureVector, SystemFeatures};
use omphalos_logic::scoring::{score_systems, Weights};
use proptest::prelude::*;

fn arb_batch() -> impl Strategy<Value = Vec<SystemFeatures>> {
    prop::collection::vec((0.0f64..5000.0, 0u32..20, 0u32..20), 1..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (dev, lore, anomalies))| SystemFeatures {
                key: format!("SYS-{:03}", i),
                features: FeatureVector {
                    geometric_deviation: dev,
                    lore_connections: lore,
                    anomalies,
                },
                position_known: true,
            })
            .collect()
    })
}

fn arb_weights() -> impl Strategy<Value = Weights> {
    (0.0f64..10.0, 0.0f64..10.0, 0.0f64..10.0).prop_map(|(g, l, a)| Weights::new(g, l, a))
}

proptest! {
    #[test]
    fn output_is_permutation_of_input(batch in arb_batch(), weights in arb_weights()) {
        let ranked = score_systems(&batch, &weights).unwrap();
        prop_assert_eq!(ranked.len(), batch.len());
        let input: BTreeSet<_> = batch.iter().map(|f| f.key.clone()).collect();
        let output: BTreeSet<_> = ranked.iter().map(|s| s.key.clone()).collect();
        prop_assert_eq!(input, output);
    }

    #[test]
    fn scores_non_increasing_by_rank(batch in arb_batch(), weights in arb_weights()) {
        let ranked = score_systems(&batch, &weights).unwrap();
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].key < pair[1].key);
            }
        }
        for (i, s) in ranked.iter().enumerate() {
            prop_assert_eq!(s.rank, i + 1);
        }
    }

    #[test]
    fn normalized_features_in_unit_range(batch in arb_batch(), weights in arb_weights()) {
        let ranked = score_systems(&batch, &weights).unwrap();
        for s in &ranked {
            for v in [s.normalized.geometry, s.normalized.lore, s.normalized.anomaly] {
                prop_assert!((0.0..=1.0).contains(&v), "normalized value {} out of range", v);
            }
            let max = weights.geometry + weights.lore + weights.anomaly;
            prop_assert!(s.score >= 0.0 && s.score <= max + 1e-9);
        }
    }

    #[test]
    fn identical_deviation_contributes_nothing(
        batch in arb_batch(),
        dev in 0.0f64..1000.0,
        weights in arb_weights(),
    ) {
        let flat: Vec<_> = batch
            .into_iter()
            .map(|mut f| {
                f.features.geometric_deviation = dev;
                f
            })
            .collect();
        let ranked = score_systems(&flat, &weights).unwrap();
        for s in &ranked {
            prop_assert_eq!(s.normalized.geometry, 0.0);
        }
    }

    #[test]
    fn scoring_is_deterministic(batch in arb_batch(), weights in arb_weights()) {
        let a = to_json(&score_systems(&batch, &weights).unwrap(), DEFAULT_PRECISION).unwrap();
        let b = to_json(&score_systems(&batch, &weights).unwrap(), DEFAULT_PRECISION).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn input_order_does_not_change_ranking(batch in arb_batch(), weights in arb_weights()) {
        let forward = score_systems(&batch, &weights).unwrap();
        let mut reversed_input = batch.clone();
        reversed_input.reverse();
        let backward = score_systems(&reversed_input, &weights).unwrap();
        let fk: Vec<_> = forward.iter().map(|s| &s.key).collect();
        let bk: Vec<_> = backward.iter().map(|s| &s.key).collect();
        prop_assert_eq!(fk, bk);
    }

    #[test]
    fn any_negative_weight_rejected(
        batch in arb_batch(),
        weights in arb_weights(),
        slot in 0usize..3,
        neg in -10.0f64..-0.0001,
    ) {
        let mut w = weights;
        match slot {
            0 => w.geometry = neg,
            1 => w.lore = neg,
            _ => w.anomaly = neg,
        }
        let is_invalid_weight = matches!(
            score_systems(&batch, &w),
            Err(ScoringError::InvalidWeight { .. })
        );
        prop_assert!(is_invalid_weight);
    }
}
