//! Omphalos Headless Harness
//!
//! Validates the scoring logic and the bundled sample data end to end.
//! Runs entirely in-process: no file writes, no networking.
//!
//! Usage:
//!   cargo run -p omphalos-simtest
//!   cargo run -p omphalos-simtest -- --verbose

use std::collections::BTreeSet;

use omphalos_logic::error::ScoringError;
use omphalos_logic::export::{to_csv, to_json, DEFAULT_PRECISION};
use omphalos_logic::features::{FeatureVector, GeometryReference, SystemFeatures};
use omphalos_logic::geometry::{knn_links, pair_distances};
use omphalos_logic::ingest::{parse_anomaly_jsonl, parse_lore_json};
use omphalos_logic::jumps::{parse_jump_log, summarize_jumps};
use omphalos_logic::lore::{analyze_lore, LoreText};
use omphalos_logic::pipeline::{run_pipeline, PipelineConfig, Snapshot};
use omphalos_logic::records::Position;
use omphalos_logic::scoring::{score_systems, ScoredSystem, Weights};
use omphalos_logic::store::parse_systems_csv;
use omphalos_logic::viewer::{build_viewer_document, ViewerOptions};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

// ── Sample data (same files the CLI reads by default) ───────────────────
const SYSTEMS_CSV: &str = include_str!("../../../data/omphalos_systems.csv");
const LORE_JSON: &str = include_str!("../../../data/lore_connections.json");
const ANOMALIES_JSONL: &str = include_str!("../../../data/anomalies.jsonl");
const JUMPS_JSONL: &str = include_str!("../../../data/witchspace_jumps.jsonl");
const TOAST_TXT: &str = include_str!("../../../data/lore_samples/dark_wheel_toast.txt");

const RANDOM_SEED: u64 = 0x0A1B_2C3D;
const RANDOM_BATCHES: usize = 200;

/// Shape of one exported score record as consumers read it.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ExportedRow {
    system: String,
    score: f64,
    rank: usize,
    features: ExportedFeatures,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ExportedFeatures {
    geometric_deviation: f64,
    lore_connections: u32,
    anomalies: u32,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Omphalos Scoring Harness ===\n");

    let mut results = Vec::new();

    // 1. Sample data ingestion
    let snapshot = load_sample(&mut results);

    // 2. Full pipeline on the sample
    results.extend(validate_sample_pipeline(&snapshot, verbose));

    // 3. Worked example
    results.extend(validate_worked_example());

    // 4. Randomized scorer invariants
    results.extend(validate_random_batches(verbose));

    // 5. Failure modes
    results.extend(validate_failure_modes());

    // 6. Geometry and viewer
    results.extend(validate_geometry(&snapshot, verbose));

    // 7. Lore sample
    results.extend(validate_lore_sample(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Sample Data ──────────────────────────────────────────────────────

fn load_sample(results: &mut Vec<TestResult>) -> Snapshot {
    println!("--- Sample Data ---");

    let systems = match parse_systems_csv(SYSTEMS_CSV.as_bytes()) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "systems_parse".into(),
                passed: false,
                detail: format!("CSV read error: {}", e),
            });
            return Snapshot::default();
        }
    };
    results.push(TestResult {
        name: "systems_clean".into(),
        passed: systems.is_clean() && systems.accepted.len() >= 9,
        detail: format!(
            "{} accepted, {} rejected",
            systems.accepted.len(),
            systems.rejected.len()
        ),
    });

    let lore = match parse_lore_json(LORE_JSON) {
        Ok(l) => l,
        Err(e) => {
            results.push(TestResult {
                name: "lore_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            Default::default()
        }
    };
    let known: BTreeSet<&str> = systems.accepted.iter().map(|s| s.key.as_str()).collect();
    let dangling: Vec<&str> = lore
        .accepted
        .iter()
        .flat_map(|c| c.systems.iter().map(String::as_str))
        .filter(|k| !known.contains(k))
        .collect();
    results.push(TestResult {
        name: "lore_references_known_systems".into(),
        passed: lore.is_clean() && dangling.is_empty(),
        detail: if dangling.is_empty() {
            format!("{} lore connections", lore.accepted.len())
        } else {
            format!("unknown systems: {:?}", dangling)
        },
    });

    let anomalies = parse_anomaly_jsonl(ANOMALIES_JSONL);
    results.push(TestResult {
        name: "anomalies_clean".into(),
        passed: anomalies.is_clean() && !anomalies.accepted.is_empty(),
        detail: format!("{} anomaly records", anomalies.accepted.len()),
    });

    let jumps = parse_jump_log(JUMPS_JSONL);
    let summary = summarize_jumps(&jumps.accepted);
    results.push(TestResult {
        name: "jump_log_clean".into(),
        passed: jumps.is_clean() && summary.anomalous > 0,
        detail: format!("{} jumps, {} anomalous", summary.total, summary.anomalous),
    });

    Snapshot {
        systems,
        lore,
        anomalies,
        jumps,
    }
}

// ── 2. Sample Pipeline ──────────────────────────────────────────────────

fn check_ranking(ranking: &[ScoredSystem]) -> Result<(), String> {
    for (i, s) in ranking.iter().enumerate() {
        if s.rank != i + 1 {
            return Err(format!("{} has rank {} at position {}", s.key, s.rank, i + 1));
        }
        if !(0.0..=1.0).contains(&s.normalized.geometry)
            || !(0.0..=1.0).contains(&s.normalized.lore)
            || !(0.0..=1.0).contains(&s.normalized.anomaly)
        {
            return Err(format!("{} normalized outside [0, 1]", s.key));
        }
    }
    for pair in ranking.windows(2) {
        if pair[0].score < pair[1].score {
            return Err(format!("{} scored below {}", pair[0].key, pair[1].key));
        }
        if pair[0].score == pair[1].score && pair[0].key > pair[1].key {
            return Err(format!("tie between {} and {} out of key order", pair[0].key, pair[1].key));
        }
    }
    Ok(())
}

fn validate_sample_pipeline(snapshot: &Snapshot, verbose: bool) -> Vec<TestResult> {
    println!("--- Sample Pipeline ---");
    let mut results = Vec::new();

    let config = PipelineConfig::default();
    let output = match run_pipeline(snapshot, &config) {
        Ok(o) => o,
        Err(e) => {
            results.push(TestResult {
                name: "pipeline_run".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };

    if verbose {
        for s in output.ranking.iter().take(5) {
            println!("  {:>2}. {:<28} RLI={:.4}", s.rank, s.key, s.score);
        }
    }

    results.push(TestResult {
        name: "pipeline_complete".into(),
        passed: output.ranking.len() == snapshot.systems.accepted.len(),
        detail: format!(
            "{} of {} systems ranked",
            output.ranking.len(),
            snapshot.systems.accepted.len()
        ),
    });

    let order = check_ranking(&output.ranking);
    results.push(TestResult {
        name: "pipeline_rank_order".into(),
        passed: order.is_ok(),
        detail: order.err().unwrap_or_else(|| "scores non-increasing, ranks 1..N".into()),
    });

    results.push(TestResult {
        name: "pipeline_jump_anomalies".into(),
        passed: output.derived_anomalies > 0,
        detail: format!("{} anomaly records derived from jumps", output.derived_anomalies),
    });

    let first = to_json(&output.ranking, DEFAULT_PRECISION);
    let second = run_pipeline(snapshot, &config)
        .ok()
        .map(|o| to_json(&o.ranking, DEFAULT_PRECISION));
    let deterministic = matches!((&first, &second), (Ok(a), Some(Ok(b))) if a == b);
    results.push(TestResult {
        name: "pipeline_deterministic".into(),
        passed: deterministic,
        detail: "two runs export byte-identical JSON".into(),
    });

    let rows: Result<Vec<ExportedRow>, String> = first
        .map_err(|e| e.to_string())
        .and_then(|json| serde_json::from_str(&json).map_err(|e| e.to_string()));
    results.push(TestResult {
        name: "export_shape".into(),
        passed: matches!(&rows, Ok(r) if r.len() == output.ranking.len()),
        detail: match &rows {
            Ok(r) => format!("{} records with system/score/rank/features", r.len()),
            Err(e) => e.clone(),
        },
    });

    let csv_lines = to_csv(&output.ranking, DEFAULT_PRECISION)
        .map(|c| c.lines().count())
        .unwrap_or(0);
    results.push(TestResult {
        name: "export_csv_rows".into(),
        passed: csv_lines == output.ranking.len() + 1,
        detail: format!("{} lines including header", csv_lines),
    });

    results
}

// ── 3. Worked Example ───────────────────────────────────────────────────

fn features(key: &str, dev: f64, lore: u32, anomalies: u32) -> SystemFeatures {
    SystemFeatures {
        key: key.to_string(),
        features: FeatureVector {
            geometric_deviation: dev,
            lore_connections: lore,
            anomalies,
        },
        position_known: true,
    }
}

fn validate_worked_example() -> Vec<TestResult> {
    println!("--- Worked Example ---");
    let batch = vec![
        features("A", 0.0, 1, 0),
        features("B", 10.0, 0, 2),
        features("C", 5.0, 2, 1),
    ];
    let expected = [("C", 0.70), ("B", 0.60), ("A", 0.20)];

    let result = score_systems(&batch, &Weights::new(0.3, 0.4, 0.3));
    let passed = match &result {
        Ok(ranked) => ranked
            .iter()
            .zip(expected)
            .all(|(s, (key, score))| s.key == key && (s.score - score).abs() < 1e-9),
        Err(_) => false,
    };
    vec![TestResult {
        name: "worked_example_cba".into(),
        passed,
        detail: match result {
            Ok(r) => r
                .iter()
                .map(|s| format!("{}={:.2}", s.key, s.score))
                .collect::<Vec<_>>()
                .join(" "),
            Err(e) => e.to_string(),
        },
    }]
}

// ── 4. Random Batches ───────────────────────────────────────────────────

fn random_batch(rng: &mut StdRng) -> Vec<SystemFeatures> {
    let n = rng.gen_range(1..60);
    (0..n)
        .map(|i| {
            // Coarse values so ties actually happen.
            features(
                &format!("SYS-{:03}", i),
                rng.gen_range(0..50) as f64 * 10.0,
                rng.gen_range(0..5),
                rng.gen_range(0..5),
            )
        })
        .collect()
}

fn validate_random_batches(verbose: bool) -> Vec<TestResult> {
    println!("--- Random Batches ---");
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
    let mut failures: Vec<String> = Vec::new();
    let mut systems_scored = 0usize;

    for batch_no in 0..RANDOM_BATCHES {
        let batch = random_batch(&mut rng);
        let weights = Weights::new(
            rng.gen_range(0.0..2.0),
            rng.gen_range(0.0..2.0),
            rng.gen_range(0.0..2.0),
        );

        let ranked = match score_systems(&batch, &weights) {
            Ok(r) => r,
            Err(e) => {
                failures.push(format!("batch {}: {}", batch_no, e));
                continue;
            }
        };
        systems_scored += ranked.len();

        let input: BTreeSet<&str> = batch.iter().map(|f| f.key.as_str()).collect();
        let output: BTreeSet<&str> = ranked.iter().map(|s| s.key.as_str()).collect();
        if ranked.len() != batch.len() || input != output {
            failures.push(format!("batch {}: output is not a permutation", batch_no));
        }
        if let Err(e) = check_ranking(&ranked) {
            failures.push(format!("batch {}: {}", batch_no, e));
        }

        let mut shuffled = batch.clone();
        shuffled.shuffle(&mut rng);
        let reshuffled = score_systems(&shuffled, &weights);
        let same_order = matches!(&reshuffled, Ok(r) if r.iter().map(|s| &s.key).eq(ranked.iter().map(|s| &s.key)));
        if !same_order {
            failures.push(format!("batch {}: ranking depends on input order", batch_no));
        }
    }

    if verbose {
        println!("  {} batches, {} systems scored", RANDOM_BATCHES, systems_scored);
    }

    vec![TestResult {
        name: "random_batch_invariants".into(),
        passed: failures.is_empty(),
        detail: if failures.is_empty() {
            format!("{} batches, {} systems", RANDOM_BATCHES, systems_scored)
        } else {
            format!("{} failures, first: {}", failures.len(), failures[0])
        },
    }]
}

// ── 5. Failure Modes ────────────────────────────────────────────────────

fn validate_failure_modes() -> Vec<TestResult> {
    println!("--- Failure Modes ---");
    let mut results = Vec::new();
    let batch = vec![features("A", 1.0, 1, 1), features("B", 2.0, 0, 0)];

    let negative = score_systems(&batch, &Weights::new(0.5, -0.1, 0.5));
    results.push(TestResult {
        name: "negative_weight_rejected".into(),
        passed: matches!(negative, Err(ScoringError::InvalidWeight { name: "lore", .. })),
        detail: format!("{:?}", negative.map(|r| r.len())),
    });

    let nan = score_systems(&batch, &Weights::new(f64::NAN, 1.0, 1.0));
    results.push(TestResult {
        name: "nan_weight_rejected".into(),
        passed: matches!(nan, Err(ScoringError::InvalidWeight { .. })),
        detail: "NaN geometry weight".into(),
    });

    let empty = score_systems(&[], &Weights::default());
    results.push(TestResult {
        name: "empty_input_rejected".into(),
        passed: empty == Err(ScoringError::EmptyInput),
        detail: "no systems".into(),
    });

    let constant = vec![features("A", 7.0, 2, 3), features("B", 7.0, 2, 3)];
    let flat = score_systems(&constant, &Weights::default());
    results.push(TestResult {
        name: "constant_features_score_zero".into(),
        passed: matches!(&flat, Ok(r) if r.iter().all(|s| s.score == 0.0) && r[0].key == "A"),
        detail: "identical features normalize to 0, ties by key".into(),
    });

    results
}

// ── 6. Geometry & Viewer ────────────────────────────────────────────────

fn validate_geometry(snapshot: &Snapshot, verbose: bool) -> Vec<TestResult> {
    println!("--- Geometry & Viewer ---");
    let mut results = Vec::new();
    let systems = &snapshot.systems.accepted;
    let positioned = systems.iter().filter(|s| s.has_position()).count();

    let pairs = pair_distances(systems);
    results.push(TestResult {
        name: "pair_distance_count".into(),
        passed: pairs.len() == positioned * positioned.saturating_sub(1) / 2,
        detail: format!("{} pairs over {} positioned systems", pairs.len(), positioned),
    });

    let k = 3;
    let links = knn_links(systems, k);
    let self_links = links.iter().filter(|l| l.a == l.b).count();
    results.push(TestResult {
        name: "knn_links_bounded".into(),
        passed: self_links == 0 && links.len() <= positioned * k,
        detail: format!("{} links, {} self links", links.len(), self_links),
    });

    let sol_reference = PipelineConfig {
        reference: GeometryReference::Point(Position::ORIGIN),
        ..PipelineConfig::default()
    };
    let ranking = run_pipeline(snapshot, &sol_reference).map(|o| o.ranking);
    let sol_zero = matches!(
        &ranking,
        Ok(r) if r.iter().any(|s| s.key == "Sol" && s.features.geometric_deviation == 0.0)
    );
    results.push(TestResult {
        name: "sol_reference_deviation".into(),
        passed: sol_zero,
        detail: "Sol sits at the fixed reference point".into(),
    });

    let options = ViewerOptions {
        k_neighbors: k,
        ..ViewerOptions::default()
    };
    let doc = build_viewer_document(systems, ranking.as_deref().ok(), &options);
    if verbose {
        println!(
            "  viewer: {} nodes, {} links",
            doc.meta.node_count, doc.meta.link_count
        );
    }
    results.push(TestResult {
        name: "viewer_counts".into(),
        passed: doc.meta.node_count == systems.len()
            && doc.meta.link_count == links.len()
            && doc.nodes.iter().all(|n| n.rank.is_some()),
        detail: format!("{} nodes, {} links", doc.meta.node_count, doc.meta.link_count),
    });

    results
}

// ── 7. Lore Sample ──────────────────────────────────────────────────────

fn validate_lore_sample(verbose: bool) -> Vec<TestResult> {
    println!("--- Lore Sample ---");
    let lore = LoreText::new("dark_wheel_toast", "The Toast", "sample", TOAST_TXT);
    let report = analyze_lore(&lore, &[1, 2]);
    if verbose {
        println!("  top words: {:?}", report.top_words);
    }

    vec![
        TestResult {
            name: "lore_acrostic".into(),
            passed: report.first_letters_by_line == "RAXXLA"
                && report.sentence_initials == "RAXXLA",
            detail: format!(
                "lines={} sentences={}",
                report.first_letters_by_line, report.sentence_initials
            ),
        },
        TestResult {
            name: "lore_numbers".into(),
            passed: report.numeric_tokens == ["3301", "19"],
            detail: format!("{:?}", report.numeric_tokens),
        },
        TestResult {
            name: "lore_top_words".into(),
            passed: report.top_words.first().map(|(w, c)| (w.as_str(), *c)) == Some(("marks", 2))
                && report.selected_words.as_deref() == Some("Raxxla lies"),
            detail: format!("{:?}", report.top_words.first()),
        },
    ]
}
