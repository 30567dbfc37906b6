//! Subcommand handlers.
//!
//! Each handler takes the resolved configuration and a writer for
//! human-readable output. Logs go through `tracing` to stderr.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;

use omphalos_logic::export::{to_csv, to_json};
use omphalos_logic::geometry::{colinear_triplets, pair_distances, radial_spokes, repeated_distances};
use omphalos_logic::jumps::{summarize_jumps, AnomalyKind, JumpEvent};
use omphalos_logic::lore::{analyze_lore, LoreText};
use omphalos_logic::pipeline::run_pipeline;
use omphalos_logic::scoring::{ScoredSystem, Weights};
use omphalos_logic::store::{guardian_stub_systems, starter_systems};
use omphalos_logic::viewer::{build_viewer_document, ViewerOptions};

use crate::config::{parse_weights, OmphalosConfig};
use crate::files;

// ── Arguments ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Args)]
pub struct InitArgs {
    /// Overwrite an existing systems file
    #[arg(long)]
    pub force: bool,
    /// Write the Guardian stub (paths.guardian_csv) instead of the starter list
    #[arg(long)]
    pub guardian: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ScoreArgs {
    /// Only print the first N systems (all are still exported)
    #[arg(long)]
    pub top: Option<usize>,
    /// Also write the ranking as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// JSON output path (defaults to paths.scores_json)
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Weights as geometry,lore,anomaly (applied as a config override)
    #[arg(long, value_parser = parse_weights)]
    pub weights: Option<Weights>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GeometryArgs {
    /// Systems CSV to analyze (defaults to paths.systems_csv)
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// Look for radial spokes from this system
    #[arg(long)]
    pub center: Option<String>,
    /// Spoke angle tolerance in degrees
    #[arg(long)]
    pub angle: Option<f64>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct LoreArgs {
    /// File name under paths.lore_dir
    pub file: PathBuf,
    /// Defaults to the file name
    #[arg(long)]
    pub identifier: Option<String>,
    /// Defaults to the file name
    #[arg(long)]
    pub title: Option<String>,
    /// Where the text came from, e.g. Codex
    #[arg(long)]
    pub source: Option<String>,
    /// Also pick out these 1-based word positions
    #[arg(long, value_delimiter = ',')]
    pub nth: Vec<usize>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct LogJumpArgs {
    pub origin: String,
    pub destination: String,
    /// Comma-separated cargo list
    #[arg(long, value_delimiter = ',')]
    pub cargo: Vec<String>,
    #[arg(long)]
    pub ship: Option<String>,
    /// FSD type
    #[arg(long)]
    pub fsd: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Visual anomaly seen during the jump
    #[arg(long)]
    pub visual: bool,
    /// Audio anomaly heard during the jump
    #[arg(long)]
    pub audio: bool,
    /// Jump took unusually long
    #[arg(long)]
    pub duration: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ReportJumpsArgs {
    /// Print every anomaly-flagged jump
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ExportVizArgs {
    /// Output path (defaults to paths.viz_json, or paths.guardian_viz_json)
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Neighbours per system in the link graph
    #[arg(long)]
    pub k: Option<usize>,
    #[arg(long)]
    pub center: Option<String>,
    /// Layer name (defaults to "omphalos", or "guardian")
    #[arg(long)]
    pub layer: Option<String>,
    /// Skip scoring; export positions only
    #[arg(long)]
    pub no_scores: bool,
    /// Export the Guardian dataset (paths.guardian_csv) without scores
    #[arg(long)]
    pub guardian: bool,
}

// ── Handlers ───────────────────────────────────────────────────────────

pub fn run_init(config: &OmphalosConfig, args: &InitArgs, out: &mut dyn Write) -> Result<()> {
    let (path, systems, label) = if args.guardian {
        (config.paths.guardian(), guardian_stub_systems(), "Guardian")
    } else {
        (config.paths.systems(), starter_systems(), "Omphalos")
    };
    if path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    files::write_systems(&path, &systems)?;
    writeln!(out, "Initialized {} systems CSV at {}", label, path.display())?;
    Ok(())
}

fn print_ranking(ranking: &[ScoredSystem], top: Option<usize>, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "\n== Raxxla Likelihood Index ==")?;
    for s in ranking.iter().take(top.unwrap_or(ranking.len())) {
        writeln!(
            out,
            "{:>3}. {:<28} RLI={:.4}  geom={:.2}  lore={}  anom={}",
            s.rank,
            s.key,
            s.score,
            s.features.geometric_deviation,
            s.features.lore_connections,
            s.features.anomalies,
        )?;
    }
    Ok(())
}

/// Score every system and write the ranking.
///
/// Weights come from `config`; `--weights` reaches it through
/// [`CliOverrides`](crate::config::CliOverrides).
pub fn run_score(config: &OmphalosConfig, args: &ScoreArgs, out: &mut dyn Write) -> Result<()> {
    let snapshot = files::load_snapshot(&config.paths)?;
    let output = run_pipeline(&snapshot, &config.pipeline()?).context("scoring failed")?;

    writeln!(
        out,
        "Scored {} systems ({} malformed records skipped, {} jump anomalies)",
        output.ranking.len(),
        output.rejected.len(),
        output.derived_anomalies
    )?;
    print_ranking(&output.ranking, args.top, out)?;

    let precision = config.scoring.precision;
    let json_path = args.out.clone().unwrap_or_else(|| config.paths.scores());
    files::write_text(&json_path, &to_json(&output.ranking, precision)?)?;
    writeln!(out, "\nWrote {}", json_path.display())?;

    if let Some(csv_path) = &args.csv {
        files::write_text(csv_path, &to_csv(&output.ranking, precision)?)?;
        writeln!(out, "Wrote {}", csv_path.display())?;
    }
    Ok(())
}

pub fn run_geometry(
    config: &OmphalosConfig,
    args: &GeometryArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let path = args.csv.clone().unwrap_or_else(|| config.paths.systems());
    let systems = files::load_systems(&path)?.accepted;
    writeln!(out, "Loaded {} systems from {}", systems.len(), path.display())?;

    let geo = &config.geometry;
    let repeats = repeated_distances(&pair_distances(&systems), geo.distance_tolerance);
    writeln!(out, "\n== Repeated distances ==")?;
    if repeats.is_empty() {
        writeln!(out, "No repeated distances above threshold.")?;
    }
    for group in &repeats {
        let pairs: Vec<String> = group
            .pairs
            .iter()
            .map(|(a, b)| format!("{} <-> {}", a, b))
            .collect();
        writeln!(out, "{:.3} ly: {}", group.distance, pairs.join(", "))?;
    }

    let triplets = colinear_triplets(&systems, geo.colinear_epsilon);
    writeln!(out, "\n== Nearly colinear triplets ==")?;
    if triplets.is_empty() {
        writeln!(out, "No colinear triplets found.")?;
    }
    for [a, b, c] in &triplets {
        writeln!(out, "{} - {} - {}", a, b, c)?;
    }

    if let Some(center) = &args.center {
        let angle = args.angle.unwrap_or(geo.angle_tolerance_deg);
        let spokes = radial_spokes(&systems, center, angle)?;
        writeln!(out, "\n== Radial spokes from {} (<= {} deg apart) ==", center, angle)?;
        if spokes.is_empty() {
            writeln!(out, "No notable spokes found.")?;
        }
        for (a, b) in &spokes {
            writeln!(out, "{} -> {} & {}", center, a, b)?;
        }
    }
    Ok(())
}

/// Cipher-style report on one text from `paths.lore_dir`.
pub fn run_lore(config: &OmphalosConfig, args: &LoreArgs, out: &mut dyn Write) -> Result<()> {
    let path = config.paths.lore_sample(&args.file);
    let body = fs::read_to_string(&path)
        .with_context(|| format!("failed to read lore sample {}", path.display()))?;
    let name = args.file.display().to_string();
    let lore = LoreText::new(
        args.identifier.clone().unwrap_or_else(|| name.clone()),
        args.title.clone().unwrap_or(name),
        args.source.clone().unwrap_or_else(|| "unknown".to_string()),
        body,
    );
    let report = analyze_lore(&lore, &args.nth);

    writeln!(out, "== Lore analysis report ==")?;
    writeln!(out, "identifier: {}", report.identifier)?;
    writeln!(out, "title: {}", report.title)?;
    writeln!(out, "source: {}", report.source)?;
    writeln!(out, "first_letters_by_line: {}", report.first_letters_by_line)?;
    writeln!(out, "last_letters_by_line: {}", report.last_letters_by_line)?;
    writeln!(out, "sentence_initials: {}", report.sentence_initials)?;
    writeln!(out, "numeric_tokens: {}", report.numeric_tokens.join(", "))?;
    let top: Vec<String> = report
        .top_words
        .iter()
        .map(|(word, count)| format!("{} ({})", word, count))
        .collect();
    writeln!(out, "top_words: {}", top.join(", "))?;
    if let Some(selected) = &report.selected_words {
        writeln!(out, "selected_words: {}", selected)?;
    }
    Ok(())
}

/// Append a jump stamped with `now`.
pub fn run_log_jump(
    config: &OmphalosConfig,
    args: &LogJumpArgs,
    now: DateTime<Utc>,
    out: &mut dyn Write,
) -> Result<()> {
    let origin = args.origin.trim();
    let destination = args.destination.trim();
    if origin.is_empty() || destination.is_empty() {
        bail!("origin and destination must not be empty");
    }

    let mut event = JumpEvent::new(now, origin, destination);
    let cargo: Vec<String> = args
        .cargo
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    event.cargo = (!cargo.is_empty()).then_some(cargo);
    event.ship = args.ship.clone();
    event.fsd_type = args.fsd.clone();
    event.notes = args.notes.clone();
    for (set, kind) in [
        (args.visual, AnomalyKind::Visual),
        (args.audio, AnomalyKind::Audio),
        (args.duration, AnomalyKind::Duration),
    ] {
        if set {
            event.flag(kind);
        }
    }

    let path = config.paths.jumps();
    files::append_jump(&path, &event)?;
    tracing::info!(origin, destination, anomalous = event.is_anomalous(), "jump logged");
    writeln!(
        out,
        "Logged jump {} -> {} to {}",
        origin,
        destination,
        path.display()
    )?;
    Ok(())
}

pub fn run_report_jumps(
    config: &OmphalosConfig,
    args: &ReportJumpsArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let path = config.paths.jumps();
    let log = files::load_jumps(&path)?;
    let events = &log.accepted;
    writeln!(out, "Loaded {} jump events from {}", events.len(), path.display())?;
    if !log.is_clean() {
        writeln!(out, "Skipped {} unreadable lines", log.rejected.len())?;
    }

    let summary = summarize_jumps(events);
    writeln!(out, "Total anomaly-flagged jumps: {}", summary.anomalous)?;
    for (kind, count) in &summary.by_kind {
        writeln!(out, "  {}: {}", kind, count)?;
    }

    if args.verbose {
        for e in events.iter().filter(|e| e.is_anomalous()) {
            writeln!(out, "{}", "-".repeat(40))?;
            writeln!(
                out,
                "{}: {} -> {}",
                e.timestamp_utc.to_rfc3339_opts(SecondsFormat::Secs, true),
                e.origin,
                e.destination
            )?;
            if let Some(cargo) = &e.cargo {
                writeln!(out, "  cargo: {}", cargo.join(", "))?;
            }
            let kinds: Vec<&str> = e.anomaly_kinds().into_iter().map(AnomalyKind::as_str).collect();
            writeln!(out, "  anomalies: {}", kinds.join(", "))?;
            if let Some(notes) = &e.notes {
                writeln!(out, "  notes: {}", notes)?;
            }
        }
    }
    Ok(())
}

pub fn run_export_viz(
    config: &OmphalosConfig,
    args: &ExportVizArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let (source, default_layer, default_out) = if args.guardian {
        (config.paths.guardian(), "guardian", config.paths.guardian_viz())
    } else {
        (config.paths.systems(), "omphalos", config.paths.viz())
    };
    let options = ViewerOptions {
        layer: args.layer.clone().unwrap_or_else(|| default_layer.to_string()),
        k_neighbors: args.k.unwrap_or(config.geometry.k_neighbors),
        center: args.center.clone(),
        precision: config.scoring.precision,
    };

    // The Guardian dataset has no lore or anomaly inputs to score against.
    let document = if args.no_scores || args.guardian {
        let systems = files::load_systems(&source)?.accepted;
        build_viewer_document(&systems, None, &options)
    } else {
        let snapshot = files::load_snapshot(&config.paths)?;
        if snapshot.systems.accepted.is_empty() {
            build_viewer_document(&[], None, &options)
        } else {
            let output = run_pipeline(&snapshot, &config.pipeline()?).context("scoring failed")?;
            build_viewer_document(&snapshot.systems.accepted, Some(&output.ranking), &options)
        }
    };

    if document.nodes.is_empty() {
        writeln!(out, "No systems loaded from {}", source.display())?;
        return Ok(());
    }
    if let Some(center) = &options.center {
        if !document.nodes.iter().any(|n| &n.id == center) {
            tracing::warn!(center = %center, "center system is not in the export");
        }
    }

    let path = args.out.clone().unwrap_or(default_out);
    files::write_text(&path, &document.to_json_pretty()?)?;
    let top = document
        .nodes
        .iter()
        .filter_map(|n| n.rli.zip(n.rank).map(|(rli, rank)| (rank, &n.id, rli)))
        .min_by_key(|(rank, _, _)| *rank);
    writeln!(
        out,
        "Exported {} nodes and {} links to {}",
        document.meta.node_count,
        document.meta.link_count,
        path.display()
    )?;
    if let Some((_, id, rli)) = top {
        writeln!(out, "Top RLI: {} ({})", id, rli)?;
    }
    Ok(())
}
