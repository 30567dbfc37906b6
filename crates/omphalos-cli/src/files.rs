//! File system boundary: reading hunt data and writing results.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};

use omphalos_logic::ingest::{parse_anomaly_jsonl, parse_lore_json, Ingested};
use omphalos_logic::jumps::{parse_jump_log, JumpEvent};
use omphalos_logic::pipeline::Snapshot;
use omphalos_logic::records::System;
use omphalos_logic::store::{parse_systems_csv, write_systems_csv};

use crate::config::PathsConfig;

/// Read a file that may legitimately be absent.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "optional input missing, treating as empty");
        return Ok(None);
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(text))
}

pub fn load_systems(path: &Path) -> Result<Ingested<System>> {
    let file = File::open(path).with_context(|| {
        format!(
            "systems file {} not found; run `omphalos init` (or `omphalos init --guardian`) first",
            path.display()
        )
    })?;
    parse_systems_csv(BufReader::new(file))
        .with_context(|| format!("failed to read {}", path.display()))
}

pub fn load_jumps(path: &Path) -> Result<Ingested<JumpEvent>> {
    Ok(read_optional(path)?
        .map(|text| parse_jump_log(&text))
        .unwrap_or_default())
}

/// Read every input stream for a scoring run.
///
/// The systems CSV is required; lore, anomaly and jump files are optional.
pub fn load_snapshot(paths: &PathsConfig) -> Result<Snapshot> {
    let systems = load_systems(&paths.systems())?;

    let lore_path = paths.lore();
    let lore = match read_optional(&lore_path)? {
        Some(text) => parse_lore_json(&text)
            .with_context(|| format!("failed to parse {}", lore_path.display()))?,
        None => Ingested::default(),
    };

    let anomalies = read_optional(&paths.anomalies())?
        .map(|text| parse_anomaly_jsonl(&text))
        .unwrap_or_default();

    let jumps = load_jumps(&paths.jumps())?;

    tracing::info!(
        systems = systems.accepted.len(),
        lore = lore.accepted.len(),
        anomalies = anomalies.accepted.len(),
        jumps = jumps.accepted.len(),
        "hunt data loaded"
    );

    Ok(Snapshot {
        systems,
        lore,
        anomalies,
        jumps,
    })
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

pub fn write_text(path: &Path, content: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_systems(path: &Path, systems: &[System]) -> Result<()> {
    ensure_parent(path)?;
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_systems_csv(file, systems).with_context(|| format!("failed to write {}", path.display()))
}

/// Append one jump to the JSONL log, creating it if needed.
pub fn append_jump(path: &Path, event: &JumpEvent) -> Result<()> {
    ensure_parent(path)?;
    let line = event.to_json_line()?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{}", line).with_context(|| format!("failed to append to {}", path.display()))
}
