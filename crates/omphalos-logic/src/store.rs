//! Coordinate store: the systems CSV.
//!
//! Columns are `name,x,y,z,category,region,faction,notes`; empty cells mean
//! "absent". Reading is generic over `io::Read` so callers decide where the
//! bytes come from.

use std::io;

use crate::error::{IngestError, MalformedRecordError, RecordKind};
use crate::ingest::{ingest_indexed_systems, Ingested, RawSystemRow};
use crate::records::{Position, System};

pub const SYSTEMS_CSV_HEADER: [&str; 8] = [
    "name", "x", "y", "z", "category", "region", "faction", "notes",
];

/// Read and validate a systems CSV.
///
/// Rows that fail to decode (wrong field count, bad quoting) or fail
/// validation are rejected individually. I/O failures abort the read.
pub fn parse_systems_csv<R: io::Read>(reader: R) -> Result<Ingested<System>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, row) in rdr.deserialize::<RawSystemRow>().enumerate() {
        match row {
            Ok(r) => rows.push((index, Ok(r))),
            Err(e) if e.is_io_error() => return Err(IngestError::Csv(e)),
            Err(e) => rows.push((
                index,
                Err(MalformedRecordError::new(RecordKind::System, index, e.to_string())),
            )),
        }
    }
    Ok(ingest_indexed_systems(rows))
}

fn to_row(s: &System) -> RawSystemRow {
    RawSystemRow {
        name: Some(s.key.clone()),
        x: s.position.map(|p| p.x),
        y: s.position.map(|p| p.y),
        z: s.position.map(|p| p.z),
        category: Some(s.category.clone()),
        region: s.region.clone(),
        faction: s.faction.clone(),
        notes: s.notes.clone(),
    }
}

/// Write systems as CSV with the standard header.
pub fn write_systems_csv<W: io::Write>(writer: W, systems: &[System]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for s in systems {
        wtr.serialize(to_row(s))?;
    }
    if systems.is_empty() {
        wtr.write_record(SYSTEMS_CSV_HEADER)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Starter list of Raxxla / Omphalos suspects.
///
/// Only Sol and Shinrarta Dezhra have coordinates; the rest are meant to be
/// filled in by a coordinate harvest.
pub fn starter_systems() -> Vec<System> {
    vec![
        System::new("Polaris", None)
            .with_category("permit_locked")
            .with_region("Frontier_Legacy")
            .with_notes("Classic Thargoid staging / transport lore."),
        System::new("Shinrarta Dezhra", Some(Position::new(55.71875, 17.59375, 27.15625)))
            .with_category("lore_hub")
            .with_region("Core")
            .with_faction("The Dark Wheel")
            .with_notes("Jameson Memorial, Dark Wheel faction base."),
        System::new("LFT 509", None)
            .with_category("permit_locked")
            .with_region("Bubble Fringe")
            .with_notes("Gas giant with 8th moon in lore."),
        System::new("Col 285 Sector BG-O d6-93", None)
            .with_category("anomaly")
            .with_region("Col 285")
            .with_notes("Delta 69 comms anomaly; phantom mass & ghost signal."),
        System::new("Nefertem", None)
            .with_category("ghost_ship")
            .with_region("Bubble Fringe")
            .with_notes("Generation Ship Thetis & insanity signal."),
        System::new("Syreadiae JX-F c0", None)
            .with_category("megaship")
            .with_region("Formidine Rift")
            .with_notes("Zurara; Project Dynasty."),
        System::new("HIP 22460", None)
            .with_category("battlefield")
            .with_region("Pleiades Fringe")
            .with_notes("Proteus Wave site; Guardian+Thargoid catastrophe."),
        System::new("HIP 87621", None)
            .with_category("permit_locked")
            .with_region("Bubble Fringe")
            .with_notes("October Consortium system; Terri Tora mystery."),
        System::new("Sol", Some(Position::ORIGIN))
            .with_category("reference")
            .with_region("Core")
            .with_notes("Reference origin system."),
    ]
}

/// Stub Guardian dataset: a single shell center to be replaced with real
/// shell or hotspot data.
pub fn guardian_stub_systems() -> Vec<System> {
    vec![System::new("Guardian_Shell_Center", None)
        .with_category("guardian_shell")
        .with_region("Guardian_Shell")
        .with_notes(
            "Default Guardian shell center; customise this or replace with your real shell / hotspot data.",
        )]
}
