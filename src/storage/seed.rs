//! Seed file
//!
//! Reads and writes `name & lat & long &` lines.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::process;

use crate::error::{RegistryError, Result};
use crate::protocol::FIELD_SEPARATOR;
use crate::registry::SettlementRecord;

/// One settlement site from the seed list
#[derive(Debug, Clone, PartialEq)]
pub struct SeedEntry {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&SettlementRecord> for SeedEntry {
    fn from(record: &SettlementRecord) -> Self {
        Self {
            name: record.name.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}

/// Load a seed file
///
/// Blank lines are skipped; any other malformed line fails the whole load.
pub fn load_seed_file(path: &Path) -> Result<Vec<SeedEntry>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = parse_line(&line).map_err(|reason| {
            RegistryError::Storage(format!(
                "{}:{}: {} in {:?}",
                path.display(),
                index + 1,
                reason,
                line
            ))
        })?;
        entries.push(entry);
    }

    tracing::debug!("Loaded {} seed entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Write a seed file
///
/// Writes a temp file next to the target, syncs it, then renames it
/// over the target.
pub fn save_seed_file(path: &Path, entries: &[SeedEntry]) -> Result<()> {
    for entry in entries {
        if entry.name.trim().is_empty()
            || entry.name.contains(FIELD_SEPARATOR)
            || entry.name.contains('\n')
        {
            return Err(RegistryError::Storage(format!(
                "settlement name cannot be stored: {:?}",
                entry.name
            )));
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension(format!("{}.tmp", process::id()));
    let result = write_entries(&temp_path, entries).and_then(|_| {
        fs::rename(&temp_path, path)?;
        Ok(())
    });

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_entries(path: &Path, entries: &[SeedEntry]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for entry in entries {
        writeln!(
            writer,
            "{} {sep} {} {sep} {} {sep}",
            entry.name,
            entry.latitude,
            entry.longitude,
            sep = FIELD_SEPARATOR
        )?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn parse_line(line: &str) -> std::result::Result<SeedEntry, String> {
    let mut fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
    while fields.last() == Some(&"") {
        fields.pop();
    }

    if fields.len() != 3 {
        return Err(format!("expected 3 fields, found {}", fields.len()));
    }
    if fields[0].is_empty() {
        return Err("empty name".to_string());
    }

    let coordinate = |label: &str, value: &str| match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid {} {:?}", label, value)),
    };

    Ok(SeedEntry {
        name: fields[0].to_string(),
        latitude: coordinate("latitude", fields[1])?,
        longitude: coordinate("longitude", fields[2])?,
    })
}
