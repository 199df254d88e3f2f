//! Merged table output.

use crate::error::ReconcileError;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write `records` as CSV to `destination`, replacing any existing file.
///
/// The header comes from the field names of the first record. With no records nothing
/// is written and `false` is returned, so "nothing to emit" shows up as a missing file.
/// Rows go to a sibling temp file that is synced and renamed into place, so a failed
/// write never leaves a half-written table at `destination`.
pub fn write_table<T: Serialize>(records: &[T], destination: &Path) -> Result<bool, ReconcileError> {
    if records.is_empty() {
        debug!(path = %destination.display(), "No records, skipping table write");
        return Ok(false);
    }

    if let Some(dir) = destination.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let temp_path = temp_path_for(destination);
    if let Err(e) = write_rows(records, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    fs::rename(&temp_path, destination)?;

    debug!(path = %destination.display(), rows = records.len(), "Table written");
    Ok(true)
}

fn write_rows<T: Serialize>(records: &[T], path: &Path) -> Result<(), ReconcileError> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for record in records {
        writer.serialize(record)?;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    destination.with_file_name(name)
}
