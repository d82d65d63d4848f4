//! Archiving of processed inputs.
//!
//! Inputs are moved to the archive directory as `<stem> (dd.mm).csv`. An existing archive
//! entry is never replaced: a numeric suffix is added until the name is free.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::errors::PipelineError;

/// Archive name of an input for `date`, e.g. `MFO5 (19.10).csv`
pub fn dated_csv_name(stem: &str, date: NaiveDate) -> String {
    format!("{stem} ({}).csv", date.format("%d.%m"))
}

/// First free archive path for `stem` in `dir`
pub fn free_archive_path(dir: &Path, stem: &str, date: NaiveDate) -> PathBuf {
    let candidate = dir.join(dated_csv_name(stem, date));
    if !candidate.exists() {
        return candidate;
    }

    let dated = format!("{stem} ({})", date.format("%d.%m"));
    (2..)
        .map(|n| dir.join(format!("{dated} {n}.csv")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Move every path into `dir`, returning the new locations.
///
/// A file that cannot be moved is logged and left in place; the others are still archived.
pub fn archive_inputs(
    paths: &[PathBuf],
    dir: &Path,
    date: NaiveDate,
) -> Result<Vec<PathBuf>, PipelineError> {
    fs::create_dir_all(dir)
        .map_err(|e| PipelineError::Io(format!("cannot create {}: {e}", dir.display())))?;

    let mut archived = Vec::with_capacity(paths.len());
    for path in paths {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = free_archive_path(dir, &stem, date);

        match move_file(path, &target) {
            Ok(()) => {
                info!(from = %path.display(), to = %target.display(), "Archived input");
                archived.push(target);
            }
            Err(e) => warn!(file = %path.display(), error = %e, "Failed to archive input"),
        }
    }
    Ok(archived)
}

// rename fails across filesystems; fall back to copy and remove
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
