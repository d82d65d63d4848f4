//! # Source File Module
//!
//! In-memory representation of the inbound CSV files and the loader that materializes a batch
//! from an inbox directory. Only the `phone` and `channel_id` columns matter; every other
//! column is ignored.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, SkipReason};
use crate::phone::normalize_cell;

pub const PHONE_COLUMN: &str = "phone";
pub const CHANNEL_ID_COLUMN: &str = "channel_id";

/// One row of a source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRecord {
    /// Raw phone cell, `None` when the cell is missing or empty
    pub phone: Option<String>,
    /// Raw channel identifier, `None` when missing or empty
    pub channel_id: Option<String>,
}

impl InputRecord {
    pub fn new(phone: Option<&str>, channel_id: Option<&str>) -> Self {
        Self {
            phone: phone.map(str::to_string),
            channel_id: channel_id.map(str::to_string),
        }
    }
}

/// A named tabular file from one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Base file name, used for classification
    pub name: String,
    /// Header names as they appear in the file
    pub columns: Vec<String>,
    pub records: Vec<InputRecord>,
}

impl SourceFile {
    /// Build a source file from already parsed parts (used by callers that do their own I/O)
    pub fn new(name: impl Into<String>, columns: Vec<String>, records: Vec<InputRecord>) -> Self {
        Self {
            name: name.into(),
            columns,
            records,
        }
    }

    /// Parse CSV data with a header row.
    ///
    /// Ragged rows are tolerated; cells past the end of a short row count as missing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use phone_buckets::source::SourceFile;
    ///
    /// let csv = "id,phone\n1,+79000000001\n2,\n";
    /// let file = SourceFile::from_reader("MFO5.csv", csv.as_bytes())?;
    /// assert!(file.has_column("phone"));
    /// assert_eq!(file.records.len(), 2);
    /// assert_eq!(file.records[1].phone, None);
    /// # Ok::<(), phone_buckets::errors::PipelineError>(())
    /// ```
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self, PipelineError> {
        let name = name.into();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|header| header.to_string())
            .collect();

        let phone_idx = columns.iter().position(|c| c == PHONE_COLUMN);
        let channel_idx = columns.iter().position(|c| c == CHANNEL_ID_COLUMN);

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let cell = |idx: Option<usize>| {
                idx.and_then(|i| row.get(i))
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            };
            records.push(InputRecord {
                phone: cell(phone_idx),
                channel_id: cell(channel_idx),
            });
        }

        debug!(file = %name, columns = columns.len(), rows = records.len(), "Parsed CSV");

        Ok(Self {
            name,
            columns,
            records,
        })
    }

    /// Read and parse a CSV file; the source name is the file's base name
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let file = fs::File::open(path)
            .map_err(|e| PipelineError::Io(format!("cannot open {}: {e}", path.display())))?;
        Self::from_reader(base_name(path), file)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Whether at least one row carries a phone that survives normalization
    pub fn has_any_phone(&self) -> bool {
        self.records
            .iter()
            .any(|record| normalize_cell(record.phone.as_deref()).is_some())
    }
}

/// A file of the inbox that could not be turned into a [`SourceFile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub name: String,
    pub reason: SkipReason,
}

/// Files materialized from one inbox scan
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub files: Vec<SourceFile>,
    /// Every CSV path of the scan, parsed or rejected
    pub paths: Vec<PathBuf>,
    pub rejected: Vec<RejectedFile>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.rejected.is_empty()
    }
}

/// List `*.csv` files of a directory, sorted by name
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| PipelineError::Io(format!("cannot list {}: {e}", dir.display())))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read every CSV of `dir` into a batch.
///
/// Files that fail to parse are recorded as rejected instead of failing the scan; only an
/// unreadable directory is an error.
pub fn load_batch(dir: &Path) -> Result<Batch, PipelineError> {
    let mut batch = Batch::default();

    for path in list_csv_files(dir)? {
        match SourceFile::from_path(&path) {
            Ok(file) => {
                batch.files.push(file);
                batch.paths.push(path);
            }
            Err(e) => {
                let name = base_name(&path);
                warn!(file = %name, error = %e, "Skipping unreadable CSV");
                batch.rejected.push(RejectedFile {
                    name,
                    reason: SkipReason::Unreadable(e.to_string()),
                });
                batch.paths.push(path);
            }
        }
    }

    info!(
        dir = %dir.display(),
        files = batch.files.len(),
        rejected = batch.rejected.len(),
        "Loaded CSV batch"
    );
    Ok(batch)
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
