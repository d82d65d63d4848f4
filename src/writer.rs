//! # Output Writer Module
//!
//! Serializes every non-empty bucket to `<outbox>/<tag> (<day>).txt`, one phone per line.
//! Files are written through a temporary file in the same directory and then renamed, so a
//! consumer never sees a half-written artifact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::aggregator::{Aggregation, Bucket};
use crate::errors::PipelineError;

/// Order of phones inside an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteOrder {
    /// Ascending lexical order (canonical)
    #[default]
    Sorted,
    /// Order of first contribution, as the early unsorted scripts wrote it
    FirstSeen,
}

impl FromStr for WriteOrder {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sorted" => Ok(WriteOrder::Sorted),
            "first-seen" | "first_seen" | "unsorted" => Ok(WriteOrder::FirstSeen),
            other => Err(PipelineError::Config(format!(
                "unknown write order '{other}' (expected 'sorted' or 'first-seen')"
            ))),
        }
    }
}

/// A written output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name, `<tag> (<day>).txt`
    pub name: String,
    pub path: PathBuf,
    /// Number of phones written
    pub phones: usize,
}

/// Render a bucket's content: phones joined by `\n`, no trailing newline
pub fn render_bucket(bucket: &Bucket, order: WriteOrder) -> String {
    match order {
        WriteOrder::Sorted => bucket.sorted().join("\n"),
        WriteOrder::FirstSeen => bucket.first_seen().join("\n"),
    }
}

/// Writes aggregation results into an output directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    order: WriteOrder,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>, order: WriteOrder) -> Self {
        Self {
            dir: dir.into(),
            order,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write every non-empty bucket, returning artifacts in bucket creation order.
    ///
    /// Existing files with the same name are replaced.
    pub fn write(&self, aggregation: &Aggregation) -> Result<Vec<Artifact>, PipelineError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            PipelineError::Io(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        let mut artifacts = Vec::new();
        for bucket in &aggregation.buckets {
            if bucket.is_empty() {
                debug!(bucket = %bucket.name(), "Empty bucket, nothing to write");
                continue;
            }
            artifacts.push(self.write_bucket(bucket)?);
        }

        info!(
            dir = %self.dir.display(),
            artifacts = artifacts.len(),
            "Output files written"
        );
        Ok(artifacts)
    }

    fn write_bucket(&self, bucket: &Bucket) -> Result<Artifact, PipelineError> {
        let path = self.dir.join(bucket.name());
        let content = render_bucket(bucket, self.order);

        let mut temp_file = NamedTempFile::new_in(&self.dir)?;
        temp_file.as_file_mut().write_all(content.as_bytes())?;
        temp_file.persist(&path).map_err(|e| {
            PipelineError::Io(format!("cannot write {}: {}", path.display(), e.error))
        })?;

        info!(bucket = %bucket.name(), phones = bucket.len(), "Saved output file");

        Ok(Artifact {
            name: bucket.name().to_string(),
            path,
            phones: bucket.len(),
        })
    }
}
