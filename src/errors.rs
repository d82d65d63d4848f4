//! # Error Types Module
//!
//! This module defines the error types used by the bucketing pipeline. Per-file problems are
//! not errors: they are reported as [`SkipReason`] values and the run keeps going. Only
//! failures of the run itself (bad configuration, unwritable output directory) surface as
//! [`PipelineError`].

/// Errors that abort a run or a plumbing operation
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Invalid or missing configuration values
    Config(String),
    /// CSV structure could not be read
    Csv(String),
    /// Filesystem errors (inbox, outbox, archive)
    Io(String),
    /// Routing table failed validation
    Routing(String),
    /// Notification delivery failed
    Notification(String),
    /// A plumbing call took longer than allowed
    Timeout(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Config(msg) => write!(f, "Configuration error: {msg}"),
            PipelineError::Csv(msg) => write!(f, "CSV error: {msg}"),
            PipelineError::Io(msg) => write!(f, "I/O error: {msg}"),
            PipelineError::Routing(msg) => write!(f, "Routing table error: {msg}"),
            PipelineError::Notification(msg) => write!(f, "Notification error: {msg}"),
            PipelineError::Timeout(msg) => write!(f, "Timeout error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Routing(err.to_string())
    }
}

/// Why a source file contributed nothing to the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be parsed as CSV
    Unreadable(String),
    /// A required column is absent
    MissingColumn(&'static str),
    /// The `phone` column exists but every value is blank
    NoPhones,
    /// The file name matches no classification rule
    Unrecognized,
}

impl SkipReason {
    /// Whether this skip is worth a warning (and possibly an alert).
    ///
    /// Unrecognized files are routine and only noted at info level.
    pub fn is_warning(&self) -> bool {
        !matches!(self, SkipReason::Unrecognized)
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Unreadable(msg) => write!(f, "unreadable CSV: {msg}"),
            SkipReason::MissingColumn(column) => write!(f, "missing column '{column}'"),
            SkipReason::NoPhones => write!(f, "no phone numbers"),
            SkipReason::Unrecognized => write!(f, "file name matches no rule"),
        }
    }
}
