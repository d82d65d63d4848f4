//! # Pipeline Module
//!
//! One complete run: optional leads file, inbox scan, aggregation, artifact writing, ordered
//! delivery and archiving. The core steps are synchronous; only notifier calls suspend.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::aggregator::{aggregate, Aggregation, FileOutcome};
use crate::archive::archive_inputs;
use crate::config::{AppConfig, SkipSeverity};
use crate::day_number::DayNumber;
use crate::errors::PipelineError;
use crate::leads::locate_previous_day;
use crate::notifier::Notifier;
use crate::ordering::order_artifacts;
use crate::source::load_batch;
use crate::writer::{Artifact, OutputWriter};

/// What a run did, logged at its end
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub day: DayNumber,
    /// Yesterday's leads file, when one was found
    pub leads_file: Option<PathBuf>,
    /// One outcome per input file
    pub outcomes: Vec<FileOutcome>,
    /// Written artifacts in delivery order
    pub artifacts: Vec<Artifact>,
    /// Files handed to the notifier without error (leads file included)
    pub delivered: usize,
    pub delivery_failures: usize,
    /// Alerts sent or attempted
    pub alerts: usize,
    /// New locations of archived inputs
    pub archived: Vec<PathBuf>,
}

impl RunSummary {
    fn new(day: DayNumber) -> Self {
        Self {
            day,
            leads_file: None,
            outcomes: Vec::new(),
            artifacts: Vec::new(),
            delivered: 0,
            delivery_failures: 0,
            alerts: 0,
            archived: Vec::new(),
        }
    }

    /// Unique phones written over all artifacts
    pub fn total_phones(&self) -> usize {
        self.artifacts.iter().map(|artifact| artifact.phones).sum()
    }

    pub fn skipped_files(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.skip_reason().is_some())
            .count()
    }

    /// Write the per-file and per-artifact report to the log
    pub fn log(&self) {
        for outcome in &self.outcomes {
            match outcome {
                FileOutcome::Accepted {
                    file,
                    rows_per_bucket,
                    blank_rows,
                    ..
                } => {
                    let rows: usize = rows_per_bucket.values().sum();
                    info!(file = %file, rows, blank_rows, "File accepted");
                }
                FileOutcome::Skipped { file, reason } => {
                    info!(file = %file, reason = %reason, "File skipped");
                }
            }
        }
        for artifact in &self.artifacts {
            info!(artifact = %artifact.name, phones = artifact.phones, "Artifact");
        }
        info!(
            day = %self.day,
            files = self.outcomes.len(),
            skipped = self.skipped_files(),
            artifacts = self.artifacts.len(),
            phones = self.total_phones(),
            delivered = self.delivered,
            delivery_failures = self.delivery_failures,
            alerts = self.alerts,
            archived = self.archived.len(),
            "Run finished"
        );
    }
}

/// Run the whole pipeline once for `today`.
///
/// Per-file problems and notifier failures never fail the run; only configuration and
/// filesystem errors of the inbox, outbox or archive do.
pub async fn run_once<N: Notifier>(
    config: &AppConfig,
    notifier: &N,
    today: NaiveDate,
) -> Result<RunSummary, PipelineError> {
    let pipeline = &config.pipeline;
    let day = pipeline.day_policy.day_number(today);
    info!(date = %today, day = %day, inbox = %config.inbox_dir.display(), "Starting run");

    let mut summary = RunSummary::new(day);

    if let Some(leads_dir) = &config.leads_dir {
        match locate_previous_day(leads_dir, today) {
            Some(path) => {
                deliver(notifier, &path, &mut summary).await;
                summary.leads_file = Some(path);
            }
            None => info!(dir = %leads_dir.display(), "No leads file for yesterday"),
        }
    }

    let batch = load_batch(&config.inbox_dir)?;
    if batch.is_empty() {
        let message = format!("no CSV files in {}", config.inbox_dir.display());
        warn!(inbox = %config.inbox_dir.display(), "No CSV files, nothing to do");
        alert(notifier, &message, &mut summary).await;
        summary.log();
        return Ok(summary);
    }

    let aggregation = aggregate(&batch.files, &batch.rejected, day, &pipeline.routing);
    forward_warnings(notifier, &aggregation, pipeline.skip_severity, &mut summary).await;

    let artifacts = OutputWriter::new(&config.outbox_dir, pipeline.write_order).write(&aggregation)?;
    summary.outcomes = aggregation.outcomes;

    if artifacts.is_empty() {
        warn!("No output files produced");
        alert(notifier, "no output files produced", &mut summary).await;
        summary.log();
        return Ok(summary);
    }

    let artifacts = order_artifacts(artifacts);
    for artifact in &artifacts {
        deliver(notifier, &artifact.path, &mut summary).await;
    }
    summary.artifacts = artifacts;

    if let Some(archive_dir) = &config.archive_dir {
        summary.archived = archive_inputs(&batch.paths, archive_dir, today)?;
    }

    summary.log();
    Ok(summary)
}

async fn forward_warnings<N: Notifier>(
    notifier: &N,
    aggregation: &Aggregation,
    severity: SkipSeverity,
    summary: &mut RunSummary,
) {
    let lines: Vec<String> = aggregation
        .warnings()
        .map(|(file, reason)| format!("{file}: {reason}"))
        .collect();

    if lines.is_empty() || severity == SkipSeverity::Log {
        return;
    }

    let message = format!("skipped {} file(s)\n{}", lines.len(), lines.join("\n"));
    alert(notifier, &message, summary).await;
}

async fn alert<N: Notifier>(notifier: &N, message: &str, summary: &mut RunSummary) {
    summary.alerts += 1;
    if let Err(e) = notifier.alert(message).await {
        warn!(error = %e, "Alert could not be sent");
    }
}

async fn deliver<N: Notifier>(notifier: &N, path: &Path, summary: &mut RunSummary) {
    match notifier.deliver(path).await {
        Ok(()) => summary.delivered += 1,
        Err(e) => {
            summary.delivery_failures += 1;
            warn!(file = %path.display(), error = %e, "Delivery failed");
        }
    }
}
