//! # Pipeline Tests
//!
//! Full runs over temporary inbox/outbox directories with a recording notifier.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use phone_buckets::config::{AppConfig, SkipSeverity};
use phone_buckets::day_number::DayNumberPolicy;
use phone_buckets::errors::PipelineError;
use phone_buckets::notifier::Notifier;
use phone_buckets::pipeline::run_once;

#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
    deliveries: Mutex<Vec<PathBuf>>,
    fail_deliveries: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            fail_deliveries: true,
            ..Self::default()
        }
    }

    fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    fn delivered_names(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    async fn alert(&self, message: &str) -> Result<(), PipelineError> {
        self.alerts.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn deliver(&self, path: &Path) -> Result<(), PipelineError> {
        self.deliveries.lock().unwrap().push(path.to_path_buf());
        if self.fail_deliveries {
            return Err(PipelineError::Notification("chat unavailable".to_string()));
        }
        Ok(())
    }
}

struct Dirs {
    _root: tempfile::TempDir,
    inbox: PathBuf,
    outbox: PathBuf,
    archive: PathBuf,
    leads: PathBuf,
}

fn dirs() -> Dirs {
    let root = tempfile::tempdir().unwrap();
    let inbox = root.path().join("csv");
    let leads = root.path().join("leads");
    fs::create_dir_all(&inbox).unwrap();
    fs::create_dir_all(&leads).unwrap();
    Dirs {
        inbox,
        outbox: root.path().join("txt"),
        archive: root.path().join("archive"),
        leads,
        _root: root,
    }
}

fn config(dirs: &Dirs) -> AppConfig {
    AppConfig {
        inbox_dir: dirs.inbox.clone(),
        outbox_dir: dirs.outbox.clone(),
        ..AppConfig::default()
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 19).unwrap()
}

#[tokio::test]
async fn test_full_run_delivers_in_priority_order() {
    let dirs = dirs();
    fs::write(dirs.inbox.join("MFO5.csv"), "phone\n+7900000001\n7900000001\n").unwrap();
    fs::write(dirs.inbox.join("253.csv"), "phone\n1\n").unwrap();
    fs::write(dirs.inbox.join("345.csv"), "phone\n2\n1\n").unwrap();
    fs::write(
        dirs.inbox.join("6_web.csv"),
        "phone,channel_id\n+5,15883\n+6,99999\n",
    )
    .unwrap();
    fs::write(
        dirs.inbox.join("broker.csv"),
        "phone,channel_id\n10,12063\n11,77\n",
    )
    .unwrap();

    let notifier = RecordingNotifier::default();
    let summary = run_once(&config(&dirs), &notifier, today()).await.unwrap();

    assert_eq!(
        notifier.delivered_names(),
        vec![
            "КР ДОП_10 (150).txt",
            "КР 1 (150).txt",
            "ББ ДОП_3 (150).txt",
            "ББ (150).txt",
            "Б1 (150).txt",
            "Б0 (150).txt",
        ]
    );
    assert!(notifier.alerts().is_empty());
    assert_eq!(summary.delivered, 6);
    assert_eq!(summary.skipped_files(), 0);
    assert_eq!(
        fs::read_to_string(dirs.outbox.join("Б1 (150).txt")).unwrap(),
        "1\n2"
    );
    assert_eq!(
        fs::read_to_string(dirs.outbox.join("Б0 (150).txt")).unwrap(),
        "7900000001"
    );
    // Without an archive directory the inputs stay where they are
    assert!(dirs.inbox.join("MFO5.csv").exists());
}

#[tokio::test]
async fn test_skip_warnings_become_one_alert() {
    let dirs = dirs();
    fs::write(dirs.inbox.join("MFO5.csv"), "phone\n\n  \n").unwrap();
    fs::write(dirs.inbox.join("389.csv"), "id\n1\n").unwrap();
    fs::write(dirs.inbox.join("other.csv"), "phone\n1\n").unwrap();
    fs::write(dirs.inbox.join("390.csv"), "phone\n7\n").unwrap();

    let notifier = RecordingNotifier::default();
    let summary = run_once(&config(&dirs), &notifier, today()).await.unwrap();

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("skipped 2 file(s)"));
    assert!(alerts[0].contains("389.csv: missing column 'phone'"));
    assert!(alerts[0].contains("MFO5.csv: no phone numbers"));
    assert!(!alerts[0].contains("other.csv"));

    assert_eq!(summary.skipped_files(), 3);
    assert_eq!(notifier.delivered_names(), vec!["Н2 (150).txt"]);
}

#[tokio::test]
async fn test_log_severity_keeps_warnings_out_of_alerts() {
    let dirs = dirs();
    fs::write(dirs.inbox.join("389.csv"), "id\n1\n").unwrap();
    fs::write(dirs.inbox.join("390.csv"), "phone\n7\n").unwrap();

    let mut config = config(&dirs);
    config.pipeline.skip_severity = SkipSeverity::Log;

    let notifier = RecordingNotifier::default();
    let summary = run_once(&config, &notifier, today()).await.unwrap();
    assert!(notifier.alerts().is_empty());
    assert_eq!(summary.skipped_files(), 1);
}

#[tokio::test]
async fn test_no_output_sends_alert() {
    let dirs = dirs();
    fs::write(dirs.inbox.join("MFO5.csv"), "phone\n\n").unwrap();

    let mut config = config(&dirs);
    config.pipeline.skip_severity = SkipSeverity::Log;
    config.archive_dir = Some(dirs.archive.clone());

    let notifier = RecordingNotifier::default();
    let summary = run_once(&config, &notifier, today()).await.unwrap();
    assert_eq!(notifier.alerts(), vec!["no output files produced".to_string()]);
    assert!(summary.artifacts.is_empty());
    assert!(notifier.delivered_names().is_empty());
    // Nothing was produced, so the input stays for another attempt
    assert!(dirs.inbox.join("MFO5.csv").exists());
}

#[tokio::test]
async fn test_leads_file_goes_first_and_inputs_are_archived() {
    let dirs = dirs();
    fs::write(dirs.leads.join("leads_sub6_18.10.2025.txt"), "lead").unwrap();
    fs::write(dirs.inbox.join("389.csv"), "phone\n1\n").unwrap();
    fs::create_dir_all(&dirs.archive).unwrap();
    fs::write(dirs.archive.join("389 (19.10).csv"), "earlier run").unwrap();

    let mut config = config(&dirs);
    config.leads_dir = Some(dirs.leads.clone());
    config.archive_dir = Some(dirs.archive.clone());

    let notifier = RecordingNotifier::default();
    let summary = run_once(&config, &notifier, today()).await.unwrap();

    assert_eq!(
        notifier.delivered_names(),
        vec!["leads_sub6_18.10.2025.txt", "Н1 (150).txt"]
    );
    assert_eq!(
        summary.leads_file,
        Some(dirs.leads.join("leads_sub6_18.10.2025.txt"))
    );
    assert_eq!(summary.archived, vec![dirs.archive.join("389 (19.10) 2.csv")]);
    assert!(!dirs.inbox.join("389.csv").exists());
    assert_eq!(
        fs::read_to_string(dirs.archive.join("389 (19.10).csv")).unwrap(),
        "earlier run"
    );
}

#[tokio::test]
async fn test_delivery_failures_do_not_fail_the_run() {
    let dirs = dirs();
    fs::write(dirs.inbox.join("389.csv"), "phone\n1\n").unwrap();
    fs::write(dirs.inbox.join("390.csv"), "phone\n2\n").unwrap();

    let notifier = RecordingNotifier::failing();
    let summary = run_once(&config(&dirs), &notifier, today()).await.unwrap();
    assert_eq!(summary.delivered, 0);
    assert_eq!(summary.delivery_failures, 2);
    assert_eq!(summary.artifacts.len(), 2);
    assert!(dirs.outbox.join("Н1 (150).txt").is_file());
}

#[tokio::test]
async fn test_legacy_day_policy_run() {
    let dirs = dirs();
    fs::write(dirs.inbox.join("MFO5.csv"), "phone\n1\n").unwrap();

    let mut config = config(&dirs);
    config.pipeline.day_policy = DayNumberPolicy::legacy_day_of_year();

    let notifier = RecordingNotifier::default();
    run_once(&config, &notifier, today()).await.unwrap();
    assert_eq!(notifier.delivered_names(), vec!["Б0 (207).txt"]);
}

#[tokio::test]
async fn test_rerun_replaces_artifacts() {
    let dirs = dirs();
    fs::write(dirs.inbox.join("MFO5.csv"), "phone\n2\n1\n").unwrap();

    let notifier = RecordingNotifier::default();
    run_once(&config(&dirs), &notifier, today()).await.unwrap();
    let first = fs::read(dirs.outbox.join("Б0 (150).txt")).unwrap();
    run_once(&config(&dirs), &notifier, today()).await.unwrap();
    let second = fs::read(dirs.outbox.join("Б0 (150).txt")).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, b"1\n2");
}
