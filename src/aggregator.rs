//! # Aggregator Module
//!
//! Runs the classifier, normalizer and router over a batch and merges the phones into
//! deduplicated buckets keyed by their final output file name.
//!
//! Per-file problems never abort aggregation: the file is skipped, the reason is kept in the
//! file's [`FileOutcome`] and a structured warning is logged.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

use crate::classifier::{classify, Classification};
use crate::day_number::DayNumber;
use crate::errors::SkipReason;
use crate::naming::artifact_name;
use crate::phone::normalize_cell;
use crate::routing::RoutingTables;
use crate::source::{RejectedFile, SourceFile, CHANNEL_ID_COLUMN, PHONE_COLUMN};

/// Accumulator of unique phones destined for one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    name: String,
    tag: String,
    members: HashSet<String>,
    first_seen: Vec<String>,
}

impl Bucket {
    pub fn new(tag: &str, day: DayNumber) -> Self {
        Self {
            name: artifact_name(tag, day),
            tag: tag.to_string(),
            members: HashSet::new(),
            first_seen: Vec::new(),
        }
    }

    /// Output file name, e.g. `Б1 (150).txt`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Add a normalized phone; returns `false` if it was already present
    pub fn insert(&mut self, phone: String) -> bool {
        if self.members.contains(&phone) {
            return false;
        }
        self.members.insert(phone.clone());
        self.first_seen.push(phone);
        true
    }

    pub fn contains(&self, phone: &str) -> bool {
        self.members.contains(phone)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending lexical order
    pub fn sorted(&self) -> Vec<&str> {
        let mut phones: Vec<&str> = self.members.iter().map(String::as_str).collect();
        phones.sort_unstable();
        phones
    }

    /// Members in the order they were first contributed
    pub fn first_seen(&self) -> &[String] {
        &self.first_seen
    }
}

/// What happened to one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Accepted {
        file: String,
        classification: Classification,
        /// Rows with a usable phone, per bucket name (duplicates included)
        rows_per_bucket: BTreeMap<String, usize>,
        /// Rows dropped because the phone was blank
        blank_rows: usize,
    },
    Skipped {
        file: String,
        reason: SkipReason,
    },
}

impl FileOutcome {
    pub fn file(&self) -> &str {
        match self {
            FileOutcome::Accepted { file, .. } | FileOutcome::Skipped { file, .. } => file,
        }
    }

    /// Skip reason, when the file contributed nothing
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            FileOutcome::Skipped { reason, .. } => Some(reason),
            FileOutcome::Accepted { .. } => None,
        }
    }
}

/// Result of aggregating one batch
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub day: DayNumber,
    /// Buckets in creation order
    pub buckets: Vec<Bucket>,
    /// One outcome per input file, in input order (rejected files first)
    pub outcomes: Vec<FileOutcome>,
}

impl Aggregation {
    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|bucket| bucket.name() == name)
    }

    /// Skipped files whose reason deserves a warning
    pub fn warnings(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.outcomes.iter().filter_map(|outcome| {
            outcome
                .skip_reason()
                .filter(|reason| reason.is_warning())
                .map(|reason| (outcome.file(), reason))
        })
    }

    /// Number of unique phones over all buckets
    pub fn total_phones(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }
}

/// Incremental aggregation of one batch
pub struct Aggregator<'a> {
    day: DayNumber,
    routing: &'a RoutingTables,
    buckets: Vec<Bucket>,
    index: HashMap<String, usize>,
    outcomes: Vec<FileOutcome>,
}

impl<'a> Aggregator<'a> {
    pub fn new(day: DayNumber, routing: &'a RoutingTables) -> Self {
        Self {
            day,
            routing,
            buckets: Vec::new(),
            index: HashMap::new(),
            outcomes: Vec::new(),
        }
    }

    /// Record a file that never made it past parsing
    pub fn add_rejected(&mut self, rejected: &RejectedFile) {
        self.skip(&rejected.name, rejected.reason.clone());
    }

    /// Classify one file and merge its phones into the buckets
    pub fn add_file(&mut self, file: &SourceFile) {
        let routing = self.routing;
        let classification = classify(&file.name);

        if classification == Classification::Unrecognized {
            self.skip(&file.name, SkipReason::Unrecognized);
            return;
        }
        if !file.has_column(PHONE_COLUMN) {
            self.skip(&file.name, SkipReason::MissingColumn(PHONE_COLUMN));
            return;
        }
        if !file.has_any_phone() {
            self.skip(&file.name, SkipReason::NoPhones);
            return;
        }
        if classification.needs_channel_id() && !file.has_column(CHANNEL_ID_COLUMN) {
            self.skip(&file.name, SkipReason::MissingColumn(CHANNEL_ID_COLUMN));
            return;
        }

        let mut rows_per_bucket = BTreeMap::new();
        let mut blank_rows = 0;

        for record in &file.records {
            let Some(phone) = normalize_cell(record.phone.as_deref()) else {
                blank_rows += 1;
                continue;
            };

            let tag = match classification {
                Classification::Passthrough { tag } | Classification::Combine { tag } => tag,
                Classification::ChannelSplit { table } => {
                    routing.route(table, record.channel_id.as_deref())
                }
                Classification::Unrecognized => continue,
            };

            let bucket = self.bucket_mut(tag);
            let name = bucket.name().to_string();
            bucket.insert(phone);
            *rows_per_bucket.entry(name).or_insert(0) += 1;
        }

        let summary = rows_per_bucket
            .iter()
            .map(|(bucket, rows)| format!("{bucket}: {rows}"))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            file = %file.name,
            rows = file.records.len(),
            blank_rows,
            buckets = %summary,
            "Processed source file"
        );

        self.outcomes.push(FileOutcome::Accepted {
            file: file.name.clone(),
            classification,
            rows_per_bucket,
            blank_rows,
        });
    }

    /// Final bucket set and per-file report
    pub fn finish(self) -> Aggregation {
        Aggregation {
            day: self.day,
            buckets: self.buckets,
            outcomes: self.outcomes,
        }
    }

    fn bucket_mut(&mut self, tag: &str) -> &mut Bucket {
        let name = artifact_name(tag, self.day);
        let idx = match self.index.get(&name) {
            Some(idx) => *idx,
            None => {
                self.buckets.push(Bucket::new(tag, self.day));
                let idx = self.buckets.len() - 1;
                self.index.insert(name, idx);
                idx
            }
        };
        &mut self.buckets[idx]
    }

    fn skip(&mut self, file: &str, reason: SkipReason) {
        match &reason {
            SkipReason::Unrecognized => {
                info!(file = %file, "File name matches no rule, skipping")
            }
            SkipReason::MissingColumn(column) => {
                warn!(file = %file, column = %column, "Required column missing, skipping file")
            }
            SkipReason::NoPhones => {
                warn!(file = %file, column = PHONE_COLUMN, "Phone column is blank, skipping file")
            }
            SkipReason::Unreadable(error) => {
                warn!(file = %file, error = %error, "Unreadable CSV, skipping file")
            }
        }
        self.outcomes.push(FileOutcome::Skipped {
            file: file.to_string(),
            reason,
        });
    }
}

/// Aggregate a whole batch in one call
///
/// # Examples
///
/// ```rust
/// use phone_buckets::aggregator::aggregate;
/// use phone_buckets::day_number::DayNumber;
/// use phone_buckets::routing::RoutingTables;
/// use phone_buckets::source::SourceFile;
///
/// let file = SourceFile::from_reader("MFO5.csv", "phone\n+7900\n7900\n".as_bytes())?;
/// let aggregation = aggregate(&[file], &[], DayNumber(53), &RoutingTables::default());
/// assert_eq!(aggregation.bucket("Б0 (53).txt").map(|b| b.len()), Some(1));
/// # Ok::<(), phone_buckets::errors::PipelineError>(())
/// ```
pub fn aggregate(
    files: &[SourceFile],
    rejected: &[RejectedFile],
    day: DayNumber,
    routing: &RoutingTables,
) -> Aggregation {
    let mut aggregator = Aggregator::new(day, routing);
    for file in rejected {
        aggregator.add_rejected(file);
    }
    for file in files {
        aggregator.add_file(file);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InputRecord;

    fn phones_file(name: &str, phones: &[&str]) -> SourceFile {
        SourceFile::new(
            name,
            vec!["phone".to_string()],
            phones.iter().map(|p| InputRecord::new(Some(*p), None)).collect(),
        )
    }

    fn split_file(name: &str, rows: &[(&str, &str)]) -> SourceFile {
        SourceFile::new(
            name,
            vec!["phone".to_string(), "channel_id".to_string()],
            rows.iter()
                .map(|(phone, channel)| InputRecord::new(Some(*phone), Some(*channel)))
                .collect(),
        )
    }

    fn run(files: &[SourceFile]) -> Aggregation {
        aggregate(files, &[], DayNumber(150), &RoutingTables::default())
    }

    #[test]
    fn test_bucket_dedup_keeps_first_seen_order() {
        let mut bucket = Bucket::new("Б0", DayNumber(1));
        assert!(bucket.insert("3".into()));
        assert!(bucket.insert("1".into()));
        assert!(!bucket.insert("3".into()));
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket.first_seen(), ["3", "1"]);
        assert_eq!(bucket.sorted(), vec!["1", "3"]);
        assert_eq!(bucket.name(), "Б0 (1).txt");
    }

    #[test]
    fn test_passthrough_dedup() {
        let aggregation = run(&[phones_file("MFO5.csv", &["+7900000001", "7900000001 "])]);
        let bucket = aggregation.bucket("Б0 (150).txt").unwrap();
        assert_eq!(bucket.sorted(), vec!["7900000001"]);
    }

    #[test]
    fn test_combine_bucket_merges_files() {
        let aggregation = run(&[
            phones_file("253.csv", &["1"]),
            phones_file("345.csv", &["2", "1"]),
        ]);
        assert_eq!(aggregation.buckets.len(), 1);
        assert_eq!(
            aggregation.bucket("Б1 (150).txt").unwrap().sorted(),
            vec!["1", "2"]
        );
    }

    #[test]
    fn test_web_split() {
        let aggregation = run(&[split_file("6_web.csv", &[("+5", "15883"), ("+6", "99999")])]);
        assert_eq!(aggregation.bucket("ББ (150).txt").unwrap().sorted(), vec!["5"]);
        assert_eq!(
            aggregation.bucket("ББ ДОП_3 (150).txt").unwrap().sorted(),
            vec!["6"]
        );
    }

    #[test]
    fn test_broker_split_with_missing_channel_cell() {
        let file = SourceFile::new(
            "broker.csv",
            vec!["phone".to_string(), "channel_id".to_string()],
            vec![
                InputRecord::new(Some("1"), Some("12063")),
                InputRecord::new(Some("2"), None),
            ],
        );
        let aggregation = run(&[file]);
        assert!(aggregation.bucket("КР 1 (150).txt").unwrap().contains("1"));
        assert!(aggregation.bucket("КР ДОП_10 (150).txt").unwrap().contains("2"));
    }

    #[test]
    fn test_missing_phone_column_skipped() {
        let file = SourceFile::new("MFO5.csv", vec!["id".to_string()], vec![InputRecord::default()]);
        let aggregation = run(&[file, phones_file("389.csv", &["1"])]);

        assert_eq!(aggregation.buckets.len(), 1);
        assert_eq!(
            aggregation.outcomes[0].skip_reason(),
            Some(&SkipReason::MissingColumn("phone"))
        );
        assert_eq!(aggregation.warnings().count(), 1);
    }

    #[test]
    fn test_missing_channel_column_skipped_entirely() {
        let aggregation = run(&[phones_file("6_web.csv", &["1", "2"])]);
        assert!(aggregation.buckets.is_empty());
        assert_eq!(
            aggregation.outcomes[0].skip_reason(),
            Some(&SkipReason::MissingColumn("channel_id"))
        );
    }

    #[test]
    fn test_unrecognized_is_not_a_warning() {
        let aggregation = run(&[phones_file("other.csv", &["1"])]);
        assert!(aggregation.buckets.is_empty());
        assert_eq!(
            aggregation.outcomes[0].skip_reason(),
            Some(&SkipReason::Unrecognized)
        );
        assert_eq!(aggregation.warnings().count(), 0);
    }

    #[test]
    fn test_blank_rows_counted() {
        let aggregation = run(&[phones_file("MFO5.csv", &["1", " ", "+"])]);
        match &aggregation.outcomes[0] {
            FileOutcome::Accepted {
                blank_rows,
                rows_per_bucket,
                ..
            } => {
                assert_eq!(*blank_rows, 2);
                assert_eq!(rows_per_bucket.get("Б0 (150).txt"), Some(&1));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_rejected_files_reported_first() {
        let rejected = RejectedFile {
            name: "MFO5.csv".to_string(),
            reason: SkipReason::Unreadable("bad".into()),
        };
        let aggregation = aggregate(
            &[phones_file("389.csv", &["1"])],
            &[rejected],
            DayNumber(1),
            &RoutingTables::default(),
        );
        assert_eq!(aggregation.outcomes[0].file(), "MFO5.csv");
        assert_eq!(aggregation.total_phones(), 1);
    }
}
