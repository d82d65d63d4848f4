//! # File Classifier Module
//!
//! Maps an inbound file name to one of a fixed set of categories. The rule table is business
//! policy, evaluated in a fixed precedence order; the first matching substring wins.

use log::trace;

use crate::routing::ChannelTable;

/// Outcome of classifying a source file by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Every phone of the file goes to the bucket with this tag
    Passthrough { tag: &'static str },
    /// Like passthrough, but several files of one run share the bucket
    Combine { tag: &'static str },
    /// Each row is routed by its `channel_id` through the given table
    ChannelSplit { table: ChannelTable },
    /// No rule matches; the file is skipped
    Unrecognized,
}

impl Classification {
    /// Whether rows of this category need a `channel_id` column
    pub fn needs_channel_id(&self) -> bool {
        matches!(self, Classification::ChannelSplit { .. })
    }

    /// Fixed tag for passthrough and combine categories
    pub fn fixed_tag(&self) -> Option<&'static str> {
        match self {
            Classification::Passthrough { tag } | Classification::Combine { tag } => Some(tag),
            _ => None,
        }
    }
}

/// Ordered classification rules: substrings tested against the file name
const RULES: &[(&[&str], Classification)] = &[
    (&["MFO5"], Classification::Passthrough { tag: "Б0" }),
    (
        &["6_web"],
        Classification::ChannelSplit {
            table: ChannelTable::Web,
        },
    ),
    (
        &["broker"],
        Classification::ChannelSplit {
            table: ChannelTable::Broker,
        },
    ),
    (&["253", "345"], Classification::Combine { tag: "Б1" }),
    (&["389"], Classification::Passthrough { tag: "Н1" }),
    (&["390"], Classification::Passthrough { tag: "Н2" }),
];

/// Classify a file by its base name (case-sensitive, not normalized).
///
/// # Examples
///
/// ```rust
/// use phone_buckets::classifier::{classify, Classification};
///
/// assert_eq!(classify("MFO5 (17.10).csv"), Classification::Passthrough { tag: "Б0" });
/// assert_eq!(classify("leads.csv"), Classification::Unrecognized);
/// ```
pub fn classify(file_name: &str) -> Classification {
    let classification = RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| file_name.contains(needle)))
        .map(|(_, classification)| *classification)
        .unwrap_or(Classification::Unrecognized);

    trace!("Classified {file_name} as {classification:?}");
    classification
}
