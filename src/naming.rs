//! # Artifact Naming Module
//!
//! Output files are named `<tag> (<day number>).txt`. Downstream consumers (ordering, later
//! runs) recover the tag by splitting on `" ("`, so a tag never contains `(`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::day_number::DayNumber;

pub const ARTIFACT_EXTENSION: &str = "txt";

lazy_static! {
    static ref ARTIFACT_NAME_REGEX: Regex = Regex::new(r"^(?P<tag>[^(]+) \((?P<day>-?\d+)\)\.txt$")
        .expect("Artifact name pattern should be valid");
}

/// Build the output file name of a bucket
///
/// # Examples
///
/// ```rust
/// use phone_buckets::day_number::DayNumber;
/// use phone_buckets::naming::artifact_name;
///
/// assert_eq!(artifact_name("ББ ДОП_3", DayNumber(150)), "ББ ДОП_3 (150).txt");
/// ```
pub fn artifact_name(tag: &str, day: DayNumber) -> String {
    format!("{tag} ({day}).{ARTIFACT_EXTENSION}")
}

/// A file name split into its tag and day number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub tag: String,
    pub day: DayNumber,
}

impl ArtifactName {
    /// Parse a name produced by [`artifact_name`]; anything else yields `None`
    pub fn parse(file_name: &str) -> Option<Self> {
        let captures = ARTIFACT_NAME_REGEX.captures(file_name)?;
        let day = captures["day"].parse::<i64>().ok()?;
        Some(Self {
            tag: captures["tag"].to_string(),
            day: DayNumber(day),
        })
    }
}

/// Tag part of any file name, as the ordering rules see it.
///
/// The extension is dropped; if what remains ends with `)`, everything from the first `" ("`
/// on is dropped too. Names outside the grammar come back mostly unchanged.
pub fn tag_of(file_name: &str) -> &str {
    let base = match file_name.rsplit_once('.') {
        Some((base, _)) => base,
        None => file_name,
    };

    if base.ends_with(')') {
        base.split(" (").next().unwrap_or(base)
    } else {
        base
    }
}
