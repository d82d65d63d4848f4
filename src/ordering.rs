//! # Output Ordering Module
//!
//! Fixes the order in which written files are handed downstream (delivery, upload). The
//! order only affects sequencing, never bucket contents.

use std::path::Path;

use crate::naming::{tag_of, ArtifactName};
use crate::writer::Artifact;

/// Tags in delivery order, highest priority first
pub const OUTPUT_PRIORITY: [&str; 15] = [
    "КР ДОП_10",
    "КР ДОП_9",
    "КР ДОП_8",
    "КР ДОП_7",
    "КР ДОП_6",
    "КР ДОП_5",
    "КР ДОП_4",
    "КР ДОП_3",
    "КР 2",
    "КР 1",
    "ББ ДОП_3",
    "ББ ДОП_2",
    "ББ",
    "Б1",
    "Б0",
];

/// Sort rank of a file name; unknown tags rank after every known one.
///
/// Artifact names are parsed strictly; anything else falls back to [`tag_of`].
pub fn priority_of(file_name: &str) -> usize {
    match ArtifactName::parse(file_name) {
        Some(artifact) => rank_of(&artifact.tag),
        None => rank_of(tag_of(file_name)),
    }
}

fn rank_of(tag: &str) -> usize {
    OUTPUT_PRIORITY
        .iter()
        .position(|known| *known == tag)
        .unwrap_or(OUTPUT_PRIORITY.len())
}

/// Stable sort of file names or paths by [`OUTPUT_PRIORITY`]
///
/// # Examples
///
/// ```rust
/// use phone_buckets::ordering::order_names;
///
/// let ordered = order_names(vec!["Б0 (5).txt", "Н1 (5).txt", "КР 1 (5).txt"]);
/// assert_eq!(ordered, vec!["КР 1 (5).txt", "Б0 (5).txt", "Н1 (5).txt"]);
/// ```
pub fn order_names<P: AsRef<Path>>(mut names: Vec<P>) -> Vec<P> {
    names.sort_by_key(|name| priority_of(&file_name_of(name.as_ref())));
    names
}

/// Stable sort of artifacts by [`OUTPUT_PRIORITY`]
pub fn order_artifacts(mut artifacts: Vec<Artifact>) -> Vec<Artifact> {
    artifacts.sort_by_key(|artifact| priority_of(&artifact.name));
    artifacts
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_priority_of_known_tags() {
        assert_eq!(priority_of("КР ДОП_10 (150).txt"), 0);
        assert_eq!(priority_of("Б0 (150).txt"), 14);
        assert_eq!(priority_of("ББ (3).txt"), 12);
    }

    #[test]
    fn test_unknown_tags_last() {
        assert_eq!(priority_of("Н2 (150).txt"), OUTPUT_PRIORITY.len());
        assert_eq!(priority_of("ББ ДОП_1 (150).txt"), OUTPUT_PRIORITY.len());
        assert_eq!(priority_of("notes.txt"), OUTPUT_PRIORITY.len());
    }

    #[test]
    fn test_names_outside_artifact_grammar() {
        // Not an artifact name, but the tag is still recognizable
        assert_eq!(priority_of("Б0 (x).txt"), 14);
        assert_eq!(priority_of("КР 2.txt"), 8);
        assert_eq!(priority_of("leads_sub6_18.10.2025.txt"), OUTPUT_PRIORITY.len());
    }

    #[test]
    fn test_full_ordering_is_stable() {
        let names = vec![
            "Н1 (9).txt",
            "Б0 (9).txt",
            "ББ ДОП_1 (9).txt",
            "ББ (9).txt",
            "КР ДОП_10 (9).txt",
            "Б1 (9).txt",
            "Н2 (9).txt",
            "КР 1 (9).txt",
        ];
        assert_eq!(
            order_names(names),
            vec![
                "КР ДОП_10 (9).txt",
                "КР 1 (9).txt",
                "ББ (9).txt",
                "Б1 (9).txt",
                "Б0 (9).txt",
                "Н1 (9).txt",
                "ББ ДОП_1 (9).txt",
                "Н2 (9).txt",
            ]
        );
    }

    #[test]
    fn test_order_paths_uses_base_name() {
        let paths = vec![
            PathBuf::from("/opt/bot/txt/Б0 (1).txt"),
            PathBuf::from("/opt/bot/txt/КР 2 (1).txt"),
        ];
        let ordered = order_names(paths);
        assert_eq!(ordered[0], PathBuf::from("/opt/bot/txt/КР 2 (1).txt"));
    }

    #[test]
    fn test_order_artifacts() {
        let artifact = |name: &str| Artifact {
            name: name.to_string(),
            path: PathBuf::from(name),
            phones: 1,
        };
        let ordered = order_artifacts(vec![artifact("Б1 (2).txt"), artifact("КР ДОП_3 (2).txt")]);
        assert_eq!(ordered[0].name, "КР ДОП_3 (2).txt");
        assert_eq!(ordered[1].name, "Б1 (2).txt");
    }
}
