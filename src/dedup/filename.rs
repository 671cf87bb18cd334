use super::{best_quality, group_from, DuplicateGroup, FileInfo, MatchReason};
use crate::download::split_extension;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Trailing copy markers: `_2`, `-3`, ` (1)`, ` copy`, `-copy-2`
///
/// Numeric suffixes are limited to three digits so camera-style names such
/// as `IMG_4032` keep their identity.
static COPY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)(?:[_-]\d{1,3}|\s*\(\d+\)|[\s_-]+copy(?:[\s_-]*\d+)?)$")
        .expect("hardcoded regex pattern is valid")
});

/// Base name of a file with one trailing copy marker removed
///
/// `photo_1.jpg`, `photo (2).jpg` and `photo copy.jpg` all map to `photo`.
pub fn base_identity(filename: &str) -> &str {
    let (stem, _) = split_extension(filename);
    COPY_SUFFIX
        .captures(stem)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end())
        .unwrap_or(stem)
}

/// Groups files in the same directory with the same base name and extension
///
/// Each group keeps the file with the most pixels, then the most bytes.
pub fn group_by_filename(files: &[FileInfo]) -> Vec<DuplicateGroup> {
    let mut by_key: BTreeMap<(PathBuf, String, String), Vec<FileInfo>> = BTreeMap::new();

    for file in files {
        let directory = file.path.parent().map(PathBuf::from).unwrap_or_default();
        by_key
            .entry((directory, file.base_name.clone(), file.extension.clone()))
            .or_default()
            .push(file.clone());
    }

    by_key
        .into_values()
        .filter(|members| members.len() > 1)
        .map(|members| {
            let keep = best_quality(&members);
            group_from(members, keep, MatchReason::Filename)
        })
        .collect()
}
