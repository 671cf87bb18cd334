//! Duplicate removal for a harvested media tree
//!
//! The deduplicator scans a directory and runs up to three phases, each over
//! the survivors of the previous one:
//!
//! | Phase | Groups files by | Keeps |
//! |-------|-----------------|-------|
//! | Filename | base name after stripping copy suffixes | most pixels, then largest |
//! | Identical | SHA-256 of the bytes | shortest filename |
//! | Visual | perceptual hash within a hamming threshold | most pixels, then largest |
//!
//! The whole pass is synchronous; callers on an async runtime run it on a
//! blocking thread.

mod content;
mod filename;
mod scan;
mod visual;

pub use content::group_identical;
pub use filename::{base_identity, group_by_filename};
pub use scan::scan_media;
pub use visual::group_similar;

use crate::config::DedupConfig;
use crate::inspect::{ContentInspector, VisualHash};
use crate::url::MediaKind;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// A media file found under the scanned root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub filename: String,

    /// Filename stem with one trailing copy marker removed
    pub base_name: String,

    /// Lowercase extension without the dot
    pub extension: String,
    pub kind: MediaKind,
    pub byte_size: u64,

    /// Width times height; 0 when dimensions are unknown
    pub pixel_count: u64,

    /// Set by the identical-content phase on grouped files
    pub content_hash: Option<String>,

    /// Set by the visual phase on clustered files
    pub visual_hash: Option<VisualHash>,
}

impl FileInfo {
    /// Quality order used by the filename and visual phases
    fn quality(&self) -> (u64, u64) {
        (self.pixel_count, self.byte_size)
    }
}

/// Why files were grouped as duplicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    Filename,
    Identical,
    Visual,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Filename => "filename",
            Self::Identical => "identical",
            Self::Visual => "visual",
        })
    }
}

/// One kept file and the files judged to duplicate it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub original: FileInfo,
    pub duplicates: Vec<FileInfo>,
    pub reason: MatchReason,
}

impl DuplicateGroup {
    /// Bytes held by the duplicates
    pub fn duplicate_bytes(&self) -> u64 {
        self.duplicates.iter().map(|f| f.byte_size).sum()
    }
}

/// Builds a group from members in scan order, keeping `keep`
fn group_from(mut members: Vec<FileInfo>, keep: usize, reason: MatchReason) -> DuplicateGroup {
    let original = members.remove(keep);
    DuplicateGroup {
        original,
        duplicates: members,
        reason,
    }
}

/// Index of the highest-quality member; the earliest wins ties
fn best_quality(members: &[FileInfo]) -> usize {
    let mut best = 0;
    for (i, file) in members.iter().enumerate().skip(1) {
        if file.quality() > members[best].quality() {
            best = i;
        }
    }
    best
}

/// Which phases run and whether files are actually removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupOptions {
    pub filename_phase: bool,
    pub content_phase: bool,
    pub visual_phase: bool,

    /// Largest hamming distance treated as the same image
    pub visual_threshold: u32,

    /// Log and count removals without deleting anything
    pub dry_run: bool,
}

impl DedupOptions {
    /// All phases, as run after a harvest
    pub fn pipeline(config: &DedupConfig, dry_run: bool) -> Self {
        Self {
            filename_phase: true,
            content_phase: true,
            visual_phase: config.visual,
            visual_threshold: config.visual_threshold,
            dry_run,
        }
    }

    /// Content and visual phases only, as run on an arbitrary directory
    pub fn standalone(config: &DedupConfig, dry_run: bool) -> Self {
        Self {
            filename_phase: false,
            ..Self::pipeline(config, dry_run)
        }
    }
}

/// Outcome of a deduplication pass
#[derive(Debug, Clone, Default)]
pub struct DedupReport {
    pub files_scanned: usize,
    pub groups: Vec<DuplicateGroup>,

    /// Files deleted, or that would be deleted in dry-run mode
    pub files_removed: usize,
    pub bytes_freed: u64,

    /// Files that could not be deleted
    pub errors: Vec<(PathBuf, String)>,
    pub dry_run: bool,
}

impl DedupReport {
    /// Number of groups found by one phase
    pub fn groups_for(&self, reason: MatchReason) -> usize {
        self.groups.iter().filter(|g| g.reason == reason).count()
    }
}

/// Runs the deduplication phases over a directory tree
pub struct Deduplicator<'a> {
    inspector: &'a dyn ContentInspector,
    options: DedupOptions,
}

impl<'a> Deduplicator<'a> {
    pub fn new(inspector: &'a dyn ContentInspector, options: DedupOptions) -> Self {
        Self { inspector, options }
    }

    /// Scans `root` and removes duplicates phase by phase
    pub fn run(&self, root: &Path) -> DedupReport {
        let mut report = DedupReport {
            dry_run: self.options.dry_run,
            ..DedupReport::default()
        };

        let mut files = scan_media(root, self.inspector);
        report.files_scanned = files.len();
        tracing::info!("Scanning {} media files under {}", files.len(), root.display());

        if self.options.filename_phase {
            let groups = group_by_filename(&files);
            files = self.apply(groups, files, &mut report);
        }

        if self.options.content_phase {
            let groups = group_identical(&files, self.inspector);
            files = self.apply(groups, files, &mut report);
        }

        if self.options.visual_phase {
            let groups = group_similar(&files, self.inspector, self.options.visual_threshold);
            self.apply(groups, files, &mut report);
        }

        tracing::info!(
            dry_run = self.options.dry_run,
            "Deduplication removed {} files ({} bytes) in {} groups",
            report.files_removed,
            report.bytes_freed,
            report.groups.len()
        );

        report
    }

    /// Removes each group's duplicates and returns the remaining files
    ///
    /// A file that fails to delete is still excluded from later phases.
    fn apply(
        &self,
        groups: Vec<DuplicateGroup>,
        files: Vec<FileInfo>,
        report: &mut DedupReport,
    ) -> Vec<FileInfo> {
        let mut removed = HashSet::new();

        for group in groups {
            for duplicate in &group.duplicates {
                tracing::info!(
                    reason = %group.reason,
                    dry_run = self.options.dry_run,
                    "Removing duplicate {} (keeping {})",
                    duplicate.path.display(),
                    group.original.path.display()
                );

                removed.insert(duplicate.path.clone());

                if self.options.dry_run {
                    report.files_removed += 1;
                    report.bytes_freed += duplicate.byte_size;
                    continue;
                }

                match std::fs::remove_file(&duplicate.path) {
                    Ok(()) => {
                        report.files_removed += 1;
                        report.bytes_freed += duplicate.byte_size;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to remove {}: {}", duplicate.path.display(), e);
                        report.errors.push((duplicate.path.clone(), e.to_string()));
                    }
                }
            }

            report.groups.push(group);
        }

        files
            .into_iter()
            .filter(|f| !removed.contains(&f.path))
            .collect()
    }
}
