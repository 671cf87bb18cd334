//! Plain-text run summaries
//!
//! This module formats the outcome of a harvest session or a standalone
//! deduplication pass for display on stdout.

use crate::crawler::CrawlReport;
use crate::dedup::{DedupReport, MatchReason};
use crate::download::DownloadStats;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Everything a harvest session produced
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub seed: String,
    pub output_root: PathBuf,

    /// Hosts downloads were allowed from, sorted
    pub allowed_domains: Vec<String>,

    pub crawl: CrawlReport,
    pub downloads: DownloadStats,

    /// None when the dedup pass did not run
    pub dedup: Option<DedupReport>,

    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HarvestSummary {
    /// Wall-clock duration of the session in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Harvest Summary ===\n")?;
        if self.dry_run {
            writeln!(f, "DRY RUN: nothing was downloaded or deleted\n")?;
        }

        writeln!(f, "Session:")?;
        writeln!(f, "  Seed: {}", self.seed)?;
        writeln!(f, "  Output: {}", self.output_root.display())?;
        writeln!(
            f,
            "  Started: {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "  Duration: {}s", self.duration_seconds())?;
        if self.crawl.cancelled {
            writeln!(f, "  Interrupted before completion")?;
        }
        writeln!(f)?;

        writeln!(f, "Allowed Domains ({}):", self.allowed_domains.len())?;
        for domain in &self.allowed_domains {
            writeln!(f, "  - {}", domain)?;
        }
        writeln!(f)?;

        writeln!(f, "Crawl:")?;
        writeln!(f, "  Pages rendered: {}", self.crawl.pages_rendered)?;
        writeln!(f, "  Pages failed: {}", self.crawl.pages_failed)?;
        writeln!(f, "  Media URLs found: {}", self.crawl.media_found)?;
        writeln!(f)?;

        let downloads = &self.downloads;
        writeln!(f, "Downloads:")?;
        if self.dry_run {
            writeln!(f, "  Would download: {}", downloads.dry_run)?;
        } else {
            writeln!(
                f,
                "  Saved: {} ({})",
                downloads.saved,
                format_bytes(downloads.bytes)
            )?;
        }
        writeln!(f, "  Failed: {}", downloads.failed)?;
        writeln!(f, "  Skipped: {}", downloads.skipped_total())?;
        for (reason, count) in &downloads.skipped {
            writeln!(f, "    {}: {}", reason, count)?;
        }

        if let Some(dedup) = &self.dedup {
            writeln!(f)?;
            write!(f, "{}", dedup)?;
        }

        Ok(())
    }
}

impl fmt::Display for DedupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (removed, freed) = if self.dry_run {
            ("Would remove", "Would free")
        } else {
            ("Removed", "Freed")
        };

        writeln!(f, "Deduplication:")?;
        writeln!(f, "  Files scanned: {}", self.files_scanned)?;
        for reason in [MatchReason::Filename, MatchReason::Identical, MatchReason::Visual] {
            let groups = self.groups_for(reason);
            if groups > 0 {
                writeln!(f, "  {} groups: {}", reason, groups)?;
            }
        }
        writeln!(f, "  {}: {} files", removed, self.files_removed)?;
        writeln!(f, "  {}: {}", freed, format_bytes(self.bytes_freed))?;

        if !self.errors.is_empty() {
            writeln!(f, "  Errors ({}):", self.errors.len())?;
            for (path, error) in &self.errors {
                writeln!(f, "    {}: {}", path.display(), error)?;
            }
        }

        Ok(())
    }
}

/// Prints a harvest summary to stdout
pub fn print_summary(summary: &HarvestSummary) {
    print!("{}", summary);
}

/// Prints a deduplication report to stdout
pub fn print_dedup_report(report: &DedupReport) {
    print!("{}", report);
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
