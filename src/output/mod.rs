//! Output module for run summaries
//!
//! This module handles:
//! - Collecting the results of a harvest session
//! - Formatting harvest and deduplication summaries for the terminal

pub mod stats;

pub use stats::{format_bytes, print_dedup_report, print_summary, HarvestSummary};
