//! Crawler module for rendered page traversal
//!
//! This module contains the core harvesting logic, including:
//! - Media and link extraction from rendered pages
//! - The depth-first crawl engine
//! - Sinks that receive discovered media URLs
//! - Overall session coordination

mod coordinator;
mod engine;
mod extract;
mod sink;

pub use coordinator::{run_dedup, Harvester};
pub use engine::{CrawlOptions, CrawlReport, Crawler};
pub use extract::{parse_srcset, parse_style_urls, resolve_page_links, MediaReferences};
pub use sink::{CollectSink, MediaSink};
