//! State module for tracking crawl progress
//!
//! This module provides the session state shared by the crawl engine and the
//! download workers.
//!
//! # Components
//!
//! - `CrawlState`: visited pages, allowed domains, dispatched downloads and
//!   kept content hashes for one harvest session

mod crawl_state;

// Re-export main types
pub use crawl_state::CrawlState;
