//! URL handling module for Sumi-Harvest
//!
//! This module provides URL normalization, domain extraction, media
//! classification by extension, and the allowed-domain discovery policy.

mod domain;
mod normalize;
mod policy;

use std::path::Path;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, same_site};
pub use normalize::{normalize_url, parse_seed_url};
pub use policy::{discover_allowed_domains, is_asset_host, select_allowed_domains, ASSET_HOST_MARKERS};

/// Extensions treated as images
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "ico", "tif", "tiff", "avif", "heic",
];

/// Extensions treated as videos
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "avi", "mkv", "ogv"];

/// Media classification of a file or URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a bare extension (case-insensitive, without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }

    /// Classifies a filesystem path by its extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Classifies a URL by the extension of its last path segment
    ///
    /// Query strings and fragments are ignored, so
    /// `https://cdn.example.com/a/photo.JPG?w=300` is an image.
    pub fn from_url(url: &Url) -> Option<Self> {
        let segment = url.path().rsplit('/').next()?;
        let (_, ext) = segment.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

/// Returns true if the URL points at a recognized image or video file
pub fn is_media_url(url: &Url) -> bool {
    MediaKind::from_url(url).is_some()
}
