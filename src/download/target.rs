//! Destination paths for downloaded media
//!
//! Files land in `<output root>/<host>/<filename>`, where the filename is the
//! percent-decoded last path segment of the URL with characters that are
//! unsafe on common filesystems replaced.

use crate::url::extract_domain;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Longest filename stem kept before the extension
const MAX_STEM_CHARS: usize = 150;

/// Highest collision suffix tried before giving up
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Where one media URL is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub url: Url,

    /// Host the file came from, also the name of its directory
    pub domain: String,

    /// Filename before any collision suffix
    pub filename: String,

    /// Preferred destination; may be replaced by a suffixed sibling
    pub filepath: PathBuf,
}

impl MediaFile {
    /// Resolves the destination of `url` below `output_root`
    ///
    /// Returns None when the URL has no host or no usable filename.
    pub fn resolve(url: &Url, output_root: &Path) -> Option<Self> {
        let domain = extract_domain(url)?;
        let filename = filename_from_url(url)?;
        let filepath = output_root.join(&domain).join(&filename);

        Some(Self {
            url: url.clone(),
            domain,
            filename,
            filepath,
        })
    }

    /// Directory the file is stored in
    pub fn directory(&self) -> &Path {
        self.filepath.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Derives a safe filename from the last path segment of a URL
pub fn filename_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    let name = sanitize_filename(&decoded);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Replaces characters that are invalid in filenames and bounds the length
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim().trim_matches('.');

    let (stem, ext) = split_extension(cleaned);
    if stem.chars().count() <= MAX_STEM_CHARS {
        return cleaned.to_string();
    }

    let stem: String = stem.chars().take(MAX_STEM_CHARS).collect();
    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

/// Splits `name` into stem and extension at the last dot
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Path with a numeric collision suffix: `photo.jpg` -> `photo_2.jpg`
pub fn suffixed_path(path: &Path, n: u32) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (stem, ext) = split_extension(&name);
    let suffixed = match ext {
        Some(ext) => format!("{}_{}.{}", stem, n, ext),
        None => format!("{}_{}", stem, n),
    };

    path.with_file_name(suffixed)
}

/// First path in the suffix sequence that does not exist yet
///
/// Only inspects the filesystem; used where no file may be created.
pub async fn unique_path(path: &Path) -> PathBuf {
    if !exists(path).await {
        return path.to_path_buf();
    }

    for n in 1..=MAX_COLLISION_SUFFIX {
        let candidate = suffixed_path(path, n);
        if !exists(&candidate).await {
            return candidate;
        }
    }

    suffixed_path(path, MAX_COLLISION_SUFFIX + 1)
}

/// Atomically claims the first free path in the suffix sequence
///
/// The claimed path is created empty, so concurrent workers resolving the
/// same filename always end up with distinct files.
pub async fn reserve_path(path: &Path) -> io::Result<PathBuf> {
    for n in 0..=MAX_COLLISION_SUFFIX {
        let candidate = if n == 0 {
            path.to_path_buf()
        } else {
            suffixed_path(path, n)
        };

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free filename for {}", path.display()),
    ))
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}
