use super::{base_identity, FileInfo};
use crate::download::split_extension;
use crate::inspect::ContentInspector;
use crate::url::MediaKind;
use std::path::Path;
use walkdir::WalkDir;

/// Lists the media files below `root` in path order
///
/// Non-media files are ignored. Unreadable entries are logged and skipped.
/// Image dimensions are read up front since two phases rank by them.
pub fn scan_media(root: &Path, inspector: &dyn ContentInspector) -> Vec<FileInfo> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(kind) = MediaKind::from_path(path) else {
            continue;
        };

        let byte_size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let pixel_count = match kind {
            MediaKind::Image => inspector
                .dimensions(path)
                .map(|(w, h)| u64::from(w) * u64::from(h))
                .unwrap_or(0),
            MediaKind::Video => 0,
        };

        let filename = entry.file_name().to_string_lossy().into_owned();
        let extension = split_extension(&filename)
            .1
            .unwrap_or_default()
            .to_ascii_lowercase();

        files.push(FileInfo {
            path: path.to_path_buf(),
            base_name: base_identity(&filename).to_string(),
            extension,
            filename,
            kind,
            byte_size,
            pixel_count,
            content_hash: None,
            visual_hash: None,
        });
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::test_support::{write_files, FakeInspector};
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_media_recursively_in_order() {
        let dir = TempDir::new().unwrap();
        write_files(
            dir.path(),
            &[
                ("b.com/z.png", b"zz"),
                ("a.com/y.JPG", b"y"),
                ("a.com/notes.txt", b"text"),
                ("a.com/clip.webm", b"webm"),
            ],
        );
        let inspector = FakeInspector::default().with_dimensions("z.png", 10, 20);

        let files = scan_media(dir.path(), &inspector);
        let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();

        assert_eq!(names, vec!["clip.webm", "y.JPG", "z.png"]);
        assert_eq!(files[0].kind, MediaKind::Video);
        assert_eq!(files[1].pixel_count, 0);
        assert_eq!(files[2].pixel_count, 200);
        assert_eq!(files[2].byte_size, 2);
        assert_eq!(files[1].extension, "jpg");
        assert_eq!(files[1].base_name, "y");
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let files = scan_media(Path::new("/nonexistent/harvest"), &FakeInspector::default());
        assert!(files.is_empty());
    }
}
