//! Content primitives
//!
//! Content digests, perceptual hashes and pixel dimensions of files on disk.
//! The download manager and the dedup engine only see the
//! [`ContentInspector`] trait; [`ImageInspector`] is the real implementation.

use crate::url::MediaKind;
use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::ImageResult;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Bit length of a [`VisualHash`]
pub const VISUAL_HASH_BITS: u32 = 64;

/// Side of the grayscale grid the difference hash is computed on
const HASH_SIDE: u32 = 8;

/// Perceptual fingerprint of an image
///
/// Visually similar images have a small hamming distance between their
/// hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHash(pub u64);

impl VisualHash {
    /// Number of differing bits between two hashes
    pub fn distance(&self, other: &VisualHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for VisualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Reads content-derived facts about files
pub trait ContentInspector: Send + Sync {
    /// Cryptographic digest of the file's bytes, hex encoded
    fn content_hash(&self, path: &Path) -> io::Result<String>;

    /// Perceptual hash of an image, or None for videos and undecodable files
    fn visual_hash(&self, path: &Path) -> Option<VisualHash>;

    /// Pixel dimensions (width, height) of an image, or None if unreadable
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)>;
}

/// Inspector backed by SHA-256 and the `image` decoders
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageInspector;

impl ContentInspector for ImageInspector {
    fn content_hash(&self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    }

    fn visual_hash(&self, path: &Path) -> Option<VisualHash> {
        if MediaKind::from_path(path) != Some(MediaKind::Image) {
            return None;
        }

        let image = match open_image(path).and_then(|reader| reader.decode()) {
            Ok(image) => image,
            Err(e) => {
                tracing::trace!(path = %path.display(), "Cannot decode image: {}", e);
                return None;
            }
        };

        // Difference hash: one bit per horizontal brightness gradient on a
        // (HASH_SIDE + 1) x HASH_SIDE grayscale thumbnail.
        let gray = image
            .resize_exact(HASH_SIDE + 1, HASH_SIDE, FilterType::Triangle)
            .to_luma8();

        let mut bits = 0u64;
        for y in 0..HASH_SIDE {
            for x in 0..HASH_SIDE {
                let left = gray.get_pixel(x, y)[0];
                let right = gray.get_pixel(x + 1, y)[0];
                bits = (bits << 1) | u64::from(left > right);
            }
        }

        Some(VisualHash(bits))
    }

    fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        if MediaKind::from_path(path) != Some(MediaKind::Image) {
            return None;
        }
        match open_image(path).and_then(|reader| reader.into_dimensions()) {
            Ok(dimensions) => Some(dimensions),
            Err(e) => {
                tracing::trace!(path = %path.display(), "Cannot read dimensions: {}", e);
                None
            }
        }
    }
}

/// Opens an image with its format sniffed from the leading bytes
///
/// The extension is only used when the bytes are not recognised.
fn open_image(path: &Path) -> ImageResult<ImageReader<BufReader<File>>> {
    Ok(ImageReader::open(path)?.with_guessed_format()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32, flip: bool) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
        ImageBuffer::from_fn(width, height, |x, _| {
            let v = (x * 255 / width.max(1)) as u8;
            let v = if flip { 255 - v } else { v };
            Rgb([v, v, v])
        })
    }

    #[test]
    fn test_distance() {
        assert_eq!(VisualHash(0).distance(&VisualHash(0)), 0);
        assert_eq!(VisualHash(0b1011).distance(&VisualHash(0)), 3);
        assert_eq!(VisualHash(u64::MAX).distance(&VisualHash(0)), 64);
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(VisualHash(0xab).to_string(), "00000000000000ab");
    }

    #[test]
    fn test_content_hash_matches_for_identical_bytes() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let c = dir.path().join("c.bin");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        std::fs::write(&c, b"other bytes").unwrap();

        let inspector = ImageInspector;
        let ha = inspector.content_hash(&a).unwrap();
        assert_eq!(ha.len(), 64);
        assert_eq!(ha, inspector.content_hash(&b).unwrap());
        assert_ne!(ha, inspector.content_hash(&c).unwrap());
    }

    #[test]
    fn test_content_hash_missing_file() {
        assert!(ImageInspector
            .content_hash(Path::new("/nonexistent/file.png"))
            .is_err());
    }

    #[test]
    fn test_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.png");
        gradient(40, 10, false).save(&path).unwrap();

        assert_eq!(ImageInspector.dimensions(&path), Some((40, 10)));
    }

    #[test]
    fn test_mislabeled_image_is_still_read() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("original.png");
        let served = dir.path().join("served-as.jpg");
        gradient(40, 10, false).save(&png).unwrap();
        std::fs::copy(&png, &served).unwrap();

        assert_eq!(ImageInspector.dimensions(&served), Some((40, 10)));
        assert_eq!(
            ImageInspector.visual_hash(&served),
            ImageInspector.visual_hash(&png)
        );
        assert!(ImageInspector.visual_hash(&served).is_some());
    }

    #[test]
    fn test_dimensions_of_non_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"not really a video").unwrap();
        assert_eq!(ImageInspector.dimensions(&path), None);
    }

    #[test]
    fn test_visual_hash_survives_rescaling() {
        let dir = TempDir::new().unwrap();
        let small = dir.path().join("small.png");
        let large = dir.path().join("large.png");
        let inverted = dir.path().join("inverted.png");
        gradient(64, 64, false).save(&small).unwrap();
        gradient(256, 256, false).save(&large).unwrap();
        gradient(64, 64, true).save(&inverted).unwrap();

        let hs = ImageInspector.visual_hash(&small).unwrap();
        let hl = ImageInspector.visual_hash(&large).unwrap();
        let hi = ImageInspector.visual_hash(&inverted).unwrap();

        assert!(hs.distance(&hl) <= 5);
        assert!(hs.distance(&hi) > 5);
    }

    #[test]
    fn test_visual_hash_skips_videos_and_garbage() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("clip.webm");
        let broken = dir.path().join("broken.png");
        std::fs::write(&video, b"webm").unwrap();
        std::fs::write(&broken, b"not a png").unwrap();

        assert_eq!(ImageInspector.visual_hash(&video), None);
        assert_eq!(ImageInspector.visual_hash(&broken), None);
    }

    #[test]
    fn test_visual_hash_of_flat_image_is_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat.png");
        ImageBuffer::from_pixel(16, 16, Luma([128u8])).save(&path).unwrap();
        assert_eq!(ImageInspector.visual_hash(&path), Some(VisualHash(0)));
    }
}
