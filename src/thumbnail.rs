use crate::config::AppConfig;
use crate::error::AppError;
use crate::ffmpeg;
use crate::media::MediaKind;
use exif::{In, Reader, Tag};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{imageops, DynamicImage, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";
pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Served when a video frame cannot be produced (no backend, unreadable
/// container). Never written to the cache, so a later request retries.
pub const VIDEO_PLACEHOLDER_SVG: &str = r##"<svg width="200" height="200" xmlns="http://www.w3.org/2000/svg">
    <rect width="200" height="200" fill="#2c3e50"/>
    <polygon points="70,50 70,150 150,100" fill="#3498db"/>
    <text x="100" y="180" font-family="Arial" font-size="14" fill="#ecf0f1" text-anchor="middle">VIDEO</text>
</svg>"##;

/// Served when a still image fails to decode.
pub const IMAGE_PLACEHOLDER_SVG: &str = r##"<svg width="200" height="200" xmlns="http://www.w3.org/2000/svg">
    <rect width="200" height="200" fill="#2c3e50"/>
    <rect x="50" y="60" width="100" height="80" fill="none" stroke="#3498db" stroke-width="6"/>
    <circle cx="80" cy="85" r="9" fill="#3498db"/>
    <polyline points="56,134 95,100 120,120 144,96" fill="none" stroke="#3498db" stroke-width="6"/>
    <text x="100" y="180" font-family="Arial" font-size="14" fill="#ecf0f1" text-anchor="middle">IMAGE</text>
</svg>"##;

#[derive(Debug)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl Thumbnail {
    fn jpeg(bytes: Vec<u8>) -> Self {
        Thumbnail {
            bytes,
            content_type: JPEG_CONTENT_TYPE,
        }
    }

    fn placeholder(svg: &'static str) -> Self {
        Thumbnail {
            bytes: svg.as_bytes().to_vec(),
            content_type: SVG_CONTENT_TYPE,
        }
    }
}

/// Disk cache of fixed-size JPEG previews, keyed by a hash of the source
/// path. An entry is valid iff its mtime is at least the source's mtime;
/// there is no manifest, so wiping the cache directory is always safe.
pub struct ThumbnailCache {
    cache_dir: PathBuf,
    max_dim: u32,
    jpeg_quality: u8,
}

impl ThumbnailCache {
    pub fn new(config: &AppConfig) -> Self {
        ThumbnailCache {
            cache_dir: config.thumbnail_cache_dir.clone(),
            max_dim: config.thumbnail_max_dim,
            jpeg_quality: config.thumbnail_jpeg_quality,
        }
    }

    /// Cache-entry path for a source file.
    pub fn entry_path(&self, source: &Path) -> PathBuf {
        let digest = Sha256::digest(source.to_string_lossy().as_bytes());
        self.cache_dir.join(format!("{:x}.jpg", digest))
    }

    /// Serve a preview for `source`, regenerating the cache entry when it is
    /// missing or older than the source. Decode failures degrade to a
    /// placeholder glyph and are never fatal.
    pub fn get(&self, source: &Path, kind: MediaKind) -> Result<Thumbnail, AppError> {
        if kind == MediaKind::Other {
            let ext = source
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            return Err(AppError::UnsupportedThumbnail(ext));
        }

        let cache_path = self.entry_path(source);
        if let Some(bytes) = self.cached_bytes(source, &cache_path) {
            log::trace!("Thumbnail cache hit for {:?}", source);
            return Ok(Thumbnail::jpeg(bytes));
        }

        match kind {
            MediaKind::Image => match self.generate_still(source) {
                Ok(bytes) => {
                    self.persist(&cache_path, &bytes);
                    Ok(Thumbnail::jpeg(bytes))
                }
                Err(e) => {
                    log::warn!("Thumbnail generation failed for {:?}: {}", source, e);
                    Ok(Thumbnail::placeholder(IMAGE_PLACEHOLDER_SVG))
                }
            },
            MediaKind::Video => {
                let frame = ffmpeg::first_frame_png(source)
                    .and_then(|png| self.generate_from_frame(source, &png));
                match frame {
                    Ok(bytes) => {
                        self.persist(&cache_path, &bytes);
                        Ok(Thumbnail::jpeg(bytes))
                    }
                    Err(AppError::BackendUnavailable) => {
                        Ok(Thumbnail::placeholder(VIDEO_PLACEHOLDER_SVG))
                    }
                    Err(e) => {
                        log::warn!("Video thumbnail failed for {:?}: {}", source, e);
                        Ok(Thumbnail::placeholder(VIDEO_PLACEHOLDER_SVG))
                    }
                }
            }
            MediaKind::Other => unreachable!("handled above"),
        }
    }

    fn cached_bytes(&self, source: &Path, cache_path: &Path) -> Option<Vec<u8>> {
        let source_mtime = fs::metadata(source).ok()?.modified().ok()?;
        let cache_mtime = fs::metadata(cache_path).ok()?.modified().ok()?;
        if cache_mtime >= source_mtime {
            fs::read(cache_path).ok()
        } else {
            None
        }
    }

    fn generate_still(&self, source: &Path) -> Result<Vec<u8>, AppError> {
        let img = image::open(source).map_err(|e| AppError::Decode {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
        let rgb = flatten_to_rgb(img);
        let rgb = apply_orientation(rgb, read_orientation(source));
        self.encode(source, rgb)
    }

    fn generate_from_frame(&self, source: &Path, png: &[u8]) -> Result<Vec<u8>, AppError> {
        let img = image::load_from_memory(png).map_err(|e| AppError::Decode {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.encode(source, flatten_to_rgb(img))
    }

    /// Shrink-to-fit within the configured bound and encode as JPEG.
    /// Images already inside the bound are not upscaled.
    fn encode(&self, source: &Path, rgb: RgbImage) -> Result<Vec<u8>, AppError> {
        let (w, h) = rgb.dimensions();
        let rgb = if w > self.max_dim || h > self.max_dim {
            DynamicImage::ImageRgb8(rgb)
                .resize(self.max_dim, self.max_dim, FilterType::Lanczos3)
                .to_rgb8()
        } else {
            rgb
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|e| AppError::Decode {
                path: source.to_path_buf(),
                reason: format!("jpeg encode: {}", e),
            })?;
        Ok(bytes)
    }

    /// Best-effort cache write: stage into a tempfile in the cache directory
    /// and swap in atomically, so readers never see a partial entry. On
    /// failure the freshly generated bytes are still returned to the caller.
    fn persist(&self, cache_path: &Path, bytes: &[u8]) {
        let staged = || -> std::io::Result<()> {
            fs::create_dir_all(&self.cache_dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)?;
            tmp.write_all(bytes)?;
            tmp.persist(cache_path).map_err(|e| e.error)?;
            Ok(())
        };
        if let Err(e) = staged() {
            log::warn!("Could not persist thumbnail {:?}: {}", cache_path, e);
        }
    }
}

/// Normalize to 3-channel RGB, compositing any alpha onto white.
fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
    for (x, y, px) in rgba.enumerate_pixels() {
        let a = px[3] as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

/// EXIF orientation correction. Codes 3/6/8 map to 180/90/270 degrees
/// clockwise; anything else leaves the image untouched.
fn apply_orientation(rgb: RgbImage, orientation: Option<u32>) -> RgbImage {
    match orientation {
        Some(3) => imageops::rotate180(&rgb),
        Some(6) => imageops::rotate90(&rgb),
        Some(8) => imageops::rotate270(&rgb),
        _ => rgb,
    }
}

fn read_orientation(source: &Path) -> Option<u32> {
    let file = File::open(source).ok()?;
    let exif = Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::time::Duration;

    fn cache_in(tmp: &tempfile::TempDir) -> ThumbnailCache {
        let config = AppConfig::for_tests(tmp.path());
        ThumbnailCache::new(&config)
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
        img.save(path).unwrap();
    }

    fn shift_mtime(path: &Path, delta_secs: i64) {
        let mtime = fs::metadata(path).unwrap().modified().unwrap();
        let shifted = if delta_secs >= 0 {
            mtime + Duration::from_secs(delta_secs as u64)
        } else {
            mtime - Duration::from_secs((-delta_secs) as u64)
        };
        filetime::set_file_mtime(path, FileTime::from_system_time(shifted)).unwrap();
    }

    #[test]
    fn repeated_gets_are_idempotent_and_served_from_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        let source = tmp.path().join("photo.png");
        write_png(&source, 32, 32);

        let first = cache.get(&source, MediaKind::Image).unwrap();
        assert_eq!(first.content_type, JPEG_CONTENT_TYPE);

        // Replace the cache entry with sentinel bytes newer than the source:
        // a second get must serve them verbatim, proving no re-decode.
        let entry = cache.entry_path(&source);
        fs::write(&entry, b"sentinel").unwrap();
        shift_mtime(&entry, 10);

        let second = cache.get(&source, MediaKind::Image).unwrap();
        assert_eq!(second.bytes, b"sentinel");
    }

    #[test]
    fn stale_entry_is_regenerated() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        let source = tmp.path().join("photo.png");
        write_png(&source, 32, 32);

        let entry = cache.entry_path(&source);
        fs::create_dir_all(entry.parent().unwrap()).unwrap();
        fs::write(&entry, b"stale").unwrap();
        shift_mtime(&entry, -10);

        let thumb = cache.get(&source, MediaKind::Image).unwrap();
        assert_ne!(thumb.bytes, b"stale");
        assert_ne!(fs::read(&entry).unwrap(), b"stale");
    }

    #[test]
    fn oversized_image_is_bounded_to_max_dim() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        let source = tmp.path().join("wide.png");
        write_png(&source, 400, 100);

        let thumb = cache.get(&source, MediaKind::Image).unwrap();
        let decoded = image::load_from_memory(&thumb.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 50));
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        let source = tmp.path().join("small.png");
        write_png(&source, 40, 30);

        let thumb = cache.get(&source, MediaKind::Image).unwrap();
        let decoded = image::load_from_memory(&thumb.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn unreadable_video_degrades_to_placeholder_without_caching() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        let source = tmp.path().join("broken.mp4");
        fs::write(&source, b"definitely not a video").unwrap();

        let thumb = cache.get(&source, MediaKind::Video).unwrap();
        assert_eq!(thumb.content_type, SVG_CONTENT_TYPE);
        assert_eq!(thumb.bytes, VIDEO_PLACEHOLDER_SVG.as_bytes());
        assert!(
            !cache.entry_path(&source).exists(),
            "a placeholder must not be cached"
        );
    }

    #[test]
    fn unsupported_extension_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        let source = tmp.path().join("notes.txt");
        fs::write(&source, b"text").unwrap();

        let err = cache.get(&source, MediaKind::Other).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedThumbnail(ext) if ext == "txt"));
    }

    #[test]
    fn transparency_is_flattened_onto_white() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 0, 0])
            }
        }));
        let rgb = flatten_to_rgb(img);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn orientation_codes_rotate_clockwise() {
        let base = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([1, 1, 1])
            } else {
                Rgb([2, 2, 2])
            }
        });

        let r180 = apply_orientation(base.clone(), Some(3));
        assert_eq!(r180.dimensions(), (2, 1));
        assert_eq!(r180.get_pixel(0, 0), &Rgb([2, 2, 2]));

        let r90 = apply_orientation(base.clone(), Some(6));
        assert_eq!(r90.dimensions(), (1, 2));
        assert_eq!(r90.get_pixel(0, 0), &Rgb([1, 1, 1]));

        let r270 = apply_orientation(base.clone(), Some(8));
        assert_eq!(r270.dimensions(), (1, 2));
        assert_eq!(r270.get_pixel(0, 1), &Rgb([1, 1, 1]));

        let untouched = apply_orientation(base.clone(), None);
        assert_eq!(untouched, base);
    }
}
