use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};
use exif::{In, Reader, Tag};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Where a capture timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    ExifOriginal,
    ExifDigitized,
    ExifStandard,
    FileMtime,
}

#[derive(Debug, Clone)]
pub struct CaptureMetadata {
    pub captured_at: NaiveDateTime,
    pub source: DateSource,
}

/// EXIF date fields in priority order. The first present, non-empty field is
/// selected; only the selected field is parsed.
const DATE_TAGS: [(Tag, DateSource); 3] = [
    (Tag::DateTimeOriginal, DateSource::ExifOriginal),
    (Tag::DateTimeDigitized, DateSource::ExifDigitized),
    (Tag::DateTime, DateSource::ExifStandard),
];

/// Textual layouts seen in the wild, tried in order. Date-only values
/// resolve to midnight.
const DATETIME_LAYOUTS: [&str; 2] = ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_LAYOUTS: [&str; 2] = ["%Y:%m:%d", "%Y-%m-%d"];

/// Extract the capture date of a media file. Infallible: corrupt, absent or
/// unparseable metadata degrades to the filesystem modified time.
pub fn extract_capture_date(path: &Path) -> CaptureMetadata {
    if let Some((captured_at, source)) = exif_capture_date(path) {
        log::debug!("EXIF date for {:?}: {} ({:?})", path, captured_at, source);
        return CaptureMetadata { captured_at, source };
    }

    let captured_at = mtime_naive(path);
    log::debug!("Using file mtime for {:?}: {}", path, captured_at);
    CaptureMetadata {
        captured_at,
        source: DateSource::FileMtime,
    }
}

fn exif_capture_date(path: &Path) -> Option<(NaiveDateTime, DateSource)> {
    let file = File::open(path).ok()?;
    let exif = Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;

    let candidates = DATE_TAGS.iter().filter_map(|(tag, source)| {
        exif.get_field(*tag, In::PRIMARY)
            .map(|field| (*source, field.display_value().to_string()))
    });
    resolve_capture_date(candidates)
}

/// Pick the first non-empty candidate by priority and parse its text.
/// A selected value that parses under none of the layouts yields `None`.
pub fn resolve_capture_date<I, S>(candidates: I) -> Option<(NaiveDateTime, DateSource)>
where
    I: IntoIterator<Item = (DateSource, S)>,
    S: AsRef<str>,
{
    let (source, text) = candidates
        .into_iter()
        .find(|(_, text)| !text.as_ref().trim().is_empty())?;
    let parsed = parse_capture_text(text.as_ref().trim());
    if parsed.is_none() {
        log::debug!("Unparseable capture date {:?} from {:?}", text.as_ref(), source);
    }
    parsed.map(|dt| (dt, source))
}

fn parse_capture_text(text: &str) -> Option<NaiveDateTime> {
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(dt);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(text, layout) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Filesystem modified time as local naive time, truncated to whole seconds.
pub fn mtime_naive(path: &Path) -> NaiveDateTime {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or_else(|e| {
            log::warn!("Could not stat {:?}: {}; using current time", path, e);
            std::time::SystemTime::now()
        });
    let local: DateTime<Local> = modified.into();
    let naive = local.naive_local();
    naive.with_nanosecond(0).unwrap_or(naive)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn original_field_beats_digitized_and_standard() {
        let (resolved, source) = resolve_capture_date([
            (DateSource::ExifOriginal, "2024:12:06 10:30:45"),
            (DateSource::ExifDigitized, "2023:01:01 00:00:00"),
            (DateSource::ExifStandard, "2022:01:01 00:00:00"),
        ])
        .unwrap();
        assert_eq!(resolved, dt("2024-12-06 10:30:45"));
        assert_eq!(source, DateSource::ExifOriginal);
    }

    #[test]
    fn empty_fields_are_skipped() {
        let (resolved, source) = resolve_capture_date([
            (DateSource::ExifOriginal, "   "),
            (DateSource::ExifDigitized, "2023-05-04 08:00:00"),
        ])
        .unwrap();
        assert_eq!(resolved, dt("2023-05-04 08:00:00"));
        assert_eq!(source, DateSource::ExifDigitized);
    }

    #[test]
    fn all_four_layouts_parse() {
        for text in [
            "2024:12:06 10:30:45",
            "2024-12-06 10:30:45",
            "2024:12:06",
            "2024-12-06",
        ] {
            let (resolved, _) =
                resolve_capture_date([(DateSource::ExifOriginal, text)]).unwrap();
            assert_eq!(resolved.date().to_string(), "2024-12-06");
        }
        let (midnight, _) =
            resolve_capture_date([(DateSource::ExifOriginal, "2024:12:06")]).unwrap();
        assert_eq!(midnight, dt("2024-12-06 00:00:00"));
    }

    #[test]
    fn unparseable_selected_field_does_not_fall_through_to_later_fields() {
        // Selection happens before parsing: a garbage value in the highest
        // priority field sends the caller to the mtime fallback.
        let resolved = resolve_capture_date([
            (DateSource::ExifOriginal, "yesterday-ish"),
            (DateSource::ExifDigitized, "2023-05-04 08:00:00"),
        ]);
        assert!(resolved.is_none());
    }

    #[test]
    fn file_without_metadata_falls_back_to_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plain.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let meta = extract_capture_date(&path);
        assert_eq!(meta.source, DateSource::FileMtime);
        assert_eq!(meta.captured_at, mtime_naive(&path));
        assert_eq!(meta.captured_at.nanosecond(), 0);
    }
}
