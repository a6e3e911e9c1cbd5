use chrono::{Datelike, NaiveDateTime};
use std::path::PathBuf;

pub const PHOTOS_DIR: &str = "Photos";
pub const VIDEOS_DIR: &str = "Videos";

/// Month number → folder name. Out-of-range numbers (cannot occur for a
/// valid date) fall back to chrono's own month rendering.
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// `Photos/<Year>/<Month>` for a capture timestamp.
pub fn photo_destination(captured_at: NaiveDateTime) -> PathBuf {
    dated_destination(PHOTOS_DIR, captured_at)
}

/// `Videos/<Year>/<Month>` for a file modification timestamp. Video
/// containers are never parsed for capture time.
pub fn video_destination(mtime: NaiveDateTime) -> PathBuf {
    dated_destination(VIDEOS_DIR, mtime)
}

fn dated_destination(category: &str, ts: NaiveDateTime) -> PathBuf {
    PathBuf::from(category)
        .join(ts.format("%Y").to_string())
        .join(month_name(&ts))
}

fn month_name(ts: &NaiveDateTime) -> String {
    match MONTH_NAMES.get((ts.month() as usize).wrapping_sub(1)) {
        Some(name) => (*name).to_string(),
        None => ts.format("%B").to_string(),
    }
}
