use crate::config::AppConfig;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_path(config: &AppConfig, path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return MediaKind::Other;
        };
        if config.is_image(ext) {
            MediaKind::Image
        } else if config.is_video(ext) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

/// One row of a directory listing or search result. Built fresh from stat
/// calls on every request; nothing here is ever persisted.
#[derive(Debug, Serialize, Clone)]
pub struct MediaItem {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub size_formatted: String,
    pub modified: String,
    pub modified_timestamp: i64,
    pub is_dir: bool,
    pub kind: MediaKind,
}

impl MediaItem {
    pub fn from_fs(config: &AppConfig, abs_path: &Path, rel_path: &str) -> std::io::Result<Self> {
        let meta = std::fs::metadata(abs_path)?;
        let is_dir = meta.is_dir();
        let size = if is_dir { folder_size(abs_path) } else { meta.len() };
        let modified: chrono::DateTime<chrono::Local> = meta.modified()?.into();

        let name = abs_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(MediaItem {
            name,
            path: rel_path.replace('\\', "/"),
            size,
            size_formatted: format_size(size),
            modified: modified.format("%Y-%m-%d %H:%M:%S").to_string(),
            modified_timestamp: modified.timestamp(),
            is_dir,
            kind: if is_dir {
                MediaKind::Other
            } else {
                MediaKind::from_path(config, abs_path)
            },
        })
    }
}

/// Sum of all file sizes under a directory. Unreadable entries count as zero.
pub fn folder_size(dir: &Path) -> u64 {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} PB", size)
}

/// Sanitize a client-supplied filename. Keeps unicode, replaces characters
/// that are forbidden on common filesystems, strips leading/trailing dots.
pub fn safe_filename(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
