use crate::capture_date::{extract_capture_date, mtime_naive};
use crate::config::AppConfig;
use crate::destination::{photo_destination, video_destination};
use crate::error::AppError;
use crate::media::{safe_filename, MediaKind};
use crate::placement::{place_media, probe_free_name, rename_by_date_if_long};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One file of a batch upload, as handed over by the HTTP layer.
pub struct IncomingFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub final_path: PathBuf,
    pub kind: MediaKind,
}

/// Per-batch counters, returned to the HTTP layer for its flash message.
/// Failures reduce the success counts; their detail stays in the log.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub uploaded: usize,
    pub photos: usize,
    pub videos: usize,
    pub failed: usize,
}

/// Ingest one uploaded file: sanitize the name, save the bytes to a
/// collision-probed temp location inside the browsing directory, then — for
/// media, when sorting is on — rename long names, resolve the dated
/// destination and move the file there. Plain files stay where they were
/// saved.
pub fn ingest_file(
    config: &AppConfig,
    upload_dir: &Path,
    original_name: &str,
    bytes: &[u8],
    sort_media: bool,
) -> Result<IngestOutcome, AppError> {
    let name = safe_filename(original_name);

    fs::create_dir_all(upload_dir).map_err(|source| AppError::DirectoryCreate {
        path: upload_dir.to_path_buf(),
        source,
    })?;
    let temp_path = probe_free_name(upload_dir, &name);
    fs::write(&temp_path, bytes)?;

    let kind = MediaKind::from_path(config, &temp_path);
    if kind == MediaKind::Other {
        return Ok(IngestOutcome {
            final_path: temp_path,
            kind,
        });
    }

    // Photos classify by capture date; videos always by file mtime.
    let classify_ts = match kind {
        MediaKind::Image => extract_capture_date(&temp_path).captured_at,
        _ => mtime_naive(&temp_path),
    };
    let temp_path = rename_by_date_if_long(&temp_path, config.max_stem_length, classify_ts);

    if !sort_media {
        return Ok(IngestOutcome {
            final_path: temp_path,
            kind,
        });
    }

    let dest_rel = match kind {
        MediaKind::Image => photo_destination(classify_ts),
        _ => video_destination(classify_ts),
    };
    let final_path = place_media(&temp_path, &config.storage_root.join(dest_rel))?;
    Ok(IngestOutcome { final_path, kind })
}

/// Fold a batch through `ingest_file` in submission order. A failing file is
/// logged and counted; the rest of the batch still runs.
pub fn ingest_batch(
    config: &AppConfig,
    upload_dir: &Path,
    files: Vec<IncomingFile>,
    sort_media: bool,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for file in files {
        match ingest_file(config, upload_dir, &file.file_name, &file.bytes, sort_media) {
            Ok(outcome) => {
                summary.uploaded += 1;
                if sort_media {
                    match outcome.kind {
                        MediaKind::Image => summary.photos += 1,
                        MediaKind::Video => summary.videos += 1,
                        MediaKind::Other => {}
                    }
                }
            }
            Err(e) => {
                log::error!("Could not ingest {:?}: {}", file.file_name, e);
                summary.failed += 1;
            }
        }
    }
    summary
}
