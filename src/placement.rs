use crate::error::AppError;
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn stem_and_ext(file_name: &str) -> (&str, &str) {
    let p = Path::new(file_name);
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = p.extension().and_then(|s| s.to_str()).unwrap_or("");
    (stem, ext)
}

/// First free path for `file_name` in `dir`, probing `_1`, `_2`, … suffixes
/// before the extension. Existence is re-checked on every candidate, so the
/// loop terminates at the first name nobody holds.
pub fn probe_free_name(dir: &Path, file_name: &str) -> PathBuf {
    let base = dir.join(file_name);
    if !base.exists() {
        return base;
    }
    let (stem, ext) = stem_and_ext(file_name);
    let mut counter = 1u32;
    loop {
        let candidate_name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        let candidate = dir.join(candidate_name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Rename a file whose stem exceeds `max_stem_len` characters to a
/// capture-date name of the form `DDMMYYYY<ext>`, suffixing on collision.
/// A failed rename is logged and the original path kept; the caller
/// proceeds with placement either way.
pub fn rename_by_date_if_long(
    path: &Path,
    max_stem_len: usize,
    captured_at: NaiveDateTime,
) -> PathBuf {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };
    let (stem, ext) = stem_and_ext(file_name);
    if stem.chars().count() <= max_stem_len {
        return path.to_path_buf();
    }

    let dated = captured_at.format("%d%m%Y").to_string();
    let new_name = if ext.is_empty() {
        dated
    } else {
        format!("{}.{}", dated, ext)
    };
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let target = probe_free_name(dir, &new_name);

    match fs::rename(path, &target) {
        Ok(()) => {
            log::info!("Renamed long filename {:?} -> {:?}", file_name, target.file_name());
            target
        }
        Err(e) => {
            log::warn!("Could not rename {:?}: {}; keeping original name", path, e);
            path.to_path_buf()
        }
    }
}

/// Move a file into its destination directory, creating the directory tree
/// and resolving name collisions. Returns the final path. Errors are fatal
/// for this one file only; callers keep processing their batch.
pub fn place_media(temp_path: &Path, dest_dir: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dest_dir).map_err(|source| AppError::DirectoryCreate {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let file_name = temp_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let final_path = probe_free_name(dest_dir, &file_name);

    move_file(temp_path, &final_path).map_err(|source| AppError::Move {
        from: temp_path.to_path_buf(),
        to: final_path.clone(),
        source,
    })?;

    log::debug!("Placed {:?} at {:?}", file_name, final_path);
    Ok(final_path)
}

/// Rename, falling back to copy + rename + delete when the rename itself
/// fails (crossing filesystems). The copy goes to a `.part` sibling first so
/// a partially written file is never visible at the final path.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    let rename_err = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    log::debug!(
        "Rename {:?} -> {:?} failed ({}); trying copy fallback",
        from,
        to,
        rename_err
    );

    let mut staged_name = to.as_os_str().to_os_string();
    staged_name.push(".part");
    let staged = PathBuf::from(staged_name);

    let result = fs::copy(from, &staged)
        .and_then(|_| fs::rename(&staged, to))
        .and_then(|_| fs::remove_file(from));
    if result.is_err() {
        let _ = fs::remove_file(&staged);
    }
    result
}
