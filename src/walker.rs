use crate::config::AppConfig;
use crate::error::AppError;
use crate::media::{format_size, MediaItem, MediaKind};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Pinned ordering for the canonical trees; everything else sorts after
/// them alphabetically.
fn special_dir_rank(name: &str) -> u32 {
    match name {
        "Photos" => 0,
        "Videos" => 1,
        _ => 999,
    }
}

/// Resolve a client-supplied relative path strictly inside the storage
/// root. Anything but plain name components is rejected.
pub fn resolve_in_root(root: &Path, rel: &str) -> Result<PathBuf, AppError> {
    let rel_path = Path::new(rel);
    if rel_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(AppError::InvalidPath(rel.to_string()));
    }
    Ok(root.join(rel_path))
}

fn join_rel(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", rel.trim_end_matches('/'), name)
    }
}

/// One level of a directory, ordered the way the browser presents it:
/// directories first (canonical trees pinned, the rest alphabetical), then
/// files newest-first.
pub fn list_dir(config: &AppConfig, rel: &str) -> Result<Vec<MediaItem>, AppError> {
    let abs = resolve_in_root(&config.storage_root, rel)?;
    if !abs.is_dir() {
        return Err(AppError::NotFound(rel.to_string()));
    }

    let mut items = Vec::new();
    for entry in std::fs::read_dir(&abs)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        match MediaItem::from_fs(config, &entry.path(), &join_rel(rel, &name)) {
            Ok(item) => items.push(item),
            Err(e) => log::debug!("Skipping unreadable entry {:?}: {}", entry.path(), e),
        }
    }

    items.sort_by(|a, b| listing_rank(a).cmp(&listing_rank(b)));
    Ok(items)
}

fn listing_rank(item: &MediaItem) -> (u8, u32, String, i64) {
    if item.is_dir {
        (0, special_dir_rank(&item.name), item.name.to_lowercase(), 0)
    } else {
        (1, 0, String::new(), -item.modified_timestamp)
    }
}

/// Lazy depth-first sweep yielding every file of the given kind below
/// `rel`. Directories are descended before sibling files are yielded;
/// callers collect (and sort) as much as they need.
pub fn walk_media<'a>(
    config: &'a AppConfig,
    rel: &str,
    kind: MediaKind,
) -> Result<impl Iterator<Item = MediaItem> + 'a, AppError> {
    let start = resolve_in_root(&config.storage_root, rel)?;
    if !start.is_dir() {
        return Err(AppError::NotFound(rel.to_string()));
    }
    let root = config.storage_root.clone();

    Ok(WalkDir::new(start)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(move |e| {
            let path = e.path();
            if MediaKind::from_path(config, path) != kind {
                return None;
            }
            let rel = path
                .strip_prefix(&root)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned();
            MediaItem::from_fs(config, path, &rel).ok()
        }))
}

/// Case-insensitive name search below `rel`, directories listed before
/// files, each group alphabetical.
pub fn search(config: &AppConfig, rel: &str, query: &str) -> Result<Vec<MediaItem>, AppError> {
    let start = resolve_in_root(&config.storage_root, rel)?;
    if !start.is_dir() {
        return Err(AppError::NotFound(rel.to_string()));
    }
    let root = config.storage_root.clone();
    let needle = query.to_lowercase();

    let mut results: Vec<MediaItem> = WalkDir::new(start)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .to_lowercase()
                .contains(&needle)
        })
        .filter_map(|e| {
            let path = e.path();
            let rel = path
                .strip_prefix(&root)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned();
            MediaItem::from_fs(config, path, &rel).ok()
        })
        .collect();

    results.sort_by_key(|item| (!item.is_dir, item.name.to_lowercase()));
    Ok(results)
}

#[derive(Debug, Serialize)]
pub struct StorageStats {
    pub total_size: String,
    pub file_count: u64,
    pub folder_count: u64,
}

pub fn storage_stats(root: &Path) -> StorageStats {
    let mut total_size = 0u64;
    let mut file_count = 0u64;
    let mut folder_count = 0u64;

    for entry in WalkDir::new(root).min_depth(1).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_dir() {
            folder_count += 1;
        } else if let Ok(meta) = entry.metadata() {
            file_count += 1;
            total_size += meta.len();
        }
    }

    StorageStats {
        total_size: format_size(total_size),
        file_count,
        folder_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn seeded_config(tmp: &tempfile::TempDir) -> AppConfig {
        let config = AppConfig::for_tests(tmp.path());
        fs::create_dir_all(config.storage_root.join("Photos/2024/December")).unwrap();
        fs::create_dir_all(config.storage_root.join("zeta")).unwrap();
        fs::create_dir_all(config.storage_root.join("alpha")).unwrap();
        fs::write(config.storage_root.join("readme.txt"), b"hello").unwrap();
        fs::write(
            config.storage_root.join("Photos/2024/December/trip.jpg"),
            b"img",
        )
        .unwrap();
        fs::write(config.storage_root.join("zeta/clip.mp4"), b"vid").unwrap();
        config
    }

    #[test]
    fn listing_orders_dirs_before_files_with_pinned_trees() {
        let tmp = tempfile::tempdir().unwrap();
        let config = seeded_config(&tmp);

        let names: Vec<String> = list_dir(&config, "")
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["Photos", "alpha", "zeta", "readme.txt"]);
    }

    #[test]
    fn category_walk_filters_by_kind_and_keeps_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let config = seeded_config(&tmp);

        let images: Vec<MediaItem> =
            walk_media(&config, "", MediaKind::Image).unwrap().collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].path, "Photos/2024/December/trip.jpg");

        let videos: Vec<MediaItem> =
            walk_media(&config, "", MediaKind::Video).unwrap().collect();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].name, "clip.mp4");
    }

    #[test]
    fn search_is_case_insensitive_with_dirs_first() {
        let tmp = tempfile::tempdir().unwrap();
        let config = seeded_config(&tmp);
        fs::create_dir_all(config.storage_root.join("TRIPS")).unwrap();

        let hits = search(&config, "", "tRiP").unwrap();
        let names: Vec<&str> = hits.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["TRIPS", "trip.jpg"]);
    }

    #[test]
    fn parent_components_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config = seeded_config(&tmp);
        assert!(matches!(
            list_dir(&config, "../outside"),
            Err(AppError::InvalidPath(_))
        ));
    }

    #[test]
    fn storage_stats_count_everything_below_the_root() {
        let tmp = tempfile::tempdir().unwrap();
        let config = seeded_config(&tmp);

        let stats = storage_stats(&config.storage_root);
        assert_eq!(stats.file_count, 3);
        assert_eq!(stats.folder_count, 5);
    }
}
