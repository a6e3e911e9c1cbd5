use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use config::{Config, ConfigError, File};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub storage_root: PathBuf,
    pub thumbnail_cache_dir: PathBuf,
    pub image_extensions: HashSet<String>,
    pub video_extensions: HashSet<String>,
    pub max_stem_length: usize,
    pub thumbnail_max_dim: u32,
    pub thumbnail_jpeg_quality: u8,
    pub web_port: u16,
    pub log_level: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .build()?;

        s.try_deserialize()
    }

    pub fn is_image(&self, ext: &str) -> bool {
        self.image_extensions.contains(&ext.to_lowercase())
    }

    pub fn is_video(&self, ext: &str) -> bool {
        self.video_extensions.contains(&ext.to_lowercase())
    }
}

#[cfg(test)]
impl AppConfig {
    /// Config rooted at a throwaway directory, with the production defaults
    /// for everything that is not a path.
    pub fn for_tests(root: &std::path::Path) -> Self {
        let exts = |list: &[&str]| list.iter().map(|e| e.to_string()).collect();
        Self {
            storage_root: root.join("storage"),
            thumbnail_cache_dir: root.join(".thumbcache"),
            image_extensions: exts(&["png", "jpg", "jpeg", "gif", "bmp", "webp"]),
            video_extensions: exts(&["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm"]),
            max_stem_length: 20,
            thumbnail_max_dim: 200,
            thumbnail_jpeg_quality: 60,
            web_port: 0,
            log_level: "warn".into(),
        }
    }
}
