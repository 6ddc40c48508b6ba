use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,

    // External services
    pub metadata_url: Option<String>,
    pub metadata_timeout_sec: Option<u64>,
    pub cover_url: Option<String>,
    pub cover_timeout_sec: Option<u64>,
    pub default_locale: Option<String>,
    pub default_region: Option<String>,

    pub library: Option<LibraryConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LibraryConfig {
    pub max_name_length: Option<usize>,
    pub max_description_length: Option<usize>,
    pub max_categories: Option<usize>,
    pub max_items: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
