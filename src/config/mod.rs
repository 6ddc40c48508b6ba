mod file_config;

pub use file_config::{FileConfig, LibraryConfig};

use crate::library::{LibraryLimits, MediaDefaults};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub metadata_url: Option<String>,
    pub metadata_timeout_sec: u64,
    pub cover_url: Option<String>,
    pub cover_timeout_sec: u64,
    pub default_locale: Option<String>,
    pub default_region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,

    // Boundary services, disabled when no url is configured
    pub metadata_url: Option<String>,
    pub metadata_timeout_sec: u64,
    pub cover_url: Option<String>,
    pub cover_timeout_sec: u64,

    pub media_defaults: MediaDefaults,
    pub library_limits: LibraryLimits,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let metadata_url = file.metadata_url.or_else(|| cli.metadata_url.clone());
        let metadata_timeout_sec = file
            .metadata_timeout_sec
            .unwrap_or(cli.metadata_timeout_sec);
        let cover_url = file.cover_url.or_else(|| cli.cover_url.clone());
        let cover_timeout_sec = file.cover_timeout_sec.unwrap_or(cli.cover_timeout_sec);

        let default_media = MediaDefaults::default();
        let media_defaults = MediaDefaults {
            locale: file
                .default_locale
                .or_else(|| cli.default_locale.clone())
                .unwrap_or(default_media.locale),
            region: file
                .default_region
                .or_else(|| cli.default_region.clone())
                .unwrap_or(default_media.region),
        };

        let library_file = file.library.unwrap_or_default();
        let default_limits = LibraryLimits::default();
        let library_limits = LibraryLimits {
            max_name_length: library_file
                .max_name_length
                .unwrap_or(default_limits.max_name_length),
            max_description_length: library_file
                .max_description_length
                .unwrap_or(default_limits.max_description_length),
            max_categories: library_file
                .max_categories
                .unwrap_or(default_limits.max_categories),
            max_items: library_file.max_items.unwrap_or(default_limits.max_items),
        };

        Ok(Self {
            db_dir,
            port,
            logging_level,
            frontend_dir_path,
            metadata_url,
            metadata_timeout_sec,
            cover_url,
            cover_timeout_sec,
            media_defaults,
            library_limits,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn watchlist_db_path(&self) -> PathBuf {
        self.db_dir.join("watchlist.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
