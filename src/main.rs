use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchlist_server::config::{AppConfig, CliConfig, FileConfig};
use watchlist_server::library::WatchlistManager;
use watchlist_server::media::{CoverClient, MetadataClient};
use watchlist_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use watchlist_server::{SqliteUserStore, SqliteWatchlistStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values found there override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding user.db and watchlist.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Base URL of the media metadata proxy.
    #[clap(long)]
    pub metadata_url: Option<String>,

    /// Timeout in seconds for metadata requests.
    #[clap(long, default_value_t = 10)]
    pub metadata_timeout_sec: u64,

    /// Base URL of the cover composition service.
    #[clap(long)]
    pub cover_url: Option<String>,

    /// Timeout in seconds for cover composition requests.
    #[clap(long, default_value_t = 30)]
    pub cover_timeout_sec: u64,

    /// Locale used for metadata lookups when the request doesn't carry one.
    #[clap(long)]
    pub default_locale: Option<String>,

    /// Region used for metadata lookups when the request doesn't carry one.
    #[clap(long)]
    pub default_region: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            metadata_url: self.metadata_url.clone(),
            metadata_timeout_sec: self.metadata_timeout_sec,
            cover_url: self.cover_url.clone(),
            cover_timeout_sec: self.cover_timeout_sec,
            default_locale: self.default_locale.clone(),
            default_region: self.default_region.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening user database at {:?}...", config.user_db_path());
    let user_store = Arc::new(SqliteUserStore::new(config.user_db_path())?);

    info!(
        "Opening watchlist database at {:?}...",
        config.watchlist_db_path()
    );
    let watchlist_store = Arc::new(SqliteWatchlistStore::new(config.watchlist_db_path())?);

    let mut manager = WatchlistManager::new(user_store, watchlist_store)
        .with_limits(config.library_limits.clone())
        .with_media_defaults(config.media_defaults.clone());

    if let Some(url) = &config.metadata_url {
        info!("Metadata service configured at {}", url);
        let client = MetadataClient::new(url.clone(), config.metadata_timeout_sec)?;
        manager = manager.with_metadata_provider(Arc::new(client));
    }

    if let Some(url) = &config.cover_url {
        info!("Cover service configured at {}", url);
        let client = CoverClient::new(url.clone(), config.cover_timeout_sec)?;
        manager = manager.with_cover_composer(Arc::new(client));
    }

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        frontend_dir_path: config.frontend_dir_path.clone(),
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(server_config, manager).await
}
