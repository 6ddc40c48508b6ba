//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases and fake media services.

use super::constants::*;
use super::fixtures::{create_test_db_with_users, spawn_fake_media_services, SeededUser};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use watchlist_server::library::WatchlistManager;
use watchlist_server::media::{CoverClient, MetadataClient};
use watchlist_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use watchlist_server::{SqliteUserStore, SqliteWatchlistStore, UserStore};

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// User store for direct database access in tests
    pub user_store: Arc<dyn UserStore>,

    /// Seeded users by handle
    pub users: HashMap<String, SeededUser>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if any fixture fails to build or the server doesn't become ready in time.
    pub async fn spawn() -> Self {
        let (temp_db_dir, db_dir, users) =
            create_test_db_with_users().expect("Failed to create test database");

        let media_url = spawn_fake_media_services()
            .await
            .expect("Failed to spawn fake media services");

        let user_store: Arc<dyn UserStore> = Arc::new(
            SqliteUserStore::new(db_dir.join("user.db")).expect("Failed to open user store"),
        );
        let watchlist_store = Arc::new(
            SqliteWatchlistStore::new(db_dir.join("watchlist.db"))
                .expect("Failed to open watchlist store"),
        );

        let manager = WatchlistManager::new(user_store.clone(), watchlist_store)
            .with_metadata_provider(Arc::new(
                MetadataClient::new(media_url.clone(), REQUEST_TIMEOUT_SECS)
                    .expect("Failed to build metadata client"),
            ))
            .with_cover_composer(Arc::new(
                CoverClient::new(media_url, REQUEST_TIMEOUT_SECS)
                    .expect("Failed to build cover client"),
            ));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            frontend_dir_path: None,
        };
        let app = make_app(config, manager).expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            user_store,
            users,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Returns the seeded user with the given handle
    pub fn user(&self, handle: &str) -> &SeededUser {
        self.users
            .get(handle)
            .unwrap_or_else(|| panic!("No seeded user {}", handle))
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
