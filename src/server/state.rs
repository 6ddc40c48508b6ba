use axum::extract::FromRef;

use crate::library::WatchlistManager;
use crate::user::UserStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedWatchlistManager = Arc<WatchlistManager>;
pub type GuardedUserStore = Arc<dyn UserStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub watchlist_manager: GuardedWatchlistManager,
    pub user_store: GuardedUserStore,
}

impl ServerState {
    pub fn new(config: ServerConfig, watchlist_manager: WatchlistManager) -> ServerState {
        let user_store = watchlist_manager.user_store().clone();
        ServerState {
            config,
            start_time: Instant::now(),
            watchlist_manager: Arc::new(watchlist_manager),
            user_store,
        }
    }
}

impl FromRef<ServerState> for GuardedWatchlistManager {
    fn from_ref(input: &ServerState) -> Self {
        input.watchlist_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
