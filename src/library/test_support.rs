use super::WatchlistManager;
use crate::media::{CoverComposer, MediaMetadata, MediaQuery, MetadataError, MetadataProvider};
use crate::user::{
    AuthToken, AuthTokenValue, SqliteUserStore, UserAuthTokenStore, UserStore, WatchlistUser,
};
use crate::watchlist::{
    MediaKind, Platform, SqliteWatchlistStore, Visibility, WatchlistDetails, WatchlistItem,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// User store that can be told to fail some writes.
pub struct FlakyUserStore {
    inner: SqliteUserStore,
    pub fail_display_order: AtomicBool,
    pub fail_collaborative_writes: AtomicBool,
    pub fail_cleanup_for: Mutex<HashSet<usize>>,
}

impl FlakyUserStore {
    fn new(inner: SqliteUserStore) -> Self {
        FlakyUserStore {
            inner,
            fail_display_order: AtomicBool::new(false),
            fail_collaborative_writes: AtomicBool::new(false),
            fail_cleanup_for: Mutex::new(HashSet::new()),
        }
    }
}

impl UserAuthTokenStore for FlakyUserStore {
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        self.inner.get_user_auth_token(token)
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        self.inner.add_user_auth_token(token)
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        self.inner.update_user_auth_token_last_used_timestamp(token)
    }
}

impl UserStore for FlakyUserStore {
    fn create_user(&self, user_handle: &str, email: Option<&str>) -> Result<usize> {
        self.inner.create_user(user_handle, email)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<WatchlistUser>> {
        self.inner.get_user(user_id)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        self.inner.get_user_id(user_handle)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        self.inner.get_user_handle(user_id)
    }

    fn add_saved_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        self.inner.add_saved_watchlist(user_id, watchlist_id)
    }

    fn remove_saved_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        self.inner.remove_saved_watchlist(user_id, watchlist_id)
    }

    fn add_collaborative_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        if self.fail_collaborative_writes.load(Ordering::SeqCst) {
            bail!("collaborative write failed");
        }
        self.inner.add_collaborative_watchlist(user_id, watchlist_id)
    }

    fn remove_collaborative_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        if self.fail_collaborative_writes.load(Ordering::SeqCst) {
            bail!("collaborative write failed");
        }
        self.inner
            .remove_collaborative_watchlist(user_id, watchlist_id)
    }

    fn append_to_display_order(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        if self.fail_display_order.load(Ordering::SeqCst) {
            bail!("display order write failed");
        }
        self.inner.append_to_display_order(user_id, watchlist_id)
    }

    fn set_display_order(&self, user_id: usize, watchlist_ids: &[String]) -> Result<()> {
        if self.fail_display_order.load(Ordering::SeqCst) {
            bail!("display order write failed");
        }
        self.inner.set_display_order(user_id, watchlist_ids)
    }

    fn remove_watchlist_references(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        if self.fail_cleanup_for.lock().unwrap().contains(&user_id) {
            bail!("cleanup failed for {}", user_id);
        }
        self.inner.remove_watchlist_references(user_id, watchlist_id)
    }
}

pub struct FakeMetadata {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeMetadata {
    pub fn new() -> Self {
        FakeMetadata {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadata {
    async fn lookup(&self, query: &MediaQuery) -> Result<MediaMetadata, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MetadataError::Unavailable("down".to_string()));
        }
        if query.media_id == "missing" {
            return Err(MetadataError::NotFound(query.media_id.clone()));
        }
        Ok(MediaMetadata {
            title: format!("Title {}", query.media_id),
            poster_url: Some(format!("https://posters/{}.jpg", query.media_id)),
            runtime: Some(50),
            season_count: match query.kind {
                MediaKind::Series => Some(1),
                MediaKind::Movie => None,
            },
            episode_count: match query.kind {
                MediaKind::Series => Some(8),
                MediaKind::Movie => None,
            },
            platforms: vec![],
        })
    }
}

pub struct FakeCover {
    pub requests: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl CoverComposer for FakeCover {
    async fn compose(&self, poster_urls: &[String]) -> Result<String> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(poster_urls.to_vec());
        Ok(format!("https://covers/{}.png", requests.len()))
    }
}

pub struct Fixture {
    pub manager: WatchlistManager,
    pub users: Arc<FlakyUserStore>,
    pub watchlists: Arc<SqliteWatchlistStore>,
    pub metadata: Arc<FakeMetadata>,
    pub covers: Arc<FakeCover>,
    _temp_dir: TempDir,
}

impl Fixture {
    pub fn new() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let users = Arc::new(FlakyUserStore::new(
            SqliteUserStore::new(temp_dir.path().join("user.db")).unwrap(),
        ));
        let watchlists =
            Arc::new(SqliteWatchlistStore::new(temp_dir.path().join("watchlist.db")).unwrap());
        let metadata = Arc::new(FakeMetadata::new());
        let covers = Arc::new(FakeCover {
            requests: Mutex::new(vec![]),
        });
        let manager = WatchlistManager::new(users.clone(), watchlists.clone())
            .with_metadata_provider(metadata.clone())
            .with_cover_composer(covers.clone());
        Fixture {
            manager,
            users,
            watchlists,
            metadata,
            covers,
            _temp_dir: temp_dir,
        }
    }

    pub fn user(&self, handle: &str) -> usize {
        self.users.create_user(handle, None).unwrap()
    }

    pub fn load_user(&self, user_id: usize) -> WatchlistUser {
        self.users.get_user(user_id).unwrap().unwrap()
    }

    pub fn create(&self, owner_id: usize, name: &str, visibility: Visibility) -> String {
        self.manager
            .create_watchlist(
                owner_id,
                WatchlistDetails {
                    name: name.to_string(),
                    description: None,
                    visibility,
                    categories: vec![],
                },
            )
            .unwrap()
            .watchlist
            .id
    }
}

pub fn item(media_id: &str) -> WatchlistItem {
    WatchlistItem {
        media_id: media_id.to_string(),
        title: format!("Title {media_id}"),
        poster_url: Some(format!("https://posters/{media_id}.jpg")),
        media_kind: MediaKind::Movie,
        platforms: vec![Platform::unknown()],
        runtime: Some(100),
        season_count: None,
        episode_count: None,
        added_at: 0,
    }
}
