use super::error::{WatchlistError, WatchlistResult};
use super::manager::WatchlistManager;
use super::sequencer::{self, ItemSort, SortDirection};
use crate::media::{MediaMetadata, MediaQuery, MetadataError};
use crate::watchlist::{normalize_platforms, ItemsWrite, MediaKind, Watchlist, WatchlistItem};
use serde::Deserialize;
use tracing::{debug, warn};

/// An item to append, either by reference (metadata fetched from the proxy) or with
/// its metadata supplied by the caller.
#[derive(Deserialize, Debug, Clone)]
pub struct NewItem {
    pub media_id: String,
    pub media_kind: MediaKind,
    #[serde(default)]
    pub metadata: Option<MediaMetadata>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl From<MetadataError> for WatchlistError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(media_id) => WatchlistError::ItemNotFound(media_id),
            other => WatchlistError::Upstream(other.to_string()),
        }
    }
}

impl WatchlistManager {
    pub fn get_items(
        &self,
        viewer_id: Option<usize>,
        watchlist_id: &str,
        sort: ItemSort,
        direction: SortDirection,
    ) -> WatchlistResult<Vec<WatchlistItem>> {
        let view = self.get_watchlist(viewer_id, watchlist_id)?;
        Ok(sequencer::sorted_view(&view.watchlist.items, sort, direction))
    }

    /// Appends an item. Nothing is written if the metadata lookup fails.
    pub async fn add_item(
        &self,
        user_id: usize,
        watchlist_id: &str,
        new_item: NewItem,
    ) -> WatchlistResult<Watchlist> {
        let user = self.require_user(user_id)?;
        let media_id = new_item.media_id.trim().to_string();
        if media_id.is_empty() {
            return Err(WatchlistError::Validation(
                "Media id cannot be empty".to_string(),
            ));
        }
        if media_id == "." || media_id == ".." {
            return Err(WatchlistError::Validation(format!(
                "Invalid media id {}",
                media_id
            )));
        }
        let watchlist = self.require_editable(&user, watchlist_id)?;
        self.check_can_append(&watchlist, &media_id)?;

        let metadata = match new_item.metadata {
            Some(metadata) => metadata,
            None => {
                let provider = self.metadata_provider.as_ref().ok_or_else(|| {
                    WatchlistError::Upstream("Metadata service not configured".to_string())
                })?;
                let query = MediaQuery {
                    media_id: media_id.clone(),
                    kind: new_item.media_kind,
                    locale: new_item
                        .locale
                        .unwrap_or_else(|| self.media_defaults.locale.clone()),
                    region: new_item
                        .region
                        .unwrap_or_else(|| self.media_defaults.region.clone()),
                };
                provider.lookup(&query).await.inspect_err(|err| {
                    warn!("Metadata lookup for {} failed: {}", media_id, err)
                })?
            }
        };
        if metadata.title.trim().is_empty() {
            return Err(WatchlistError::Validation(
                "Item title cannot be empty".to_string(),
            ));
        }

        let item = WatchlistItem {
            media_id: media_id.clone(),
            title: metadata.title,
            poster_url: metadata.poster_url,
            media_kind: new_item.media_kind,
            platforms: normalize_platforms(metadata.platforms),
            runtime: metadata.runtime,
            season_count: metadata.season_count,
            episode_count: metadata.episode_count,
            added_at: chrono::Utc::now().timestamp(),
        };

        // The lookup may have taken a while, append to what is stored now.
        let watchlist = self.require_editable(&user, watchlist_id)?;
        self.check_can_append(&watchlist, &media_id)?;
        let items = sequencer::append(&watchlist.items, item)?;
        self.write_items(watchlist, items, None)
    }

    pub fn remove_item(
        &self,
        user_id: usize,
        watchlist_id: &str,
        media_id: &str,
    ) -> WatchlistResult<Watchlist> {
        let watchlist = self.editable_for(user_id, watchlist_id)?;
        let items = sequencer::remove(&watchlist.items, media_id)?;
        self.write_items(watchlist, items, None)
    }

    pub fn move_item_to_first(
        &self,
        user_id: usize,
        watchlist_id: &str,
        media_id: &str,
    ) -> WatchlistResult<Watchlist> {
        let watchlist = self.editable_for(user_id, watchlist_id)?;
        let items = sequencer::move_to_first(&watchlist.items, media_id)?;
        self.write_items(watchlist, items, None)
    }

    pub fn move_item_to_last(
        &self,
        user_id: usize,
        watchlist_id: &str,
        media_id: &str,
    ) -> WatchlistResult<Watchlist> {
        let watchlist = self.editable_for(user_id, watchlist_id)?;
        let items = sequencer::move_to_last(&watchlist.items, media_id)?;
        self.write_items(watchlist, items, None)
    }

    /// Replaces the item order. With `expected_version`, the write is refused if the
    /// watchlist changed since the caller read it.
    pub fn reorder_items(
        &self,
        user_id: usize,
        watchlist_id: &str,
        order: &[String],
        expected_version: Option<u64>,
    ) -> WatchlistResult<Watchlist> {
        let watchlist = self.editable_for(user_id, watchlist_id)?;
        if let Some(expected) = expected_version {
            if expected != watchlist.version {
                return Err(WatchlistError::VersionConflict {
                    current: watchlist.version,
                });
            }
        }
        let items = sequencer::reorder(&watchlist.items, order)?;
        self.write_items(watchlist, items, expected_version)
    }

    fn editable_for(&self, user_id: usize, watchlist_id: &str) -> WatchlistResult<Watchlist> {
        let user = self.require_user(user_id)?;
        self.require_editable(&user, watchlist_id)
    }

    fn check_can_append(&self, watchlist: &Watchlist, media_id: &str) -> WatchlistResult<()> {
        if watchlist.item_position(media_id).is_some() {
            return Err(WatchlistError::AlreadyExists(media_id.to_string()));
        }
        if watchlist.items.len() >= self.limits.max_items {
            return Err(WatchlistError::Validation(format!(
                "A watchlist can hold at most {} items",
                self.limits.max_items
            )));
        }
        Ok(())
    }

    /// Persists the new sequence and refreshes the cover if its posters changed.
    fn write_items(
        &self,
        before: Watchlist,
        items: Vec<WatchlistItem>,
        expected_version: Option<u64>,
    ) -> WatchlistResult<Watchlist> {
        let write = self
            .watchlist_store
            .set_items(&before.id, &items, expected_version)?;
        let version = match write {
            ItemsWrite::Written { version } => version,
            ItemsWrite::VersionMismatch { current } => {
                return Err(WatchlistError::VersionConflict { current })
            }
            ItemsWrite::NotFound => return Err(WatchlistError::WatchlistNotFound(before.id)),
        };

        let posters_before = before.cover_posters();
        let after = Watchlist {
            items,
            version,
            ..before
        };
        debug!(
            "Watchlist {} now has {} items (version {})",
            after.id,
            after.items.len(),
            after.version
        );
        if after.cover_posters() != posters_before {
            self.schedule_cover_refresh(&after);
        }
        Ok(after)
    }
}
