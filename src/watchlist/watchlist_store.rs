use super::models::{Watchlist, WatchlistDetails, WatchlistItem};
use anyhow::Result;

/// Outcome of adding a collaborator to the watchlist document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollaboratorAdded {
    pub added: bool,
    /// The user was following the watchlist and the follow was dropped.
    pub removed_follower: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemsWrite {
    Written { version: u64 },
    VersionMismatch { current: u64 },
    NotFound,
}

/// Persistence of the watchlist aggregate.
///
/// Membership methods are idempotent and return whether the stored document changed.
pub trait WatchlistStore: Send + Sync {
    fn create_watchlist(
        &self,
        owner_id: usize,
        details: &WatchlistDetails,
        items: &[WatchlistItem],
    ) -> Result<Watchlist>;

    fn get_watchlist(&self, watchlist_id: &str) -> Result<Option<Watchlist>>;

    /// Resolves the given ids, silently skipping the ones that don't exist.
    fn get_watchlists(&self, watchlist_ids: &[String]) -> Result<Vec<Watchlist>>;

    /// Watchlists the user owns or collaborates on, in creation order.
    fn get_owned_or_collaborative(&self, user_id: usize) -> Result<Vec<Watchlist>>;

    fn update_details(&self, watchlist_id: &str, details: &WatchlistDetails) -> Result<bool>;

    fn delete_watchlist(&self, watchlist_id: &str) -> Result<bool>;

    /// Adds the collaborator and drops their follow, if any, in the same write.
    fn add_collaborator(&self, watchlist_id: &str, user_id: usize) -> Result<CollaboratorAdded>;

    fn remove_collaborator(&self, watchlist_id: &str, user_id: usize) -> Result<bool>;

    /// Adds the follower, incrementing the follower count only if it wasn't there.
    fn add_follower(&self, watchlist_id: &str, user_id: usize) -> Result<bool>;

    /// Removes the follower, decrementing the follower count (never below zero).
    fn remove_follower(&self, watchlist_id: &str, user_id: usize) -> Result<bool>;

    /// Replaces the item sequence and bumps the version.
    /// When `expected_version` is given, the write only happens if it matches.
    fn set_items(
        &self,
        watchlist_id: &str,
        items: &[WatchlistItem],
        expected_version: Option<u64>,
    ) -> Result<ItemsWrite>;

    /// Sets (or clears) a cover chosen by a user; a custom cover disables composition.
    fn set_custom_cover(&self, watchlist_id: &str, cover_image: Option<&str>) -> Result<bool>;

    /// Stores a composed cover, unless a custom cover has been set in the meantime.
    fn set_generated_cover(&self, watchlist_id: &str, cover_image: Option<&str>) -> Result<bool>;
}
