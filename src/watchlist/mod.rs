pub mod models;
mod sqlite_watchlist_store;
mod watchlist_store;

pub use models::{
    normalize_platforms, MediaKind, Platform, Visibility, Watchlist, WatchlistDetails,
    WatchlistItem,
};
pub use sqlite_watchlist_store::SqliteWatchlistStore;
pub use watchlist_store::{CollaboratorAdded, ItemsWrite, WatchlistStore};
