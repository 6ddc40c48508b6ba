//! Watchlist Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod library;
pub mod media;
pub mod server;
pub mod sqlite_persistence;
pub mod user;
pub mod watchlist;

// Re-export commonly used types for convenience
pub use library::{WatchlistError, WatchlistManager};
pub use server::{run_server, RequestsLoggingLevel};
pub use user::{SqliteUserStore, UserStore};
pub use watchlist::{SqliteWatchlistStore, WatchlistStore};
