//! User data models

use serde::Serialize;

/// The user side of the membership relation.
///
/// `display_order` is meant to be exactly the union of owned, collaborative and saved
/// watchlists, but nothing enforces it at write time: it is repaired when the user's
/// watchlists are listed.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WatchlistUser {
    pub id: usize,
    pub handle: String,
    pub email: Option<String>,
    pub saved_watchlists: Vec<String>,
    pub collaborative_watchlists: Vec<String>,
    pub display_order: Vec<String>,
}

impl WatchlistUser {
    pub fn has_saved(&self, watchlist_id: &str) -> bool {
        self.saved_watchlists.iter().any(|id| id == watchlist_id)
    }

    pub fn is_collaborating_on(&self, watchlist_id: &str) -> bool {
        self.collaborative_watchlists
            .iter()
            .any(|id| id == watchlist_id)
    }
}
