use super::auth::{AuthToken, AuthTokenValue};
use super::user_models::WatchlistUser;
use anyhow::Result;

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns a user's authentication token given an AuthTokenValue.
    /// Returns Ok(None) if the token does not exist.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Adds a new auth token.
    fn add_user_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Updates an auth token with the latest timestamp.
    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()>;
}

/// Persistence of the user aggregate.
///
/// Every membership method touches a single user record and reports whether anything
/// changed, so callers can retry a half-applied mutation without double effects.
pub trait UserStore: UserAuthTokenStore + Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, user_handle: &str, email: Option<&str>) -> Result<usize>;

    /// Returns the full user record, Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<WatchlistUser>>;

    /// Returns a user's id given the handle.
    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>>;

    /// Returns a user's handle given the id.
    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>>;

    /// Adds the watchlist to the saved set and appends it to the display order if absent.
    fn add_saved_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool>;

    /// Removes the watchlist from the saved set and from the display order.
    fn remove_saved_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool>;

    /// Drops the watchlist from the saved set, adds it to the collaborative set and
    /// appends it to the display order if absent.
    fn add_collaborative_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool>;

    /// Removes the watchlist from the collaborative set and from the display order.
    fn remove_collaborative_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool>;

    /// Appends the watchlist to the end of the display order if it isn't there yet.
    fn append_to_display_order(&self, user_id: usize, watchlist_id: &str) -> Result<bool>;

    /// Replaces the whole display order.
    fn set_display_order(&self, user_id: usize, watchlist_ids: &[String]) -> Result<()>;

    /// Removes every reference to the watchlist (saved, collaborative, display order).
    fn remove_watchlist_references(&self, user_id: usize, watchlist_id: &str) -> Result<bool>;
}
