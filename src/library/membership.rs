//! Membership mutations.
//!
//! Preconditions are checked against both sides of the relation before anything is
//! written. A side that already holds the wanted state is rewritten idempotently, so
//! retrying a mutation that failed halfway completes it.

use super::error::{WatchlistError, WatchlistResult};
use super::manager::{WatchlistManager, WatchlistView};
use super::roles::{resolve_role, Role};
use crate::watchlist::WatchlistDetails;
use tracing::{info, warn};

impl WatchlistManager {
    /// Follows a public watchlist.
    pub fn save_watchlist(
        &self,
        user_id: usize,
        watchlist_id: &str,
    ) -> WatchlistResult<WatchlistView> {
        let user = self.require_user(user_id)?;
        let watchlist = self.require_watchlist(watchlist_id)?;
        if watchlist.owner_id == user_id {
            return Err(WatchlistError::InvalidTarget(
                "You can't save your own watchlist".to_string(),
            ));
        }
        if watchlist.has_collaborator(user_id) {
            return Err(WatchlistError::AlreadyCollaborator);
        }
        if !watchlist.is_public() {
            return Err(WatchlistError::AccessDenied);
        }
        if watchlist.has_follower(user_id) && user.has_saved(watchlist_id) {
            return Err(WatchlistError::AlreadySaved);
        }

        self.watchlist_store.add_follower(watchlist_id, user_id)?;
        self.user_store.add_saved_watchlist(user_id, watchlist_id)?;
        info!("User {} saved watchlist {}", user_id, watchlist_id);

        let user = self.require_user(user_id)?;
        let watchlist = self.require_watchlist(watchlist_id)?;
        Ok(Self::view(&user, watchlist))
    }

    /// Stops following a watchlist. A follow whose watchlist is gone is still removed
    /// from the user's records.
    pub fn unsave_watchlist(&self, user_id: usize, watchlist_id: &str) -> WatchlistResult<()> {
        let user = self.require_user(user_id)?;
        let watchlist = match self.watchlist_store.get_watchlist(watchlist_id)? {
            Some(watchlist) => watchlist,
            None if user.has_saved(watchlist_id) => {
                self.user_store.remove_saved_watchlist(user_id, watchlist_id)?;
                return Ok(());
            }
            None => {
                return Err(WatchlistError::WatchlistNotFound(
                    watchlist_id.to_string(),
                ))
            }
        };
        if !watchlist.has_follower(user_id) && !user.has_saved(watchlist_id) {
            return Err(WatchlistError::NotMember);
        }

        self.watchlist_store.remove_follower(watchlist_id, user_id)?;
        self.user_store.remove_saved_watchlist(user_id, watchlist_id)?;
        info!("User {} unsaved watchlist {}", user_id, watchlist_id);
        Ok(())
    }

    /// Makes the user with `handle` a collaborator. Collaboration replaces any follow
    /// the user had on the watchlist.
    pub fn add_collaborator(
        &self,
        owner_id: usize,
        watchlist_id: &str,
        handle: &str,
    ) -> WatchlistResult<WatchlistView> {
        let owner = self.require_user(owner_id)?;
        let watchlist = self.require_watchlist(watchlist_id)?;
        if watchlist.owner_id != owner_id {
            return Err(WatchlistError::NotOwner);
        }
        let target_id = self
            .user_store
            .get_user_id(handle.trim())?
            .ok_or_else(|| WatchlistError::UserNotFound(handle.to_string()))?;
        if target_id == owner_id {
            return Err(WatchlistError::InvalidTarget(
                "The owner can't be a collaborator".to_string(),
            ));
        }
        let target = self.require_user(target_id)?;
        if watchlist.has_collaborator(target_id) && target.is_collaborating_on(watchlist_id) {
            return Err(WatchlistError::AlreadyCollaborator);
        }

        let added = self
            .watchlist_store
            .add_collaborator(watchlist_id, target_id)?;
        self.user_store
            .add_collaborative_watchlist(target_id, watchlist_id)?;
        info!(
            "User {} added {} as collaborator of {} (dropped follow: {})",
            owner_id, target_id, watchlist_id, added.removed_follower
        );

        let watchlist = self.require_watchlist(watchlist_id)?;
        Ok(Self::view(&owner, watchlist))
    }

    pub fn remove_collaborator(
        &self,
        owner_id: usize,
        watchlist_id: &str,
        target_id: usize,
    ) -> WatchlistResult<()> {
        let watchlist = self.require_watchlist(watchlist_id)?;
        if watchlist.owner_id != owner_id {
            return Err(WatchlistError::NotOwner);
        }
        let target = self.require_user(target_id)?;
        if !watchlist.has_collaborator(target_id) && !target.is_collaborating_on(watchlist_id) {
            return Err(WatchlistError::NotMember);
        }

        self.watchlist_store
            .remove_collaborator(watchlist_id, target_id)?;
        self.user_store
            .remove_collaborative_watchlist(target_id, watchlist_id)?;
        info!(
            "User {} removed collaborator {} from {}",
            owner_id, target_id, watchlist_id
        );
        Ok(())
    }

    /// A collaborator removing themselves.
    pub fn leave_watchlist(&self, user_id: usize, watchlist_id: &str) -> WatchlistResult<()> {
        let user = self.require_user(user_id)?;
        let watchlist = match self.watchlist_store.get_watchlist(watchlist_id)? {
            Some(watchlist) => watchlist,
            None if user.is_collaborating_on(watchlist_id) => {
                self.user_store
                    .remove_collaborative_watchlist(user_id, watchlist_id)?;
                return Ok(());
            }
            None => {
                return Err(WatchlistError::WatchlistNotFound(
                    watchlist_id.to_string(),
                ))
            }
        };
        if watchlist.owner_id == user_id {
            return Err(WatchlistError::InvalidTarget(
                "The owner can't leave their own watchlist".to_string(),
            ));
        }
        if !watchlist.has_collaborator(user_id) && !user.is_collaborating_on(watchlist_id) {
            return Err(WatchlistError::NotMember);
        }

        self.watchlist_store
            .remove_collaborator(watchlist_id, user_id)?;
        self.user_store
            .remove_collaborative_watchlist(user_id, watchlist_id)?;
        info!("User {} left watchlist {}", user_id, watchlist_id);
        Ok(())
    }

    /// Copies someone else's watchlist into a new one owned by the caller.
    ///
    /// Items and categories are copied. The custom cover and the membership are not.
    pub fn duplicate_watchlist(
        &self,
        user_id: usize,
        watchlist_id: &str,
    ) -> WatchlistResult<WatchlistView> {
        let user = self.require_user(user_id)?;
        let source = self.require_watchlist(watchlist_id)?;
        let access = resolve_role(Some(&user), &source);
        if access.role == Role::Owner {
            return Err(WatchlistError::InvalidTarget(
                "You can't duplicate your own watchlist".to_string(),
            ));
        }
        if !access.can_read(&source) {
            return Err(WatchlistError::AccessDenied);
        }

        let details = WatchlistDetails {
            name: source.name.clone(),
            description: source.description.clone(),
            visibility: source.visibility,
            categories: source.categories.clone(),
        };
        let copy = self
            .watchlist_store
            .create_watchlist(user_id, &details, &source.items)?;
        info!(
            "User {} duplicated watchlist {} into {}",
            user_id, watchlist_id, copy.id
        );

        if let Err(err) = self.user_store.append_to_display_order(user_id, &copy.id) {
            warn!(
                "Could not append watchlist {} to display order of user {}: {:#}",
                copy.id, user_id, err
            );
        }
        self.schedule_cover_refresh(&copy);
        Ok(Self::view(&user, copy))
    }
}
