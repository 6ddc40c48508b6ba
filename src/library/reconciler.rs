//! Listing a user's watchlists.
//!
//! The listing is computed from the current membership on both sides and doubles as
//! the repair pass for anything a mutation left half-applied.

use super::error::{WatchlistError, WatchlistResult};
use super::manager::{WatchlistManager, WatchlistView};
use super::ordering::{validate_permutation, DisplayOrder};
use super::roles::resolve_role;
use crate::user::WatchlistUser;
use crate::watchlist::Watchlist;
use std::collections::HashSet;
use tracing::{debug, warn};

impl WatchlistManager {
    /// Returns every watchlist the user owns, collaborates on or follows, in the
    /// user's display order.
    ///
    /// Unresolvable ids are dropped and the stored order is repaired on the way.
    /// Persisting repairs is best-effort and never fails the listing.
    pub fn list_watchlists(&self, user_id: usize) -> WatchlistResult<Vec<WatchlistView>> {
        let user = self.require_user(user_id)?;
        let owned_or_collaborative = self.watchlist_store.get_owned_or_collaborative(user_id)?;
        let saved = self.watchlist_store.get_watchlists(&user.saved_watchlists)?;

        let repaired_memberships =
            self.repair_memberships(&user, &owned_or_collaborative, &saved);

        let mut seen = HashSet::new();
        let mut views: Vec<WatchlistView> = owned_or_collaborative
            .into_iter()
            .chain(saved)
            .filter(|watchlist| seen.insert(watchlist.id.clone()))
            .map(|watchlist| Self::view(&user, watchlist))
            .collect();

        let mut order = DisplayOrder::new(user.display_order.iter().cloned());
        let repair = order.reconcile(
            views.iter().map(|view| view.watchlist.id.as_str()),
            user.display_order.len(),
        );
        if !repair.is_empty() || repaired_memberships {
            debug!(
                "Repairing display order of user {}: appended {:?}, removed {:?}, {} duplicates",
                user_id, repair.appended, repair.removed, repair.deduplicated
            );
            if let Err(err) = self.user_store.set_display_order(user_id, order.ids()) {
                warn!(
                    "Could not persist repaired display order of user {}: {:#}",
                    user_id, err
                );
            }
        }

        order.sort_by_position(&mut views, |view| view.watchlist.id.as_str());
        Ok(views)
    }

    /// Replaces the user's display order. `watchlist_ids` must be a permutation of the
    /// user's current watchlists.
    pub fn reorder_watchlists(
        &self,
        user_id: usize,
        watchlist_ids: Vec<String>,
    ) -> WatchlistResult<Vec<WatchlistView>> {
        let mut views = self.list_watchlists(user_id)?;
        let current: Vec<&str> = views.iter().map(|v| v.watchlist.id.as_str()).collect();
        validate_permutation(&current, &watchlist_ids).map_err(WatchlistError::InvalidOrder)?;

        self.user_store.set_display_order(user_id, &watchlist_ids)?;
        let order = DisplayOrder::new(watchlist_ids);
        order.sort_by_position(&mut views, |view| view.watchlist.id.as_str());
        Ok(views)
    }

    /// Brings the user's membership sets in line with the watchlists. Returns whether
    /// anything was written, in which case the display order must be persisted again.
    fn repair_memberships(
        &self,
        user: &WatchlistUser,
        owned_or_collaborative: &[Watchlist],
        saved: &[Watchlist],
    ) -> bool {
        let mut repaired = false;
        let mut attempt = |what: &str, watchlist_id: &str, result: anyhow::Result<bool>| match result
        {
            Ok(changed) => {
                if changed {
                    debug!("Repaired {} of {} for user {}", what, watchlist_id, user.id);
                }
                repaired |= changed;
            }
            Err(err) => warn!(
                "Could not repair {} of {} for user {}: {:#}",
                what, watchlist_id, user.id, err
            ),
        };

        let resolved_saved: HashSet<&str> = saved.iter().map(|w| w.id.as_str()).collect();
        for watchlist_id in &user.saved_watchlists {
            if !resolved_saved.contains(watchlist_id.as_str()) {
                attempt(
                    "dangling save",
                    watchlist_id,
                    self.user_store
                        .remove_saved_watchlist(user.id, watchlist_id),
                );
            }
        }

        let collaborating: HashSet<&str> = owned_or_collaborative
            .iter()
            .filter(|w| w.has_collaborator(user.id) && w.owner_id != user.id)
            .map(|w| w.id.as_str())
            .collect();
        for watchlist_id in &user.collaborative_watchlists {
            if !collaborating.contains(watchlist_id.as_str()) {
                attempt(
                    "stale collaboration",
                    watchlist_id,
                    self.user_store
                        .remove_collaborative_watchlist(user.id, watchlist_id),
                );
            }
        }
        for watchlist_id in &collaborating {
            if !user.is_collaborating_on(watchlist_id) {
                attempt(
                    "missing collaboration",
                    watchlist_id,
                    self.user_store
                        .add_collaborative_watchlist(user.id, watchlist_id),
                );
            }
        }

        for watchlist in owned_or_collaborative.iter().chain(saved) {
            if !resolve_role(Some(user), watchlist).superseded_follow {
                continue;
            }
            if watchlist.has_follower(user.id) {
                attempt(
                    "superseded follow",
                    &watchlist.id,
                    self.watchlist_store.remove_follower(&watchlist.id, user.id),
                );
            }
            if user.has_saved(&watchlist.id) {
                attempt(
                    "superseded save",
                    &watchlist.id,
                    self.user_store
                        .remove_saved_watchlist(user.id, &watchlist.id),
                );
            }
        }

        repaired
    }
}
