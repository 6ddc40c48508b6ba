use super::error::{WatchlistError, WatchlistResult};
use super::roles::{resolve_role, RoleResolution};
use crate::media::{CoverComposer, MetadataProvider};
use crate::user::{UserStore, WatchlistUser};
use crate::watchlist::{Visibility, Watchlist, WatchlistDetails, WatchlistStore};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLimits {
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub max_categories: usize,
    pub max_items: usize,
}

impl Default for LibraryLimits {
    fn default() -> Self {
        LibraryLimits {
            max_name_length: 100,
            max_description_length: 1000,
            max_categories: 10,
            max_items: 500,
        }
    }
}

/// Locale and region used for metadata lookups when the request doesn't carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDefaults {
    pub locale: String,
    pub region: String,
}

impl Default for MediaDefaults {
    fn default() -> Self {
        MediaDefaults {
            locale: "en-US".to_string(),
            region: "US".to_string(),
        }
    }
}

/// A watchlist as seen by one viewer.
#[derive(Serialize, Debug, Clone)]
pub struct WatchlistView {
    #[serde(flatten)]
    pub watchlist: Watchlist,
    #[serde(flatten)]
    pub access: RoleResolution,
}

/// Entry point of every watchlist operation.
///
/// Holds both aggregates' stores. No operation writes both in one transaction:
/// mutations write the watchlist side first, then the user side, and anything left
/// half-applied is repaired by the next listing of the user's watchlists.
pub struct WatchlistManager {
    pub(super) user_store: Arc<dyn UserStore>,
    pub(super) watchlist_store: Arc<dyn WatchlistStore>,
    pub(super) metadata_provider: Option<Arc<dyn MetadataProvider>>,
    pub(super) cover_composer: Option<Arc<dyn CoverComposer>>,
    pub(super) limits: LibraryLimits,
    pub(super) media_defaults: MediaDefaults,
}

impl WatchlistManager {
    pub fn new(user_store: Arc<dyn UserStore>, watchlist_store: Arc<dyn WatchlistStore>) -> Self {
        WatchlistManager {
            user_store,
            watchlist_store,
            metadata_provider: None,
            cover_composer: None,
            limits: LibraryLimits::default(),
            media_defaults: MediaDefaults::default(),
        }
    }

    pub fn with_metadata_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata_provider = Some(provider);
        self
    }

    pub fn with_cover_composer(mut self, composer: Arc<dyn CoverComposer>) -> Self {
        self.cover_composer = Some(composer);
        self
    }

    pub fn with_limits(mut self, limits: LibraryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_media_defaults(mut self, defaults: MediaDefaults) -> Self {
        self.media_defaults = defaults;
        self
    }

    pub fn user_store(&self) -> &Arc<dyn UserStore> {
        &self.user_store
    }

    pub(super) fn require_user(&self, user_id: usize) -> WatchlistResult<WatchlistUser> {
        self.user_store
            .get_user(user_id)?
            .ok_or_else(|| WatchlistError::UserNotFound(user_id.to_string()))
    }

    pub(super) fn require_watchlist(&self, watchlist_id: &str) -> WatchlistResult<Watchlist> {
        self.watchlist_store
            .get_watchlist(watchlist_id)?
            .ok_or_else(|| WatchlistError::WatchlistNotFound(watchlist_id.to_string()))
    }

    pub(super) fn view(user: &WatchlistUser, watchlist: Watchlist) -> WatchlistView {
        let access = resolve_role(Some(user), &watchlist);
        WatchlistView { watchlist, access }
    }

    /// Loads the watchlist and checks that `user` may edit it.
    pub(super) fn require_editable(
        &self,
        user: &WatchlistUser,
        watchlist_id: &str,
    ) -> WatchlistResult<Watchlist> {
        let watchlist = self.require_watchlist(watchlist_id)?;
        if !resolve_role(Some(user), &watchlist).can_edit() {
            return Err(WatchlistError::NotEditor);
        }
        Ok(watchlist)
    }

    fn validate_details(&self, details: WatchlistDetails) -> WatchlistResult<WatchlistDetails> {
        let name = details.name.trim().to_string();
        if name.is_empty() {
            return Err(WatchlistError::Validation("Name cannot be empty".to_string()));
        }
        if name.chars().count() > self.limits.max_name_length {
            return Err(WatchlistError::Validation(format!(
                "Name cannot be longer than {} characters",
                self.limits.max_name_length
            )));
        }

        let description = details
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(description) = &description {
            if description.chars().count() > self.limits.max_description_length {
                return Err(WatchlistError::Validation(format!(
                    "Description cannot be longer than {} characters",
                    self.limits.max_description_length
                )));
            }
        }

        let categories = match details.visibility {
            Visibility::Private => vec![],
            Visibility::Public => {
                let mut seen = HashSet::new();
                let categories: Vec<String> = details
                    .categories
                    .iter()
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .filter(|c| seen.insert(c.clone()))
                    .collect();
                if categories.len() > self.limits.max_categories {
                    return Err(WatchlistError::Validation(format!(
                        "At most {} categories are allowed",
                        self.limits.max_categories
                    )));
                }
                categories
            }
        };

        Ok(WatchlistDetails {
            name,
            description,
            visibility: details.visibility,
            categories,
        })
    }

    pub fn create_watchlist(
        &self,
        user_id: usize,
        details: WatchlistDetails,
    ) -> WatchlistResult<WatchlistView> {
        let user = self.require_user(user_id)?;
        let details = self.validate_details(details)?;
        let watchlist = self
            .watchlist_store
            .create_watchlist(user_id, &details, &[])?;
        info!("User {} created watchlist {}", user_id, watchlist.id);

        if let Err(err) = self
            .user_store
            .append_to_display_order(user_id, &watchlist.id)
        {
            warn!(
                "Could not append watchlist {} to display order of user {}: {:#}",
                watchlist.id, user_id, err
            );
        }
        Ok(Self::view(&user, watchlist))
    }

    /// Returns the watchlist if `viewer_id` (or an anonymous viewer) may read it.
    pub fn get_watchlist(
        &self,
        viewer_id: Option<usize>,
        watchlist_id: &str,
    ) -> WatchlistResult<WatchlistView> {
        let viewer = match viewer_id {
            Some(id) => Some(self.require_user(id)?),
            None => None,
        };
        let watchlist = self.require_watchlist(watchlist_id)?;
        let access = resolve_role(viewer.as_ref(), &watchlist);
        if !access.can_read(&watchlist) {
            return Err(WatchlistError::AccessDenied);
        }
        Ok(WatchlistView { watchlist, access })
    }

    pub fn update_details(
        &self,
        user_id: usize,
        watchlist_id: &str,
        details: WatchlistDetails,
    ) -> WatchlistResult<WatchlistView> {
        let user = self.require_user(user_id)?;
        self.require_editable(&user, watchlist_id)?;
        let details = self.validate_details(details)?;
        if !self.watchlist_store.update_details(watchlist_id, &details)? {
            return Err(WatchlistError::WatchlistNotFound(watchlist_id.to_string()));
        }
        let watchlist = self.require_watchlist(watchlist_id)?;
        Ok(Self::view(&user, watchlist))
    }

    /// Deletes the watchlist and removes it from every member's records.
    ///
    /// Cleanup is attempted for each member independently; whatever fails is left for
    /// that member's next listing to repair.
    pub fn delete_watchlist(&self, user_id: usize, watchlist_id: &str) -> WatchlistResult<()> {
        let watchlist = self.require_watchlist(watchlist_id)?;
        if watchlist.owner_id != user_id {
            return Err(WatchlistError::NotOwner);
        }

        self.watchlist_store.delete_watchlist(watchlist_id)?;
        info!("User {} deleted watchlist {}", user_id, watchlist_id);

        let mut affected = vec![watchlist.owner_id];
        affected.extend(watchlist.collaborator_ids.iter().copied());
        affected.extend(watchlist.follower_ids.iter().copied());
        let mut seen = HashSet::new();
        affected.retain(|id| seen.insert(*id));

        for member_id in affected {
            match self
                .user_store
                .remove_watchlist_references(member_id, watchlist_id)
            {
                Ok(changed) => debug!(
                    "Cleaned watchlist {} from user {} (changed: {})",
                    watchlist_id, member_id, changed
                ),
                Err(err) => warn!(
                    "Could not clean watchlist {} from user {}: {:#}",
                    watchlist_id, member_id, err
                ),
            }
        }
        Ok(())
    }

    pub fn set_custom_cover(
        &self,
        user_id: usize,
        watchlist_id: &str,
        cover_image: String,
    ) -> WatchlistResult<WatchlistView> {
        let user = self.require_user(user_id)?;
        self.require_editable(&user, watchlist_id)?;
        let cover_image = cover_image.trim();
        if cover_image.is_empty() {
            return Err(WatchlistError::Validation(
                "Cover image cannot be empty".to_string(),
            ));
        }
        self.watchlist_store
            .set_custom_cover(watchlist_id, Some(cover_image))?;
        let watchlist = self.require_watchlist(watchlist_id)?;
        Ok(Self::view(&user, watchlist))
    }

    /// Drops the custom cover and goes back to a composed one.
    pub fn clear_custom_cover(
        &self,
        user_id: usize,
        watchlist_id: &str,
    ) -> WatchlistResult<WatchlistView> {
        let user = self.require_user(user_id)?;
        self.require_editable(&user, watchlist_id)?;
        self.watchlist_store.set_custom_cover(watchlist_id, None)?;
        let watchlist = self.require_watchlist(watchlist_id)?;
        self.schedule_cover_refresh(&watchlist);
        Ok(Self::view(&user, watchlist))
    }

    /// Asks the cover service for a new cover in the background.
    ///
    /// The result is stored only if the leading posters are still the ones it was
    /// composed from. A watchlist without posters just loses its generated cover.
    pub(crate) fn schedule_cover_refresh(&self, watchlist: &Watchlist) -> Option<JoinHandle<()>> {
        if watchlist.custom_cover {
            return None;
        }
        let posters = watchlist.cover_posters();
        if posters.is_empty() {
            if watchlist.cover_image.is_some() {
                if let Err(err) = self
                    .watchlist_store
                    .set_generated_cover(&watchlist.id, None)
                {
                    warn!("Could not clear cover of watchlist {}: {:#}", watchlist.id, err);
                }
            }
            return None;
        }

        let composer = self.cover_composer.clone()?;
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("No runtime, skipping cover refresh of {}", watchlist.id);
                return None;
            }
        };
        let store = self.watchlist_store.clone();
        let watchlist_id = watchlist.id.clone();
        Some(handle.spawn(refresh_cover(store, composer, watchlist_id, posters)))
    }
}

async fn refresh_cover(
    store: Arc<dyn WatchlistStore>,
    composer: Arc<dyn CoverComposer>,
    watchlist_id: String,
    posters: Vec<String>,
) {
    let url = match composer.compose(&posters).await {
        Ok(url) => url,
        Err(err) => {
            warn!("Cover composition failed for {}: {:#}", watchlist_id, err);
            return;
        }
    };
    match store.get_watchlist(&watchlist_id) {
        Ok(Some(current)) if current.cover_posters() == posters => {
            if let Err(err) = store.set_generated_cover(&watchlist_id, Some(&url)) {
                warn!("Could not store cover of {}: {:#}", watchlist_id, err);
            }
        }
        Ok(_) => debug!(
            "Watchlist {} changed while composing its cover, dropping {}",
            watchlist_id, url
        ),
        Err(err) => warn!("Could not reload watchlist {}: {:#}", watchlist_id, err),
    }
}
