//! Role resolution.
//!
//! Roles are always computed from the current state of both sides of the relation:
//! the watchlist's owner and collaborator list, and the viewer's saved set.

use crate::user::WatchlistUser;
use crate::watchlist::Watchlist;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Collaborator,
    Follower,
    None,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleResolution {
    pub role: Role,
    pub is_owner: bool,
    pub is_collaborator: bool,
    pub is_saved: bool,
    /// The viewer is both a collaborator (or owner) and a follower.
    /// Collaboration wins; the stale follow should be cleaned up.
    #[serde(skip)]
    pub superseded_follow: bool,
}

impl RoleResolution {
    pub const NONE: RoleResolution = RoleResolution {
        role: Role::None,
        is_owner: false,
        is_collaborator: false,
        is_saved: false,
        superseded_follow: false,
    };

    pub fn can_read(&self, watchlist: &Watchlist) -> bool {
        watchlist.is_public() || self.role != Role::None
    }

    pub fn can_edit(&self) -> bool {
        matches!(self.role, Role::Owner | Role::Collaborator)
    }
}

/// Resolves the role of `viewer` on `watchlist`. An anonymous viewer has no role.
pub fn resolve_role(viewer: Option<&WatchlistUser>, watchlist: &Watchlist) -> RoleResolution {
    let viewer = match viewer {
        Some(viewer) => viewer,
        None => return RoleResolution::NONE,
    };

    let is_owner = watchlist.owner_id == viewer.id;
    let is_collaborator = !is_owner && watchlist.has_collaborator(viewer.id);
    let follows = viewer.has_saved(&watchlist.id) || watchlist.has_follower(viewer.id);
    let superseded_follow = follows && (is_owner || is_collaborator);
    let is_saved = follows && !superseded_follow;

    let role = if is_owner {
        Role::Owner
    } else if is_collaborator {
        Role::Collaborator
    } else if is_saved {
        Role::Follower
    } else {
        Role::None
    };

    RoleResolution {
        role,
        is_owner,
        is_collaborator,
        is_saved,
        superseded_follow,
    }
}
