use thiserror::Error;

/// Broad class of a [`WatchlistError`], used to pick the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    Upstream,
    Internal,
}

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("{0}")]
    Validation(String),

    #[error("Watchlist {0} not found")]
    WatchlistNotFound(String),

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Item {0} not found")]
    ItemNotFound(String),

    #[error("Only the owner can do this")]
    NotOwner,

    #[error("Only the owner or a collaborator can do this")]
    NotEditor,

    #[error("You don't have access to this watchlist")]
    AccessDenied,

    #[error("Watchlist already saved")]
    AlreadySaved,

    #[error("User is already a collaborator")]
    AlreadyCollaborator,

    #[error("Item {0} is already in the watchlist")]
    AlreadyExists(String),

    #[error("Not a member of this watchlist")]
    NotMember,

    #[error("{0}")]
    InvalidTarget(String),

    #[error("Submitted order does not match the current set: {0}")]
    InvalidOrder(String),

    #[error("Watchlist changed (version {current}), reload and retry")]
    VersionConflict { current: u64 },

    #[error("Upstream service failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl WatchlistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WatchlistError::Validation(_) => ErrorKind::Validation,
            WatchlistError::WatchlistNotFound(_)
            | WatchlistError::UserNotFound(_)
            | WatchlistError::ItemNotFound(_) => ErrorKind::NotFound,
            WatchlistError::NotOwner
            | WatchlistError::NotEditor
            | WatchlistError::AccessDenied
            | WatchlistError::InvalidTarget(_) => ErrorKind::Forbidden,
            WatchlistError::AlreadySaved
            | WatchlistError::AlreadyCollaborator
            | WatchlistError::AlreadyExists(_)
            | WatchlistError::NotMember
            | WatchlistError::InvalidOrder(_)
            | WatchlistError::VersionConflict { .. } => ErrorKind::Conflict,
            WatchlistError::Upstream(_) => ErrorKind::Upstream,
            WatchlistError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            WatchlistError::Validation(_) => "validation_error",
            WatchlistError::WatchlistNotFound(_) => "watchlist_not_found",
            WatchlistError::UserNotFound(_) => "user_not_found",
            WatchlistError::ItemNotFound(_) => "item_not_found",
            WatchlistError::NotOwner => "not_owner",
            WatchlistError::NotEditor => "not_editor",
            WatchlistError::AccessDenied => "access_denied",
            WatchlistError::AlreadySaved => "already_saved",
            WatchlistError::AlreadyCollaborator => "already_collaborator",
            WatchlistError::AlreadyExists(_) => "already_exists",
            WatchlistError::NotMember => "not_member",
            WatchlistError::InvalidTarget(_) => "invalid_target",
            WatchlistError::InvalidOrder(_) => "invalid_order",
            WatchlistError::VersionConflict { .. } => "version_conflict",
            WatchlistError::Upstream(_) => "upstream_failure",
            WatchlistError::Store(_) => "internal_error",
        }
    }
}

pub type WatchlistResult<T> = Result<T, WatchlistError>;
