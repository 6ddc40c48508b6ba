mod error;
mod items;
mod manager;
mod membership;
pub mod ordering;
mod reconciler;
pub mod roles;
pub mod sequencer;

#[cfg(test)]
mod test_support;

pub use error::{ErrorKind, WatchlistError, WatchlistResult};
pub use items::NewItem;
pub use manager::{LibraryLimits, MediaDefaults, WatchlistManager, WatchlistView};
pub use ordering::{DisplayOrder, OrderRepair};
pub use roles::{resolve_role, Role, RoleResolution};
pub use sequencer::{ItemSort, SortDirection};
