mod cover;
mod metadata;

pub use cover::{CoverClient, CoverComposer};
pub use metadata::{MediaMetadata, MediaQuery, MetadataClient, MetadataError, MetadataProvider};
