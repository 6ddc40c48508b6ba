//! Watchlist data models

use serde::{Deserialize, Serialize};

/// Number of leading posters the generated cover is composed from.
pub const COVER_POSTER_COUNT: usize = 4;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn to_int(&self) -> i32 {
        match self {
            Visibility::Public => 0,
            Visibility::Private => 1,
        }
    }

    pub fn from_int(value: i32) -> Option<Visibility> {
        match value {
            0 => Some(Visibility::Public),
            1 => Some(Visibility::Private),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn to_int(&self) -> i32 {
        match self {
            MediaKind::Movie => 0,
            MediaKind::Series => 1,
        }
    }

    pub fn from_int(value: i32) -> Option<MediaKind> {
        match value {
            0 => Some(MediaKind::Movie),
            1 => Some(MediaKind::Series),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl Platform {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn unknown() -> Platform {
        Platform {
            name: Self::UNKNOWN.to_string(),
            logo: None,
        }
    }
}

/// An empty platform list is stored as a single `unknown` platform.
pub fn normalize_platforms(platforms: Vec<Platform>) -> Vec<Platform> {
    if platforms.is_empty() {
        vec![Platform::unknown()]
    } else {
        platforms
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WatchlistItem {
    pub media_id: String,
    pub title: String,
    pub poster_url: Option<String>,
    pub media_kind: MediaKind,
    pub platforms: Vec<Platform>,
    pub runtime: Option<u32>,
    pub season_count: Option<u32>,
    pub episode_count: Option<u32>,
    /// Unix timestamp, seconds.
    pub added_at: i64,
}

impl WatchlistItem {
    /// Total watch time in minutes, when known.
    pub fn duration_minutes(&self) -> Option<u64> {
        let runtime = self.runtime? as u64;
        match (self.media_kind, self.episode_count) {
            (MediaKind::Series, Some(episodes)) => Some(runtime * episodes as u64),
            _ => Some(runtime),
        }
    }
}

/// The user-editable part of a watchlist.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WatchlistDetails {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: Visibility,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Watchlist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub owner_id: usize,
    pub collaborator_ids: Vec<usize>,
    pub follower_ids: Vec<usize>,
    pub follower_count: u32,
    pub items: Vec<WatchlistItem>,
    pub cover_image: Option<String>,
    pub custom_cover: bool,
    pub categories: Vec<String>,
    pub version: u64,
    pub created: i64,
}

impl Watchlist {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn has_collaborator(&self, user_id: usize) -> bool {
        self.collaborator_ids.contains(&user_id)
    }

    pub fn has_follower(&self, user_id: usize) -> bool {
        self.follower_ids.contains(&user_id)
    }

    pub fn item_position(&self, media_id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.media_id == media_id)
    }

    /// Poster urls of the leading items, the input of cover composition.
    pub fn cover_posters(&self) -> Vec<String> {
        leading_posters(&self.items)
    }
}

pub fn leading_posters(items: &[WatchlistItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.poster_url.clone())
        .take(COVER_POSTER_COUNT)
        .collect()
}
