//! Item sequencing inside a single watchlist.
//!
//! All operations work on a copy of the item sequence and return the new one; the
//! caller persists it as a whole. Sorted views are never persisted.

use super::error::{WatchlistError, WatchlistResult};
use super::ordering::validate_permutation;
use crate::watchlist::WatchlistItem;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemSort {
    #[default]
    Position,
    Title,
    Duration,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

pub fn append(items: &[WatchlistItem], item: WatchlistItem) -> WatchlistResult<Vec<WatchlistItem>> {
    if items.iter().any(|i| i.media_id == item.media_id) {
        return Err(WatchlistError::AlreadyExists(item.media_id));
    }
    let mut items = items.to_vec();
    items.push(item);
    Ok(items)
}

pub fn remove(items: &[WatchlistItem], media_id: &str) -> WatchlistResult<Vec<WatchlistItem>> {
    let index = find(items, media_id)?;
    let mut items = items.to_vec();
    items.remove(index);
    Ok(items)
}

pub fn move_to_first(items: &[WatchlistItem], media_id: &str) -> WatchlistResult<Vec<WatchlistItem>> {
    let index = find(items, media_id)?;
    let mut items = items.to_vec();
    let item = items.remove(index);
    items.insert(0, item);
    Ok(items)
}

pub fn move_to_last(items: &[WatchlistItem], media_id: &str) -> WatchlistResult<Vec<WatchlistItem>> {
    let index = find(items, media_id)?;
    let mut items = items.to_vec();
    let item = items.remove(index);
    items.push(item);
    Ok(items)
}

/// Rearranges `items` to follow `order`, which must be a permutation of the current ids.
pub fn reorder(items: &[WatchlistItem], order: &[String]) -> WatchlistResult<Vec<WatchlistItem>> {
    let current: Vec<&str> = items.iter().map(|item| item.media_id.as_str()).collect();
    validate_permutation(&current, order).map_err(WatchlistError::InvalidOrder)?;

    let by_id: HashMap<&str, &WatchlistItem> = items
        .iter()
        .map(|item| (item.media_id.as_str(), item))
        .collect();
    Ok(order
        .iter()
        .filter_map(|media_id| by_id.get(media_id.as_str()).map(|item| (*item).clone()))
        .collect())
}

/// A transient sorted view. Items with unknown duration go last in both directions.
pub fn sorted_view(
    items: &[WatchlistItem],
    sort: ItemSort,
    direction: SortDirection,
) -> Vec<WatchlistItem> {
    let mut view = items.to_vec();
    match sort {
        ItemSort::Position => {
            if direction == SortDirection::Desc {
                view.reverse();
            }
        }
        ItemSort::Title => {
            view.sort_by_cached_key(|item| item.title.to_lowercase());
            if direction == SortDirection::Desc {
                view.reverse();
            }
        }
        ItemSort::Duration => {
            view.sort_by(|a, b| match (a.duration_minutes(), b.duration_minutes()) {
                (Some(a), Some(b)) => match direction {
                    SortDirection::Asc => a.cmp(&b),
                    SortDirection::Desc => b.cmp(&a),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        }
    }
    view
}

fn find(items: &[WatchlistItem], media_id: &str) -> WatchlistResult<usize> {
    items
        .iter()
        .position(|item| item.media_id == media_id)
        .ok_or_else(|| WatchlistError::ItemNotFound(media_id.to_string()))
}
