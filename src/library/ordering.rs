//! Explicit orderings over sets of ids.
//!
//! Used for a user's display order over their watchlists and, through
//! [`validate_permutation`], for explicit item reorders.

use std::collections::{HashMap, HashSet};

/// What [`DisplayOrder::reconcile`] had to change.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrderRepair {
    pub appended: Vec<String>,
    pub removed: Vec<String>,
    pub deduplicated: usize,
}

impl OrderRepair {
    pub fn is_empty(&self) -> bool {
        self.appended.is_empty() && self.removed.is_empty() && self.deduplicated == 0
    }
}

/// An ordered, duplicate-free sequence of ids with O(1) position lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayOrder {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl DisplayOrder {
    /// Builds the order keeping the first occurrence of every id.
    pub fn new<I: IntoIterator<Item = String>>(ids: I) -> Self {
        let mut order = DisplayOrder::default();
        for id in ids {
            order.push(id);
        }
        order
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<String> {
        self.ids
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Appends `id` unless already present. Returns whether it was appended.
    pub fn push(&mut self, id: String) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }
        self.positions.insert(id.clone(), self.ids.len());
        self.ids.push(id);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let index = match self.positions.remove(id) {
            Some(index) => index,
            None => return false,
        };
        self.ids.remove(index);
        for (position, id) in self.ids.iter().enumerate().skip(index) {
            self.positions.insert(id.clone(), position);
        }
        true
    }

    /// Makes the order cover exactly `members`.
    ///
    /// Ids missing from the order are appended in the order `members` yields them,
    /// ids that are no longer members are dropped. `stored_len` is the length of the
    /// persisted sequence the order was built from, so duplicates dropped while
    /// building it are reported too.
    pub fn reconcile<'a, I>(&mut self, members: I, stored_len: usize) -> OrderRepair
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut repair = OrderRepair {
            deduplicated: stored_len.saturating_sub(self.ids.len()),
            ..Default::default()
        };

        let mut member_set = HashSet::new();
        let mut missing = Vec::new();
        for id in members {
            if !member_set.insert(id) {
                continue;
            }
            if !self.contains(id) {
                missing.push(id.to_string());
            }
        }

        let stale: Vec<String> = self
            .ids
            .iter()
            .filter(|id| !member_set.contains(id.as_str()))
            .cloned()
            .collect();
        if !stale.is_empty() {
            let kept: Vec<String> = self
                .ids
                .drain(..)
                .filter(|id| member_set.contains(id.as_str()))
                .collect();
            *self = DisplayOrder::new(kept);
        }

        for id in missing {
            self.push(id.clone());
            repair.appended.push(id);
        }
        repair.removed = stale;
        repair
    }

    /// Stable sort of `entries` by position of their id; unknown ids go last.
    pub fn sort_by_position<T, F>(&self, entries: &mut [T], id_of: F)
    where
        F: Fn(&T) -> &str,
    {
        entries.sort_by_key(|entry| self.position(id_of(entry)).unwrap_or(usize::MAX));
    }
}

/// Checks that `submitted` contains exactly the ids of `current`, each once.
pub fn validate_permutation(current: &[&str], submitted: &[String]) -> Result<(), String> {
    if current.len() != submitted.len() {
        return Err(format!(
            "expected {} ids, got {}",
            current.len(),
            submitted.len()
        ));
    }
    let current: HashSet<&str> = current.iter().copied().collect();
    let mut seen = HashSet::with_capacity(submitted.len());
    for id in submitted {
        if !current.contains(id.as_str()) {
            return Err(format!("unknown id {}", id));
        }
        if !seen.insert(id.as_str()) {
            return Err(format!("duplicate id {}", id));
        }
    }
    Ok(())
}
