//! Per-player discovery records.
//!
//! Discovery is a one-way gate: an item id, once added, is never removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::catalog::ItemId;

/// Stable player identity.
pub type PlayerId = Uuid;

/// Items a player may transmute, plus their last search string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    discovered: BTreeSet<ItemId>,
    search_query: String,
}

impl DiscoveryRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a record from persisted state.
    #[must_use]
    pub fn from_parts(discovered: impl IntoIterator<Item = ItemId>, search_query: String) -> Self {
        Self {
            discovered: discovered.into_iter().collect(),
            search_query,
        }
    }

    /// Adds an item. Returns true if it was not already discovered.
    pub fn discover(&mut self, item_id: &str) -> bool {
        if self.discovered.contains(item_id) {
            return false;
        }
        self.discovered.insert(item_id.to_string())
    }

    /// Returns true if the item has been discovered.
    #[must_use]
    pub fn contains(&self, item_id: &str) -> bool {
        self.discovered.contains(item_id)
    }

    /// Discovered ids in sorted order.
    pub fn discovered(&self) -> impl Iterator<Item = &ItemId> {
        self.discovered.iter()
    }

    /// Number of discovered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.discovered.len()
    }

    /// Returns true if nothing has been discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty()
    }

    /// Last search string.
    #[must_use]
    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Replaces the search string.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }
}
