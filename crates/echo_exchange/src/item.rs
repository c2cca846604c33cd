//! # Item Stacks and Metadata
//!
//! An [`ItemStack`] is what sits in an inventory slot: an item id, a count
//! and an optional metadata blob. The blob is opaque to the host; the
//! exchange uses it for two things:
//!
//! - a scroll's redeemable Echo value
//! - a carried account's balance and upgrade progress

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::catalog::ItemId;

/// Opaque string-keyed metadata attached to one item instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemMetadata(Map<String, Value>);

impl ItemMetadata {
    /// Creates an empty blob.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads an unsigned integer value.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    /// Writes an unsigned integer value.
    pub fn put_u64(&mut self, key: &str, value: u64) {
        self.0.insert(key.to_string(), Value::from(value));
    }

    /// Reads a nested `name -> u32` table. Entries that are not valid
    /// `u32` values are skipped.
    #[must_use]
    pub fn get_u32_map(&self, key: &str) -> Option<BTreeMap<String, u32>> {
        let table = self.0.get(key)?.as_object()?;
        Some(
            table
                .iter()
                .filter_map(|(name, value)| {
                    let value = u32::try_from(value.as_u64()?).ok()?;
                    Some((name.clone(), value))
                })
                .collect(),
        )
    }

    /// Writes a nested `name -> u32` table.
    pub fn put_u32_map(&mut self, key: &str, values: &BTreeMap<String, u32>) {
        let table: Map<String, Value> = values
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(*value)))
            .collect();
        self.0.insert(key.to_string(), Value::Object(table));
    }
}

/// A stack of items in an inventory slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    /// The item type.
    pub item_id: ItemId,
    /// Number of items in this stack.
    pub quantity: u32,
    /// Per-instance data, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ItemMetadata>,
}

impl ItemStack {
    /// Creates a plain stack without metadata.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
            metadata: None,
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ItemMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns true if this stack holds nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quantity == 0 || self.item_id.is_empty()
    }

    /// Two stacks merge only when they are the same item with the same
    /// metadata; a scroll worth 50 never merges with a scroll worth 80.
    #[must_use]
    pub fn stacks_with(&self, other: &Self) -> bool {
        self.item_id == other.item_id && self.metadata == other.metadata
    }
}
