//! # Inventory Abstraction
//!
//! The exchange does not own player inventories. Hosts expose theirs
//! through [`InventoryAccess`]; the engine only ever:
//!
//! - enumerates slot contents
//! - removes N units from a slot
//! - inserts a stack and learns the undeliverable remainder
//! - swaps the instance in a slot (to commit a carried account)
//!
//! [`Inventory`] is a plain slot container implementing the trait, used by
//! tests and by hosts that have nothing better.

use std::collections::HashMap;

use crate::catalog::{ItemCatalog, ItemId, DEFAULT_MAX_STACK};
use crate::item::ItemStack;

/// Index of an inventory slot.
pub type SlotIndex = usize;

/// Inventory operations consumed by the transaction engine.
pub trait InventoryAccess {
    /// Non-empty slots in scan order.
    fn slots(&self) -> Vec<(SlotIndex, ItemStack)>;

    /// Contents of one slot.
    fn stack_at(&self, slot: SlotIndex) -> Option<ItemStack>;

    /// Removes up to `quantity` units from `slot`, returns how many were removed.
    fn remove_from_slot(&mut self, slot: SlotIndex, quantity: u32) -> u32;

    /// Inserts a stack. Returns whatever did not fit.
    fn insert_stack(&mut self, stack: ItemStack) -> Option<ItemStack>;

    /// Overwrites the contents of `slot`.
    fn replace_slot(&mut self, slot: SlotIndex, stack: ItemStack);

    /// Counts units of `item_id` across all slots, regardless of metadata.
    fn count_item(&self, item_id: &str) -> u32 {
        self.slots()
            .iter()
            .filter(|(_, stack)| stack.item_id == item_id)
            .fold(0u32, |total, (_, stack)| total.saturating_add(stack.quantity))
    }
}

/// Default number of slots.
pub const DEFAULT_INVENTORY_SLOTS: usize = 36;

/// A fixed-size slot inventory.
///
/// Stack limits come from [`Inventory::from_catalog`] or
/// [`Inventory::set_max_stack`]; items with neither stack to
/// [`DEFAULT_MAX_STACK`].
#[derive(Clone, Debug)]
pub struct Inventory {
    /// Slots; `None` is empty.
    slots: Vec<Option<ItemStack>>,
    /// Item max stack sizes.
    max_stacks: HashMap<ItemId, u32>,
}

impl Inventory {
    /// Creates an empty inventory with `slot_count` slots.
    #[must_use]
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![None; slot_count],
            max_stacks: HashMap::new(),
        }
    }

    /// Creates an empty inventory whose stack limits match `catalog`.
    #[must_use]
    pub fn from_catalog(slot_count: usize, catalog: &dyn ItemCatalog) -> Self {
        let mut inventory = Self::new(slot_count);
        for item_id in catalog.item_ids() {
            let max_stack = catalog.max_stack(&item_id);
            inventory.set_max_stack(item_id, max_stack);
        }
        inventory
    }

    /// Sets the maximum stack size for an item.
    pub fn set_max_stack(&mut self, item_id: impl Into<ItemId>, max_stack: u32) {
        self.max_stacks.insert(item_id.into(), max_stack.max(1));
    }

    fn max_stack(&self, item_id: &str) -> u32 {
        self.max_stacks
            .get(item_id)
            .copied()
            .unwrap_or(DEFAULT_MAX_STACK)
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn used_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Places a stack into a specific slot, replacing what was there.
    pub fn set(&mut self, slot: SlotIndex, stack: ItemStack) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = (!stack.is_empty()).then_some(stack);
        }
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(DEFAULT_INVENTORY_SLOTS)
    }
}

impl InventoryAccess for Inventory {
    fn slots(&self) -> Vec<(SlotIndex, ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.clone().map(|stack| (index, stack)))
            .collect()
    }

    fn stack_at(&self, slot: SlotIndex) -> Option<ItemStack> {
        self.slots.get(slot).cloned().flatten()
    }

    fn remove_from_slot(&mut self, slot: SlotIndex, quantity: u32) -> u32 {
        let Some(entry) = self.slots.get_mut(slot) else {
            return 0;
        };
        let Some(stack) = entry.as_mut() else {
            return 0;
        };

        let removed = stack.quantity.min(quantity);
        stack.quantity -= removed;
        if stack.quantity == 0 {
            *entry = None;
        }
        removed
    }

    fn insert_stack(&mut self, stack: ItemStack) -> Option<ItemStack> {
        if stack.is_empty() {
            return None;
        }
        let max_stack = self.max_stack(&stack.item_id);
        let mut remaining = stack.quantity;

        // First, top up existing stacks
        for existing in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if existing.stacks_with(&stack) && existing.quantity < max_stack {
                let can_add = (max_stack - existing.quantity).min(remaining);
                existing.quantity += can_add;
                remaining -= can_add;
            }
        }

        // Then, use empty slots
        for slot in &mut self.slots {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let add = remaining.min(max_stack);
                *slot = Some(ItemStack {
                    quantity: add,
                    ..stack.clone()
                });
                remaining -= add;
            }
        }

        (remaining > 0).then(|| ItemStack {
            quantity: remaining,
            ..stack
        })
    }

    fn replace_slot(&mut self, slot: SlotIndex, stack: ItemStack) {
        self.set(slot, stack);
    }
}
