//! # Account
//!
//! The state shared by both storage bindings:
//!
//! - [`crate::location::LocationAccount`]: bound to a world coordinate,
//!   persisted by the ledger.
//! - [`crate::carried::CarriedAccount`]: encoded into the metadata of a
//!   single carried item.
//!
//! Capacity is never stored. It is derived from upgrade progress and the
//! configuration every time it is asked for, so changing the config
//! retroactively changes every account's capacity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{ItemCatalog, ItemId};
use crate::config::ExchangeConfig;
use crate::item::ItemStack;

/// Balance and upgrade progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stored Echoes.
    pub balance: u64,
    /// Deposited units per upgrade item.
    pub upgrade_progress: BTreeMap<ItemId, u32>,
}

impl Account {
    /// Creates an empty account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account holding `balance` Echoes.
    #[must_use]
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Units deposited toward the slot for `item_id`.
    #[must_use]
    pub fn progress(&self, item_id: &str) -> u32 {
        self.upgrade_progress.get(item_id).copied().unwrap_or(0)
    }

    /// Number of configured slots whose requirement is met.
    #[must_use]
    pub fn completed_upgrades(&self, config: &ExchangeConfig) -> u32 {
        let completed = config
            .upgrade_slots
            .iter()
            .filter(|slot| self.progress(&slot.item_id) >= slot.required_amount)
            .count();
        u32::try_from(completed).unwrap_or(u32::MAX)
    }

    /// Current capacity.
    #[must_use]
    pub fn capacity(&self, config: &ExchangeConfig) -> u64 {
        config.capacity_for(self.completed_upgrades(config))
    }

    /// Echoes that can still be credited before hitting capacity.
    #[must_use]
    pub fn free_capacity(&self, config: &ExchangeConfig) -> u64 {
        self.capacity(config).saturating_sub(self.balance)
    }

    pub(crate) fn credit(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
    }

    pub(crate) fn debit(&mut self, amount: u64) {
        self.balance = self.balance.saturating_sub(amount);
    }

    /// Adds up to `amount` units toward `item_id`, never past `required`.
    /// Returns the units actually applied.
    pub(crate) fn add_progress(&mut self, item_id: &str, amount: u32, required: u32) -> u32 {
        let current = self.progress(item_id);
        let applied = required.saturating_sub(current).min(amount);
        if applied > 0 {
            self.upgrade_progress
                .insert(item_id.to_string(), current + applied);
        }
        applied
    }

    /// Materializes deposited upgrade items as stacks, each bounded by the
    /// item's max stack size.
    #[must_use]
    pub fn upgrade_returns(&self, catalog: &dyn ItemCatalog) -> Vec<ItemStack> {
        let mut stacks = Vec::new();
        for (item_id, &deposited) in &self.upgrade_progress {
            let max_stack = catalog.max_stack(item_id);
            let mut remaining = deposited;
            while remaining > 0 {
                let quantity = remaining.min(max_stack);
                stacks.push(ItemStack::new(item_id.clone(), quantity));
                remaining -= quantity;
            }
        }
        stacks
    }
}
