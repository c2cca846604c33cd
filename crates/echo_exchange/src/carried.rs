//! # Carried Accounts
//!
//! A portable account lives inside the metadata of one Exchange Tablet.
//! It has no identity of its own: reading it means decoding the item in a
//! slot, saving it means putting a freshly encoded tablet back into that
//! same slot.
//!
//! ```text
//!   slot 4: ExchangeTablet { StoredEchoes: 900, UpgradeSlotProgress: {..} }
//!              │ decode                                   ▲ commit
//!              ▼                                          │
//!           CarriedAccount ── burn / transmute / deposit ─┘
//! ```

use crate::account::Account;
use crate::inventory::{InventoryAccess, SlotIndex};
use crate::item::{ItemMetadata, ItemStack};

/// Item id of the portable exchange.
pub const TABLET_ITEM_ID: &str = "ExchangeTablet";

/// Metadata key for the balance.
pub const STORED_ECHOES_KEY: &str = "StoredEchoes";

/// Metadata key for upgrade progress.
pub const UPGRADE_PROGRESS_KEY: &str = "UpgradeSlotProgress";

/// An account decoded from a tablet's metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CarriedAccount {
    /// Decoded state.
    pub account: Account,
}

impl CarriedAccount {
    /// Wraps an account.
    #[must_use]
    pub fn new(account: Account) -> Self {
        Self { account }
    }

    /// Returns true if `item_id` is the tablet item.
    #[inline]
    #[must_use]
    pub fn is_carrier(item_id: &str) -> bool {
        item_id == TABLET_ITEM_ID
    }

    /// Decodes the account carried by `stack`.
    ///
    /// Returns `None` if the stack is not a tablet. A tablet without
    /// metadata decodes as an empty account.
    #[must_use]
    pub fn decode(stack: &ItemStack) -> Option<Self> {
        if !Self::is_carrier(&stack.item_id) {
            return None;
        }
        let Some(meta) = stack.metadata.as_ref() else {
            return Some(Self::default());
        };
        Some(Self::new(Account {
            balance: meta.get_u64(STORED_ECHOES_KEY).unwrap_or(0),
            upgrade_progress: meta.get_u32_map(UPGRADE_PROGRESS_KEY).unwrap_or_default(),
        }))
    }

    /// First slot holding a tablet, in scan order.
    #[must_use]
    pub fn locate(inventory: &dyn InventoryAccess) -> Option<SlotIndex> {
        inventory
            .slots()
            .into_iter()
            .find(|(_, stack)| Self::is_carrier(&stack.item_id))
            .map(|(slot, _)| slot)
    }

    /// Encodes the account into a new tablet instance.
    #[must_use]
    pub fn encode(&self) -> ItemStack {
        let mut meta = ItemMetadata::new();
        meta.put_u64(STORED_ECHOES_KEY, self.account.balance);
        meta.put_u32_map(UPGRADE_PROGRESS_KEY, &self.account.upgrade_progress);
        ItemStack::new(TABLET_ITEM_ID, 1).with_metadata(meta)
    }

    /// Saves the account by replacing the tablet in `slot`.
    pub fn commit(&self, inventory: &mut dyn InventoryAccess, slot: SlotIndex) {
        inventory.replace_slot(slot, self.encode());
        tracing::debug!(
            "Committed carried account to slot {}: {} Echoes",
            slot,
            self.account.balance
        );
    }
}
