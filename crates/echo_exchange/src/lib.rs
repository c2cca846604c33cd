//! # Echo Exchange
//!
//! Economic engine for an item-to-currency exchange. Items are burned
//! into a fungible stored credit (Echoes) and transmuted back, with every
//! item's price derived from the crafting-recipe graph instead of being
//! hand-authored.
//!
//! ## Components
//!
//! 1. **Value resolution** ([`value`]) - override, recipe cost or level
//!    fallback, memoized, safe on cyclic recipe graphs
//! 2. **Accounts** ([`account`], [`location`], [`carried`]) - balance and
//!    upgrade progress, bound to a world location or carried in an item
//! 3. **Ledger** ([`ledger`]) - concurrent location accounts and player
//!    discoveries, persisted by a background thread
//! 4. **Transactions** ([`transaction`]) - burn, transmute and upgrade
//!    deposits with capacity and discovery rules
//!
//! ## Thread Safety
//!
//! Everything here may be called from any number of request threads at
//! once. Request threads never do I/O; only the flusher thread and the
//! final shutdown flush touch disk.
//!
//! ## Example
//!
//! ```rust,ignore
//! use echo_exchange::{Catalog, EchoExchange, ExchangeConfig, LocationKey};
//!
//! let config = ExchangeConfig::load("config/echo_exchange.toml")?;
//! let catalog = Catalog::load("data/catalog.toml")?;
//! let exchange = EchoExchange::start(config, Arc::new(catalog), "data/echo_exchange");
//!
//! let location = exchange.location(&LocationKey::new("default", 10, 64, -3));
//! if let Some(mut account) = location.lock() {
//!     let receipt = exchange
//!         .engine()
//!         .burn_from_slot(&mut account, player, &mut inventory, slot, 16);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod account;
pub mod carried;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod exchange;
pub mod inventory;
pub mod item;
pub mod ledger;
pub mod location;
pub mod scroll;
pub mod transaction;
pub mod value;

pub use account::Account;
pub use carried::CarriedAccount;
pub use catalog::{
    Catalog, CatalogEntry, ItemCatalog, ItemId, MaterialQuantity, Recipe, RecipeItem,
};
pub use config::{DiscoveryMode, ExchangeConfig, UpgradeSlotConfig};
pub use discovery::{DiscoveryRecord, PlayerId};
pub use error::{EchoError, EchoResult};
pub use exchange::EchoExchange;
pub use inventory::{Inventory, InventoryAccess, SlotIndex};
pub use item::{ItemMetadata, ItemStack};
pub use ledger::{LedgerFlusher, LedgerStore};
pub use location::{LocationAccount, LocationKey};
pub use transaction::{
    BurnReceipt, DepositReceipt, Notice, TransactionEngine, TransmuteReceipt, UpgradeStatus,
};
pub use value::ValueResolver;
