//! # Echo Exchange
//!
//! **Composition root.** Built once at server start and handed to the
//! host's UI, block and command handlers by reference.
//!
//! ```text
//!   ExchangeConfig ─┐
//!   ItemCatalog ────┼──> ValueResolver ──┐
//!                   │                    ├──> TransactionEngine
//!   data dir ───────┴──> LedgerStore ────┘
//!                              │
//!                              └──> LedgerFlusher (background thread)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! // On server startup
//! let exchange = EchoExchange::start(config, Arc::new(catalog), "data/echo_exchange");
//!
//! // Player burns from a machine
//! let location = exchange.location(&key);
//! if let Some(mut account) = location.lock() {
//!     let receipt = exchange
//!         .engine()
//!         .burn_from_slot(&mut account, player, &mut inv, slot, 64);
//!     if let Some(notice) = receipt.notice {
//!         player.send_message(notice.to_string());
//!     }
//! }
//!
//! // On server shutdown
//! exchange.shutdown();
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::catalog::{Catalog, ItemCatalog};
use crate::config::ExchangeConfig;
use crate::error::EchoResult;
use crate::ledger::{LedgerFlusher, LedgerStore};
use crate::location::{LocationAccount, LocationKey};
use crate::transaction::TransactionEngine;
use crate::value::ValueResolver;

/// The assembled exchange.
#[derive(Debug)]
pub struct EchoExchange {
    values: Arc<ValueResolver>,
    ledger: Arc<LedgerStore>,
    engine: TransactionEngine,
    flusher: Option<LedgerFlusher>,
}

impl EchoExchange {
    /// Builds the exchange over `data_dir`, loads persisted state, warms
    /// the value cache and starts background saving.
    #[must_use]
    pub fn start(
        config: ExchangeConfig,
        catalog: Arc<dyn ItemCatalog>,
        data_dir: impl AsRef<Path>,
    ) -> Self {
        let ledger = Arc::new(LedgerStore::open(data_dir));
        let interval = config.save_interval();
        let mut exchange = Self::assemble(config, catalog, ledger);
        exchange.flusher = Some(LedgerFlusher::start(
            Arc::clone(&exchange.ledger),
            interval,
        ));
        exchange
    }

    /// Builds an exchange that keeps everything in memory.
    #[must_use]
    pub fn in_memory(config: ExchangeConfig, catalog: Arc<dyn ItemCatalog>) -> Self {
        Self::assemble(config, catalog, Arc::new(LedgerStore::in_memory()))
    }

    /// Loads config and catalog files, then [`EchoExchange::start`]s.
    ///
    /// # Errors
    ///
    /// Returns error if either file cannot be read or parsed.
    pub fn from_files(
        config_path: impl AsRef<Path>,
        catalog_path: impl AsRef<Path>,
        data_dir: impl AsRef<Path>,
    ) -> EchoResult<Self> {
        let config = ExchangeConfig::load(config_path)?;
        let catalog = Catalog::load(catalog_path)?;
        Ok(Self::start(config, Arc::new(catalog), data_dir))
    }

    fn assemble(
        config: ExchangeConfig,
        catalog: Arc<dyn ItemCatalog>,
        ledger: Arc<LedgerStore>,
    ) -> Self {
        let values = Arc::new(ValueResolver::new(
            catalog,
            config.echo_value_overrides.clone(),
        ));
        values.precompute_all();

        let engine = TransactionEngine::new(
            Arc::new(config),
            Arc::clone(&values),
            Arc::clone(&ledger),
        );
        Self {
            values,
            ledger,
            engine,
            flusher: None,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        self.engine.config()
    }

    /// Value resolver.
    #[must_use]
    pub fn values(&self) -> &ValueResolver {
        &self.values
    }

    /// Ledger store.
    #[must_use]
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// Transaction engine.
    #[must_use]
    pub fn engine(&self) -> &TransactionEngine {
        &self.engine
    }

    /// Location account at `key`, created on first access.
    #[must_use]
    pub fn location(&self, key: &LocationKey) -> Arc<LocationAccount> {
        self.ledger.location(key)
    }

    /// Stops background saving and writes the ledger one final time.
    pub fn shutdown(mut self) {
        tracing::info!("Shutting down Echo Exchange");
        if let Some(flusher) = self.flusher.take() {
            flusher.shutdown();
        }
    }
}
