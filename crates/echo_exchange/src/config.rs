//! # Exchange Configuration
//!
//! Loaded once at startup from TOML. Keys use the PascalCase names of the
//! plugin config so existing files keep working:
//!
//! ```toml
//! BaseEchoStorage = 10000
//! CapacityMultiplier = 2.0
//! DiscoveryMode = "PerPlayer"
//! SaveIntervalSecs = 5
//!
//! [EchoValueOverrides]
//! Ingredient_Life_Essence = 500
//!
//! [[UpgradeSlots]]
//! ItemId = "Ingredient_Stick"
//! RequiredAmount = 100
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::catalog::ItemId;
use crate::error::{EchoError, EchoResult};

/// How discoveries are scoped.
///
/// Only [`DiscoveryMode::PerPlayer`] is implemented. The other variants are
/// accepted in config files and reserved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DiscoveryMode {
    /// Each player has their own discovery record.
    #[default]
    PerPlayer,
    /// Reserved: one record shared by every player.
    Global,
    /// Reserved: discoveries owned by each machine.
    PerMachine,
}

impl DiscoveryMode {
    /// Parses a mode name; unknown names fall back to `PerPlayer`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "Global" => Self::Global,
            "PerMachine" => Self::PerMachine,
            _ => Self::PerPlayer,
        }
    }

    /// Config-file name of the mode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PerPlayer => "PerPlayer",
            Self::Global => "Global",
            Self::PerMachine => "PerMachine",
        }
    }
}

impl From<String> for DiscoveryMode {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<DiscoveryMode> for String {
    fn from(mode: DiscoveryMode) -> Self {
        mode.name().to_string()
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One capacity upgrade: deposit `required_amount` of `item_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpgradeSlotConfig {
    /// Item that must be deposited.
    pub item_id: ItemId,
    /// Units needed to complete the slot.
    pub required_amount: u32,
}

impl UpgradeSlotConfig {
    /// Creates a slot definition.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, required_amount: u32) -> Self {
        Self {
            item_id: item_id.into(),
            required_amount,
        }
    }
}

/// Exchange configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExchangeConfig {
    /// Capacity of an account with no completed upgrades.
    pub base_echo_storage: u32,
    /// Capacity factor applied per completed upgrade.
    pub capacity_multiplier: f64,
    /// Manual prices that bypass recipe resolution.
    pub echo_value_overrides: HashMap<ItemId, u32>,
    /// Discovery scoping.
    pub discovery_mode: DiscoveryMode,
    /// Ordered upgrade slots.
    pub upgrade_slots: Vec<UpgradeSlotConfig>,
    /// Seconds between background flush checks.
    pub save_interval_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_echo_storage: 10_000,
            capacity_multiplier: 2.0,
            echo_value_overrides: HashMap::new(),
            discovery_mode: DiscoveryMode::PerPlayer,
            upgrade_slots: default_upgrade_slots(),
            save_interval_secs: 5,
        }
    }
}

/// The stock progression: basic materials first, then metal bars.
fn default_upgrade_slots() -> Vec<UpgradeSlotConfig> {
    vec![
        UpgradeSlotConfig::new("Ingredient_Stick", 100),
        UpgradeSlotConfig::new("Ingredient_Fibre", 100),
        UpgradeSlotConfig::new("Rubble_Stone", 100),
        UpgradeSlotConfig::new("Ingredient_Bar_Copper", 25),
        UpgradeSlotConfig::new("Ingredient_Bar_Iron", 25),
        UpgradeSlotConfig::new("Ingredient_Bar_Gold", 25),
        UpgradeSlotConfig::new("Ingredient_Bar_Thorium", 15),
        UpgradeSlotConfig::new("Ingredient_Bar_Cobalt", 15),
        UpgradeSlotConfig::new("Ingredient_Bar_Adamantite", 15),
    ]
}

impl ExchangeConfig {
    /// Parses configuration from TOML text. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid TOML or a value is out of range.
    pub fn from_toml_str(text: &str) -> EchoResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EchoError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EchoResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EchoError::storage(path, e))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> EchoResult<()> {
        if !self.capacity_multiplier.is_finite() || self.capacity_multiplier < 0.0 {
            return Err(EchoError::InvalidConfig(format!(
                "CapacityMultiplier must be a non-negative number, got {}",
                self.capacity_multiplier
            )));
        }
        if self.save_interval_secs == 0 {
            return Err(EchoError::InvalidConfig(
                "SaveIntervalSecs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval of the background flush task.
    #[must_use]
    pub const fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    /// Capacity after `completed_upgrades` upgrades:
    /// `base × multiplier^completed`, saturating at `u64::MAX`.
    #[must_use]
    pub fn capacity_for(&self, completed_upgrades: u32) -> u64 {
        let exponent = completed_upgrades.min(i32::MAX as u32) as i32;
        let capacity =
            f64::from(self.base_echo_storage) * self.capacity_multiplier.powi(exponent);
        // Float-to-int casts saturate
        capacity as u64
    }

    /// Slot definition by index.
    #[must_use]
    pub fn upgrade_slot(&self, index: usize) -> Option<&UpgradeSlotConfig> {
        self.upgrade_slots.get(index)
    }
}
