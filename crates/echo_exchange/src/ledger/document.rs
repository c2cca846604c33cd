//! On-disk forms of the two ledger documents.
//!
//! Both are JSON. The writer emits a top-level list; the reader also
//! accepts the older wrapped layout (`{"Machines": [...]}` and
//! `{"Players": [{"PlayerUuid": ..}]}`) so existing save folders load.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::account::Account;
use crate::discovery::{DiscoveryRecord, PlayerId};
use crate::error::{EchoError, EchoResult};
use crate::location::{LocationAccount, LocationKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UpgradeSlotEntry {
    item_id: String,
    progress: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct LocationData {
    stored_echoes: u64,
    discovered_items: Vec<String>,
    upgrade_slots: Vec<UpgradeSlotEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LocationEntry {
    key: String,
    #[serde(default)]
    data: LocationData,
}

impl LocationEntry {
    pub(crate) fn capture(key: &LocationKey, location: &LocationAccount) -> Self {
        let account = location.snapshot();
        Self {
            key: key.to_string(),
            data: LocationData {
                stored_echoes: account.balance,
                discovered_items: location.legacy_discoveries(),
                upgrade_slots: account
                    .upgrade_progress
                    .into_iter()
                    .map(|(item_id, progress)| UpgradeSlotEntry { item_id, progress })
                    .collect(),
            },
        }
    }

    pub(crate) fn sort_key(&self) -> &str {
        &self.key
    }

    /// Splits into a parsed key and account. Unparseable keys are an error.
    pub(crate) fn restore(self) -> EchoResult<(LocationKey, LocationAccount)> {
        let key = self.key.parse::<LocationKey>()?;
        let account = Account {
            balance: self.data.stored_echoes,
            upgrade_progress: self
                .data
                .upgrade_slots
                .into_iter()
                .map(|slot| (slot.item_id, slot.progress))
                .collect(),
        };
        Ok((
            key,
            LocationAccount::from_parts(account, self.data.discovered_items),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LocationsDocument {
    List(Vec<LocationEntry>),
    Wrapped {
        #[serde(rename = "Machines", default)]
        machines: Vec<LocationEntry>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct DiscoveriesData {
    discovered_items: Vec<String>,
    search_query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PlayerEntry {
    #[serde(alias = "PlayerUuid")]
    player_id: PlayerId,
    #[serde(default)]
    discoveries: DiscoveriesData,
}

impl PlayerEntry {
    pub(crate) fn capture(player: PlayerId, record: &DiscoveryRecord) -> Self {
        Self {
            player_id: player,
            discoveries: DiscoveriesData {
                discovered_items: record.discovered().cloned().collect(),
                search_query: record.search_query().to_string(),
            },
        }
    }

    pub(crate) fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub(crate) fn restore(self) -> (PlayerId, DiscoveryRecord) {
        let record = DiscoveryRecord::from_parts(
            self.discoveries.discovered_items,
            self.discoveries.search_query,
        );
        (self.player_id, record)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DiscoveryDocument {
    List(Vec<PlayerEntry>),
    Wrapped {
        #[serde(rename = "Players", default)]
        players: Vec<PlayerEntry>,
    },
}

/// Reads the locations document. `Ok(None)` if the file does not exist.
pub(crate) fn read_locations(path: &Path) -> EchoResult<Option<Vec<LocationEntry>>> {
    Ok(read_json::<LocationsDocument>(path)?.map(|doc| match doc {
        LocationsDocument::List(entries) => entries,
        LocationsDocument::Wrapped { machines } => machines,
    }))
}

/// Reads the discovery document. `Ok(None)` if the file does not exist.
pub(crate) fn read_discoveries(path: &Path) -> EchoResult<Option<Vec<PlayerEntry>>> {
    Ok(read_json::<DiscoveryDocument>(path)?.map(|doc| match doc {
        DiscoveryDocument::List(entries) => entries,
        DiscoveryDocument::Wrapped { players } => players,
    }))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> EchoResult<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(EchoError::storage(path, err)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| EchoError::Serialization(format!("parse {} failed: {err}", path.display())))
}

/// Writes `value` as pretty JSON through a temp sibling and a rename.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> EchoResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| EchoError::storage(parent, err))?;
    }
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| EchoError::Serialization(err.to_string()))?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, bytes).map_err(|err| EchoError::storage(&temp_path, err))?;
    fs::rename(&temp_path, path).map_err(|err| EchoError::storage(path, err))?;
    Ok(())
}
