//! # Ledger Store
//!
//! **Durable keyed state: location accounts and player discoveries.**
//!
//! ## Architecture
//!
//! ```text
//!   request threads ──> DashMap<LocationKey, Arc<LocationAccount>> ─┐
//!                  └──> DashMap<PlayerId, Arc<Mutex<Discovery>>> ───┤
//!                                   │ mark_dirty()                 │ snapshot
//!                                   ▼                              ▼
//!                              [AtomicBool] ──> LedgerFlusher ──> machines.json
//!                                                                  player_discoveries.json
//! ```
//!
//! Request threads only touch memory. The flusher thread swaps the dirty
//! flag and, if it was set, rewrites both documents. A failed write puts
//! the flag back so the next tick retries. Writes are serialized by a
//! store-wide write lock, so an explicit [`LedgerStore::flush`] racing the
//! flusher thread never interleaves on the shared `.tmp` files.
//!
//! Loading is forgiving: a missing document is a fresh start, a corrupt
//! one is logged and skipped.

mod document;
mod flusher;

pub use flusher::LedgerFlusher;

use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::discovery::{DiscoveryRecord, PlayerId};
use crate::error::EchoResult;
use crate::location::{LocationAccount, LocationKey};
use document::{LocationEntry, PlayerEntry};

/// File name of the locations document.
pub const LOCATIONS_FILE: &str = "machines.json";

/// File name of the discovery document.
pub const DISCOVERIES_FILE: &str = "player_discoveries.json";

/// Shared handle to one player's discovery record.
pub type DiscoveryHandle = Arc<Mutex<DiscoveryRecord>>;

#[derive(Debug, Clone)]
struct LedgerPaths {
    locations: PathBuf,
    discoveries: PathBuf,
}

/// Concurrent store of location accounts and discovery records.
#[derive(Debug, Default)]
pub struct LedgerStore {
    locations: DashMap<LocationKey, Arc<LocationAccount>>,
    discoveries: DashMap<PlayerId, DiscoveryHandle>,
    dirty: AtomicBool,
    /// Held for the whole of a flush; both writers share the `.tmp` paths.
    write_lock: Mutex<()>,
    /// Backing files; `None` keeps everything in memory.
    paths: Option<LedgerPaths>,
}

impl LedgerStore {
    /// Creates a store that never touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a store backed by documents in `dir`, loading whatever is
    /// there. Load failures are logged and the affected collection starts
    /// empty.
    #[must_use]
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let store = Self {
            paths: Some(LedgerPaths {
                locations: dir.join(LOCATIONS_FILE),
                discoveries: dir.join(DISCOVERIES_FILE),
            }),
            ..Self::default()
        };
        store.load();
        store
    }

    fn load(&self) {
        let Some(paths) = &self.paths else {
            return;
        };

        match document::read_locations(&paths.locations) {
            Ok(Some(entries)) => {
                for entry in entries {
                    match entry.restore() {
                        Ok((key, location)) => {
                            self.locations.insert(key, Arc::new(location));
                        }
                        Err(e) => tracing::warn!("Skipping stored location: {}", e),
                    }
                }
                tracing::info!("Loaded {} exchange locations from disk", self.locations.len());
            }
            Ok(None) => tracing::info!("No existing location data found, starting fresh"),
            Err(e) => tracing::error!("Failed to load location data: {}", e),
        }

        match document::read_discoveries(&paths.discoveries) {
            Ok(Some(entries)) => {
                for entry in entries {
                    let (player, record) = entry.restore();
                    self.discoveries.insert(player, Arc::new(Mutex::new(record)));
                }
                tracing::info!(
                    "Loaded discoveries for {} players from disk",
                    self.discoveries.len()
                );
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Failed to load player discoveries: {}", e),
        }
    }

    // =========================================================================
    // Locations
    // =========================================================================

    /// Returns the account at `key`, creating an empty one on first access.
    /// Creation marks the store dirty.
    pub fn location(&self, key: &LocationKey) -> Arc<LocationAccount> {
        if let Some(existing) = self.locations.get(key) {
            return Arc::clone(existing.value());
        }
        let mut created = false;
        let location = Arc::clone(
            self.locations
                .entry(key.clone())
                .or_insert_with(|| {
                    created = true;
                    Arc::new(LocationAccount::new())
                })
                .value(),
        );
        if created {
            self.mark_dirty();
        }
        location
    }

    /// Returns the account at `key` without creating it.
    #[must_use]
    pub fn get_location(&self, key: &LocationKey) -> Option<Arc<LocationAccount>> {
        self.locations.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes the account at `key` and marks the store dirty.
    pub fn remove_location(&self, key: &LocationKey) -> Option<Arc<LocationAccount>> {
        let removed = self.locations.remove(key).map(|(_, location)| location);
        if removed.is_some() {
            self.mark_dirty();
        }
        removed
    }

    /// Number of location accounts.
    #[must_use]
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    // =========================================================================
    // Discoveries
    // =========================================================================

    /// Returns the record for `player`, creating an empty one on first access.
    /// Creation marks the store dirty.
    pub fn discovery(&self, player: PlayerId) -> DiscoveryHandle {
        if let Some(existing) = self.discoveries.get(&player) {
            return Arc::clone(existing.value());
        }
        let mut created = false;
        let record = Arc::clone(
            self.discoveries
                .entry(player)
                .or_insert_with(|| {
                    created = true;
                    Arc::new(Mutex::new(DiscoveryRecord::new()))
                })
                .value(),
        );
        if created {
            self.mark_dirty();
        }
        record
    }

    /// Records that `player` discovered `item_id`. Returns true if new.
    pub fn discover(&self, player: PlayerId, item_id: &str) -> bool {
        let added = self.discovery(player).lock().discover(item_id);
        if added {
            self.mark_dirty();
        }
        added
    }

    /// Returns true if `player` has discovered `item_id`.
    #[must_use]
    pub fn has_discovered(&self, player: PlayerId, item_id: &str) -> bool {
        self.discoveries.get(&player).is_some_and(|record| {
            let record = record.lock();
            record.contains(item_id)
        })
    }

    /// The player's last search string.
    #[must_use]
    pub fn search_query(&self, player: PlayerId) -> String {
        self.discoveries
            .get(&player)
            .map(|record| {
                let record = record.lock();
                record.search_query().to_string()
            })
            .unwrap_or_default()
    }

    /// Stores the player's search string.
    pub fn set_search_query(&self, player: PlayerId, query: impl Into<String>) {
        self.discovery(player).lock().set_search_query(query);
        self.mark_dirty();
    }

    /// Number of players with a record.
    #[must_use]
    pub fn discovery_count(&self) -> usize {
        self.discoveries.len()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Flags in-memory state as not yet persisted.
    #[inline]
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Returns true if there are unsaved changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Writes both documents if the store is dirty.
    ///
    /// The flag is cleared before writing; on failure it is set again so
    /// the change is not forgotten.
    ///
    /// # Errors
    ///
    /// Returns error if a document cannot be written.
    pub fn flush_if_dirty(&self) -> EchoResult<bool> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        if let Err(e) = self.flush() {
            self.mark_dirty();
            return Err(e);
        }
        Ok(true)
    }

    /// Writes both documents unconditionally. A no-op for in-memory stores.
    ///
    /// Concurrent callers take turns; each writes a complete snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if a document cannot be serialized or written.
    pub fn flush(&self) -> EchoResult<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };
        let _write = self.write_lock.lock();

        let mut locations: Vec<LocationEntry> = self
            .locations
            .iter()
            .map(|entry| LocationEntry::capture(entry.key(), entry.value()))
            .collect();
        locations.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
        document::write_json(&paths.locations, &locations)?;
        tracing::debug!("Saved {} exchange locations to disk", locations.len());

        let mut players: Vec<PlayerEntry> = self
            .discoveries
            .iter()
            .map(|entry| {
                let record = entry.value().lock();
                PlayerEntry::capture(*entry.key(), &record)
            })
            .collect();
        players.sort_by_key(PlayerEntry::player_id);
        document::write_json(&paths.discoveries, &players)?;
        tracing::debug!("Saved discoveries for {} players to disk", players.len());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_dir(name: &str) -> PathBuf {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("echo_ledger_{name}_{id}"))
    }

    #[test]
    fn test_get_or_create_returns_same_account() {
        let store = LedgerStore::in_memory();
        let key = LocationKey::new("default", 1, 2, 3);

        assert!(!store.is_dirty());
        store.location(&key).lock().unwrap().balance = 40;
        assert!(store.is_dirty());

        assert_eq!(store.location(&key).snapshot().balance, 40);
        assert_eq!(store.location_count(), 1);
    }

    #[test]
    fn test_new_discovery_record_marks_dirty() {
        let store = LedgerStore::in_memory();
        let player = Uuid::new_v4();

        assert!(!store.has_discovered(player, "Rubble_Stone"));
        assert!(!store.is_dirty());
        let _ = store.discovery(player);
        assert!(store.is_dirty());
        assert_eq!(store.discovery_count(), 1);
    }

    #[test]
    fn test_remove_marks_dirty() {
        let store = LedgerStore::in_memory();
        let key = LocationKey::new("default", 0, 0, 0);
        let _ = store.location(&key);

        assert!(store.remove_location(&key).is_some());
        assert!(store.is_dirty());
        assert!(store.get_location(&key).is_none());
        assert!(store.remove_location(&key).is_none());
    }

    #[test]
    fn test_discovery_and_search() {
        let store = LedgerStore::in_memory();
        let player = Uuid::new_v4();

        assert!(!store.has_discovered(player, "Rubble_Stone"));
        assert!(store.discover(player, "Rubble_Stone"));
        assert!(!store.discover(player, "Rubble_Stone"));
        assert!(store.has_discovered(player, "Rubble_Stone"));

        store.set_search_query(player, "bar");
        assert_eq!(store.search_query(player), "bar");
        assert_eq!(store.search_query(Uuid::new_v4()), "");
    }

    #[test]
    fn test_flush_if_dirty_clears_flag() {
        let dir = temp_dir("flag");
        let store = LedgerStore::open(&dir);

        assert!(!store.flush_if_dirty().unwrap());
        store.mark_dirty();
        assert!(store.flush_if_dirty().unwrap());
        assert!(!store.is_dirty());
        assert!(dir.join(LOCATIONS_FILE).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failed_flush_restores_flag() {
        // A regular file where the directory should be makes every write fail
        let blocker = temp_dir("blocker");
        std::fs::write(&blocker, b"occupied").unwrap();
        let store = LedgerStore::open(&blocker);

        store.mark_dirty();
        assert!(store.flush_if_dirty().is_err());
        assert!(store.is_dirty());

        let _ = std::fs::remove_file(&blocker);
    }

    #[test]
    fn test_parallel_flushes_never_interleave() {
        let dir = temp_dir("parallel");
        let store = Arc::new(LedgerStore::open(&dir));
        for i in 0..2_000 {
            let key = LocationKey::new("default", i, 0, 0);
            store.location(&key).lock().unwrap().balance = u64::from(i.unsigned_abs());
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..20).filter(|_| store.flush().is_err()).count()
                })
            })
            .collect();
        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let reloaded = LedgerStore::open(&dir);
        assert_eq!(reloaded.location_count(), 2_000);
        let last = reloaded.get_location(&LocationKey::new("default", 1_999, 0, 0));
        assert_eq!(last.unwrap().snapshot().balance, 1_999);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_documents_start_empty() {
        let dir = temp_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(LOCATIONS_FILE), "garbage").unwrap();
        std::fs::write(dir.join(DISCOVERIES_FILE), "[{").unwrap();

        let store = LedgerStore::open(&dir);
        assert_eq!(store.location_count(), 0);
        assert_eq!(store.discovery_count(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
