//! Integration test for ledger persistence.

use echo_exchange::ledger::{DISCOVERIES_FILE, LOCATIONS_FILE};
use echo_exchange::{LedgerStore, LocationKey};
use uuid::Uuid;

fn temp_data_dir(name: &str) -> std::path::PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("test_echo_ledger_{name}_{id}"))
}

#[test]
fn test_round_trip_is_field_for_field() {
    let dir = temp_data_dir("round_trip");
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let forge = LocationKey::new("default", 12, 64, -40);
    let vault = LocationKey::new("instance:arena", 0, 0, 0);

    {
        let store = LedgerStore::open(&dir);
        {
            let location = store.location(&forge);
            let mut account = location.lock().unwrap();
            account.balance = 18_250;
            account.upgrade_progress.insert("Ingredient_Stick".to_string(), 100);
            account.upgrade_progress.insert("Rubble_Stone".to_string(), 37);
        }
        store.location(&vault).lock().unwrap().balance = 3;

        store.discover(alice, "Rubble_Stone");
        store.discover(alice, "Ingredient_Bar_Iron");
        store.set_search_query(alice, "bar");
        store.discover(bob, "Ingredient_Fibre");

        store.flush().unwrap();
    }

    let reloaded = LedgerStore::open(&dir);
    assert_eq!(reloaded.location_count(), 2);
    assert_eq!(reloaded.discovery_count(), 2);

    let forge_account = reloaded.get_location(&forge).unwrap().snapshot();
    assert_eq!(forge_account.balance, 18_250);
    assert_eq!(forge_account.progress("Ingredient_Stick"), 100);
    assert_eq!(forge_account.progress("Rubble_Stone"), 37);
    assert_eq!(reloaded.get_location(&vault).unwrap().snapshot().balance, 3);

    assert!(reloaded.has_discovered(alice, "Rubble_Stone"));
    assert!(reloaded.has_discovered(alice, "Ingredient_Bar_Iron"));
    assert!(!reloaded.has_discovered(alice, "Ingredient_Fibre"));
    assert_eq!(reloaded.search_query(alice), "bar");
    assert!(reloaded.has_discovered(bob, "Ingredient_Fibre"));
    assert!(!reloaded.is_dirty());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_documents_are_top_level_lists() {
    let dir = temp_data_dir("layout");
    let player = Uuid::new_v4();

    let store = LedgerStore::open(&dir);
    store.location(&LocationKey::new("default", 1, 2, 3)).lock().unwrap().balance = 42;
    store.discover(player, "Rubble_Stone");
    store.flush().unwrap();

    let locations: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.join(LOCATIONS_FILE)).unwrap()).unwrap();
    assert_eq!(locations[0]["Key"], "default:1,2,3");
    assert_eq!(locations[0]["Data"]["StoredEchoes"], 42);

    let players: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.join(DISCOVERIES_FILE)).unwrap()).unwrap();
    assert_eq!(players[0]["PlayerId"], player.to_string());
    assert_eq!(players[0]["Discoveries"]["DiscoveredItems"][0], "Rubble_Stone");

    // No temp files left behind
    assert!(!dir.join("machines.json.tmp").exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_removed_location_is_not_persisted() {
    let dir = temp_data_dir("removed");
    let key = LocationKey::new("default", 5, 5, 5);

    {
        let store = LedgerStore::open(&dir);
        store.location(&key).lock().unwrap().balance = 10;
        store.flush().unwrap();
        store.remove_location(&key);
        assert!(store.flush_if_dirty().unwrap());
    }

    assert!(LedgerStore::open(&dir).get_location(&key).is_none());
    std::fs::remove_dir_all(&dir).ok();
}
