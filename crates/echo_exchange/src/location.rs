//! Location-bound accounts and their keys.
//!
//! Keys render as `"<world>:<x>,<y>,<z>"`. World names may themselves
//! contain colons, so parsing splits on the last one.

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::fmt;
use std::str::FromStr;

use crate::account::Account;
use crate::catalog::ItemId;
use crate::error::EchoError;

/// Identity of a location account: world plus block coordinate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    /// World name.
    pub world: String,
    /// Block X.
    pub x: i32,
    /// Block Y.
    pub y: i32,
    /// Block Z.
    pub z: i32,
}

impl LocationKey {
    /// Creates a key.
    #[must_use]
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}

impl FromStr for LocationKey {
    type Err = EchoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EchoError::InvalidLocationKey(s.to_string());

        let (world, coords) = s.rsplit_once(':').ok_or_else(invalid)?;
        let mut parts = coords.split(',').map(|part| part.trim().parse::<i32>());
        let (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if world.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(world, x, y, z))
    }
}

/// Account state plus the retirement mark set when the location is
/// salvaged.
#[derive(Debug, Default)]
struct LocationState {
    account: Account,
    retired: bool,
}

/// An account bound to a world location.
///
/// The balance and progress sit behind their own lock so two players
/// burning into the same machine serialize instead of losing updates.
/// Once the location is salvaged the account is retired and can no
/// longer be locked for writing, even through a handle taken earlier.
#[derive(Debug, Default)]
pub struct LocationAccount {
    state: Mutex<LocationState>,
    /// Discovery list carried by old save files. Kept for round-tripping,
    /// never consulted: discovery is per player.
    legacy_discoveries: Mutex<Vec<ItemId>>,
}

impl LocationAccount {
    /// Creates an empty account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores an account from persisted state.
    #[must_use]
    pub fn from_parts(account: Account, legacy_discoveries: Vec<ItemId>) -> Self {
        Self {
            state: Mutex::new(LocationState {
                account,
                retired: false,
            }),
            legacy_discoveries: Mutex::new(legacy_discoveries),
        }
    }

    /// Locks the account for a read-modify-write.
    ///
    /// Returns `None` once the location has been retired.
    #[must_use]
    pub fn lock(&self) -> Option<MappedMutexGuard<'_, Account>> {
        let state = self.state.lock();
        if state.retired {
            return None;
        }
        Some(MutexGuard::map(state, |state| &mut state.account))
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Account {
        self.state.lock().account.clone()
    }

    /// Returns true after [`LocationAccount::retire`].
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.state.lock().retired
    }

    /// Closes the account and returns its final state. Writers already
    /// holding the lock finish first; later ones get nothing.
    ///
    /// Returns `None` if it was already retired.
    pub(crate) fn retire(&self) -> Option<Account> {
        let mut state = self.state.lock();
        if state.retired {
            return None;
        }
        state.retired = true;
        Some(state.account.clone())
    }

    /// Legacy discovery list as loaded.
    #[must_use]
    pub fn legacy_discoveries(&self) -> Vec<ItemId> {
        self.legacy_discoveries.lock().clone()
    }
}
