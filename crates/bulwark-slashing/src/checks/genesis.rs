//! Genesis validators root pinning
//!
//! The first successful operation records the root in the database; once
//! that transaction commits, the value is also pinned for the lifetime of the
//! process so later requests are compared without a query.

use rusqlite::Connection;
use std::sync::OnceLock;
use tracing::info;

use bulwark_core::GenesisValidatorsRoot;

use crate::dao::metadata;
use crate::error::{Result, SlashingError};

#[derive(Debug, Default)]
pub struct GenesisGuard {
    pinned: OnceLock<GenesisValidatorsRoot>,
}

impl GenesisGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root pinned by a committed operation, if any
    pub fn pinned(&self) -> Option<&GenesisValidatorsRoot> {
        self.pinned.get()
    }

    /// Compare `supplied` with the known root, storing it if none exists yet
    ///
    /// Must run inside the caller's transaction; call [`Self::pin`] only after
    /// that transaction committed.
    pub fn check_and_store(&self, conn: &Connection, supplied: &GenesisValidatorsRoot) -> Result<()> {
        if let Some(pinned) = self.pinned.get() {
            return compare(supplied, pinned);
        }

        match metadata::find_genesis_validators_root(conn)? {
            Some(stored) => compare(supplied, &stored),
            None => {
                metadata::insert_genesis_validators_root(conn, supplied)?;
                info!("Recorded genesis validators root {}", supplied);
                Ok(())
            }
        }
    }

    /// Compare `supplied` with the stored root without writing anything
    pub fn check(&self, conn: &Connection, supplied: &GenesisValidatorsRoot) -> Result<()> {
        if let Some(pinned) = self.pinned.get() {
            return compare(supplied, pinned);
        }
        match metadata::find_genesis_validators_root(conn)? {
            Some(stored) => compare(supplied, &stored),
            None => Ok(()),
        }
    }

    pub fn pin(&self, root: GenesisValidatorsRoot) {
        // A concurrent first writer may have pinned already; the database
        // row guarantees both saw the same value.
        let _ = self.pinned.set(root);
    }
}

fn compare(supplied: &GenesisValidatorsRoot, stored: &GenesisValidatorsRoot) -> Result<()> {
    if supplied == stored {
        Ok(())
    } else {
        Err(SlashingError::GenesisValidatorsRootMismatch {
            supplied: *supplied,
            stored: *stored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SlashingDatabase;

    #[test]
    fn test_first_root_is_stored_then_enforced() {
        let db = SlashingDatabase::open_in_memory().unwrap();
        let guard = GenesisGuard::new();
        let first = GenesisValidatorsRoot::new([1; 32]);
        let other = GenesisValidatorsRoot::new([2; 32]);

        db.with_transaction(|tx| guard.check_and_store(tx, &first)).unwrap();
        // not pinned yet: the mismatch is detected from the stored row
        let err = db
            .with_transaction(|tx| guard.check_and_store(tx, &other))
            .unwrap_err();
        assert!(matches!(err, SlashingError::GenesisValidatorsRootMismatch { .. }));

        guard.pin(first);
        assert_eq!(guard.pinned(), Some(&first));
        assert!(guard.check(&rusqlite::Connection::open_in_memory().unwrap(), &other).is_err());
    }

    #[test]
    fn test_read_only_check_writes_nothing() {
        let db = SlashingDatabase::open_in_memory().unwrap();
        let guard = GenesisGuard::new();
        let root = GenesisValidatorsRoot::new([3; 32]);

        db.with_transaction(|tx| guard.check(tx, &root)).unwrap();
        let stored = db
            .with_transaction(|tx| metadata::find_genesis_validators_root(tx))
            .unwrap();
        assert_eq!(stored, None);
    }
}
