//! Global metadata: the pinned genesis validators root

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use bulwark_core::GenesisValidatorsRoot;

use crate::error::Result;

pub fn find_genesis_validators_root(conn: &Connection) -> Result<Option<GenesisValidatorsRoot>> {
    let root = conn
        .query_row(
            "SELECT genesis_validators_root FROM metadata WHERE id = 1",
            [],
            |row| {
                let bytes: Vec<u8> = row.get(0)?;
                GenesisValidatorsRoot::from_slice(&bytes).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(0, Type::Blob, Box::new(e))
                })
            },
        )
        .optional()?;
    Ok(root)
}

/// Store the root unless one is already present. Returns whether a row was written.
pub fn insert_genesis_validators_root(
    conn: &Connection,
    root: &GenesisValidatorsRoot,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO metadata (id, genesis_validators_root) VALUES (1, ?1)",
        params![&root.as_bytes()[..]],
    )?;
    Ok(inserted > 0)
}
