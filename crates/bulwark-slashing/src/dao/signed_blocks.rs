//! Signed block history

use rusqlite::{params, Connection, OptionalExtension};

use bulwark_core::{SigningRoot, Slot, ValidatorId};

use super::{read_root, read_u64, to_sql_int};
use crate::error::Result;

/// A block the validator has signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBlock {
    pub validator_id: ValidatorId,
    pub slot: Slot,
    pub signing_root: SigningRoot,
}

fn map_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<SignedBlock> {
    Ok(SignedBlock {
        validator_id: ValidatorId::new(row.get(0)?),
        slot: Slot::new(read_u64(row, 1)?),
        signing_root: read_root(row, 2)?,
    })
}

/// A block at `slot` with a different signing root, if any
pub fn find_conflicting(
    conn: &Connection,
    validator_id: ValidatorId,
    slot: Slot,
    signing_root: &SigningRoot,
) -> Result<Option<SignedBlock>> {
    let block = conn
        .query_row(
            "SELECT validator_id, slot, signing_root FROM signed_blocks
             WHERE validator_id = ?1 AND slot = ?2 AND signing_root != ?3
             LIMIT 1",
            params![
                validator_id.as_i64(),
                to_sql_int("slot", slot.as_u64())?,
                &signing_root.as_bytes()[..]
            ],
            map_block,
        )
        .optional()?;
    Ok(block)
}

pub fn exists(
    conn: &Connection,
    validator_id: ValidatorId,
    slot: Slot,
    signing_root: &SigningRoot,
) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM signed_blocks
             WHERE validator_id = ?1 AND slot = ?2 AND signing_root = ?3",
            params![
                validator_id.as_i64(),
                to_sql_int("slot", slot.as_u64())?,
                &signing_root.as_bytes()[..]
            ],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Record a signed block. Returns `false` if the identical row already existed.
pub fn insert(
    conn: &Connection,
    validator_id: ValidatorId,
    slot: Slot,
    signing_root: &SigningRoot,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO signed_blocks (validator_id, slot, signing_root)
         VALUES (?1, ?2, ?3)",
        params![
            validator_id.as_i64(),
            to_sql_int("slot", slot.as_u64())?,
            &signing_root.as_bytes()[..]
        ],
    )?;
    Ok(inserted > 0)
}

pub fn count(conn: &Connection, validator_id: ValidatorId) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM signed_blocks WHERE validator_id = ?1",
        params![validator_id.as_i64()],
        |row| row.get(0),
    )?;
    Ok(count.unsigned_abs())
}

/// Slot of the row at `offset` in ascending slot order
pub fn slot_at_offset(
    conn: &Connection,
    validator_id: ValidatorId,
    offset: u64,
) -> Result<Option<Slot>> {
    let slot = conn
        .query_row(
            "SELECT slot FROM signed_blocks WHERE validator_id = ?1
             ORDER BY slot ASC LIMIT 1 OFFSET ?2",
            params![validator_id.as_i64(), to_sql_int("offset", offset)?],
            |row| read_u64(row, 0),
        )
        .optional()?;
    Ok(slot.map(Slot::new))
}

pub fn max_slot(conn: &Connection, validator_id: ValidatorId) -> Result<Option<Slot>> {
    let slot: Option<i64> = conn.query_row(
        "SELECT MAX(slot) FROM signed_blocks WHERE validator_id = ?1",
        params![validator_id.as_i64()],
        |row| row.get(0),
    )?;
    Ok(slot.map(|s| Slot::new(s.unsigned_abs())))
}

/// Delete every block strictly below `slot`
pub fn delete_below(conn: &Connection, validator_id: ValidatorId, slot: Slot) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM signed_blocks WHERE validator_id = ?1 AND slot < ?2",
        params![validator_id.as_i64(), to_sql_int("slot", slot.as_u64())?],
    )?;
    Ok(deleted)
}

/// Every block of a validator, ordered by slot
pub fn for_validator(conn: &Connection, validator_id: ValidatorId) -> Result<Vec<SignedBlock>> {
    let mut stmt = conn.prepare(
        "SELECT validator_id, slot, signing_root FROM signed_blocks
         WHERE validator_id = ?1 ORDER BY slot ASC, signing_root ASC",
    )?;
    let blocks = stmt
        .query_map(params![validator_id.as_i64()], map_block)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(blocks)
}
