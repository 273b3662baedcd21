//! Signed attestation history and the slashing-condition queries over it

use rusqlite::{params, Connection, OptionalExtension};

use bulwark_core::{Epoch, SigningRoot, ValidatorId};

use super::{read_root, read_u64, to_sql_int};
use crate::error::Result;

/// An attestation the validator has signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAttestation {
    pub validator_id: ValidatorId,
    pub source_epoch: Epoch,
    pub target_epoch: Epoch,
    pub signing_root: SigningRoot,
}

const COLUMNS: &str = "validator_id, source_epoch, target_epoch, signing_root";

fn map_attestation(row: &rusqlite::Row<'_>) -> rusqlite::Result<SignedAttestation> {
    Ok(SignedAttestation {
        validator_id: ValidatorId::new(row.get(0)?),
        source_epoch: Epoch::new(read_u64(row, 1)?),
        target_epoch: Epoch::new(read_u64(row, 2)?),
        signing_root: read_root(row, 3)?,
    })
}

fn source(epoch: Epoch) -> Result<i64> {
    to_sql_int("source_epoch", epoch.as_u64())
}

fn target(epoch: Epoch) -> Result<i64> {
    to_sql_int("target_epoch", epoch.as_u64())
}

/// An attestation for the same target epoch with a different signing root
pub fn find_double_vote(
    conn: &Connection,
    validator_id: ValidatorId,
    target_epoch: Epoch,
    signing_root: &SigningRoot,
) -> Result<Option<SignedAttestation>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM signed_attestations
         WHERE validator_id = ?1 AND target_epoch = ?2 AND signing_root != ?3
         LIMIT 1"
    );
    let found = conn
        .query_row(
            &sql,
            params![validator_id.as_i64(), target(target_epoch)?, &signing_root.as_bytes()[..]],
            map_attestation,
        )
        .optional()?;
    Ok(found)
}

/// A prior attestation `(s, t)` with `s < source` and `t > target`
pub fn find_surrounding(
    conn: &Connection,
    validator_id: ValidatorId,
    source_epoch: Epoch,
    target_epoch: Epoch,
) -> Result<Option<SignedAttestation>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM signed_attestations
         WHERE validator_id = ?1 AND source_epoch < ?2 AND target_epoch > ?3
         LIMIT 1"
    );
    let found = conn
        .query_row(
            &sql,
            params![validator_id.as_i64(), source(source_epoch)?, target(target_epoch)?],
            map_attestation,
        )
        .optional()?;
    Ok(found)
}

/// A prior attestation `(s, t)` with `s > source` and `t < target`
pub fn find_surrounded(
    conn: &Connection,
    validator_id: ValidatorId,
    source_epoch: Epoch,
    target_epoch: Epoch,
) -> Result<Option<SignedAttestation>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM signed_attestations
         WHERE validator_id = ?1 AND source_epoch > ?2 AND target_epoch < ?3
         LIMIT 1"
    );
    let found = conn
        .query_row(
            &sql,
            params![validator_id.as_i64(), source(source_epoch)?, target(target_epoch)?],
            map_attestation,
        )
        .optional()?;
    Ok(found)
}

pub fn exists(
    conn: &Connection,
    validator_id: ValidatorId,
    source_epoch: Epoch,
    target_epoch: Epoch,
    signing_root: &SigningRoot,
) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM signed_attestations
             WHERE validator_id = ?1 AND source_epoch = ?2 AND target_epoch = ?3
               AND signing_root = ?4",
            params![
                validator_id.as_i64(),
                source(source_epoch)?,
                target(target_epoch)?,
                &signing_root.as_bytes()[..]
            ],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Record a signed attestation. Returns `false` if the identical row already existed.
pub fn insert(
    conn: &Connection,
    validator_id: ValidatorId,
    source_epoch: Epoch,
    target_epoch: Epoch,
    signing_root: &SigningRoot,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO signed_attestations
             (validator_id, source_epoch, target_epoch, signing_root)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            validator_id.as_i64(),
            source(source_epoch)?,
            target(target_epoch)?,
            &signing_root.as_bytes()[..]
        ],
    )?;
    Ok(inserted > 0)
}

pub fn count(conn: &Connection, validator_id: ValidatorId) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM signed_attestations WHERE validator_id = ?1",
        params![validator_id.as_i64()],
        |row| row.get(0),
    )?;
    Ok(count.unsigned_abs())
}

/// `(source, target)` of the row at `offset`, ordered by target then source
pub fn epochs_at_offset(
    conn: &Connection,
    validator_id: ValidatorId,
    offset: u64,
) -> Result<Option<(Epoch, Epoch)>> {
    let epochs = conn
        .query_row(
            "SELECT source_epoch, target_epoch FROM signed_attestations
             WHERE validator_id = ?1
             ORDER BY target_epoch ASC, source_epoch ASC LIMIT 1 OFFSET ?2",
            params![validator_id.as_i64(), to_sql_int("offset", offset)?],
            |row| Ok((Epoch::new(read_u64(row, 0)?), Epoch::new(read_u64(row, 1)?))),
        )
        .optional()?;
    Ok(epochs)
}

/// Highest `(source, target)` epochs recorded for a validator
pub fn max_epochs(
    conn: &Connection,
    validator_id: ValidatorId,
) -> Result<(Option<Epoch>, Option<Epoch>)> {
    let (source, target): (Option<i64>, Option<i64>) = conn.query_row(
        "SELECT MAX(source_epoch), MAX(target_epoch) FROM signed_attestations
         WHERE validator_id = ?1",
        params![validator_id.as_i64()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((
        source.map(|e| Epoch::new(e.unsigned_abs())),
        target.map(|e| Epoch::new(e.unsigned_abs())),
    ))
}

/// Delete every attestation whose target epoch is strictly below `target_epoch`
pub fn delete_below_target(
    conn: &Connection,
    validator_id: ValidatorId,
    target_epoch: Epoch,
) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM signed_attestations WHERE validator_id = ?1 AND target_epoch < ?2",
        params![validator_id.as_i64(), target(target_epoch)?],
    )?;
    Ok(deleted)
}

/// Every attestation of a validator, ordered by target then source epoch
pub fn for_validator(
    conn: &Connection,
    validator_id: ValidatorId,
) -> Result<Vec<SignedAttestation>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM signed_attestations WHERE validator_id = ?1
         ORDER BY target_epoch ASC, source_epoch ASC, signing_root ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let attestations = stmt
        .query_map(params![validator_id.as_i64()], map_attestation)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(attestations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::validators;
    use crate::database::SlashingDatabase;
    use bulwark_core::PublicKey;

    fn root(byte: u8) -> SigningRoot {
        SigningRoot::new([byte; 32])
    }

    #[test]
    fn test_surround_queries() {
        let db = SlashingDatabase::open_in_memory().unwrap();
        db.with_transaction(|tx| {
            let id = validators::insert_if_absent(tx, &PublicKey::from_hex("0x01")?)?;
            insert(tx, id, Epoch::new(5), Epoch::new(10), &root(1))?;

            // (6, 9) sits inside (5, 10)
            assert!(find_surrounding(tx, id, Epoch::new(6), Epoch::new(9))?.is_some());
            // (4, 11) wraps (5, 10)
            assert!(find_surrounded(tx, id, Epoch::new(4), Epoch::new(11))?.is_some());
            // shared endpoints are not surround votes
            assert!(find_surrounding(tx, id, Epoch::new(5), Epoch::new(9))?.is_none());
            assert!(find_surrounded(tx, id, Epoch::new(5), Epoch::new(11))?.is_none());

            assert!(find_double_vote(tx, id, Epoch::new(10), &root(2))?.is_some());
            assert!(find_double_vote(tx, id, Epoch::new(10), &root(1))?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_offset_orders_by_target_then_source() {
        let db = SlashingDatabase::open_in_memory().unwrap();
        db.with_transaction(|tx| {
            let id = validators::insert_if_absent(tx, &PublicKey::from_hex("0x01")?)?;
            insert(tx, id, Epoch::new(3), Epoch::new(7), &root(1))?;
            insert(tx, id, Epoch::new(1), Epoch::new(2), &root(2))?;
            insert(tx, id, Epoch::new(2), Epoch::new(4), &root(3))?;

            assert_eq!(
                epochs_at_offset(tx, id, 1)?,
                Some((Epoch::new(2), Epoch::new(4)))
            );
            assert_eq!(epochs_at_offset(tx, id, 3)?, None);
            assert_eq!(
                max_epochs(tx, id)?,
                (Some(Epoch::new(3)), Some(Epoch::new(7)))
            );
            Ok(())
        })
        .unwrap();
    }
}
