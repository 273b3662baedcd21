//! Per-validator low watermarks
//!
//! Every mutation here is monotone: values are either set when absent or
//! raised to a maximum. Nothing in the engine can lower a watermark.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use bulwark_core::{Epoch, Slot, ValidatorId};

use super::{read_opt_u64, to_sql_int};
use crate::error::Result;

/// Lowest slot and epochs still eligible for signing
///
/// `None` means no watermark has been set for that field yet, which is
/// distinct from a watermark at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningWatermark {
    pub validator_id: ValidatorId,
    pub slot: Option<Slot>,
    pub source_epoch: Option<Epoch>,
    pub target_epoch: Option<Epoch>,
}

impl SigningWatermark {
    pub fn empty(validator_id: ValidatorId) -> Self {
        Self {
            validator_id,
            slot: None,
            source_epoch: None,
            target_epoch: None,
        }
    }

    /// Both epoch fields are set
    pub fn has_epochs(&self) -> bool {
        self.source_epoch.is_some() && self.target_epoch.is_some()
    }
}

pub fn find(conn: &Connection, validator_id: ValidatorId) -> Result<Option<SigningWatermark>> {
    let watermark = conn
        .query_row(
            "SELECT slot, source_epoch, target_epoch FROM low_watermarks
             WHERE validator_id = ?1",
            params![validator_id.as_i64()],
            |row| {
                Ok(SigningWatermark {
                    validator_id,
                    slot: read_opt_u64(row, 0)?.map(Slot::new),
                    source_epoch: read_opt_u64(row, 1)?.map(Epoch::new),
                    target_epoch: read_opt_u64(row, 2)?.map(Epoch::new),
                })
            },
        )
        .optional()?;
    Ok(watermark)
}

/// Watermark for a validator, with every field unset when no row exists
pub fn find_or_empty(conn: &Connection, validator_id: ValidatorId) -> Result<SigningWatermark> {
    Ok(find(conn, validator_id)?.unwrap_or_else(|| SigningWatermark::empty(validator_id)))
}

/// Set the slot watermark only if it is currently unset
pub fn init_slot_if_unset(conn: &Connection, validator_id: ValidatorId, slot: Slot) -> Result<()> {
    conn.execute(
        "INSERT INTO low_watermarks (validator_id, slot) VALUES (?1, ?2)
         ON CONFLICT(validator_id) DO UPDATE SET slot = COALESCE(slot, excluded.slot)",
        params![validator_id.as_i64(), to_sql_int("slot", slot.as_u64())?],
    )?;
    Ok(())
}

/// Set each epoch watermark only if that field is currently unset
pub fn init_epochs_if_unset(
    conn: &Connection,
    validator_id: ValidatorId,
    source_epoch: Epoch,
    target_epoch: Epoch,
) -> Result<()> {
    conn.execute(
        "INSERT INTO low_watermarks (validator_id, source_epoch, target_epoch) VALUES (?1, ?2, ?3)
         ON CONFLICT(validator_id) DO UPDATE SET
             source_epoch = COALESCE(source_epoch, excluded.source_epoch),
             target_epoch = COALESCE(target_epoch, excluded.target_epoch)",
        params![
            validator_id.as_i64(),
            to_sql_int("source_epoch", source_epoch.as_u64())?,
            to_sql_int("target_epoch", target_epoch.as_u64())?
        ],
    )?;
    Ok(())
}

/// Raise the slot watermark to `slot`, leaving a higher value untouched
pub fn raise_slot(conn: &Connection, validator_id: ValidatorId, slot: Slot) -> Result<()> {
    conn.execute(
        "INSERT INTO low_watermarks (validator_id, slot) VALUES (?1, ?2)
         ON CONFLICT(validator_id) DO UPDATE SET
             slot = MAX(COALESCE(slot, excluded.slot), excluded.slot)",
        params![validator_id.as_i64(), to_sql_int("slot", slot.as_u64())?],
    )?;
    Ok(())
}

/// Raise both epoch watermarks, each independently
pub fn raise_epochs(
    conn: &Connection,
    validator_id: ValidatorId,
    source_epoch: Epoch,
    target_epoch: Epoch,
) -> Result<()> {
    conn.execute(
        "INSERT INTO low_watermarks (validator_id, source_epoch, target_epoch) VALUES (?1, ?2, ?3)
         ON CONFLICT(validator_id) DO UPDATE SET
             source_epoch = MAX(COALESCE(source_epoch, excluded.source_epoch), excluded.source_epoch),
             target_epoch = MAX(COALESCE(target_epoch, excluded.target_epoch), excluded.target_epoch)",
        params![
            validator_id.as_i64(),
            to_sql_int("source_epoch", source_epoch.as_u64())?,
            to_sql_int("target_epoch", target_epoch.as_u64())?
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::validators;
    use crate::database::SlashingDatabase;
    use bulwark_core::PublicKey;

    fn with_validator<T>(f: impl FnOnce(&Connection, ValidatorId) -> Result<T>) -> T {
        let db = SlashingDatabase::open_in_memory().unwrap();
        db.with_transaction(|tx| {
            let id = validators::insert_if_absent(tx, &PublicKey::from_hex("0x01")?)?;
            f(tx, id)
        })
        .unwrap()
    }

    #[test]
    fn test_missing_row_is_empty() {
        let watermark = with_validator(|conn, id| find_or_empty(conn, id));
        assert_eq!(watermark.slot, None);
        assert!(!watermark.has_epochs());
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let watermark = with_validator(|conn, id| {
            init_slot_if_unset(conn, id, Slot::new(10))?;
            init_slot_if_unset(conn, id, Slot::new(3))?;
            init_epochs_if_unset(conn, id, Epoch::new(4), Epoch::new(5))?;
            init_epochs_if_unset(conn, id, Epoch::new(1), Epoch::new(2))?;
            find_or_empty(conn, id)
        });
        assert_eq!(watermark.slot, Some(Slot::new(10)));
        assert_eq!(watermark.source_epoch, Some(Epoch::new(4)));
        assert_eq!(watermark.target_epoch, Some(Epoch::new(5)));
    }

    #[test]
    fn test_raise_never_lowers() {
        let watermark = with_validator(|conn, id| {
            raise_slot(conn, id, Slot::new(8))?;
            raise_slot(conn, id, Slot::new(5))?;
            raise_epochs(conn, id, Epoch::new(6), Epoch::new(2))?;
            raise_epochs(conn, id, Epoch::new(3), Epoch::new(7))?;
            find_or_empty(conn, id)
        });
        assert_eq!(watermark.slot, Some(Slot::new(8)));
        assert_eq!(watermark.source_epoch, Some(Epoch::new(6)));
        assert_eq!(watermark.target_epoch, Some(Epoch::new(7)));
    }

    #[test]
    fn test_slot_and_epochs_are_independent() {
        let watermark = with_validator(|conn, id| {
            init_slot_if_unset(conn, id, Slot::new(1))?;
            find_or_empty(conn, id)
        });
        assert_eq!(watermark.slot, Some(Slot::new(1)));
        assert_eq!(watermark.source_epoch, None);
    }
}
