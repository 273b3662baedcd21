//! Row-level access to the slashing-protection tables
//!
//! Stateless functions over `&Connection`. Callers pass the active
//! [`rusqlite::Transaction`], which derefs to a connection, so every read
//! and write of one engine operation shares its transaction.

pub mod database_version;
pub mod low_watermark;
pub mod metadata;
pub mod signed_attestations;
pub mod signed_blocks;
pub mod validators;

use rusqlite::types::Type;
use rusqlite::Row;

use bulwark_core::SigningRoot;

use crate::error::{Result, SlashingError};

/// Convert a slot or epoch to SQLite's signed integer domain
pub fn to_sql_int(field: &'static str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| SlashingError::ValueOutOfRange { field, value })
}

pub(crate) fn read_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

pub(crate) fn read_opt_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u64>> {
    let value: Option<i64> = row.get(idx)?;
    value
        .map(|v| u64::try_from(v).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, v)))
        .transpose()
}

pub(crate) fn read_root(row: &Row<'_>, idx: usize) -> rusqlite::Result<SigningRoot> {
    let bytes: Vec<u8> = row.get(idx)?;
    SigningRoot::from_slice(&bytes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Blob, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sql_int_bounds() {
        assert_eq!(to_sql_int("slot", 0).unwrap(), 0);
        assert_eq!(to_sql_int("slot", i64::MAX as u64).unwrap(), i64::MAX);
        assert!(matches!(
            to_sql_int("target_epoch", u64::MAX),
            Err(SlashingError::ValueOutOfRange {
                field: "target_epoch",
                value: u64::MAX
            })
        ));
    }
}
