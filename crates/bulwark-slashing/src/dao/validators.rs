//! Validator registry rows

use rusqlite::{params, Connection, OptionalExtension};

use bulwark_core::{PublicKey, ValidatorId};

use crate::error::Result;

/// Register a public key, returning its id whether or not it was new
///
/// The unique constraint on `public_key` resolves concurrent registrations.
pub fn insert_if_absent(conn: &Connection, public_key: &PublicKey) -> Result<ValidatorId> {
    conn.execute(
        "INSERT OR IGNORE INTO validators (public_key) VALUES (?1)",
        params![public_key.as_bytes()],
    )?;
    let id: i64 = conn.query_row(
        "SELECT id FROM validators WHERE public_key = ?1",
        params![public_key.as_bytes()],
        |row| row.get(0),
    )?;
    Ok(ValidatorId::new(id))
}

pub fn find_by_public_key(conn: &Connection, public_key: &PublicKey) -> Result<Option<ValidatorId>> {
    let id = conn
        .query_row(
            "SELECT id FROM validators WHERE public_key = ?1",
            params![public_key.as_bytes()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id.map(ValidatorId::new))
}

pub fn exists(conn: &Connection, id: ValidatorId) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM validators WHERE id = ?1",
            params![id.as_i64()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// All registered validators, ordered by id
pub fn all(conn: &Connection) -> Result<Vec<(ValidatorId, PublicKey)>> {
    let mut stmt = conn.prepare("SELECT id, public_key FROM validators ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        let id: i64 = row.get(0)?;
        let key: Vec<u8> = row.get(1)?;
        Ok((id, key))
    })?;

    let mut validators = Vec::new();
    for row in rows {
        let (id, key) = row?;
        validators.push((ValidatorId::new(id), PublicKey::new(key)?));
    }
    Ok(validators)
}

pub fn all_ids(conn: &Connection) -> Result<Vec<ValidatorId>> {
    let mut stmt = conn.prepare("SELECT id FROM validators ORDER BY id")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .map(|id| id.map(ValidatorId::new))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}
