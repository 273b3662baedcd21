use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

pub fn find(conn: &Connection) -> Result<Option<i64>> {
    let version = conn
        .query_row("SELECT version FROM database_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(version)
}

pub fn insert(conn: &Connection, version: u32) -> Result<()> {
    conn.execute(
        "INSERT INTO database_version (id, version) VALUES (1, ?1)",
        params![version],
    )?;
    Ok(())
}
