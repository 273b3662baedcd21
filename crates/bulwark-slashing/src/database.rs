//! SQLite-backed store for slashing-protection data
//!
//! [`SlashingDatabase`] exclusively owns the connection. Every engine
//! operation that writes runs inside one `BEGIN IMMEDIATE` transaction handed
//! out by [`SlashingDatabase::with_transaction`]: the write lock is taken
//! before the first read, so a check-then-insert sequence can never interleave
//! with another writer, in this process or another one sharing the file.
//! Pure lookups use [`SlashingDatabase::with_read_transaction`].

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::dao::database_version;
use crate::error::{Result, SlashingError};

/// Schema version this build reads and writes
pub const EXPECTED_DATABASE_VERSION: u32 = 1;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// How long a writer waits for another process holding the lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the slashing-protection database
pub struct SlashingDatabase {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SlashingDatabase {
    /// Open an existing database, refusing to run against a missing or
    /// mismatched schema version.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure(&conn)?;
        Self::verify_version(&conn)?;

        info!("Opened slashing protection database at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a database, creating it and applying migrations if needed
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Self::verify_version(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Self::verify_version(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Apply the schema and record its version.
    ///
    /// Idempotent: tables are created only if absent and an existing version
    /// row is left untouched, so a mismatch is still caught on verification.
    pub fn migrate(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)?;
        if database_version::find(conn)?.is_none() {
            database_version::insert(conn, EXPECTED_DATABASE_VERSION)?;
            info!(
                "Initialized slashing protection schema version {}",
                EXPECTED_DATABASE_VERSION
            );
        }
        Ok(())
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        // Returns the resulting mode ("memory" for in-memory databases)
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!("SQLite journal mode: {}", mode);
        Ok(())
    }

    fn verify_version(conn: &Connection) -> Result<()> {
        let version = match database_version::find(conn) {
            Ok(Some(version)) => version,
            Ok(None) => {
                return Err(SlashingError::MissingDatabaseVersion {
                    expected: EXPECTED_DATABASE_VERSION,
                })
            }
            Err(e) => {
                warn!("Unable to read database version: {}", e);
                return Err(SlashingError::MissingDatabaseVersion {
                    expected: EXPECTED_DATABASE_VERSION,
                });
            }
        };

        if version != i64::from(EXPECTED_DATABASE_VERSION) {
            return Err(SlashingError::DatabaseVersionMismatch {
                found: version,
                expected: EXPECTED_DATABASE_VERSION,
            });
        }
        Ok(())
    }

    /// Run `f` inside a single immediate transaction.
    ///
    /// Commits when `f` returns `Ok`; any error rolls back every change made
    /// by `f`.
    ///
    /// There is one connection per process, so calls from every validator
    /// queue on the same mutex. Each check holds it only for a handful of
    /// indexed queries. Separate processes on the same file serialize on the
    /// SQLite write lock instead.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.run(TransactionBehavior::Immediate, f)
    }

    /// Run the read-only `f` inside a deferred transaction.
    ///
    /// No SQLite write lock is taken unless `f` writes, so readers on other
    /// connections never wait behind a signing check.
    pub fn with_read_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.run(TransactionBehavior::Deferred, f)
    }

    fn run<T, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| SlashingError::LockPoisoned)?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
