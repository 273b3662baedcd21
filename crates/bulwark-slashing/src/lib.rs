//! Bulwark Slashing - Slashing-protection engine for validator signers
//!
//! Decides, for every block or attestation a validator is asked to sign,
//! whether signing is safe, and durably records approved requests in the
//! same SQLite transaction.
//!
//! # Components
//!
//! - [`database`]: connection ownership, schema migration and version check
//! - [`dao`]: row-level access to validators, signed data and watermarks
//! - [`checks`]: block and attestation safety checks
//! - [`pruning`]: history trimming that only ever raises watermarks
//! - [`interchange`]: EIP-3076 import and export
//! - [`protection`]: the [`SlashingProtection`] facade used by callers

pub mod checks;
pub mod dao;
pub mod database;
pub mod error;
pub mod interchange;
pub mod protection;
pub mod pruning;

pub use dao::low_watermark::SigningWatermark;
pub use database::{SlashingDatabase, EXPECTED_DATABASE_VERSION};
pub use error::{ErrorKind, Result, SlashingError};
pub use interchange::ImportSummary;
pub use protection::{DbSlashingProtection, SlashingProtection};
pub use pruning::{PruneOutcome, PruneSummary};
