//! Error types for the slashing-protection engine
//!
//! Refusing to sign is not an error; see [`bulwark_core::SigningDecision`].
//! Errors fall into two classes: validation failures caused by the caller's
//! input, and storage failures.

use thiserror::Error;

use bulwark_core::{GenesisValidatorsRoot, PublicKey, ValidatorId};

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SlashingError>;

/// Broad classification of an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; the operation had no effect
    Validation,
    /// The store failed or is unusable
    Storage,
}

/// Errors that can occur in the slashing-protection engine
#[derive(Debug, Error)]
pub enum SlashingError {
    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version row missing or unreadable
    #[error("Failed to read database version, expected {expected}")]
    MissingDatabaseVersion { expected: u32 },

    /// Schema version differs from the one this build understands
    #[error("Database version ({found}) does not match expected version ({expected}), please run migrations and try again.")]
    DatabaseVersionMismatch { found: i64, expected: u32 },

    /// Storage lock poisoned by a panic in another thread
    #[error("Slashing database lock poisoned")]
    LockPoisoned,

    /// Malformed interchange input
    #[error("Invalid interchange data: {0}")]
    InvalidInterchange(#[from] bulwark_core::Error),

    /// Genesis validators root differs from the pinned value
    #[error("Supplied genesis validators root {supplied} does not match value in database {stored}")]
    GenesisValidatorsRootMismatch {
        supplied: GenesisValidatorsRoot,
        stored: GenesisValidatorsRoot,
    },

    /// Export requested before any genesis validators root was recorded
    #[error("No genesis validators root for slashing protection data")]
    MissingGenesisValidatorsRoot,

    /// Imported attestation with source epoch above target epoch
    #[error("Attestation #{index} for validator {public_key} - source is greater than target epoch")]
    InvalidAttestationRange { index: usize, public_key: PublicKey },

    /// Slot or epoch that does not fit the store's signed 64-bit integers
    #[error("{field} value {value} exceeds the storable range")]
    ValueOutOfRange { field: &'static str, value: u64 },

    /// Operation on a validator id without a registration record
    #[error("Validator {0} is not registered")]
    UnregisteredValidator(ValidatorId),

    /// Pruning must keep at least one entry per validator
    #[error("entries to keep must be at least 1")]
    InvalidPruneAmount,
}

impl SlashingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SlashingError::Database(_)
            | SlashingError::Io(_)
            | SlashingError::MissingDatabaseVersion { .. }
            | SlashingError::DatabaseVersionMismatch { .. }
            | SlashingError::LockPoisoned => ErrorKind::Storage,
            SlashingError::InvalidInterchange(_)
            | SlashingError::GenesisValidatorsRootMismatch { .. }
            | SlashingError::MissingGenesisValidatorsRoot
            | SlashingError::InvalidAttestationRange { .. }
            | SlashingError::ValueOutOfRange { .. }
            | SlashingError::UnregisteredValidator(_)
            | SlashingError::InvalidPruneAmount => ErrorKind::Validation,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl From<serde_json::Error> for SlashingError {
    fn from(e: serde_json::Error) -> Self {
        SlashingError::InvalidInterchange(bulwark_core::Error::MalformedInterchange(e))
    }
}
