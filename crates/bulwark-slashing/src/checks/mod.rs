//! Safety checks run inside a signing transaction
//!
//! Each check re-reads the validator's history and watermark from the
//! connection it is handed; nothing is cached between calls.

pub mod attestation;
pub mod block;
pub mod genesis;

pub use attestation::check_attestation;
pub use block::check_block;
pub use genesis::GenesisGuard;

use rusqlite::Connection;

use bulwark_core::ValidatorId;

use crate::dao::validators;
use crate::error::{Result, SlashingError};

pub(crate) fn require_registered(conn: &Connection, validator_id: ValidatorId) -> Result<()> {
    if validators::exists(conn, validator_id)? {
        Ok(())
    } else {
        Err(SlashingError::UnregisteredValidator(validator_id))
    }
}
