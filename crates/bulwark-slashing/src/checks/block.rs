//! Block proposal safety check

use rusqlite::Connection;
use tracing::{debug, warn};

use bulwark_core::{RefusalReason, Safe, SigningDecision, SigningRoot, Slot, ValidatorId};

use super::require_registered;
use crate::dao::{low_watermark, signed_blocks};
use crate::error::Result;

/// Decide whether `validator_id` may sign the block at `slot`, recording it if so
///
/// Conflicts are checked before the watermark so that a request at an
/// already-signed slot reports `DOUBLE_PROPOSAL` or replays instead of
/// being reported as too old.
pub fn check_block(
    conn: &Connection,
    validator_id: ValidatorId,
    slot: Slot,
    signing_root: &SigningRoot,
) -> Result<SigningDecision> {
    require_registered(conn, validator_id)?;

    if let Some(existing) = signed_blocks::find_conflicting(conn, validator_id, slot, signing_root)? {
        warn!(
            "Refusing block for validator {} at slot {}: already signed {} (requested {})",
            validator_id, slot, existing.signing_root, signing_root
        );
        return Ok(SigningDecision::Refused(RefusalReason::DoubleProposal));
    }

    if signed_blocks::exists(conn, validator_id, slot, signing_root)? {
        debug!(
            "Block for validator {} at slot {} already signed, allowing replay",
            validator_id, slot
        );
        return Ok(SigningDecision::Allowed(Safe::SameData));
    }

    let watermark = low_watermark::find_or_empty(conn, validator_id)?;
    if let Some(min_slot) = watermark.slot {
        if slot <= min_slot {
            warn!(
                "Refusing block for validator {} at slot {}: at or below watermark {}",
                validator_id, slot, min_slot
            );
            return Ok(SigningDecision::Refused(RefusalReason::TooOld));
        }
    }

    signed_blocks::insert(conn, validator_id, slot, signing_root)?;
    low_watermark::init_slot_if_unset(conn, validator_id, slot)?;

    Ok(SigningDecision::Allowed(Safe::Valid))
}
