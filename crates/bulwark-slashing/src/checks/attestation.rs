//! Attestation safety check: double votes and surround votes

use rusqlite::Connection;
use tracing::{debug, warn};

use bulwark_core::{Epoch, RefusalReason, Safe, SigningDecision, SigningRoot, ValidatorId};

use super::require_registered;
use crate::dao::{low_watermark, signed_attestations};
use crate::error::Result;

/// Reject an attestation whose source is after its target
///
/// Runs before any transaction is opened; such a vote is never signable.
pub fn check_range(source_epoch: Epoch, target_epoch: Epoch) -> Option<SigningDecision> {
    if source_epoch > target_epoch {
        warn!(
            "Refusing attestation: source epoch {} is greater than target epoch {}",
            source_epoch, target_epoch
        );
        Some(SigningDecision::Refused(RefusalReason::InvalidRange))
    } else {
        None
    }
}

/// Decide whether `validator_id` may sign the attestation, recording it if so
pub fn check_attestation(
    conn: &Connection,
    validator_id: ValidatorId,
    source_epoch: Epoch,
    target_epoch: Epoch,
    signing_root: &SigningRoot,
) -> Result<SigningDecision> {
    if let Some(refused) = check_range(source_epoch, target_epoch) {
        return Ok(refused);
    }
    require_registered(conn, validator_id)?;

    if let Some(existing) =
        signed_attestations::find_double_vote(conn, validator_id, target_epoch, signing_root)?
    {
        warn!(
            "Refusing attestation for validator {} ({} -> {}): double vote with {}",
            validator_id, source_epoch, target_epoch, existing.signing_root
        );
        return Ok(SigningDecision::Refused(RefusalReason::DoubleVote));
    }

    if let Some(existing) =
        signed_attestations::find_surrounding(conn, validator_id, source_epoch, target_epoch)?
    {
        warn!(
            "Refusing attestation for validator {} ({} -> {}): surrounded by ({} -> {})",
            validator_id, source_epoch, target_epoch, existing.source_epoch, existing.target_epoch
        );
        return Ok(SigningDecision::Refused(RefusalReason::Surrounded));
    }

    if let Some(existing) =
        signed_attestations::find_surrounded(conn, validator_id, source_epoch, target_epoch)?
    {
        warn!(
            "Refusing attestation for validator {} ({} -> {}): surrounds ({} -> {})",
            validator_id, source_epoch, target_epoch, existing.source_epoch, existing.target_epoch
        );
        return Ok(SigningDecision::Refused(RefusalReason::Surrounds));
    }

    if signed_attestations::exists(conn, validator_id, source_epoch, target_epoch, signing_root)? {
        debug!(
            "Attestation for validator {} ({} -> {}) already signed, allowing replay",
            validator_id, source_epoch, target_epoch
        );
        return Ok(SigningDecision::Allowed(Safe::SameData));
    }

    let watermark = low_watermark::find_or_empty(conn, validator_id)?;
    let below_source = watermark.source_epoch.is_some_and(|min| source_epoch < min);
    let below_target = watermark.target_epoch.is_some_and(|min| target_epoch <= min);
    if below_source || below_target {
        warn!(
            "Refusing attestation for validator {} ({} -> {}): below watermark ({:?} -> {:?})",
            validator_id, source_epoch, target_epoch, watermark.source_epoch, watermark.target_epoch
        );
        return Ok(SigningDecision::Refused(RefusalReason::TooOld));
    }

    signed_attestations::insert(conn, validator_id, source_epoch, target_epoch, signing_root)?;
    low_watermark::init_epochs_if_unset(conn, validator_id, source_epoch, target_epoch)?;

    Ok(SigningDecision::Allowed(Safe::Valid))
}
