//! History pruning
//!
//! Pruning keeps the newest `entries_to_keep` blocks and attestations of a
//! validator and raises its watermarks to the oldest retained entry, so a
//! deleted entry can never be signed again. Watermarks never move down: a
//! floor that is already higher than the computed mark wins, and more rows
//! are deleted instead.
//!
//! A validator without a watermark is left alone. Its history is the only
//! thing protecting it, so nothing is deleted until a floor exists.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use bulwark_core::ValidatorId;

use crate::dao::low_watermark::{self, SigningWatermark};
use crate::dao::{signed_attestations, signed_blocks, validators};
use crate::database::SlashingDatabase;
use crate::error::{Result, SlashingError};

/// Effect of pruning one validator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneOutcome {
    pub blocks_deleted: usize,
    pub attestations_deleted: usize,
    /// Watermark after pruning, `None` if the validator has none
    pub watermark: Option<SigningWatermark>,
}

/// Totals for a pruning pass over every registered validator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneSummary {
    pub validators_pruned: usize,
    pub validators_failed: usize,
    pub blocks_deleted: usize,
    pub attestations_deleted: usize,
}

/// Prune one validator inside the caller's transaction
pub fn prune_validator(
    conn: &Connection,
    entries_to_keep: u64,
    validator_id: ValidatorId,
) -> Result<PruneOutcome> {
    if entries_to_keep == 0 {
        return Err(SlashingError::InvalidPruneAmount);
    }
    if !validators::exists(conn, validator_id)? {
        debug!("Skipping pruning for unregistered validator {}", validator_id);
        return Ok(PruneOutcome::default());
    }
    let Some(watermark) = low_watermark::find(conn, validator_id)? else {
        debug!("Validator {} has no watermark, nothing to prune", validator_id);
        return Ok(PruneOutcome::default());
    };

    let mut outcome = PruneOutcome::default();

    if let Some(current) = watermark.slot {
        let total = signed_blocks::count(conn, validator_id)?;
        let offset = total.saturating_sub(entries_to_keep);
        if let Some(mark) = signed_blocks::slot_at_offset(conn, validator_id, offset)? {
            let floor = current.max(mark);
            low_watermark::raise_slot(conn, validator_id, floor)?;
            outcome.blocks_deleted = signed_blocks::delete_below(conn, validator_id, floor)?;
        }
    }

    if let (Some(source), Some(target)) = (watermark.source_epoch, watermark.target_epoch) {
        let total = signed_attestations::count(conn, validator_id)?;
        let offset = total.saturating_sub(entries_to_keep);
        if let Some((mark_source, mark_target)) =
            signed_attestations::epochs_at_offset(conn, validator_id, offset)?
        {
            let source_floor = source.max(mark_source);
            let target_floor = target.max(mark_target);
            low_watermark::raise_epochs(conn, validator_id, source_floor, target_floor)?;
            outcome.attestations_deleted =
                signed_attestations::delete_below_target(conn, validator_id, target_floor)?;
        }
    }

    outcome.watermark = low_watermark::find(conn, validator_id)?;

    debug!(
        "Pruned validator {}: {} blocks, {} attestations",
        validator_id, outcome.blocks_deleted, outcome.attestations_deleted
    );
    Ok(outcome)
}

/// Prune every registered validator, each in its own transaction
///
/// A failure for one validator rolls back only that validator's changes; it
/// is logged and counted, and the pass continues.
pub fn prune_all(db: &SlashingDatabase, entries_to_keep: u64) -> Result<PruneSummary> {
    if entries_to_keep == 0 {
        return Err(SlashingError::InvalidPruneAmount);
    }

    let ids = db.with_transaction(|tx| validators::all_ids(tx))?;
    let mut summary = PruneSummary::default();

    for id in ids {
        match db.with_transaction(|tx| prune_validator(tx, entries_to_keep, id)) {
            Ok(outcome) => {
                summary.validators_pruned += 1;
                summary.blocks_deleted += outcome.blocks_deleted;
                summary.attestations_deleted += outcome.attestations_deleted;
            }
            Err(e) => {
                error!("Failed to prune validator {}: {}", id, e);
                summary.validators_failed += 1;
            }
        }
    }

    info!(
        "Pruning complete: {} validators, {} blocks and {} attestations deleted, {} failures",
        summary.validators_pruned,
        summary.blocks_deleted,
        summary.attestations_deleted,
        summary.validators_failed
    );
    Ok(summary)
}
