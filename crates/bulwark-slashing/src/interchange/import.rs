use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use bulwark_core::{Epoch, InterchangeDocument, ValidatorHistory, ValidatorId};

use crate::checks::GenesisGuard;
use crate::dao::signed_attestations::SignedAttestation;
use crate::dao::{low_watermark, signed_attestations, signed_blocks, validators};
use crate::database::SlashingDatabase;
use crate::error::{Result, SlashingError};

/// Counts of what an import did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub validators: usize,
    pub blocks_imported: usize,
    pub blocks_skipped: usize,
    pub attestations_imported: usize,
    pub attestations_skipped: usize,
    /// Records that conflict with history (double proposals, double or surround votes)
    pub conflicts: usize,
}

/// Import a parsed, version-checked document
///
/// Conflicting records are stored anyway, since an import is a statement of
/// historical fact; each is logged. Identical records are skipped, so
/// importing the same document twice changes nothing. Watermarks are raised
/// to the highest slot and epochs known for each validator after the import.
pub fn import_document(
    db: &SlashingDatabase,
    guard: &GenesisGuard,
    document: &InterchangeDocument,
) -> Result<ImportSummary> {
    let genesis_validators_root = document.metadata.genesis_validators_root;

    if document.validators().is_empty() {
        db.with_transaction(|tx| guard.check(tx, &genesis_validators_root))?;
        info!("Interchange document contains no validator data, nothing to import");
        return Ok(ImportSummary::default());
    }

    let summary = db.with_transaction(|tx| {
        guard.check_and_store(tx, &genesis_validators_root)?;

        let mut summary = ImportSummary::default();
        for history in document.validators() {
            import_validator(tx, history, &mut summary)?;
        }
        Ok(summary)
    })?;
    guard.pin(genesis_validators_root);

    info!(
        "Imported {} validators: {} blocks ({} skipped), {} attestations ({} skipped), {} conflicts",
        summary.validators,
        summary.blocks_imported,
        summary.blocks_skipped,
        summary.attestations_imported,
        summary.attestations_skipped,
        summary.conflicts
    );
    Ok(summary)
}

fn import_validator(
    conn: &Connection,
    history: &ValidatorHistory,
    summary: &mut ImportSummary,
) -> Result<()> {
    let public_key = &history.pubkey;
    let validator_id = validators::insert_if_absent(conn, public_key)?;
    summary.validators += 1;

    for block in &history.signed_blocks {
        if signed_blocks::exists(conn, validator_id, block.slot, &block.signing_root)? {
            debug!(
                "Skipping block for {} at slot {}: already present",
                public_key.short(),
                block.slot
            );
            summary.blocks_skipped += 1;
            continue;
        }
        if let Some(existing) =
            signed_blocks::find_conflicting(conn, validator_id, block.slot, &block.signing_root)?
        {
            warn!(
                "Imported block for {} at slot {} conflicts with signing root {}",
                public_key, block.slot, existing.signing_root
            );
            summary.conflicts += 1;
        }
        signed_blocks::insert(conn, validator_id, block.slot, &block.signing_root)?;
        summary.blocks_imported += 1;
    }

    if !history.signed_blocks.is_empty() {
        if let Some(max_slot) = signed_blocks::max_slot(conn, validator_id)? {
            low_watermark::raise_slot(conn, validator_id, max_slot)?;
        }
    }

    for (index, attestation) in history.signed_attestations.iter().enumerate() {
        let (source, target) = (attestation.source_epoch, attestation.target_epoch);
        if source > target {
            return Err(SlashingError::InvalidAttestationRange {
                index,
                public_key: public_key.clone(),
            });
        }

        if signed_attestations::exists(conn, validator_id, source, target, &attestation.signing_root)? {
            debug!(
                "Skipping attestation for {} ({} -> {}): already present",
                public_key.short(),
                source,
                target
            );
            summary.attestations_skipped += 1;
            continue;
        }

        if let Some(existing) = signed_attestations::find_double_vote(
            conn,
            validator_id,
            target,
            &attestation.signing_root,
        )? {
            warn!(
                "Imported attestation for {} ({} -> {}) is a double vote with signing root {}",
                public_key, source, target, existing.signing_root
            );
            summary.conflicts += 1;
        } else if let Some(existing) = find_surround_vote(conn, validator_id, source, target)? {
            warn!(
                "Imported attestation for {} ({} -> {}) is a surround vote with ({} -> {})",
                public_key, source, target, existing.source_epoch, existing.target_epoch
            );
            summary.conflicts += 1;
        }

        signed_attestations::insert(conn, validator_id, source, target, &attestation.signing_root)?;
        summary.attestations_imported += 1;
    }

    if !history.signed_attestations.is_empty() {
        if let (Some(max_source), Some(max_target)) =
            signed_attestations::max_epochs(conn, validator_id)?
        {
            low_watermark::raise_epochs(conn, validator_id, max_source, max_target)?;
        }
    }

    Ok(())
}

fn find_surround_vote(
    conn: &Connection,
    validator_id: ValidatorId,
    source: Epoch,
    target: Epoch,
) -> Result<Option<SignedAttestation>> {
    match signed_attestations::find_surrounding(conn, validator_id, source, target)? {
        Some(existing) => Ok(Some(existing)),
        None => signed_attestations::find_surrounded(conn, validator_id, source, target),
    }
}
