//! Slashing-protection facade
//!
//! [`SlashingProtection`] is the seam the signer talks to. Every method is
//! one atomic operation against the store; refusals come back as
//! [`SigningDecision`] values, errors only for bad input or storage failure.

use std::io::{Read, Write};
use tracing::{debug, info};

use bulwark_core::{
    Epoch, GenesisValidatorsRoot, InterchangeDocument, PublicKey, SigningDecision, SigningRoot,
    Slot, ValidatorId,
};

use crate::checks::{self, attestation::check_range, GenesisGuard};
use crate::dao::{low_watermark, validators};
use crate::database::SlashingDatabase;
use crate::error::Result;
use crate::interchange::{self, ImportSummary};
use crate::pruning::{self, PruneOutcome, PruneSummary};
use crate::SigningWatermark;

/// Operations exposed to the signing layer
pub trait SlashingProtection: Send + Sync {
    /// Register public keys, returning their ids in input order
    fn register_validators(&self, public_keys: &[PublicKey]) -> Result<Vec<ValidatorId>>;

    fn lookup(&self, public_key: &PublicKey) -> Result<Option<ValidatorId>>;

    fn may_sign_block(
        &self,
        validator_id: ValidatorId,
        slot: Slot,
        signing_root: &SigningRoot,
        genesis_validators_root: &GenesisValidatorsRoot,
    ) -> Result<SigningDecision>;

    fn may_sign_attestation(
        &self,
        validator_id: ValidatorId,
        source_epoch: Epoch,
        target_epoch: Epoch,
        signing_root: &SigningRoot,
        genesis_validators_root: &GenesisValidatorsRoot,
    ) -> Result<SigningDecision>;

    fn watermark(&self, validator_id: ValidatorId) -> Result<Option<SigningWatermark>>;

    fn prune(&self, entries_to_keep: u64, validator_id: ValidatorId) -> Result<PruneOutcome>;

    fn prune_all(&self, entries_to_keep: u64) -> Result<PruneSummary>;

    fn import_data(&self, reader: &mut dyn Read) -> Result<ImportSummary>;

    fn export_data(&self, writer: &mut dyn Write) -> Result<()>;
}

/// Database-backed slashing protection
pub struct DbSlashingProtection {
    db: SlashingDatabase,
    genesis: GenesisGuard,
}

impl DbSlashingProtection {
    pub fn new(db: SlashingDatabase) -> Self {
        Self {
            db,
            genesis: GenesisGuard::new(),
        }
    }

    pub fn database(&self) -> &SlashingDatabase {
        &self.db
    }

    /// Check `root` against the store and pin it, recording it if none is stored
    pub fn pin_genesis_validators_root(&self, root: &GenesisValidatorsRoot) -> Result<()> {
        self.db
            .with_transaction(|tx| self.genesis.check_and_store(tx, root))?;
        self.genesis.pin(*root);
        Ok(())
    }

    /// Build the current interchange document without serializing it
    pub fn export_document(&self) -> Result<InterchangeDocument> {
        self.db.with_transaction(|tx| interchange::export_document(tx))
    }
}

impl SlashingProtection for DbSlashingProtection {
    fn register_validators(&self, public_keys: &[PublicKey]) -> Result<Vec<ValidatorId>> {
        let ids = self.db.with_transaction(|tx| {
            public_keys
                .iter()
                .map(|key| validators::insert_if_absent(tx, key))
                .collect::<Result<Vec<_>>>()
        })?;
        info!("Registered {} validators", ids.len());
        Ok(ids)
    }

    fn lookup(&self, public_key: &PublicKey) -> Result<Option<ValidatorId>> {
        self.db
            .with_read_transaction(|tx| validators::find_by_public_key(tx, public_key))
    }

    fn may_sign_block(
        &self,
        validator_id: ValidatorId,
        slot: Slot,
        signing_root: &SigningRoot,
        genesis_validators_root: &GenesisValidatorsRoot,
    ) -> Result<SigningDecision> {
        let decision = self.db.with_transaction(|tx| {
            self.genesis.check_and_store(tx, genesis_validators_root)?;
            checks::check_block(tx, validator_id, slot, signing_root)
        })?;
        self.genesis.pin(*genesis_validators_root);

        debug!(
            "Block decision for validator {} at slot {}: {:?}",
            validator_id, slot, decision
        );
        Ok(decision)
    }

    fn may_sign_attestation(
        &self,
        validator_id: ValidatorId,
        source_epoch: Epoch,
        target_epoch: Epoch,
        signing_root: &SigningRoot,
        genesis_validators_root: &GenesisValidatorsRoot,
    ) -> Result<SigningDecision> {
        if let Some(refused) = check_range(source_epoch, target_epoch) {
            return Ok(refused);
        }

        let decision = self.db.with_transaction(|tx| {
            self.genesis.check_and_store(tx, genesis_validators_root)?;
            checks::check_attestation(tx, validator_id, source_epoch, target_epoch, signing_root)
        })?;
        self.genesis.pin(*genesis_validators_root);

        debug!(
            "Attestation decision for validator {} ({} -> {}): {:?}",
            validator_id, source_epoch, target_epoch, decision
        );
        Ok(decision)
    }

    fn watermark(&self, validator_id: ValidatorId) -> Result<Option<SigningWatermark>> {
        self.db
            .with_read_transaction(|tx| low_watermark::find(tx, validator_id))
    }

    fn prune(&self, entries_to_keep: u64, validator_id: ValidatorId) -> Result<PruneOutcome> {
        self.db
            .with_transaction(|tx| pruning::prune_validator(tx, entries_to_keep, validator_id))
    }

    fn prune_all(&self, entries_to_keep: u64) -> Result<PruneSummary> {
        pruning::prune_all(&self.db, entries_to_keep)
    }

    fn import_data(&self, reader: &mut dyn Read) -> Result<ImportSummary> {
        let document = InterchangeDocument::from_reader(reader)?;
        interchange::import_document(&self.db, &self.genesis, &document)
    }

    fn export_data(&self, writer: &mut dyn Write) -> Result<()> {
        let document = self.export_document()?;
        let json = document.to_json_pretty()?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        info!("Exported slashing protection data for {} validators", document.validators().len());
        Ok(())
    }
}
