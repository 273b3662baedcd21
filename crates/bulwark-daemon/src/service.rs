//! Async facade over the slashing-protection engine
//!
//! Engine calls block on SQLite, so each one runs on tokio's blocking pool.
//! Requests address validators by public key; the service resolves them to
//! ids and refuses keys that were never registered.

use std::sync::Arc;
use tracing::{info, warn};

use bulwark_core::{
    Epoch, GenesisValidatorsRoot, PublicKey, SigningDecision, SigningRoot, Slot, ValidatorId,
};
use bulwark_slashing::{
    DbSlashingProtection, ImportSummary, PruneSummary, SlashingDatabase, SlashingProtection,
};

use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};

#[derive(Clone)]
pub struct SlashingService {
    protection: Arc<dyn SlashingProtection>,
    default_genesis_validators_root: Option<GenesisValidatorsRoot>,
}

impl SlashingService {
    pub fn new(
        protection: Arc<dyn SlashingProtection>,
        default_genesis_validators_root: Option<GenesisValidatorsRoot>,
    ) -> Self {
        Self {
            protection,
            default_genesis_validators_root,
        }
    }

    /// Open the configured database and apply startup registration
    pub async fn from_config(config: &DaemonConfig) -> Result<Self> {
        let database_path = config.database_path.clone();
        let keys = config.validator_keys()?;
        let genesis_root = config.genesis_root()?;

        let protection = tokio::task::spawn_blocking(move || -> Result<DbSlashingProtection> {
            let protection = DbSlashingProtection::new(SlashingDatabase::create(&database_path)?);
            if let Some(root) = &genesis_root {
                protection.pin_genesis_validators_root(root)?;
            }
            if !keys.is_empty() {
                protection.register_validators(&keys)?;
            }
            Ok(protection)
        })
        .await??;

        info!("Slashing protection database ready at {:?}", config.database_path);
        Ok(Self::new(Arc::new(protection), genesis_root))
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn SlashingProtection) -> bulwark_slashing::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let protection = Arc::clone(&self.protection);
        let value = tokio::task::spawn_blocking(move || f(protection.as_ref())).await??;
        Ok(value)
    }

    fn genesis_root(&self, supplied: Option<GenesisValidatorsRoot>) -> Result<GenesisValidatorsRoot> {
        supplied
            .or(self.default_genesis_validators_root)
            .ok_or(DaemonError::MissingGenesisValidatorsRoot)
    }

    async fn resolve(&self, public_key: PublicKey) -> Result<ValidatorId> {
        let key_hex = public_key.to_hex();
        match self.lookup(public_key).await? {
            Some(id) => Ok(id),
            None => {
                warn!("Request for unregistered validator {}", key_hex);
                Err(DaemonError::UnknownValidator(key_hex))
            }
        }
    }

    pub async fn register_validators(&self, public_keys: Vec<PublicKey>) -> Result<Vec<ValidatorId>> {
        self.run(move |p| p.register_validators(&public_keys)).await
    }

    pub async fn lookup(&self, public_key: PublicKey) -> Result<Option<ValidatorId>> {
        self.run(move |p| p.lookup(&public_key)).await
    }

    pub async fn may_sign_block(
        &self,
        public_key: PublicKey,
        slot: Slot,
        signing_root: SigningRoot,
        genesis_validators_root: Option<GenesisValidatorsRoot>,
    ) -> Result<SigningDecision> {
        let genesis = self.genesis_root(genesis_validators_root)?;
        let id = self.resolve(public_key).await?;
        self.run(move |p| p.may_sign_block(id, slot, &signing_root, &genesis))
            .await
    }

    pub async fn may_sign_attestation(
        &self,
        public_key: PublicKey,
        source_epoch: Epoch,
        target_epoch: Epoch,
        signing_root: SigningRoot,
        genesis_validators_root: Option<GenesisValidatorsRoot>,
    ) -> Result<SigningDecision> {
        let genesis = self.genesis_root(genesis_validators_root)?;
        let id = self.resolve(public_key).await?;
        self.run(move |p| {
            p.may_sign_attestation(id, source_epoch, target_epoch, &signing_root, &genesis)
        })
        .await
    }

    /// Prune one validator, or every registered validator when `public_key` is `None`
    pub async fn prune(
        &self,
        entries_to_keep: u64,
        public_key: Option<PublicKey>,
    ) -> Result<PruneSummary> {
        match public_key {
            Some(key) => {
                let id = self.resolve(key).await?;
                let outcome = self.run(move |p| p.prune(entries_to_keep, id)).await?;
                Ok(PruneSummary {
                    validators_pruned: 1,
                    validators_failed: 0,
                    blocks_deleted: outcome.blocks_deleted,
                    attestations_deleted: outcome.attestations_deleted,
                })
            }
            None => self.prune_all(entries_to_keep).await,
        }
    }

    pub async fn prune_all(&self, entries_to_keep: u64) -> Result<PruneSummary> {
        self.run(move |p| p.prune_all(entries_to_keep)).await
    }

    pub async fn import_json(&self, interchange_json: String) -> Result<ImportSummary> {
        self.run(move |p| p.import_data(&mut interchange_json.as_bytes()))
            .await
    }

    pub async fn export_json(&self) -> Result<String> {
        let bytes = self
            .run(|p| {
                let mut out = Vec::new();
                p.export_data(&mut out)?;
                Ok(out)
            })
            .await?;
        String::from_utf8(bytes).map_err(|e| DaemonError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::RefusalReason;

    fn service(genesis: Option<GenesisValidatorsRoot>) -> SlashingService {
        let protection = DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap());
        SlashingService::new(Arc::new(protection), genesis)
    }

    #[tokio::test]
    async fn test_unregistered_key_is_refused() {
        let service = service(Some(GenesisValidatorsRoot::new([1; 32])));
        let result = service
            .may_sign_block(
                PublicKey::from_hex("0x01").unwrap(),
                Slot::new(1),
                SigningRoot::new([1; 32]),
                None,
            )
            .await;
        assert!(matches!(result, Err(DaemonError::UnknownValidator(_))));
    }

    #[tokio::test]
    async fn test_genesis_root_falls_back_to_configured() {
        let service = service(Some(GenesisValidatorsRoot::new([1; 32])));
        let key = PublicKey::from_hex("0x01").unwrap();
        service.register_validators(vec![key.clone()]).await.unwrap();

        let decision = service
            .may_sign_block(key.clone(), Slot::new(5), SigningRoot::new([1; 32]), None)
            .await
            .unwrap();
        assert!(decision.is_allowed());

        let decision = service
            .may_sign_block(key, Slot::new(5), SigningRoot::new([2; 32]), None)
            .await
            .unwrap();
        assert_eq!(decision.reason(), Some(RefusalReason::DoubleProposal));
    }

    #[tokio::test]
    async fn test_missing_genesis_root_is_an_error() {
        let service = service(None);
        let result = service
            .may_sign_attestation(
                PublicKey::from_hex("0x01").unwrap(),
                Epoch::new(1),
                Epoch::new(2),
                SigningRoot::new([1; 32]),
                None,
            )
            .await;
        assert!(matches!(result, Err(DaemonError::MissingGenesisValidatorsRoot)));
    }
}
