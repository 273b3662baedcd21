use rusqlite::Connection;

use bulwark_core::{InterchangeAttestation, InterchangeBlock, InterchangeDocument, ValidatorHistory};

use crate::dao::{metadata, signed_attestations, signed_blocks, validators};
use crate::error::{Result, SlashingError};

/// Build an interchange document from the store
///
/// Validators are ordered by id, blocks by slot and attestations by target
/// then source epoch.
pub fn export_document(conn: &Connection) -> Result<InterchangeDocument> {
    let genesis_validators_root = metadata::find_genesis_validators_root(conn)?
        .ok_or(SlashingError::MissingGenesisValidatorsRoot)?;

    let mut data = Vec::new();
    for (validator_id, pubkey) in validators::all(conn)? {
        let signed_blocks = signed_blocks::for_validator(conn, validator_id)?
            .into_iter()
            .map(|block| InterchangeBlock {
                slot: block.slot,
                signing_root: block.signing_root,
            })
            .collect();

        let signed_attestations = signed_attestations::for_validator(conn, validator_id)?
            .into_iter()
            .map(|attestation| InterchangeAttestation {
                source_epoch: attestation.source_epoch,
                target_epoch: attestation.target_epoch,
                signing_root: attestation.signing_root,
            })
            .collect();

        data.push(ValidatorHistory {
            pubkey,
            signed_blocks,
            signed_attestations,
        });
    }

    Ok(InterchangeDocument::new(genesis_validators_root, data))
}
