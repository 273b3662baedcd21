//! Bulwark Core - Shared types for validator slashing protection
//!
//! This crate provides the foundational types used by the slashing-protection
//! engine, the signer daemon and the CLI:
//! - Validator identity, signing roots and slot/epoch newtypes
//! - Signing decisions and refusal reasons
//! - The EIP-3076 interchange document model

pub mod decision;
pub mod error;
pub mod interchange;
pub mod types;

pub use decision::{RefusalReason, Safe, SigningDecision};
pub use error::{Error, Result};
pub use interchange::{
    InterchangeAttestation, InterchangeBlock, InterchangeDocument, InterchangeMetadata,
    ValidatorHistory, INTERCHANGE_FORMAT_VERSION,
};
pub use types::{Epoch, GenesisValidatorsRoot, PublicKey, SigningRoot, Slot, ValidatorId};
