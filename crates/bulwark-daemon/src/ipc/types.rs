//! IPC protocol types
//!
//! Byte fields travel as hex strings (`0x` optional), slots and epochs as
//! JSON numbers.

use serde::{Deserialize, Serialize};

use bulwark_core::{GenesisValidatorsRoot, PublicKey, SigningDecision, SigningRoot};
use bulwark_slashing::{ImportSummary, PruneSummary};

/// IPC request types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcRequest {
    /// Check if daemon is running
    Ping,

    /// Register validator public keys
    RegisterValidators { public_keys: Vec<String> },

    /// Resolve a public key to its validator id
    Lookup { public_key: String },

    /// Ask whether a block may be signed
    MaySignBlock {
        public_key: String,
        slot: u64,
        signing_root: String,
        /// Falls back to the configured root when absent
        #[serde(default)]
        genesis_validators_root: Option<String>,
    },

    /// Ask whether an attestation may be signed
    MaySignAttestation {
        public_key: String,
        source_epoch: u64,
        target_epoch: u64,
        signing_root: String,
        #[serde(default)]
        genesis_validators_root: Option<String>,
    },

    /// Prune one validator, or all when `public_key` is absent
    Prune {
        entries_to_keep: u64,
        #[serde(default)]
        public_key: Option<String>,
    },

    /// Import an interchange document
    Import { interchange_json: String },

    /// Export all history as an interchange document
    Export,
}

/// IPC response types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcResponse {
    /// Pong response
    Pong { version: String },

    /// Error response
    Error { message: String },

    /// Ids of registered validators, in request order
    Registered { validator_ids: Vec<i64> },

    /// Lookup result
    Validator { validator_id: Option<i64> },

    /// Signing decision
    Decision { decision: SigningDecision },

    /// Pruning result
    Pruned { summary: PruneSummary },

    /// Import result
    Imported { summary: ImportSummary },

    /// Exported interchange document
    Exported { interchange_json: String },
}

impl IpcResponse {
    pub fn error(message: impl Into<String>) -> Self {
        IpcResponse::Error {
            message: message.into(),
        }
    }
}

pub(crate) fn parse_public_key(s: &str) -> Result<PublicKey, String> {
    PublicKey::from_hex(s).map_err(|e| format!("Invalid public key: {}", e))
}

pub(crate) fn parse_signing_root(s: &str) -> Result<SigningRoot, String> {
    SigningRoot::from_hex(s).map_err(|e| format!("Invalid signing root: {}", e))
}

pub(crate) fn parse_genesis_root(s: Option<&str>) -> Result<Option<GenesisValidatorsRoot>, String> {
    s.map(|root| {
        GenesisValidatorsRoot::from_hex(root)
            .map_err(|e| format!("Invalid genesis validators root: {}", e))
    })
    .transpose()
}
