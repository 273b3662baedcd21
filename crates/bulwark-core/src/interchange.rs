//! Slashing-protection interchange format (EIP-3076, version 5)
//!
//! The document is the only external file format of the engine. Numeric
//! fields are decimal strings and byte fields `0x`-prefixed hex on output;
//! on input bare JSON numbers and unprefixed hex are tolerated.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::types::{Epoch, GenesisValidatorsRoot, PublicKey, SigningRoot, Slot};

/// The only supported `interchange_format_version`
pub const INTERCHANGE_FORMAT_VERSION: u32 = 5;

/// A complete interchange document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeDocument {
    pub metadata: InterchangeMetadata,

    /// Per-validator history; absent, `null` and `[]` all mean "nothing to import"
    #[serde(default)]
    pub data: Option<Vec<ValidatorHistory>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeMetadata {
    #[serde(with = "format_version")]
    pub interchange_format_version: u32,

    pub genesis_validators_root: GenesisValidatorsRoot,
}

/// Signing history of a single validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorHistory {
    pub pubkey: PublicKey,

    #[serde(default)]
    pub signed_blocks: Vec<InterchangeBlock>,

    #[serde(default)]
    pub signed_attestations: Vec<InterchangeAttestation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeBlock {
    pub slot: Slot,
    pub signing_root: SigningRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeAttestation {
    pub source_epoch: Epoch,
    pub target_epoch: Epoch,
    pub signing_root: SigningRoot,
}

impl InterchangeDocument {
    /// Create a version-5 document
    pub fn new(genesis_validators_root: GenesisValidatorsRoot, data: Vec<ValidatorHistory>) -> Self {
        Self {
            metadata: InterchangeMetadata {
                interchange_format_version: INTERCHANGE_FORMAT_VERSION,
                genesis_validators_root,
            },
            data: Some(data),
        }
    }

    /// Parse a document and check its format version
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: Self = serde_json::from_reader(reader)?;
        document.check_version()?;
        Ok(document)
    }

    /// Parse a document from a string and check its format version
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_reader(json.as_bytes())
    }

    pub fn check_version(&self) -> Result<()> {
        let found = self.metadata.interchange_format_version;
        if found != INTERCHANGE_FORMAT_VERSION {
            return Err(Error::UnsupportedFormatVersion {
                expected: INTERCHANGE_FORMAT_VERSION,
                found,
            });
        }
        Ok(())
    }

    /// Validator entries, treating an absent `data` field as empty
    pub fn validators(&self) -> &[ValidatorHistory] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn to_writer_pretty<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Format version is written as `"5"` but older producers emit a bare number
mod format_version {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u32),
    }

    pub fn serialize<S>(version: &u32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
            StringOrNumber::Number(n) => Ok(n),
        }
    }
}
