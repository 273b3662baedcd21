//! Signing decisions returned by the slashing-protection engine
//!
//! A refusal is a normal answer, not an error: the caller must decline to
//! sign and should log the reason.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a request that may be signed is safe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Safe {
    /// Incoming data is safe from slashing, and is not a duplicate.
    Valid,
    /// The exact same data was approved before; signing it again is never slashable.
    SameData,
}

/// Why a request must not be signed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefusalReason {
    /// At or below the validator's low watermark
    TooOld,
    /// A different block was already signed at this slot
    DoubleProposal,
    /// A different attestation was already signed for this target epoch
    DoubleVote,
    /// The candidate attestation is surrounded by a previously signed one
    Surrounded,
    /// The candidate attestation surrounds a previously signed one
    Surrounds,
    /// Source epoch is greater than target epoch
    InvalidRange,
}

impl RefusalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefusalReason::TooOld => "TOO_OLD",
            RefusalReason::DoubleProposal => "DOUBLE_PROPOSAL",
            RefusalReason::DoubleVote => "DOUBLE_VOTE",
            RefusalReason::Surrounded => "SURROUNDED",
            RefusalReason::Surrounds => "SURROUNDS",
            RefusalReason::InvalidRange => "INVALID_RANGE",
        }
    }
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a block or attestation safety check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SigningDecision {
    Allowed(Safe),
    Refused(RefusalReason),
}

impl SigningDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, SigningDecision::Allowed(_))
    }

    /// Refusal reason, if the request was refused
    pub fn reason(&self) -> Option<RefusalReason> {
        match self {
            SigningDecision::Allowed(_) => None,
            SigningDecision::Refused(reason) => Some(*reason),
        }
    }

    /// Whether this was an idempotent replay of already-approved data
    pub fn is_replay(&self) -> bool {
        matches!(self, SigningDecision::Allowed(Safe::SameData))
    }
}

impl From<RefusalReason> for SigningDecision {
    fn from(reason: RefusalReason) -> Self {
        SigningDecision::Refused(reason)
    }
}
