//! Error types for the Bulwark core library

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Public key must not be empty")]
    EmptyPublicKey,

    #[error("Invalid unsigned integer: {0}")]
    InvalidNumber(String),

    #[error("Expecting an interchange_format_version of {expected}, found {found}")]
    UnsupportedFormatVersion { expected: u32, found: u32 },

    #[error("Malformed interchange document: {0}")]
    MalformedInterchange(#[from] serde_json::Error),
}
