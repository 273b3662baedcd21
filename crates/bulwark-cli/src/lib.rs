//! Bulwark CLI - Command-line tools for slashing protection
//!
//! Offline commands operate on the SQLite database directly; daemon commands
//! talk to a running `bulwark-daemon` over its IPC socket.

pub mod client;
pub mod commands;

pub use client::{BulwarkClient, ClientError};
pub use commands::*;
