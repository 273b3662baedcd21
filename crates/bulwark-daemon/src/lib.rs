//! Bulwark Daemon - Long-running slashing-protection service
//!
//! This crate provides:
//! - JSON configuration with startup validator registration
//! - An async service over the slashing-protection engine
//! - A periodic pruning scheduler
//! - IPC server for CLI and signer communication

pub mod config;
pub mod error;
pub mod ipc;
pub mod pruning;
pub mod service;

pub use config::{DaemonConfig, PruningConfig};
pub use error::{DaemonError, Result};
pub use ipc::{IpcClient, IpcRequest, IpcResponse, IpcServer};
pub use pruning::PruningScheduler;
pub use service::SlashingService;
