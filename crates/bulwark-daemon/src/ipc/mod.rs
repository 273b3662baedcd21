//! IPC server for CLI and signer communication
//!
//! Newline-delimited JSON over a Unix domain socket.

mod client;
mod connection;
mod server;
mod types;
mod unix;

// Public API
pub use client::IpcClient;
pub use server::IpcServer;
pub use types::{IpcRequest, IpcResponse};
