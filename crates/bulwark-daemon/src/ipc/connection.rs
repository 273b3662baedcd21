//! Transport seam between the request loop and the socket type
//!
//! The server and client are written against these traits; `unix.rs`
//! provides the only implementation.

use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Listening endpoint that signers and the CLI connect to
#[async_trait]
pub trait IpcTransport: Send + Sync {
    /// One accepted signer or CLI connection
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Claim the endpoint at `path`, replacing one left by a dead daemon
    async fn bind(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Wait for the next connection
    async fn accept(&self) -> Result<Self::Stream>;

    /// Remove the endpoint so clients see the daemon as stopped
    async fn cleanup(&self) -> Result<()>;
}

/// Dialer used by `IpcClient`
#[async_trait]
pub trait IpcClientTransport: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Connect to a running daemon; a missing endpoint reports "Daemon not running"
    async fn connect(path: &Path) -> Result<Self::Stream>;
}

pub use super::unix::{UnixIpcClient as PlatformClient, UnixIpcTransport as PlatformTransport};
