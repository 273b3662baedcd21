//! Client for communicating with the Bulwark daemon

use std::path::PathBuf;

use bulwark_core::SigningDecision;
use bulwark_daemon::ipc::{IpcClient, IpcRequest, IpcResponse};

/// Client for the Bulwark daemon
pub struct BulwarkClient {
    inner: IpcClient,
}

/// Error type for client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("Daemon error: {0}")]
    DaemonError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validator {0} is not registered")]
    UnknownValidator(String),

    #[error("Slashing protection error: {0}")]
    Slashing(#[from] bulwark_slashing::SlashingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    fn from_daemon_error(e: bulwark_daemon::DaemonError) -> Self {
        match &e {
            bulwark_daemon::DaemonError::Ipc(msg) if msg.contains("not running") => {
                ClientError::DaemonNotRunning
            }
            _ => ClientError::DaemonError(e.to_string()),
        }
    }
}

impl From<bulwark_core::Error> for ClientError {
    fn from(e: bulwark_core::Error) -> Self {
        ClientError::InvalidInput(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl BulwarkClient {
    /// Create a new client with the daemon's default socket path
    pub fn new() -> Self {
        Self::with_socket_path(bulwark_daemon::DaemonConfig::default().ipc_socket_path)
    }

    /// Create a new client with a custom socket path
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            inner: IpcClient::new(socket_path),
        }
    }

    async fn request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        match self
            .inner
            .request(request)
            .await
            .map_err(ClientError::from_daemon_error)?
        {
            IpcResponse::Error { message } => Err(ClientError::RequestFailed(message)),
            response => Ok(response),
        }
    }

    /// Check if the daemon is running, returning its version
    pub async fn ping(&self) -> Result<String> {
        match self.request(&IpcRequest::Ping).await? {
            IpcResponse::Pong { version } => Ok(version),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Ask the daemon whether a block may be signed
    pub async fn check_block(
        &self,
        public_key: &str,
        slot: u64,
        signing_root: &str,
        genesis_validators_root: Option<&str>,
    ) -> Result<SigningDecision> {
        let request = IpcRequest::MaySignBlock {
            public_key: public_key.to_string(),
            slot,
            signing_root: signing_root.to_string(),
            genesis_validators_root: genesis_validators_root.map(str::to_string),
        };
        match self.request(&request).await? {
            IpcResponse::Decision { decision } => Ok(decision),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Ask the daemon whether an attestation may be signed
    pub async fn check_attestation(
        &self,
        public_key: &str,
        source_epoch: u64,
        target_epoch: u64,
        signing_root: &str,
        genesis_validators_root: Option<&str>,
    ) -> Result<SigningDecision> {
        let request = IpcRequest::MaySignAttestation {
            public_key: public_key.to_string(),
            source_epoch,
            target_epoch,
            signing_root: signing_root.to_string(),
            genesis_validators_root: genesis_validators_root.map(str::to_string),
        };
        match self.request(&request).await? {
            IpcResponse::Decision { decision } => Ok(decision),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

impl Default for BulwarkClient {
    fn default() -> Self {
        Self::new()
    }
}
