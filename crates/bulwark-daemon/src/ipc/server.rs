//! IPC server implementation

use std::future::Future;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use bulwark_core::{Epoch, Slot};

use crate::error::Result;
use crate::service::SlashingService;

use super::connection::{IpcTransport, PlatformTransport};
use super::types::{
    parse_genesis_root, parse_public_key, parse_signing_root, IpcRequest, IpcResponse,
};

/// IPC server
pub struct IpcServer {
    /// Socket path
    socket_path: PathBuf,

    service: SlashingService,
}

impl IpcServer {
    /// Create a new IPC server
    pub fn new(socket_path: PathBuf, service: SlashingService) -> Self {
        Self {
            socket_path,
            service,
        }
    }

    /// Serve until the process exits
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` completes, then remove the socket
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let transport = PlatformTransport::bind(&self.socket_path).await?;
        tokio::pin!(shutdown);

        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("IPC server stopping");
                    transport.cleanup().await?;
                    return Ok(());
                }
                accepted = transport.accept() => match accepted {
                    Ok(stream) => {
                        let service = self.service.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, service).await {
                                error!("Connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                },
            }
        }
    }
}

/// Handle a single IPC connection
async fn handle_connection<S>(stream: S, service: SlashingService) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let request: IpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let response = IpcResponse::error(format!("Invalid request: {}", e));
                send_response(&mut writer, &response).await?;
                line.clear();
                continue;
            }
        };

        debug!("Received IPC request: {:?}", request);

        let response = handle_request(request, &service).await;

        send_response(&mut writer, &response).await?;
        line.clear();
    }

    Ok(())
}

/// Handle a single request
async fn handle_request(request: IpcRequest, service: &SlashingService) -> IpcResponse {
    match request {
        IpcRequest::Ping => IpcResponse::Pong {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },

        IpcRequest::RegisterValidators { public_keys } => {
            let keys = match public_keys
                .iter()
                .map(|key| parse_public_key(key))
                .collect::<std::result::Result<Vec<_>, _>>()
            {
                Ok(keys) => keys,
                Err(message) => return IpcResponse::Error { message },
            };

            match service.register_validators(keys).await {
                Ok(ids) => IpcResponse::Registered {
                    validator_ids: ids.iter().map(|id| id.as_i64()).collect(),
                },
                Err(e) => IpcResponse::error(format!("Registration failed: {}", e)),
            }
        }

        IpcRequest::Lookup { public_key } => {
            let key = match parse_public_key(&public_key) {
                Ok(key) => key,
                Err(message) => return IpcResponse::Error { message },
            };

            match service.lookup(key).await {
                Ok(id) => IpcResponse::Validator {
                    validator_id: id.map(|id| id.as_i64()),
                },
                Err(e) => IpcResponse::error(format!("Lookup failed: {}", e)),
            }
        }

        IpcRequest::MaySignBlock {
            public_key,
            slot,
            signing_root,
            genesis_validators_root,
        } => {
            let parsed = parse_public_key(&public_key).and_then(|key| {
                Ok((
                    key,
                    parse_signing_root(&signing_root)?,
                    parse_genesis_root(genesis_validators_root.as_deref())?,
                ))
            });
            let (key, root, genesis) = match parsed {
                Ok(parsed) => parsed,
                Err(message) => return IpcResponse::Error { message },
            };

            match service
                .may_sign_block(key, Slot::new(slot), root, genesis)
                .await
            {
                Ok(decision) => IpcResponse::Decision { decision },
                Err(e) => IpcResponse::error(format!("Block check failed: {}", e)),
            }
        }

        IpcRequest::MaySignAttestation {
            public_key,
            source_epoch,
            target_epoch,
            signing_root,
            genesis_validators_root,
        } => {
            let parsed = parse_public_key(&public_key).and_then(|key| {
                Ok((
                    key,
                    parse_signing_root(&signing_root)?,
                    parse_genesis_root(genesis_validators_root.as_deref())?,
                ))
            });
            let (key, root, genesis) = match parsed {
                Ok(parsed) => parsed,
                Err(message) => return IpcResponse::Error { message },
            };

            match service
                .may_sign_attestation(
                    key,
                    Epoch::new(source_epoch),
                    Epoch::new(target_epoch),
                    root,
                    genesis,
                )
                .await
            {
                Ok(decision) => IpcResponse::Decision { decision },
                Err(e) => IpcResponse::error(format!("Attestation check failed: {}", e)),
            }
        }

        IpcRequest::Prune {
            entries_to_keep,
            public_key,
        } => {
            let key = match public_key.as_deref().map(parse_public_key).transpose() {
                Ok(key) => key,
                Err(message) => return IpcResponse::Error { message },
            };

            match service.prune(entries_to_keep, key).await {
                Ok(summary) => IpcResponse::Pruned { summary },
                Err(e) => IpcResponse::error(format!("Pruning failed: {}", e)),
            }
        }

        IpcRequest::Import { interchange_json } => {
            match service.import_json(interchange_json).await {
                Ok(summary) => IpcResponse::Imported { summary },
                Err(e) => IpcResponse::error(format!("Import failed: {}", e)),
            }
        }

        IpcRequest::Export => match service.export_json().await {
            Ok(interchange_json) => IpcResponse::Exported { interchange_json },
            Err(e) => IpcResponse::error(format!("Export failed: {}", e)),
        },
    }
}

/// Send a response over the socket
async fn send_response<W>(writer: &mut W, response: &IpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
