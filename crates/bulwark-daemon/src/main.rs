//! Bulwark Daemon - Main entry point
//!
//! The daemon owns the slashing-protection database and answers signing
//! checks from local signers over IPC.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bulwark_daemon::{DaemonConfig, IpcServer, PruningScheduler, SlashingService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bulwark_daemon=info,bulwark_slashing=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Bulwark daemon v{}", env!("CARGO_PKG_VERSION"));

    // Load or create config
    let config_path = std::env::var("BULWARK_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::config_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("/etc"))
                .join("bulwark")
                .join("daemon.json")
        });

    let config = if config_path.exists() {
        DaemonConfig::load(&config_path)?
    } else {
        let config = DaemonConfig::default();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config.save(&config_path)?;
        info!("Created default config at {:?}", config_path);
        config
    };

    config.ensure_directories()?;

    let service = SlashingService::from_config(&config).await?;

    let pruning_handle = if config.pruning.enabled {
        let scheduler = PruningScheduler::new(service.clone(), config.pruning.clone());
        Some(tokio::spawn(scheduler.run()))
    } else {
        info!("Scheduled pruning disabled");
        None
    };

    let ipc_server = IpcServer::new(config.ipc_socket_path.clone(), service);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let mut ipc_handle = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = ipc_server.run_until(shutdown).await {
            error!("IPC server error: {}", e);
        }
    });

    info!("Daemon started successfully");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = (&mut ipc_handle).await;
        }
        _ = &mut ipc_handle => {
            error!("IPC server exited unexpectedly");
        }
    }

    if let Some(handle) = pruning_handle {
        handle.abort();
    }

    info!("Daemon shutting down");

    Ok(())
}

/// Helper module for dirs functionality
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
    }
}
