//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use bulwark_core::{GenesisValidatorsRoot, PublicKey};

use crate::error::{DaemonError, Result};

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// SQLite slashing-protection database
    pub database_path: PathBuf,

    /// Unix socket path for IPC
    pub ipc_socket_path: PathBuf,

    /// Hex public keys registered at startup
    #[serde(default)]
    pub validators: Vec<String>,

    /// Pins the network before the first request when set
    #[serde(default)]
    pub genesis_validators_root: Option<String>,

    #[serde(default)]
    pub pruning: PruningConfig,
}

/// Periodic pruning of signing history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruningConfig {
    pub enabled: bool,

    /// Blocks and attestations kept per validator
    pub entries_to_keep: u64,

    /// Seconds between pruning passes
    pub interval_secs: u64,

    /// Run one pass immediately at startup
    pub at_boot: bool,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // 250 epochs of 32 slots
            entries_to_keep: 8000,
            interval_secs: 24 * 60 * 60,
            at_boot: false,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            database_path: Self::default_database_path(),
            ipc_socket_path: Self::default_ipc_path(),
            validators: Vec::new(),
            genesis_validators_root: None,
            pruning: PruningConfig::default(),
        }
    }
}

impl DaemonConfig {
    fn default_ipc_path() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, fallback to /tmp
        std::env::var_os("XDG_RUNTIME_DIR")
            .map(|dir| PathBuf::from(dir).join("bulwark.sock"))
            .unwrap_or_else(|| PathBuf::from("/tmp/bulwark.sock"))
    }

    fn default_database_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/var/lib"))
            .join("bulwark")
            .join("slashing-protection.db")
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create directories if they don't exist
    pub fn ensure_directories(&self) -> Result<()> {
        for path in [&self.database_path, &self.ipc_socket_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pruning.entries_to_keep == 0 {
            return Err(DaemonError::Config(
                "pruning.entries_to_keep must be at least 1".to_string(),
            ));
        }
        if self.pruning.interval_secs == 0 {
            return Err(DaemonError::Config(
                "pruning.interval_secs must be at least 1".to_string(),
            ));
        }
        self.validator_keys()?;
        self.genesis_root()?;
        Ok(())
    }

    /// Parsed validator public keys
    pub fn validator_keys(&self) -> Result<Vec<PublicKey>> {
        self.validators
            .iter()
            .map(|key| {
                PublicKey::from_hex(key)
                    .map_err(|e| DaemonError::Config(format!("Invalid validator key {}: {}", key, e)))
            })
            .collect()
    }

    /// Parsed genesis validators root, if configured
    pub fn genesis_root(&self) -> Result<Option<GenesisValidatorsRoot>> {
        self.genesis_validators_root
            .as_deref()
            .map(|root| {
                GenesisValidatorsRoot::from_hex(root).map_err(|e| {
                    DaemonError::Config(format!("Invalid genesis validators root: {}", e))
                })
            })
            .transpose()
    }
}

/// Helper module for dirs crate functionality
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("daemon.json");

        let config = DaemonConfig {
            database_path: temp_dir.path().join("db.sqlite"),
            ipc_socket_path: temp_dir.path().join("bulwark.sock"),
            validators: vec!["0x01".to_string()],
            genesis_validators_root: Some(format!("0x{}", "ab".repeat(32))),
            pruning: PruningConfig {
                enabled: true,
                entries_to_keep: 5,
                interval_secs: 60,
                at_boot: true,
            },
        };
        config.save(&path).unwrap();

        assert_eq!(DaemonConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_optional_fields_default() {
        let config: DaemonConfig = serde_json::from_str(
            r#"{"database_path": "/tmp/a.db", "ipc_socket_path": "/tmp/a.sock"}"#,
        )
        .unwrap();

        assert!(config.validators.is_empty());
        assert_eq!(config.genesis_validators_root, None);
        assert!(!config.pruning.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DaemonConfig::default();
        config.pruning.entries_to_keep = 0;
        assert!(matches!(config.validate(), Err(DaemonError::Config(_))));

        let mut config = DaemonConfig::default();
        config.pruning.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DaemonConfig::default();
        config.validators = vec!["0xzz".to_string()];
        assert!(config.validate().is_err());

        let mut config = DaemonConfig::default();
        config.genesis_validators_root = Some("0x0102".to_string());
        assert!(config.validate().is_err());
    }
}
