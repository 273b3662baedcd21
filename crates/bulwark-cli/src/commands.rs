//! CLI command implementations
//!
//! `db` and `validators` commands open the database directly and must not run
//! while a daemon holds the same file for long transactions. `daemon`
//! commands go through the IPC socket.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use bulwark_core::{PublicKey, SigningDecision, ValidatorId};
use bulwark_slashing::{
    DbSlashingProtection, ImportSummary, PruneSummary, SlashingDatabase, SlashingProtection,
};

use crate::client::{BulwarkClient, ClientError, Result};

/// Bulwark CLI - Slashing protection for validator signers
#[derive(Parser)]
#[command(name = "bulwark")]
#[command(about = "Slashing-protection database and daemon tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the slashing-protection database
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to daemon socket
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Database maintenance commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Validator registration commands
    #[command(subcommand)]
    Validators(ValidatorCommands),

    /// Commands answered by a running daemon
    #[command(subcommand)]
    Daemon(DaemonCommands),
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Create the database or bring its schema up to date
    Migrate,

    /// Import an EIP-3076 interchange file
    Import {
        /// Interchange JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export all signing history as an EIP-3076 interchange file
    Export {
        /// Output file, defaults to a timestamped name in the current directory
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete old signing history, raising the low watermarks
    Prune {
        /// Blocks and attestations to keep per validator
        #[arg(short, long)]
        keep: u64,

        /// Only prune this validator
        #[arg(long)]
        public_key: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ValidatorCommands {
    /// Register validator public keys
    Register {
        /// Hex-encoded public keys
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// List registered validators
    List,
}

#[derive(Subcommand)]
pub enum DaemonCommands {
    /// Check daemon status
    Ping,

    /// Ask whether a block may be signed
    CheckBlock {
        #[arg(long)]
        public_key: String,

        #[arg(long)]
        slot: u64,

        #[arg(long)]
        signing_root: String,

        /// Defaults to the daemon's configured root
        #[arg(long)]
        genesis_validators_root: Option<String>,
    },

    /// Ask whether an attestation may be signed
    CheckAttestation {
        #[arg(long)]
        public_key: String,

        #[arg(long)]
        source_epoch: u64,

        #[arg(long)]
        target_epoch: u64,

        #[arg(long)]
        signing_root: String,

        #[arg(long)]
        genesis_validators_root: Option<String>,
    },
}

/// Run the CLI
pub async fn run(cli: Cli) -> Result<()> {
    let defaults = bulwark_daemon::DaemonConfig::default();
    let database = cli.database.unwrap_or(defaults.database_path);
    let socket = cli.socket.unwrap_or(defaults.ipc_socket_path);

    match cli.command {
        Commands::Db(cmd) => handle_db_command(&database, cmd),
        Commands::Validators(cmd) => handle_validator_command(&database, cmd),
        Commands::Daemon(cmd) => {
            handle_daemon_command(BulwarkClient::with_socket_path(socket), cmd).await
        }
    }
}

fn handle_db_command(database: &Path, cmd: DbCommands) -> Result<()> {
    match cmd {
        DbCommands::Migrate => {
            migrate(database)?;
            println!("✓ Database ready at {}", database.display());
        }

        DbCommands::Import { file } => {
            let summary = import_file(database, &file)?;
            println!("✓ Imported {}", file.display());
            println!("  Validators: {}", summary.validators);
            println!(
                "  Blocks: {} imported, {} already present",
                summary.blocks_imported, summary.blocks_skipped
            );
            println!(
                "  Attestations: {} imported, {} already present",
                summary.attestations_imported, summary.attestations_skipped
            );
            if summary.conflicts > 0 {
                println!(
                    "\n⚠️  WARNING: {} conflicting records imported; watermarks were raised past them",
                    summary.conflicts
                );
            }
        }

        DbCommands::Export { file } => {
            let file = file.unwrap_or_else(default_export_path);
            export_file(database, &file)?;
            println!("✓ Exported slashing protection data to {}", file.display());
        }

        DbCommands::Prune { keep, public_key } => {
            let summary = prune(database, keep, public_key.as_deref())?;
            println!("✓ Pruned {} validator(s)", summary.validators_pruned);
            println!("  Blocks deleted: {}", summary.blocks_deleted);
            println!("  Attestations deleted: {}", summary.attestations_deleted);
            if summary.validators_failed > 0 {
                println!("\n⚠️  WARNING: {} validator(s) failed", summary.validators_failed);
            }
        }
    }

    Ok(())
}

fn handle_validator_command(database: &Path, cmd: ValidatorCommands) -> Result<()> {
    match cmd {
        ValidatorCommands::Register { keys } => {
            let ids = register(database, &keys)?;
            for (key, id) in keys.iter().zip(&ids) {
                println!("{} -> {}", key, id);
            }
        }

        ValidatorCommands::List => {
            let protection = open(database)?;
            let validators = protection
                .database()
                .with_transaction(|tx| bulwark_slashing::dao::validators::all(tx))?;
            if validators.is_empty() {
                println!("No validators registered");
            }
            for (id, key) in validators {
                println!("{:>6}  {}", id.as_i64(), key);
            }
        }
    }

    Ok(())
}

async fn handle_daemon_command(client: BulwarkClient, cmd: DaemonCommands) -> Result<()> {
    match cmd {
        DaemonCommands::Ping => match client.ping().await {
            Ok(version) => {
                println!("Bulwark daemon v{} is running", version);
            }
            Err(ClientError::DaemonNotRunning) => {
                println!("Bulwark daemon is not running");
                println!("Start it with: bulwark-daemon");
                return Err(ClientError::DaemonNotRunning);
            }
            Err(e) => return Err(e),
        },

        DaemonCommands::CheckBlock {
            public_key,
            slot,
            signing_root,
            genesis_validators_root,
        } => {
            let decision = client
                .check_block(
                    &public_key,
                    slot,
                    &signing_root,
                    genesis_validators_root.as_deref(),
                )
                .await?;
            print_decision(&decision);
        }

        DaemonCommands::CheckAttestation {
            public_key,
            source_epoch,
            target_epoch,
            signing_root,
            genesis_validators_root,
        } => {
            let decision = client
                .check_attestation(
                    &public_key,
                    source_epoch,
                    target_epoch,
                    &signing_root,
                    genesis_validators_root.as_deref(),
                )
                .await?;
            print_decision(&decision);
        }
    }

    Ok(())
}

fn print_decision(decision: &SigningDecision) {
    match decision {
        SigningDecision::Allowed(safe) => println!("✓ Safe to sign ({:?})", safe),
        SigningDecision::Refused(reason) => println!("✗ Refused: {}", reason),
    }
}

fn open(database: &Path) -> Result<DbSlashingProtection> {
    Ok(DbSlashingProtection::new(SlashingDatabase::open(database)?))
}

fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "slashing-protection-{}.json",
        chrono::Utc::now().format("%Y%m%dT%H%M%SZ")
    ))
}

/// Create the database if needed and verify its schema version
pub fn migrate(database: &Path) -> Result<()> {
    SlashingDatabase::create(database)?;
    info!("Database at {:?} is at the expected version", database);
    Ok(())
}

/// Import an interchange file into an existing database
pub fn import_file(database: &Path, file: &Path) -> Result<ImportSummary> {
    let protection = open(database)?;
    let mut reader = BufReader::new(File::open(file)?);
    Ok(protection.import_data(&mut reader)?)
}

/// Export the database to an interchange file
pub fn export_file(database: &Path, file: &Path) -> Result<()> {
    let protection = open(database)?;

    // Render first so a failed export leaves no partial file behind
    let mut buffer = Vec::new();
    protection.export_data(&mut buffer)?;

    let mut writer = BufWriter::new(File::create(file)?);
    writer.write_all(&buffer)?;
    writer.flush()?;
    Ok(())
}

/// Prune one validator, or every registered validator when `public_key` is `None`
pub fn prune(database: &Path, entries_to_keep: u64, public_key: Option<&str>) -> Result<PruneSummary> {
    let protection = open(database)?;

    match public_key {
        Some(key) => {
            let key = PublicKey::from_hex(key)?;
            let id = protection
                .lookup(&key)?
                .ok_or_else(|| ClientError::UnknownValidator(key.to_hex()))?;
            let outcome = protection.prune(entries_to_keep, id)?;
            Ok(PruneSummary {
                validators_pruned: 1,
                validators_failed: 0,
                blocks_deleted: outcome.blocks_deleted,
                attestations_deleted: outcome.attestations_deleted,
            })
        }
        None => Ok(protection.prune_all(entries_to_keep)?),
    }
}

/// Register public keys, returning their ids in input order
pub fn register(database: &Path, keys: &[String]) -> Result<Vec<ValidatorId>> {
    let keys = keys
        .iter()
        .map(|key| PublicKey::from_hex(key))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let protection = open(database)?;
    Ok(protection.register_validators(&keys)?)
}
