//! CLI module — Clap argument parser, prompts, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use dialoguer::{Confirm, Input, Password};

use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::{InitOutcome, Vault, VaultManager, VaultPaths};

/// pm: a local encrypted password vault.
#[derive(Parser)]
#[command(
    name = "pm",
    about = "Encrypted password vault with automatic backups",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding data.db, data.backup.db and key.gob (default: next to the binary)
    #[arg(long, env = "PM_HOME", global = true)]
    pub dir: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Store a new password
    Add {
        /// Key or account name (prompted if omitted)
        key: Option<String>,
        /// Platform or category label
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Show the password stored under a key
    Query {
        /// Key or account name (prompted if omitted)
        key: Option<String>,
    },

    /// List all stored passwords
    List,

    /// List passwords whose platform contains the given text
    Pla {
        /// Platform text to search for (prompted if omitted)
        tag: Option<String>,
    },

    /// Change a stored password, its platform, or its key
    Update {
        /// Key or account name (prompted if omitted)
        key: Option<String>,
        /// Prompt for (or read from stdin) a new password
        #[arg(short, long)]
        secret: bool,
        /// New platform label
        #[arg(short, long)]
        tag: Option<String>,
        /// Rename the record to this key
        #[arg(short, long)]
        rename: Option<String>,
    },

    /// Delete a stored password
    Del {
        /// Key or account name (prompted if omitted)
        key: Option<String>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Copy the vault to the backup file now
    Backup {
        /// Re-open the backup afterwards and check it matches the vault
        #[arg(long)]
        verify: bool,
    },

    /// Overwrite the vault with the backup file
    Restore {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Build a `VaultManager` for the base directory chosen on the command line.
pub fn manager(cli: &Cli) -> Result<VaultManager> {
    let paths = VaultPaths::resolve(cli.dir.as_deref())?;
    let settings = Settings::load(&paths.base_dir)?;
    Ok(VaultManager::new(paths).with_settings(&settings))
}

/// Bring the vault up, asking before a restore, and report what happened.
pub fn open_vault(cli: &Cli) -> Result<(VaultManager, Vault)> {
    let manager = manager(cli)?;

    let confirm = || {
        output::warning("Vault file not found, but a backup exists.");
        Confirm::new()
            .with_prompt("Do you want to restore the data?")
            .default(false)
            .interact()
            .unwrap_or(false)
    };
    let vault = manager.initialize(&confirm)?;

    match vault.outcome() {
        InitOutcome::Created => {
            output::success(&format!(
                "Initialized vault and backup in {}",
                manager.paths().base_dir.display()
            ));
        }
        InitOutcome::Restored => output::success("Data restored successfully."),
        InitOutcome::Opened {
            last_backup: Some(ts),
            backed_up,
        } => {
            output::last_backup(ts);
            if backed_up {
                output::tip("Backup interval elapsed, backup refreshed.");
            }
        }
        InitOutcome::Opened { .. } => {}
    }

    Ok((manager, vault))
}

/// Run the post-change backup the same way for every mutating command.
pub fn backup_after_change(manager: &VaultManager) -> Result<()> {
    manager.backup()?;
    output::info("Backup updated.");
    Ok(())
}

/// Use `value` if given, otherwise prompt until something non-empty is entered.
pub fn require_arg(value: Option<&str>, prompt: &str) -> Result<String> {
    if let Some(v) = value {
        if v.is_empty() {
            return Err(VaultError::MissingArgument(prompt.to_string()));
        }
        return Ok(v.to_string());
    }

    Input::<String>::new()
        .with_prompt(prompt)
        .validate_with(|s: &String| {
            if s.trim().is_empty() {
                Err("Please do not leave the input empty.")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map(|s| s.trim().to_string())
        .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))
}

/// Prompt for optional text; an empty answer means "skip".
pub fn optional_input(prompt: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map(|s| s.trim().to_string())
        .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))
}

/// Read a secret from piped stdin, or from a hidden prompt on a terminal.
///
/// With `allow_empty`, an empty answer is returned as-is (meaning "keep
/// the current value" to `update`).
pub fn read_secret(prompt: &str, allow_empty: bool) -> Result<String> {
    if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let secret = buf.trim_end_matches(['\r', '\n']).to_string();
        if secret.is_empty() && !allow_empty {
            return Err(VaultError::SecretEmpty);
        }
        return Ok(secret);
    }

    loop {
        let secret = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;

        if !secret.is_empty() || allow_empty {
            return Ok(secret);
        }
        output::warning("Please do not leave the input empty.");
    }
}
