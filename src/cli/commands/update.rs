//! `pm update` — change a stored password, its platform, or its key.

use std::io::{self, IsTerminal};

use crate::cli::output;
use crate::cli::{backup_after_change, open_vault, optional_input, read_secret, require_arg, Cli};
use crate::errors::{Result, VaultError};

/// Fields to change.  Empty strings mean "keep the current value".
#[derive(Debug, Default, PartialEq, Eq)]
struct Changes {
    secret: String,
    tag: String,
    key: String,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.secret.is_empty() && self.tag.is_empty() && self.key.is_empty()
    }
}

/// Execute the `update` command.
pub fn execute(
    cli: &Cli,
    key: Option<&str>,
    secret: bool,
    tag: Option<&str>,
    rename: Option<&str>,
) -> Result<()> {
    let key = require_arg(key, "Key")?;

    let flags_given = secret || tag.is_some() || rename.is_some();
    let changes = if flags_given {
        Changes {
            secret: if secret {
                read_secret(&format!("New password for {key}"), false)?
            } else {
                String::new()
            },
            tag: tag.unwrap_or_default().to_string(),
            key: rename.unwrap_or_default().to_string(),
        }
    } else if io::stdin().is_terminal() {
        output::tip("Leave a field empty to keep its current value.");
        Changes {
            secret: read_secret("New password", true)?,
            tag: optional_input("New platform")?,
            key: optional_input("New key")?,
        }
    } else {
        return Err(VaultError::CommandFailed(
            "nothing to update — pass --secret, --tag or --rename".into(),
        ));
    };

    if changes.is_empty() {
        output::info("Nothing to change.");
        return Ok(());
    }

    let (manager, mut vault) = open_vault(cli)?;
    vault.update(&key, &changes.secret, &changes.tag, &changes.key)?;
    drop(vault);

    if changes.key.is_empty() || changes.key == key {
        output::success(&format!("Password '{key}' updated"));
    } else {
        output::success(&format!("Password '{key}' updated and renamed to '{}'", changes.key));
    }
    backup_after_change(&manager)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_changes_are_empty() {
        assert!(Changes::default().is_empty());
    }

    #[test]
    fn any_field_makes_changes_non_empty() {
        let c = Changes {
            tag: "GitHub".into(),
            ..Changes::default()
        };
        assert!(!c.is_empty());
    }
}
