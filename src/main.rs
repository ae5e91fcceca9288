use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pwvault::cli::output;
use pwvault::cli::{commands, Cli, Commands};
use pwvault::errors::VaultError;

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env("PM_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("pwvault=debug")
        } else {
            EnvFilter::new("pwvault=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).without_time())
        .init();

    let result = match cli.command {
        Commands::Add { ref key, ref tag } => {
            commands::add::execute(&cli, key.as_deref(), tag.as_deref())
        }
        Commands::Query { ref key } => commands::query::execute(&cli, key.as_deref()),
        Commands::List => commands::list::execute(&cli),
        Commands::Pla { ref tag } => commands::pla::execute(&cli, tag.as_deref()),
        Commands::Update {
            ref key,
            secret,
            ref tag,
            ref rename,
        } => commands::update::execute(
            &cli,
            key.as_deref(),
            secret,
            tag.as_deref(),
            rename.as_deref(),
        ),
        Commands::Del { ref key, force } => commands::del::execute(&cli, key.as_deref(), force),
        Commands::Backup { verify } => commands::backup::execute(&cli, verify),
        Commands::Restore { force } => commands::restore::execute(&cli, force),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        let hint = match &e {
            VaultError::RestoreDeclined => Some("run: pm restore"),
            VaultError::KeyFileNotFound(_) => {
                Some("the key file is required to decrypt this vault; restore key.gob")
            }
            VaultError::Database(_) => Some("is another pm process using this vault?"),
            _ => None,
        };
        if let Some(hint) = hint {
            output::tip(hint);
        }
        std::process::exit(1);
    }
}
