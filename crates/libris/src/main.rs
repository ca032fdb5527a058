mod cli;
mod commands;
mod config;
mod error;
mod output;
mod shell;

use std::sync::Arc;

use clap::Parser;
use libris_core::SessionStore;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;
use crate::shell::{Presentation, Shell};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        if !err.was_notified() {
            eprintln!("{:?}", miette::Report::new(err));
        }
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let cfg = libris_config::load_config_or_default();
    let resolved = config::resolve(&cfg, &cli.global)?;
    tracing::debug!(
        profile = %resolved.profile_name,
        api_url = %resolved.client.api_url,
        "resolved configuration"
    );

    let session = Arc::new(SessionStore::in_memory());
    let client = Arc::new(resolved.client.build_client(session)?);

    let presentation = Presentation::new(
        cli.global.output,
        cli.global.color,
        cli.global.quiet,
        cli.global.yes,
    );
    let mut shell = Shell::new(client, presentation);
    shell.default_email = resolved.email;
    shell.default_password = resolved.password;

    // Log in up front when the profile carries both halves of a credential.
    if let Some(creds) = resolved.client.credentials {
        let login = shell.account.login(&creds.email, &creds.password).await;
        shell.flush();
        if let Err(err) = login {
            if cli.command.is_some() {
                return Err(err.into());
            }
        }
    }

    match cli.command {
        Some(command) => {
            shell.run_command(command).await?;
            shell.coordinator().close();
            Ok(())
        }
        None => shell.repl().await,
    }
}
