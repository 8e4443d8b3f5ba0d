//! hangman CLI entry point.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing::info_span;

use hangman_client::cli::{Cli, Command, ConfigAction};
use hangman_client::commands;
use hangman_client::config::ClientConfig;
use hangman_client::error::ClientResult;
use hangman_client::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing.with_format(cli.log_format)) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let mut config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };
    cli.apply(&mut config);

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(cli.config.as_deref()),
        },
        Some(command) => {
            config.validate()?;
            let span = info_span!("hangman", server = %config.server.address);
            commands::game::run(command, &config, span).await
        }
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}
