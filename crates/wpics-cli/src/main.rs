//! wp-ics-gen entry point.

use std::process::ExitCode;

use clap::Parser;

use wpics_cli::cli::{Cli, Command, ConfigAction};
use wpics_cli::commands;
use wpics_cli::config::{self, FileConfig};
use wpics_cli::error::CliResult;
use wpics_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command();

    if let Err(e) = setup_tracing(&cli, &command) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn setup_tracing(cli: &Cli, command: &Command) -> CliResult<()> {
    let tracing = if cli.debug {
        TracingConfig::debug()
    } else if *command == Command::Serve {
        TracingConfig::server()
    } else {
        TracingConfig::default()
    };
    init_tracing(tracing.with_format(cli.log_format))?;
    Ok(())
}

async fn run(cli: &Cli, command: Command) -> CliResult<()> {
    let file = FileConfig::load(cli.config.as_deref())?;
    let config = config::resolve(&cli.feed, file)?;

    match command {
        Command::Serve => commands::serve::run(&config).await,
        Command::Render { output } => commands::render::run(&config, output.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
