//! calmerge CLI entry point.

use std::io;
use std::process::ExitCode;

use clap::Parser;

use calmerge_client::cli::{Cli, Command};
use calmerge_client::commands;
use calmerge_client::error::ClientResult;
use calmerge_core::init_tracing;
use calmerge_providers::CalendarSource;
use calmerge_server::CalendarService;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.tracing_config()) {
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
    let sources = CalendarSource::from_env()?;
    let service = CalendarService::new(cli.server_config(), sources)?;
    service.start().await?;

    let result = execute(&service, &cli.command).await;
    service.shutdown().await;
    result
}

async fn execute(service: &CalendarService, command: &Command) -> ClientResult<()> {
    let mut out = io::stdout();
    match command {
        Command::Events { from, to } => {
            commands::events::events(service, from.as_deref(), to.as_deref(), &mut out).await
        }
        Command::Search { query } => commands::events::search(service, query, &mut out).await,
        Command::Sources => commands::sources::sources(service, &mut out).await,
    }
}
