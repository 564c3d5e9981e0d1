//! SiteRM console CLI entry point

use clap::Parser;
use siterm_console::cli::{Cli, Commands};
use siterm_console::core::error::Result;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("SITERM_CONSOLE_LOG"))
        .init();

    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31m>\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.config()?;

    match cli.command {
        Commands::Login(args) => siterm_console::cli::login::run(&config, args).await,
        Commands::Logout => siterm_console::cli::logout::run(&config),
        Commands::Whoami(args) => siterm_console::cli::whoami::run(&config, args).await,
        Commands::Status(args) => siterm_console::cli::status::run(&config, args).await,
        Commands::Hosts(args) => siterm_console::cli::hosts::run(&config, args).await,
        Commands::Get(args) => siterm_console::cli::get::run(&config, args).await,
        Commands::Web(args) => siterm_console::cli::web::run(&config, args).await,
    }
}
