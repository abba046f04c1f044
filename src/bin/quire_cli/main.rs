//! quire-cli: headless front end for the admin editor pipeline.
//! Drafts live in a local directory; saves and publishes go through the admin API.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};
use client::{CliError, build_ctx_from_cli};
use handlers::{articles, drafts, publish};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing();
    let ctx = build_ctx_from_cli(&cli)?;

    match cli.command {
        Commands::Drafts(cmd) => drafts::handle(&ctx, cmd.action).await?,
        Commands::Publish(cmd) => publish::handle(&ctx, cmd).await?,
        Commands::Articles(cmd) => articles::handle(&ctx, cmd.action).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUIRE_CLI_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
