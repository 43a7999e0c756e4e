//! `poverka`: climate journal, task list and instrument verification
//! protocols for a metrology workshop.

mod cli;
mod commands;
mod config;
mod style;
mod util;

use std::io;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use time::UtcOffset;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{
    cmd_climate, cmd_config, cmd_device, cmd_journal, cmd_protocol, cmd_remind, cmd_task,
    cmd_verify,
};
use config::Config;
use util::AppContext;

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    // Handle completions before initializing tracing
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "poverka", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // The local offset can only be read while the process is single-threaded
    let offset = UtcOffset::current_local_offset().unwrap_or_else(|_| {
        warn!("Could not determine the local time zone, using UTC");
        UtcOffset::UTC
    });

    let config = Config::load();
    let ctx = AppContext {
        db_path: config.database_path(cli.db.as_deref()),
        no_color: cli.no_color || config.no_color,
        quiet: cli.quiet,
        offset,
        config,
    };
    debug!("Using database {}", ctx.db_path.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(cli.command, &ctx))
}

async fn run(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Climate { action } => cmd_climate(action, ctx),
        Commands::Task { action } => cmd_task(action, ctx),
        Commands::Verify { action } => cmd_verify(action, ctx).await,
        Commands::Device { action } => cmd_device(action, ctx),
        Commands::Journal { search, output } => cmd_journal(search.as_deref(), output.format, ctx),
        Commands::Protocol { action } => cmd_protocol(action, ctx),
        Commands::Remind { action } => cmd_remind(action, ctx).await,
        Commands::Config { action } => cmd_config(action, ctx),
        Commands::Completions { .. } => Ok(()),
    }
}
