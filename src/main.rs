use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod base;
mod cache;
mod commands;
mod config;
mod filter;
mod output;
mod registry;

use commands::{clear, list};
use config::{Layout, Settings};

#[derive(Parser)]
#[command(name = "bases1c", version)]
#[command(about = "List 1C:Enterprise infobases and clear their disk caches", long_about = None)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Settings file (default: <config dir>/bases1c/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// The 1C folder under the roaming application data directory
    #[arg(long, global = true, env = "BASES1C_ROAMING_ROOT")]
    roaming_root: Option<PathBuf>,

    /// The 1C folder under the local application data directory
    #[arg(long, global = true, env = "BASES1C_LOCAL_ROOT")]
    local_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bases
    List(list::ListArgs),

    /// Clear bases cache
    Clear(clear::ClearArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::discover(cli.config.as_deref())?;
    let layout = Layout::resolve(settings, cli.roaming_root, cli.local_root)?;
    tracing::debug!(?layout, "resolved locations");

    match cli.command {
        Commands::List(args) => list::run(args, &layout)?,
        Commands::Clear(args) => clear::run(args, &layout)?,
    }

    Ok(())
}
