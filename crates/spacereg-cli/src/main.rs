//! Operator CLI for the space registry
//!
//! Validates configurations and dry-runs resolutions against spaces loaded
//! from a JSON fixture, without contacting real providers.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod fixture;

use commands::{
    check::{self, CheckArgs},
    expand::{self, ExpandArgs},
    place::{self, PlaceArgs},
    resolve::{self, ResolveArgs},
};

#[derive(Parser)]
#[command(name = "spacereg")]
#[command(about = "Spacereg - storage space registry tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and print the compiled rule table
    Check(CheckArgs),
    /// Resolve a path or resource id against fixture providers
    Resolve(ResolveArgs),
    /// Find the provider a new space would be placed on
    Place(PlaceArgs),
    /// Expand character classes in a mount pattern
    Expand(ExpandArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let output = match cli.command {
        Commands::Check(args) => check::run(&args)?,
        Commands::Resolve(args) => resolve::run(&args).await?,
        Commands::Place(args) => place::run(&args).await?,
        Commands::Expand(args) => expand::run(&args)?,
    };
    println!("{output}");
    Ok(())
}
