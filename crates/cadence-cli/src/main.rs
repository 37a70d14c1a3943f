//! Cadence CLI - validate and schedule dataflow graph descriptions.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Cadence SDF scheduler CLI", long_about = None)]
struct Cli {
    /// Log generation steps (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a graph description without generating buffers
    Validate(commands::validate::ValidateArgs),

    /// Compile a graph description and print the schedule
    Schedule(commands::schedule::ScheduleArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Schedule(args) => commands::schedule::run(args),
    }
}
