//! tasksync — keep paired task collections in agreement.
//!
//! # Usage
//!
//! ```text
//! tasksync sync  [--config PATH] [--pair N] [--dry-run] [--create-only] [--snapshot FILE] [--json]
//! tasksync check [--config PATH] [--snapshot FILE]
//! tasksync pairs list [--config PATH]
//! tasksync pairs add --a WORKSPACE/COLLECTION --b WORKSPACE/COLLECTION [--one-way] [--create-only]
//! ```
//!
//! Without `--snapshot`, commands talk to Asana using `ASANA_ACCESS_TOKEN`.

mod asana;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, pairs::PairsCommand, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tasksync",
    version,
    about = "Reconcile tasks between paired project collections",
    long_about = None,
)]
struct Cli {
    /// Increase log detail on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile every configured pair (or one, with --pair).
    Sync(SyncArgs),

    /// Verify that configured pairs resolve and their sections line up.
    Check(CheckArgs),

    /// Manage configured collection pairs.
    Pairs {
        #[command(subcommand)]
        command: PairsCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Pairs { command } => commands::pairs::run(command),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
