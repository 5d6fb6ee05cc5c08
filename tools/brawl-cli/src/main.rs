//! Brawl CLI - replay inspection and determinism soak tests
//!
//! # Commands
//!
//! - `brawl replay validate` - Verify every record checksum in a replay
//! - `brawl replay dump` - Print recorded inputs (text or JSON lines)
//! - `brawl replay run` - Re-simulate a replay and print the final world hash
//! - `brawl record` - Record a match driven by random input
//! - `brawl synctest` - Run a GGRS sync-test session against a plain local run
//!
//! # Usage
//!
//! ```bash
//! brawl record --config match.toml --ticks 3600 --seed 7 -o match.bin
//! brawl replay run match.bin --config match.toml
//! brawl synctest --config match.toml --ticks 3600 --check-distance 7
//! ```

mod common;
mod replay;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Brawl CLI - replay inspection and determinism soak tests
#[derive(Parser)]
#[command(name = "brawl")]
#[command(about = "Replay inspection and determinism soak tests for brawl matches")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or re-simulate a replay file
    #[command(subcommand)]
    Replay(replay::ReplayAction),

    /// Record a match driven by seeded random input
    Record(session::RecordArgs),

    /// Run a sync-test session and compare it against a plain local run
    Synctest(session::SyncTestArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(action) => replay::execute(action),
        Commands::Record(args) => session::record(args),
        Commands::Synctest(args) => session::synctest(args),
    }
}
