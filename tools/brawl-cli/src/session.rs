//! Recording and sync-test commands

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use brawl_core::rollback::{DEFAULT_CHECK_DISTANCE, MAX_ROLLBACK_FRAMES};
use brawl_core::{GgrsSession, Match, RollbackDriver, RollbackMatch, SessionConfig};

use crate::common::{MatchFiles, RandomInput, start};

#[derive(Args)]
pub struct RecordArgs {
    #[command(flatten)]
    files: MatchFiles,

    /// Ticks to record
    #[arg(long, default_value = "3600")]
    ticks: u32,

    /// Input RNG seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Output replay file
    #[arg(short, long)]
    output: PathBuf,
}

pub fn record(args: RecordArgs) -> Result<()> {
    let (config, stage) = args.files.load()?;
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create replay: {}", args.output.display()))?;

    let mut game =
        Match::local(config, RandomInput::new(args.seed)).with_recorder(BufWriter::new(file))?;
    start(&mut game, &stage)?;

    for _ in 0..args.ticks {
        game.update()?;
    }
    let records = game.records_written().unwrap_or(0);
    let hash = game.world_hash();
    game.dispose()?;

    println!("=== Recording Complete ===");
    println!("Output: {}", args.output.display());
    println!("Ticks: {records}");
    println!("World hash: {hash:#018x}");
    Ok(())
}

#[derive(Args)]
pub struct SyncTestArgs {
    #[command(flatten)]
    files: MatchFiles,

    /// Ticks to simulate
    #[arg(long, default_value = "3600")]
    ticks: u32,

    /// Input RNG seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Frames rolled back and compared on every tick
    #[arg(long, default_value_t = DEFAULT_CHECK_DISTANCE)]
    check_distance: usize,
}

/// Run the match twice with the same input: once through a GGRS sync-test
/// session (which rolls back and compares checksums every tick) and once
/// plainly. Both must end on the same world hash.
pub fn synctest(args: SyncTestArgs) -> Result<()> {
    if args.check_distance == 0 || args.check_distance >= MAX_ROLLBACK_FRAMES {
        bail!("check distance must be between 1 and {}", MAX_ROLLBACK_FRAMES - 1);
    }
    let (config, stage) = args.files.load()?;

    let session_config = SessionConfig {
        check_distance: args.check_distance,
        ..SessionConfig::sync_test(config.player_count())
    };
    let session = GgrsSession::new_sync_test(session_config, &config)?;
    let mut remote = Match::remote(config.clone());
    start(&mut remote, &stage)?;
    let mut rollback = RollbackMatch::new(
        session,
        RollbackDriver::new(remote),
        RandomInput::new(args.seed),
    );

    let mut local = Match::local(config, RandomInput::new(args.seed));
    start(&mut local, &stage)?;

    for tick in 0..args.ticks {
        for event in rollback.update()? {
            tracing::warn!(tick, ?event, "session event");
        }
        local.update()?;
    }

    let rollback_hash = rollback.game().world_hash();
    let local_hash = local.world_hash();
    let (saves, loads) = rollback.driver().snapshot_counts();
    println!("=== Sync Test ===");
    println!("Ticks: {}", args.ticks);
    println!("Rollback frames: {}", rollback.session().total_rollback_frames());
    println!("Saves: {saves}, loads: {loads}");
    println!("Peak snapshots: {}", rollback.driver().store().total_count());
    println!("World hash (rollback): {rollback_hash:#018x}");
    println!("World hash (local):    {local_hash:#018x}");

    rollback.dispose()?;
    local.dispose()?;
    if rollback_hash != local_hash {
        bail!("rollback and local runs diverged");
    }
    println!("OK");
    Ok(())
}
