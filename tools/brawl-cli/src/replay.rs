//! Replay subcommands

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Subcommand;

use brawl_core::config::MAX_PLAYERS;
use brawl_core::runtime::FixedTimestep;
use brawl_core::{FrameInput, Match, MatchError, ReplayReader, TickInputs};

use crate::common::{MatchFiles, start};

#[derive(Subcommand)]
pub enum ReplayAction {
    /// Verify every record checksum
    Validate {
        /// Replay file
        replay: PathBuf,
    },

    /// Print recorded inputs
    Dump {
        /// Replay file
        replay: PathBuf,

        /// Emit one JSON object per tick
        #[arg(long)]
        json: bool,

        /// First tick to print
        #[arg(long, default_value = "0")]
        from: u64,

        /// Maximum ticks to print
        #[arg(long)]
        count: Option<usize>,
    },

    /// Re-simulate a replay and print the final world hash
    Run {
        /// Replay file
        replay: PathBuf,

        #[command(flatten)]
        files: MatchFiles,

        /// Pace ticks at the configured tick rate instead of as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Print the world hash every N ticks
        #[arg(long)]
        hash_every: Option<u32>,
    },
}

pub fn execute(action: ReplayAction) -> Result<()> {
    match action {
        ReplayAction::Validate { replay } => validate(&replay),
        ReplayAction::Dump {
            replay,
            json,
            from,
            count,
        } => dump(&replay, json, from, count),
        ReplayAction::Run {
            replay,
            files,
            realtime,
            hash_every,
        } => run(&replay, &files, realtime, hash_every),
    }
}

fn open(path: &Path) -> Result<ReplayReader<BufReader<File>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open replay: {}", path.display()))?;
    ReplayReader::new(BufReader::new(file))
        .with_context(|| format!("Failed to read replay header: {}", path.display()))
}

fn validate(path: &Path) -> Result<()> {
    println!("Validating replay: {}", path.display());

    let mut reader = open(path)?;
    let mut active = [false; MAX_PLAYERS];
    while let Some(inputs) = reader
        .read_inputs()
        .with_context(|| format!("Replay is corrupt at record {}", reader.records_read()))?
    {
        for (slot, input) in active.iter_mut().zip(&inputs) {
            *slot |= *input != FrameInput::default();
        }
    }

    println!();
    println!("=== Replay Valid ===");
    println!("Ticks: {}", reader.records_read());
    println!(
        "Slots with input: {:?}",
        active
            .iter()
            .enumerate()
            .filter_map(|(slot, used)| used.then_some(slot))
            .collect::<Vec<_>>()
    );
    Ok(())
}

fn describe(input: &FrameInput) -> String {
    format!(
        "{:?} move=({}, {}) smash=({}, {})",
        input.buttons(),
        input.move_x,
        input.move_y,
        input.smash_x,
        input.smash_y
    )
}

fn print_tick(tick: u64, inputs: &TickInputs, json: bool) -> Result<()> {
    if json {
        let line = serde_json::json!({ "tick": tick, "inputs": inputs });
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }
    println!("tick {tick}");
    for (slot, input) in inputs.iter().enumerate() {
        if *input != FrameInput::default() {
            println!("  p{slot}: {}", describe(input));
        }
    }
    Ok(())
}

fn dump(path: &Path, json: bool, from: u64, count: Option<usize>) -> Result<()> {
    let mut reader = open(path)?;
    reader.seek_record(from)?;

    let limit = count.unwrap_or(usize::MAX);
    for (offset, record) in reader.take(limit).enumerate() {
        let tick = from + offset as u64;
        let inputs = record.with_context(|| format!("Replay is corrupt at record {tick}"))?;
        print_tick(tick, &inputs, json)?;
    }
    Ok(())
}

fn run(path: &Path, files: &MatchFiles, realtime: bool, hash_every: Option<u32>) -> Result<()> {
    let (config, stage) = files.load()?;
    let file = File::open(path)
        .with_context(|| format!("Failed to open replay: {}", path.display()))?;
    let mut game = Match::replay(config, BufReader::new(file))?;
    start(&mut game, &stage)?;

    let started = Instant::now();
    let every = hash_every.filter(|every| *every > 0);
    let tick = |game: &mut Match| -> Result<(), MatchError> {
        game.update()?;
        let current = game.match_state().tick;
        if every.is_some_and(|every| current % every == 0) {
            println!("tick {current:>6}: {:#018x}", game.world_hash());
        }
        Ok(())
    };

    let outcome = if realtime {
        let mut timestep = FixedTimestep::new(game.runtime());
        let pause = timestep.tick_duration() / 4;
        loop {
            if let Err(err) = timestep.frame(Instant::now(), 1.0, || tick(&mut game)) {
                break err;
            }
            std::thread::sleep(pause.max(Duration::from_millis(1)));
        }
    } else {
        loop {
            if let Err(err) = tick(&mut game) {
                break err;
            }
        }
    };

    match outcome {
        MatchError::ReplayFinished { ticks } => {
            println!();
            println!("=== Replay Complete ===");
            println!("Ticks: {ticks}");
            println!("Progression: {:?}", game.match_state().progression);
            println!("World hash: {:#018x}", game.world_hash());
            println!("Elapsed: {:?}", started.elapsed());
            game.dispose()?;
            Ok(())
        }
        err => Err(err).context(format!("Replay failed at tick {}", game.match_state().tick)),
    }
}
