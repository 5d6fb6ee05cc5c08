//! Shared helpers: config loading, match startup, random input

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use brawl_core::runtime::{DefaultSpawner, LoadBarrier};
use brawl_core::{Buttons, FrameInput, InputSource, Match, MatchConfig, StageSettings};

/// Match and stage files shared by every simulating command.
#[derive(Args, Debug, Clone)]
pub struct MatchFiles {
    /// Match config (TOML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Stage config (TOML); a flat stage sized to the player count if omitted
    #[arg(short, long)]
    pub stage: Option<PathBuf>,
}

impl MatchFiles {
    pub fn load(&self) -> Result<(MatchConfig, StageSettings)> {
        let config = MatchConfig::load(&self.config)
            .with_context(|| format!("Failed to load match config: {}", self.config.display()))?;
        let stage = match &self.stage {
            Some(path) => load_stage(path)?,
            None => StageSettings::flat(config.player_count()),
        };
        Ok((config, stage))
    }
}

fn load_stage(path: &Path) -> Result<StageSettings> {
    StageSettings::load(path)
        .with_context(|| format!("Failed to load stage config: {}", path.display()))
}

/// Initialize `game` with a ready loader and the default spawner.
pub fn start(game: &mut Match, stage: &StageSettings) -> Result<()> {
    pollster::block_on(game.initialize(stage, &LoadBarrier::ready(), &DefaultSpawner))
        .context("Failed to initialize match")
}

/// Seeded random input: buttons change every few ticks, sticks drift.
pub struct RandomInput {
    rng: StdRng,
    held: FrameInput,
    hold_ticks: u32,
}

impl RandomInput {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            held: FrameInput::default(),
            hold_ticks: 0,
        }
    }
}

impl InputSource for RandomInput {
    fn sample(&mut self, _local_id: u8) -> FrameInput {
        if self.hold_ticks == 0 {
            let buttons = Buttons::from_bits_truncate(self.rng.random::<u8>());
            let movement = (
                self.rng.random_range(-127..=127i8),
                self.rng.random_range(-127..=127i8),
            );
            let smash = if self.rng.random_bool(0.1) {
                (self.rng.random_range(-127..=127i8), 0)
            } else {
                (0, 0)
            };
            self.held = FrameInput::new(buttons, movement, smash);
            self.hold_ticks = self.rng.random_range(1..=12);
        }
        self.hold_ticks -= 1;
        self.held
    }
}
