//! Match orchestration
//!
//! [`Match`] owns the live [`SimulationState`] and advances it one fixed tick
//! at a time. Only [`Match::initialize`] suspends; once running, every call is
//! synchronous and performs exactly one tick.

use std::io::{Read, Write};

use futures::future::try_join_all;

use crate::config::{ConfigError, MatchConfig, MatchMode, StageLayout, StageSettings};
use crate::hash::{HashCategory, HashDigest, WorldHasher};
use crate::input::{EMPTY_TICK, InputSource, PlayerInputState, TickInputs};
use crate::replay::{ReplayError, ReplayReader, ReplayWriter};
use crate::rules::MatchRuleRegistry;
use crate::sim::systems::{self, InputInjector};
use crate::sim::{
    DeterministicRng, Hurtbox, MatchState, PlayerComponent, ProgressionState, SimulationState,
    TickContext, Transform, Velocity,
};

mod config;
mod game_loop;
mod loader;


pub use config::RuntimeConfig;
pub use game_loop::FixedTimestep;
pub use loader::{
    DefaultSpawner, LoadBarrier, LoadError, MatchDataLoader, PlayerSpawner, SpawnError,
    SpawnedPlayer,
};

/// Replay source owned by a replaying match.
pub type ReplaySource = ReplayReader<Box<dyn Read + Send>>;

/// Replay sink owned by a recording match.
pub type ReplaySink = ReplayWriter<Box<dyn Write + Send>>;

/// Lifecycle of a [`Match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Uninitialized,
    /// Awaiting the data loader and player spawns
    Initializing,
    Running,
    Disposed,
}

/// Which rules and input path a match uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVariant {
    /// Time and/or stock rules, live input
    Default,
    /// Respawn on death, live input
    Training,
    /// Inputs come from a replay file
    Replay,
    /// Live input, written to a replay file every tick
    Recordable,
}

/// Where [`Match::update`] gets each tick's inputs.
pub enum InputFeed {
    /// Sample every local player from a device collaborator
    Local(Box<dyn InputSource + Send>),
    /// Substitute recorded inputs
    Replay(ReplaySource),
    /// Inputs arrive from a rollback session through [`Match::step`]
    Remote,
}

impl std::fmt::Debug for InputFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputFeed::Local(_) => f.write_str("Local"),
            InputFeed::Replay(reader) => write!(f, "Replay(record {})", reader.records_read()),
            InputFeed::Remote => f.write_str("Remote"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to spawn player {player_id}: {source}")]
    Spawn {
        player_id: u8,
        #[source]
        source: SpawnError,
    },
    #[error("cannot {operation} a match that is {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: MatchPhase,
    },
    #[error("pause is only supported for live, unrecorded matches")]
    PauseUnsupported,
    #[error("replay ended after {ticks} ticks")]
    ReplayFinished { ticks: u64 },
    #[error("remote matches are advanced by their rollback session")]
    RemoteFeed,
    #[error("tick {tick} is not deterministic (categories {categories:?})")]
    Nondeterministic {
        tick: u32,
        categories: Vec<HashCategory>,
    },
}

/// A single match: configuration, live state and the per-tick pipeline.
pub struct Match {
    config: MatchConfig,
    runtime: RuntimeConfig,
    phase: MatchPhase,
    state: SimulationState,
    stage: Option<StageLayout>,
    rules: MatchRuleRegistry,
    injector: InputInjector,
    hasher: WorldHasher,
    feed: InputFeed,
    recorder: Option<ReplaySink>,
    pending_pause: Option<bool>,
    /// Pre-tick copy used by the determinism self-check
    scratch: Option<Box<SimulationState>>,
}

impl Match {
    pub fn new(config: MatchConfig, feed: InputFeed) -> Self {
        Self {
            config,
            runtime: RuntimeConfig::default(),
            phase: MatchPhase::Uninitialized,
            state: SimulationState::new(),
            stage: None,
            rules: MatchRuleRegistry::default(),
            injector: InputInjector::new(),
            hasher: WorldHasher::new(),
            feed,
            recorder: None,
            pending_pause: None,
            scratch: None,
        }
    }

    /// Live match sampling local players from `source`.
    pub fn local(config: MatchConfig, source: impl InputSource + Send + 'static) -> Self {
        Self::new(config, InputFeed::Local(Box::new(source)))
    }

    /// Match replaying the records in `source`. The magic header is checked here.
    pub fn replay(
        config: MatchConfig,
        source: impl Read + Send + 'static,
    ) -> Result<Self, MatchError> {
        let reader = ReplayReader::new(Box::new(source) as Box<dyn Read + Send>)?;
        Ok(Self::new(config, InputFeed::Replay(reader)))
    }

    /// Match whose inputs are supplied by a rollback session.
    pub fn remote(config: MatchConfig) -> Self {
        Self::new(config, InputFeed::Remote)
    }

    /// Write every tick's inputs to `sink`.
    pub fn with_recorder(mut self, sink: impl Write + Send + 'static) -> Result<Self, MatchError> {
        self.recorder = Some(ReplayWriter::new(Box::new(sink) as Box<dyn Write + Send>)?);
        Ok(self)
    }

    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Validate configuration, wait for match data and spawn every player.
    ///
    /// On failure the match returns to `Uninitialized` with an empty state.
    pub async fn initialize(
        &mut self,
        stage: &StageSettings,
        loader: &impl MatchDataLoader,
        spawner: &impl PlayerSpawner,
    ) -> Result<(), MatchError> {
        self.expect_phase("initialize", MatchPhase::Uninitialized)?;
        self.phase = MatchPhase::Initializing;

        let result = self.initialize_inner(stage, loader, spawner).await;
        match &result {
            Ok(()) => self.phase = MatchPhase::Running,
            Err(err) => {
                tracing::error!("match initialization failed: {err}");
                self.state.clear();
                self.stage = None;
                self.phase = MatchPhase::Uninitialized;
            }
        }
        result
    }

    async fn initialize_inner(
        &mut self,
        stage: &StageSettings,
        loader: &impl MatchDataLoader,
        spawner: &impl PlayerSpawner,
    ) -> Result<(), MatchError> {
        self.config.validate()?;
        let layout = stage.resolve()?;
        self.rules = MatchRuleRegistry::for_config(&self.config);

        self.state.clear();
        self.state.match_state = MatchState {
            time: self.config.time,
            progression: if self.config.intro_ticks > 0 {
                ProgressionState::Intro
            } else {
                ProgressionState::InGame
            },
            intro_remaining: self.config.intro_ticks,
            tick: 0,
            rng: DeterministicRng::new(self.config.seed),
        };

        loader.wait_until_loaded().await?;

        let spawns = self.config.players.iter().enumerate().map(|(index, player)| {
            let point = layout.spawn_point(index);
            async move {
                spawner
                    .spawn_player(player, point)
                    .await
                    .map(|spawned| (spawned, point))
                    .map_err(|source| MatchError::Spawn {
                        player_id: player.player_id,
                        source,
                    })
            }
        });
        let spawned = try_join_all(spawns).await?;

        // validate() bounds stocks to i8
        let stocks = self.config.stocks as i8;
        for (player, (spawned, point)) in self.config.players.iter().zip(spawned) {
            let id = self.state.spawn();
            let mut component = PlayerComponent::new(
                player.player_id,
                self.config.seed,
                stocks,
                player.default_damage,
            );
            component.view_binding = spawned.view_binding;
            self.state.players.insert(id, component);
            self.state.inputs.insert(id, PlayerInputState::default());
            self.state.transforms.insert(id, Transform::at(point));
            self.state.velocities.insert(id, Velocity::default());
            self.state.movement.insert(id, spawned.movement);
            self.state
                .hurtboxes
                .insert(id, Hurtbox::new(id, player.player_id, spawned.hurtbox_radius));
        }

        self.stage = Some(layout);
        self.hasher.update(&self.state);
        tracing::info!(
            players = self.config.player_count(),
            stage_id = self.config.stage_id,
            variant = ?self.variant(),
            "players spawned"
        );
        Ok(())
    }

    fn expect_phase(&self, operation: &'static str, phase: MatchPhase) -> Result<(), MatchError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(MatchError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Advance one tick with inputs from the configured feed.
    pub fn update(&mut self) -> Result<(), MatchError> {
        self.expect_phase("update", MatchPhase::Running)?;

        let inputs = match &mut self.feed {
            InputFeed::Local(source) => {
                let mut inputs = EMPTY_TICK;
                for player in &self.config.players {
                    if let Some(local_id) = player.local_id {
                        inputs[player.player_id as usize] = source.sample(local_id);
                    }
                }
                inputs
            }
            InputFeed::Replay(reader) => match reader.read_inputs()? {
                Some(inputs) => inputs,
                None => {
                    return Err(MatchError::ReplayFinished {
                        ticks: reader.records_read(),
                    });
                }
            },
            InputFeed::Remote => return Err(MatchError::RemoteFeed),
        };

        if let Some(recorder) = &mut self.recorder {
            recorder.write_inputs(&inputs)?;
        }

        let pause = self.pending_pause.take();
        if self.runtime.verify_determinism {
            self.verified_advance(&inputs, pause)
        } else {
            self.advance(&inputs, pause);
            Ok(())
        }
    }

    /// Advance one tick with the given inputs.
    ///
    /// Given identical state and inputs the resulting state and world hash
    /// are bit-identical on every machine and every call.
    pub fn step(&mut self, inputs: &TickInputs) -> Result<(), MatchError> {
        self.expect_phase("step", MatchPhase::Running)?;
        let pause = self.pending_pause.take();
        self.advance(inputs, pause);
        Ok(())
    }

    /// Step from a saved copy twice and compare the resulting hashes.
    fn verified_advance(
        &mut self,
        inputs: &TickInputs,
        pause: Option<bool>,
    ) -> Result<(), MatchError> {
        let tick = self.state.match_state.tick;
        self.scratch
            .get_or_insert_with(Default::default)
            .copy_from(&self.state);

        self.advance(inputs, pause);
        let first = self.hasher.clone();

        if let Some(scratch) = &self.scratch {
            self.state.copy_from(scratch);
        }
        self.advance(inputs, pause);

        if first != self.hasher {
            let categories = first.diff(&self.hasher);
            tracing::error!(tick, ?categories, "determinism check failed");
            return Err(MatchError::Nondeterministic { tick, categories });
        }
        Ok(())
    }

    fn advance(&mut self, inputs: &TickInputs, pause: Option<bool>) {
        let Some(stage) = self.stage.as_ref() else {
            return;
        };
        let ctx = TickContext {
            tick: self.state.match_state.tick,
            delta: self.runtime.tick_duration(),
        };

        let match_state = &mut self.state.match_state;
        match (pause, match_state.progression) {
            (Some(true), ProgressionState::InGame) => {
                match_state.progression = ProgressionState::Pause;
                tracing::debug!(tick = ctx.tick, "match paused");
            }
            (Some(false), ProgressionState::Pause) => {
                match_state.progression = ProgressionState::InGame;
                tracing::debug!(tick = ctx.tick, "match resumed");
            }
            _ => {}
        }
        if match_state.progression == ProgressionState::Intro {
            if match_state.intro_remaining == 0 {
                match_state.progression = ProgressionState::InGame;
            } else {
                match_state.intro_remaining -= 1;
            }
        }

        if match_state.progression != ProgressionState::Pause {
            self.injector.set_all(inputs);
            self.injector.apply(&mut self.state);
        }

        if self.state.match_state.is_running() {
            systems::movement::run(&mut self.state, &ctx, stage.ground.as_ref());
            systems::combat::spawn_attacks(&mut self.state);
            systems::combat::resolve_hits(&mut self.state);
            systems::lifetime::run(&mut self.state);
            systems::blast_zone::run(&mut self.state, stage);
        }

        let outcome = self.rules.run(&mut self.state);
        systems::respawn::run(&mut self.state, &stage.respawn_points);
        if outcome.ended {
            tracing::info!(tick = ctx.tick, "match ended");
        }

        self.state.match_state.tick = self.state.match_state.tick.wrapping_add(1);
        self.hasher.update(&self.state);
    }

    /// Overwrite the live state with `snapshot` and rehash. The live state
    /// object itself is kept, only its contents change.
    pub fn restore(&mut self, snapshot: &SimulationState) -> Result<(), MatchError> {
        self.expect_phase("restore", MatchPhase::Running)?;
        self.state.copy_from(snapshot);
        self.hasher.update(&self.state);
        Ok(())
    }

    /// Ask for the match to pause or resume at the start of the next tick.
    pub fn request_pause(&mut self, paused: bool) -> Result<(), MatchError> {
        self.expect_phase("pause", MatchPhase::Running)?;
        if !matches!(self.feed, InputFeed::Local(_)) || self.recorder.is_some() {
            return Err(MatchError::PauseUnsupported);
        }
        self.pending_pause = Some(paused);
        Ok(())
    }

    /// Close the replay streams and drop the state. Only valid between ticks.
    pub fn dispose(&mut self) -> Result<(), MatchError> {
        if self.phase == MatchPhase::Disposed {
            return Ok(());
        }
        let recorder = self.recorder.take();
        self.feed = InputFeed::Remote;
        self.state.clear();
        self.scratch = None;
        self.stage = None;
        self.phase = MatchPhase::Disposed;

        if let Some(recorder) = recorder {
            let records = recorder.records_written();
            recorder.into_inner()?;
            tracing::debug!(records, "replay recording closed");
        }
        Ok(())
    }

    pub fn variant(&self) -> MatchVariant {
        if matches!(self.feed, InputFeed::Replay(_)) {
            MatchVariant::Replay
        } else if self.recorder.is_some() {
            MatchVariant::Recordable
        } else if self.config.mode == MatchMode::Training {
            MatchVariant::Training
        } else {
            MatchVariant::Default
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    pub fn rules(&self) -> &MatchRuleRegistry {
        &self.rules
    }

    pub fn stage(&self) -> Option<&StageLayout> {
        self.stage.as_ref()
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn match_state(&self) -> &MatchState {
        &self.state.match_state
    }

    pub fn is_paused(&self) -> bool {
        self.state.match_state.progression == ProgressionState::Pause
    }

    pub fn is_finished(&self) -> bool {
        self.state.match_state.progression == ProgressionState::End
    }

    /// World hash as of the last completed tick.
    pub fn world_hash(&self) -> HashDigest {
        self.hasher.world_hash()
    }

    pub fn hasher(&self) -> &WorldHasher {
        &self.hasher
    }

    /// Records written so far by a recordable match.
    pub fn records_written(&self) -> Option<u64> {
        self.recorder.as_ref().map(ReplayWriter::records_written)
    }
}
