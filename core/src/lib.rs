//! Brawl Core - deterministic rollback match engine
//!
//! This crate provides the simulation core of a platform fighter match,
//! built so that every tick is bit-exact across machines and across
//! re-simulation.
//!
//! # Architecture
//!
//! - [`Match`] - Fixed-tick stepper composing input injection, rules and gameplay systems
//! - [`SimulationState`] - Arena of entities and components; copying it is a full snapshot
//! - [`WorldHasher`] - Order-independent digest of the state for desync detection
//! - [`ReplayWriter`] / [`ReplayReader`] - Checksummed fixed-width input log
//! - [`RollbackDriver`] - Save/load/free/advance callbacks for a rollback session
//! - [`GgrsSession`] - GGRS integration for sync-test and P2P sessions

pub mod config;
pub mod hash;
pub mod input;
#[cfg(test)]
mod integration;
pub mod replay;
pub mod rollback;
pub mod rules;
pub mod runtime;
pub mod sim;

pub use config::{MAX_PLAYERS, MatchConfig, MatchMode, PlayerConfig, StageSettings};
pub use hash::{HashCategory, HashDigest, WorldHasher};
pub use input::{Buttons, FrameInput, InputSource, TickInputs};
pub use replay::{ReplayError, ReplayReader, ReplayWriter};
pub use rollback::{
    BrawlConfig, GgrsSession, RollbackDriver, RollbackMatch, RollbackSession, SessionCallbacks,
    SessionConfig, SessionError, SessionEvent, SnapshotHandle, SnapshotStore,
};
pub use rules::{MatchRule, MatchRuleRegistry};
pub use runtime::{Match, MatchError, MatchPhase, MatchVariant, RuntimeConfig};
pub use sim::{MatchState, ProgressionState, SimulationState};

// Re-export GGRS types for convenience
pub use ggrs::{GgrsError, InputStatus, PlayerType, SessionState};
