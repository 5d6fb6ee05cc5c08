//! Rollback limits and session settings

use std::time::Duration;

use ggrs::Config;

use crate::input::FrameInput;

use super::events::SessionError;
use super::store::SnapshotHandle;

/// Deepest rollback a session may request
pub const MAX_ROLLBACK_FRAMES: usize = 8;

/// Upper bound on local input delay
pub const MAX_INPUT_DELAY: usize = 10;

/// Input delay for sessions where every player is on this machine
pub const DEFAULT_INPUT_DELAY: usize = 0;

/// Input delay for networked sessions; hides a couple of frames of latency
pub const DEFAULT_ONLINE_INPUT_DELAY: usize = 2;

/// How many frames a sync-test session rewinds and re-checks every tick
pub const DEFAULT_CHECK_DISTANCE: usize = 2;

/// Snapshots allocated up front: the rollback window plus the frame being
/// saved and one spare
pub const STATE_POOL_SIZE: usize = MAX_ROLLBACK_FRAMES + 2;

/// GGRS type bundle for a match.
///
/// GGRS cells carry [`SnapshotHandle`]s; the states themselves stay in the
/// [`SnapshotStore`](super::SnapshotStore).
pub struct BrawlConfig;

impl Config for BrawlConfig {
    type Input = FrameInput;
    type State = SnapshotHandle;
    /// Peer address, e.g. "10.0.0.2:7000"
    type Address = String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub num_players: usize,
    /// Frames between sampling an input and applying it
    pub input_delay: usize,
    /// Frames the session may run ahead of confirmed remote input
    pub max_prediction_frames: usize,
    /// Sync-test only
    pub check_distance: usize,
    /// Silence after which a peer is dropped
    pub disconnect_timeout: Duration,
    /// Silence after which `NetworkInterrupted` is raised
    pub disconnect_notify_start: Duration,
    /// Tick rate used by GGRS time sync
    pub fps: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            num_players: 2,
            input_delay: DEFAULT_INPUT_DELAY,
            max_prediction_frames: MAX_ROLLBACK_FRAMES,
            check_distance: DEFAULT_CHECK_DISTANCE,
            disconnect_timeout: Duration::from_secs(5),
            disconnect_notify_start: Duration::from_secs(3),
            fps: 60,
        }
    }
}

impl SessionConfig {
    /// Everyone on one machine.
    pub fn local(num_players: usize) -> Self {
        Self {
            num_players,
            ..Default::default()
        }
    }

    pub fn online(num_players: usize) -> Self {
        Self {
            num_players,
            input_delay: DEFAULT_ONLINE_INPUT_DELAY,
            ..Default::default()
        }
    }

    /// Local rollback-every-frame determinism check.
    pub fn sync_test(num_players: usize) -> Self {
        Self {
            num_players,
            input_delay: 0,
            ..Default::default()
        }
    }

    /// Reject settings GGRS would refuse or that break the snapshot pool sizing.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.input_delay > MAX_INPUT_DELAY {
            return Err(SessionError::InvalidConfig(format!(
                "input delay {} exceeds {MAX_INPUT_DELAY}",
                self.input_delay
            )));
        }
        if self.max_prediction_frames == 0 || self.max_prediction_frames > MAX_ROLLBACK_FRAMES {
            return Err(SessionError::InvalidConfig(format!(
                "prediction window {} outside 1..={MAX_ROLLBACK_FRAMES}",
                self.max_prediction_frames
            )));
        }
        if self.check_distance >= self.max_prediction_frames {
            return Err(SessionError::InvalidConfig(format!(
                "check distance {} must be below the prediction window {}",
                self.check_distance, self.max_prediction_frames
            )));
        }
        Ok(())
    }

    /// Ticks after which an advanced input can no longer be rolled back.
    pub fn confirmation_window(&self) -> u32 {
        (self.max_prediction_frames + self.input_delay + 1) as u32
    }
}
