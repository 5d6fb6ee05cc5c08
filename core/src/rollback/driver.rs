//! Rollback driver
//!
//! [`RollbackDriver`] implements the four callbacks a rollback session needs
//! (save, load, free, advance) on top of a [`Match`] and a [`SnapshotStore`].
//! [`RollbackMatch`] pairs a driver with a session and an input source for
//! the host loop.

use std::collections::BTreeMap;
use std::io::Write;

use ggrs::GgrsError;
use smallvec::SmallVec;

use crate::config::MAX_PLAYERS;
use crate::hash::fold_checksum;
use crate::input::{FrameInput, InputSource, TickInputs};
use crate::replay::ReplayWriter;
use crate::runtime::{Match, ReplaySink};

use super::config::SessionConfig;
use super::events::{SessionError, SessionEvent};
use super::session::RollbackSession;
use super::store::{SnapshotHandle, SnapshotStore};

/// Token and checksum handed back to the session by a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedFrame {
    pub token: SnapshotHandle,
    /// World hash folded to 32 bits
    pub checksum: u32,
}

/// Callbacks a rollback session invokes while advancing.
///
/// Ordering contract: a save for tick `t` precedes any advance past `t`; a
/// load precedes re-simulating ticks already advanced past; a free only
/// targets tokens the session can no longer reach.
pub trait SessionCallbacks {
    /// Snapshot the live state.
    fn save_game_state(&mut self, frame: i32) -> Result<SavedFrame, SessionError>;

    /// Copy a snapshot back into the live state.
    ///
    /// # Panics
    ///
    /// If `token` is not a live snapshot.
    fn load_game_state(&mut self, token: SnapshotHandle) -> Result<(), SessionError>;

    /// Return a snapshot to the pool.
    ///
    /// # Panics
    ///
    /// If `token` was already freed.
    fn free_buffer(&mut self, token: SnapshotHandle);

    /// Step the match once with the session's inputs.
    fn advance_frame(&mut self, inputs: &TickInputs) -> Result<(), SessionError>;
}

/// Bridges a [`Match`] to an external rollback session.
pub struct RollbackDriver {
    game: Match,
    store: SnapshotStore,
    recorder: Option<ReplaySink>,
    /// Advanced but not yet confirmed inputs, by tick
    pending: BTreeMap<u32, TickInputs>,
    confirmation_window: u32,
    saves: u64,
    loads: u64,
}

impl RollbackDriver {
    /// Wrap an initialized match.
    pub fn new(game: Match) -> Self {
        Self {
            game,
            store: SnapshotStore::default(),
            recorder: None,
            pending: BTreeMap::new(),
            confirmation_window: SessionConfig::default().confirmation_window(),
            saves: 0,
            loads: 0,
        }
    }

    /// Record confirmed inputs to `sink`.
    ///
    /// Inputs are written once they fall outside the session's rollback
    /// window, so a corrected tick is never written twice.
    pub fn with_recorder(
        mut self,
        sink: impl Write + Send + 'static,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        self.recorder = Some(ReplayWriter::new(Box::new(sink) as Box<dyn Write + Send>)?);
        self.confirmation_window = config.confirmation_window();
        Ok(self)
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Match {
        &mut self.game
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// (saves, loads) performed so far.
    pub fn snapshot_counts(&self) -> (u64, u64) {
        (self.saves, self.loads)
    }

    pub fn records_written(&self) -> Option<u64> {
        self.recorder.as_ref().map(ReplayWriter::records_written)
    }

    fn flush_confirmed(&mut self, all: bool) -> Result<(), SessionError> {
        let Some(recorder) = &mut self.recorder else {
            self.pending.clear();
            return Ok(());
        };
        let current = self.game.match_state().tick;
        while let Some(entry) = self.pending.first_entry() {
            if !all && entry.key().saturating_add(self.confirmation_window) > current {
                break;
            }
            recorder.write_inputs(&entry.remove())?;
        }
        Ok(())
    }

    /// Write every pending input and close the recording.
    pub fn finish_recording(&mut self) -> Result<(), SessionError> {
        self.flush_confirmed(true)?;
        if let Some(recorder) = self.recorder.take() {
            let records = recorder.records_written();
            recorder.into_inner()?;
            tracing::info!(records, "rollback replay closed");
        }
        Ok(())
    }

    /// Release every snapshot, close the recording and dispose the match.
    pub fn dispose(&mut self) -> Result<(), SessionError> {
        let recording = self.finish_recording();
        tracing::debug!(
            live = self.store.active_count(),
            saves = self.saves,
            loads = self.loads,
            "disposing rollback driver"
        );
        self.store.dispose();
        self.game.dispose()?;
        recording
    }
}

impl SessionCallbacks for RollbackDriver {
    fn save_game_state(&mut self, frame: i32) -> Result<SavedFrame, SessionError> {
        let (token, target) = self.store.acquire();
        target.copy_from(self.game.state());
        self.saves += 1;
        let checksum = fold_checksum(self.game.world_hash());
        tracing::trace!(frame, %token, checksum, "saved state");
        Ok(SavedFrame { token, checksum })
    }

    fn load_game_state(&mut self, token: SnapshotHandle) -> Result<(), SessionError> {
        let snapshot = match self.store.get(token) {
            Ok(snapshot) => snapshot,
            Err(err) => panic!("load_game_state: {err}"),
        };
        self.game.restore(snapshot)?;
        self.loads += 1;
        tracing::trace!(%token, tick = self.game.match_state().tick, "loaded state");
        Ok(())
    }

    fn free_buffer(&mut self, token: SnapshotHandle) {
        assert!(
            self.store.is_active(token),
            "free_buffer: {token} is not live"
        );
        self.store.release(token);
    }

    fn advance_frame(&mut self, inputs: &TickInputs) -> Result<(), SessionError> {
        if self.recorder.is_some() {
            self.pending.insert(self.game.match_state().tick, *inputs);
        }
        self.game.step(inputs)?;
        self.flush_confirmed(false)
    }
}

/// A match advanced by a rollback session.
pub struct RollbackMatch<S: RollbackSession> {
    session: S,
    driver: RollbackDriver,
    input: Box<dyn InputSource + Send>,
}

impl<S: RollbackSession> RollbackMatch<S> {
    pub fn new(
        session: S,
        driver: RollbackDriver,
        input: impl InputSource + Send + 'static,
    ) -> Self {
        Self {
            session,
            driver,
            input: Box::new(input),
        }
    }

    /// Sample local input, advance the session and return its events.
    ///
    /// Running out of prediction frames is not an error; it is reported as
    /// [`SessionEvent::WaitingForPlayers`] and the tick is retried on the
    /// next call.
    pub fn update(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.session.poll();
        let mut events = self.session.events();
        if !self.session.is_running() {
            return Ok(events);
        }

        let handles: SmallVec<[usize; MAX_PLAYERS]> =
            self.session.local_players().iter().copied().collect();
        for handle in handles {
            // Handles without a local id are fed neutral input, as `Match::update` does.
            let local_id = self
                .driver
                .game()
                .config()
                .players
                .get(handle)
                .and_then(|player| player.local_id);
            let input = match local_id {
                Some(local_id) => self.input.sample(local_id),
                None => FrameInput::default(),
            };
            self.session.add_local_input(handle, input)?;
        }

        match self.session.advance_frame(&mut self.driver) {
            Ok(()) => {}
            Err(SessionError::Ggrs(GgrsError::PredictionThreshold)) => {
                tracing::debug!("prediction threshold reached, waiting for remote input");
                events.push(SessionEvent::WaitingForPlayers);
            }
            Err(err) => return Err(err),
        }
        Ok(events)
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn driver(&self) -> &RollbackDriver {
        &self.driver
    }

    pub fn game(&self) -> &Match {
        self.driver.game()
    }

    /// Dispose the driver and hand back the session.
    pub fn dispose(mut self) -> Result<S, SessionError> {
        self.driver.dispose()?;
        Ok(self.session)
    }
}
