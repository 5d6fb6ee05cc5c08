//! GGRS adapter: request translation, input mapping and event conversion

use ggrs::{GgrsEvent, GgrsRequest, InputStatus, NetworkStats, SessionState};
use smallvec::SmallVec;

use crate::config::MAX_PLAYERS;
use crate::input::{EMPTY_TICK, FrameInput, TickInputs};

use super::super::config::{BrawlConfig, SessionConfig};
use super::super::driver::SessionCallbacks;
use super::super::events::{SessionError, SessionEvent};
use super::RollbackSession;
use super::types::{SessionInner, SessionType};

/// GGRS session adapter
///
/// Wraps GGRS session types behind [`RollbackSession`]. Player handles are
/// GGRS handles; `slots[handle]` is the player id whose input buffer slot
/// the handle's input fills.
pub struct GgrsSession {
    pub(super) inner: SessionInner,
    pub(super) session_type: SessionType,
    pub(super) config: SessionConfig,
    pub(super) slots: SmallVec<[u8; MAX_PLAYERS]>,
    pub(super) local_players: Vec<usize>,
    /// Set between a load and the end of the request batch
    pub(super) rolling_back: bool,
    pub(super) total_rollback_frames: u64,
    pub(super) desync_detected: bool,
}

impl GgrsSession {
    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Player id for each handle.
    pub fn slots(&self) -> &[u8] {
        &self.slots
    }

    pub fn current_frame(&self) -> i32 {
        match &self.inner {
            SessionInner::Local { current_frame, .. } => *current_frame,
            SessionInner::SyncTest { current_frame, .. } => *current_frame,
            SessionInner::P2P(session) => session.current_frame(),
        }
    }

    /// Peer handshake state; `None` for sessions without peers.
    pub fn session_state(&self) -> Option<SessionState> {
        match &self.inner {
            SessionInner::P2P(session) => Some(session.current_state()),
            _ => None,
        }
    }

    /// Ping, queue and bandwidth figures for a remote handle.
    pub fn network_stats(&self, handle: usize) -> Option<NetworkStats> {
        match &self.inner {
            SessionInner::P2P(session) => session.network_stats(handle).ok(),
            _ => None,
        }
    }

    pub fn total_rollback_frames(&self) -> u64 {
        self.total_rollback_frames
    }

    pub fn has_desync(&self) -> bool {
        self.desync_detected
    }

    /// Build the full input block from per-handle inputs.
    ///
    /// Disconnected handles contribute neutral input; slots with no handle
    /// stay zeroed.
    pub fn sync_input(&self, inputs: &[(FrameInput, InputStatus)]) -> TickInputs {
        let mut block = EMPTY_TICK;
        for (handle, (input, status)) in inputs.iter().enumerate() {
            let Some(&player_id) = self.slots.get(handle) else {
                continue;
            };
            block[player_id as usize] = match status {
                InputStatus::Disconnected => FrameInput::default(),
                _ => *input,
            };
        }
        block
    }

    /// Translate GGRS requests into driver callbacks, in order.
    pub fn handle_requests(
        &mut self,
        requests: Vec<GgrsRequest<BrawlConfig>>,
        callbacks: &mut dyn SessionCallbacks,
    ) -> Result<(), SessionError> {
        let mut rollback_frames = 0u64;

        for request in requests {
            match request {
                GgrsRequest::SaveGameState { cell, frame } => {
                    // Cells are reused; the token they held is unreachable once overwritten.
                    if let Some(previous) = cell.load() {
                        callbacks.free_buffer(previous);
                    }
                    let saved = callbacks.save_game_state(frame)?;
                    cell.save(frame, Some(saved.token), Some(saved.checksum as u128));
                }
                GgrsRequest::LoadGameState { cell, frame } => {
                    self.rolling_back = true;
                    let token = cell.load().ok_or(SessionError::MissingSnapshot { frame })?;
                    callbacks.load_game_state(token)?;
                }
                GgrsRequest::AdvanceFrame { inputs } => {
                    if self.rolling_back {
                        rollback_frames += 1;
                    }
                    let block = self.sync_input(&inputs);
                    callbacks.advance_frame(&block)?;
                }
            }
        }

        self.rolling_back = false;
        if rollback_frames > 0 {
            self.total_rollback_frames += rollback_frames;
            tracing::trace!(rollback_frames, "re-simulated frames");
        }
        Ok(())
    }

    /// Drain pending peer events. Only P2P sessions produce any; a desync is
    /// also latched in [`has_desync`](Self::has_desync).
    pub fn handle_events(&mut self) -> Vec<SessionEvent> {
        let raw_events: Vec<GgrsEvent<BrawlConfig>> = match &mut self.inner {
            SessionInner::P2P(session) => session.events().collect(),
            _ => return Vec::new(),
        };

        let mut session_events = Vec::with_capacity(raw_events.len());
        for event in raw_events {
            let event = match event {
                GgrsEvent::Synchronizing { addr, total, count } => {
                    tracing::debug!(%addr, count, total, "synchronizing");
                    SessionEvent::Synchronizing { addr, count, total }
                }
                GgrsEvent::Synchronized { addr } => {
                    tracing::info!(%addr, "peer synchronized");
                    SessionEvent::Synchronized { addr }
                }
                GgrsEvent::Disconnected { addr } => {
                    tracing::warn!(%addr, "peer disconnected, substituting neutral input");
                    SessionEvent::Disconnected { addr }
                }
                GgrsEvent::NetworkInterrupted {
                    addr,
                    disconnect_timeout,
                } => {
                    let disconnect_timeout_ms = disconnect_timeout as u64;
                    tracing::warn!(%addr, disconnect_timeout_ms, "connection interrupted");
                    SessionEvent::NetworkInterrupted {
                        addr,
                        disconnect_timeout_ms,
                    }
                }
                GgrsEvent::NetworkResumed { addr } => {
                    tracing::info!(%addr, "connection resumed");
                    SessionEvent::NetworkResumed { addr }
                }
                GgrsEvent::WaitRecommendation { skip_frames } => {
                    tracing::debug!(skip_frames, "peer is behind, recommending a wait");
                    SessionEvent::TimeSync {
                        frames_to_skip: skip_frames,
                    }
                }
                GgrsEvent::DesyncDetected {
                    frame,
                    local_checksum,
                    remote_checksum,
                    addr,
                } => {
                    tracing::error!(
                        %addr,
                        frame,
                        local = format_args!("{local_checksum:#x}"),
                        remote = format_args!("{remote_checksum:#x}"),
                        "desync detected"
                    );
                    self.desync_detected = true;
                    SessionEvent::Desync {
                        frame,
                        local_checksum: local_checksum as u64,
                        remote_checksum: remote_checksum as u64,
                    }
                }
            };
            session_events.push(event);
        }
        session_events
    }
}

impl RollbackSession for GgrsSession {
    fn add_local_input(&mut self, handle: usize, input: FrameInput) -> Result<(), SessionError> {
        match &mut self.inner {
            SessionInner::Local { stored_inputs, .. } => {
                if let Some(slot) = stored_inputs.get_mut(handle) {
                    *slot = input;
                }
                Ok(())
            }
            SessionInner::SyncTest { session, .. } => Ok(session.add_local_input(handle, input)?),
            SessionInner::P2P(session) => Ok(session.add_local_input(handle, input)?),
        }
    }

    fn advance_frame(&mut self, callbacks: &mut dyn SessionCallbacks) -> Result<(), SessionError> {
        let requests = match &mut self.inner {
            SessionInner::Local {
                current_frame,
                stored_inputs,
            } => {
                *current_frame += 1;
                let inputs: Vec<(FrameInput, InputStatus)> = stored_inputs
                    .iter()
                    .map(|input| (*input, InputStatus::Confirmed))
                    .collect();
                vec![GgrsRequest::AdvanceFrame { inputs }]
            }
            SessionInner::SyncTest {
                session,
                current_frame,
            } => {
                let requests = session.advance_frame()?;
                *current_frame += 1;
                requests
            }
            SessionInner::P2P(session) => session.advance_frame()?,
        };
        self.handle_requests(requests, callbacks)
    }

    fn local_players(&self) -> &[usize] {
        &self.local_players
    }

    fn poll(&mut self) {
        if let SessionInner::P2P(session) = &mut self.inner {
            session.poll_remote_clients();
        }
    }

    fn events(&mut self) -> Vec<SessionEvent> {
        self.handle_events()
    }

    fn is_running(&self) -> bool {
        self.session_state()
            .is_none_or(|state| state == SessionState::Running)
    }
}
