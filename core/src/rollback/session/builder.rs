//! Session constructors
//!
//! Handles are assigned in match-config player order: handle `h` drives the
//! input slot of `match_config.players[h].player_id`.

use ggrs::{NonBlockingSocket, PlayerType, SessionBuilder};
use smallvec::SmallVec;

use crate::config::{MAX_PLAYERS, MatchConfig};
use crate::input::FrameInput;

use super::super::config::{BrawlConfig, SessionConfig};
use super::super::events::SessionError;
use super::session::GgrsSession;
use super::types::{SessionInner, SessionType};

fn slots(match_config: &MatchConfig) -> SmallVec<[u8; MAX_PLAYERS]> {
    match_config.players.iter().map(|player| player.player_id).collect()
}

impl GgrsSession {
    fn with_inner(
        inner: SessionInner,
        session_type: SessionType,
        config: SessionConfig,
        match_config: &MatchConfig,
        local_players: Vec<usize>,
    ) -> Self {
        Self {
            inner,
            session_type,
            config,
            slots: slots(match_config),
            local_players,
            rolling_back: false,
            total_rollback_frames: 0,
            desync_detected: false,
        }
    }

    /// Every handle local, every advance confirmed at once, no snapshots.
    pub fn new_local(match_config: &MatchConfig) -> Self {
        let num_players = match_config.player_count();
        Self::with_inner(
            SessionInner::Local {
                current_frame: 0,
                stored_inputs: vec![FrameInput::default(); num_players],
            },
            SessionType::Local,
            SessionConfig::local(num_players),
            match_config,
            (0..num_players).collect(),
        )
    }

    /// Every handle local. Each advance rewinds `check_distance` frames,
    /// re-simulates them and fails if any checksum changed.
    pub fn new_sync_test(
        mut config: SessionConfig,
        match_config: &MatchConfig,
    ) -> Result<Self, SessionError> {
        config.num_players = match_config.player_count();
        config.validate()?;
        let session = SessionBuilder::<BrawlConfig>::new()
            .with_num_players(config.num_players)
            .with_max_prediction_window(config.max_prediction_frames)
            .with_input_delay(config.input_delay)
            .with_check_distance(config.check_distance)
            .start_synctest_session()?;

        let local_players = (0..config.num_players).collect();
        Ok(Self::with_inner(
            SessionInner::SyncTest {
                session: Box::new(session),
                current_frame: 0,
            },
            SessionType::SyncTest,
            config,
            match_config,
            local_players,
        ))
    }

    /// Networked session over `socket`. `players` pairs each handle with its
    /// GGRS player type; the `Local` ones are sampled by the host.
    pub fn new_p2p<Sock>(
        mut config: SessionConfig,
        match_config: &MatchConfig,
        socket: Sock,
        players: Vec<(usize, PlayerType<String>)>,
    ) -> Result<Self, SessionError>
    where
        Sock: NonBlockingSocket<String> + 'static,
    {
        config.num_players = match_config.player_count();
        config.validate()?;
        let mut builder = SessionBuilder::<BrawlConfig>::new()
            .with_num_players(config.num_players)
            .with_max_prediction_window(config.max_prediction_frames)
            .with_input_delay(config.input_delay)
            .with_fps(config.fps)?
            .with_disconnect_timeout(config.disconnect_timeout)
            .with_disconnect_notify_delay(config.disconnect_notify_start);

        let mut local_players = Vec::new();
        for (handle, player_type) in players {
            if matches!(player_type, PlayerType::Local) {
                local_players.push(handle);
            }
            builder = builder.add_player(player_type, handle)?;
        }

        let session = builder.start_p2p_session(socket)?;
        tracing::info!(
            players = config.num_players,
            local = local_players.len(),
            input_delay = config.input_delay,
            "P2P session started"
        );

        Ok(Self::with_inner(
            SessionInner::P2P(Box::new(session)),
            SessionType::P2P,
            config,
            match_config,
            local_players,
        ))
    }
}
