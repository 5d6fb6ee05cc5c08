//! Rollback session events and errors
//!
//! Raw GGRS events are translated into [`SessionEvent`]s the host can act on.

use ggrs::GgrsError;

use crate::replay::ReplayError;
use crate::runtime::MatchError;

/// High-level session events for the application layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake progress with a peer
    Synchronizing {
        addr: String,
        count: u32,
        total: u32,
    },
    /// Connection synchronized with a peer
    Synchronized { addr: String },
    /// A peer disconnected; its inputs are neutral from now on
    Disconnected { addr: String },
    /// Checksums for a confirmed frame differ between peers
    ///
    /// The match cannot recover from this. The session should be terminated.
    Desync {
        frame: i32,
        local_checksum: u64,
        remote_checksum: u64,
    },
    /// Network interrupted with a peer
    NetworkInterrupted {
        addr: String,
        /// Time left before the peer is dropped (ms)
        disconnect_timeout_ms: u64,
    },
    NetworkResumed { addr: String },
    /// Local client is ahead; skipping frames lets peers catch up
    TimeSync { frames_to_skip: u32 },
    /// Prediction window exhausted, waiting for remote input
    WaitingForPlayers,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("GGRS error: {0}")]
    Ggrs(#[from] GgrsError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("replay recording failed: {0}")]
    Replay(#[from] ReplayError),
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
    /// The session asked to load a frame it never saved
    #[error("no snapshot saved for frame {frame}")]
    MissingSnapshot { frame: i32 },
    #[error("desync detected at frame {frame}: local={local_checksum:#x}, remote={remote_checksum:#x}")]
    Desync {
        frame: i32,
        local_checksum: u64,
        remote_checksum: u64,
    },
}

impl SessionEvent {
    /// Whether the host should stop the match after this event.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionEvent::Desync { .. })
    }

    /// Convert a fatal event into the matching error.
    pub fn into_error(self) -> Option<SessionError> {
        match self {
            SessionEvent::Desync {
                frame,
                local_checksum,
                remote_checksum,
            } => Some(SessionError::Desync {
                frame,
                local_checksum,
                remote_checksum,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desync_is_fatal() {
        let event = SessionEvent::Desync {
            frame: 12,
            local_checksum: 0xdead,
            remote_checksum: 0xbeef,
        };
        assert!(event.is_fatal());
        let err = event.into_error().unwrap();
        assert_eq!(
            err.to_string(),
            "desync detected at frame 12: local=0xdead, remote=0xbeef"
        );

        assert!(!SessionEvent::WaitingForPlayers.is_fatal());
        assert!(SessionEvent::WaitingForPlayers.into_error().is_none());
    }
}
