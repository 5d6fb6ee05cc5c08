//! Session kinds and the GGRS session each one wraps

use ggrs::{P2PSession, SyncTestSession};

use crate::input::FrameInput;

use super::super::config::BrawlConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    /// All players on this machine, never rolls back
    Local,
    /// All players on this machine, rolls back every tick to check determinism
    SyncTest,
    /// Remote peers over a host-supplied socket
    P2P,
}

/// The GGRS session behind a [`SessionType`]. Large variants are boxed.
pub(super) enum SessionInner {
    /// Bypasses GGRS: each advance applies the inputs added since the last one
    Local {
        current_frame: i32,
        /// Latest input per handle
        stored_inputs: Vec<FrameInput>,
    },
    SyncTest {
        session: Box<SyncTestSession<BrawlConfig>>,
        current_frame: i32,
    },
    P2P(Box<P2PSession<BrawlConfig>>),
}
