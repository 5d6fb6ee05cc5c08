//! Rollback session interface
//!
//! The prediction and negotiation algorithm lives outside this crate. A
//! session only has to drive [`SessionCallbacks`]; [`GgrsSession`] adapts the
//! GGRS local, sync-test and P2P sessions to that contract.

mod builder;
mod session;
mod types;


pub use session::GgrsSession;
pub use types::SessionType;

use crate::input::FrameInput;

use super::driver::SessionCallbacks;
use super::events::{SessionError, SessionEvent};

/// An external rollback session, seen from the match side.
pub trait RollbackSession {
    /// Queue input for a local player handle for the next advance.
    fn add_local_input(&mut self, handle: usize, input: FrameInput) -> Result<(), SessionError>;

    /// Advance one frame, issuing save/load/free/advance callbacks as needed.
    fn advance_frame(&mut self, callbacks: &mut dyn SessionCallbacks) -> Result<(), SessionError>;

    /// Handles whose input is sampled on this machine.
    fn local_players(&self) -> &[usize];

    /// Exchange network messages. Sessions without a transport do nothing.
    fn poll(&mut self) {}

    /// Drain pending events.
    fn events(&mut self) -> Vec<SessionEvent> {
        Vec::new()
    }

    /// False while the session is still synchronizing with its peers.
    fn is_running(&self) -> bool {
        true
    }
}
