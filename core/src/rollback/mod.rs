//! Rollback integration
//!
//! # Architecture
//!
//! The rollback session (GGRS) decides when to save, load and re-simulate.
//! This module answers those requests:
//!
//! - [`SnapshotStore`]: pooled full-state copies behind generational handles
//! - [`RollbackDriver`]: the save/load/free/advance callbacks over a [`Match`](crate::runtime::Match)
//! - [`RollbackSession`]: the session seen from the match side, with
//!   [`GgrsSession`] adapting GGRS local, sync-test and P2P sessions
//! - [`RollbackMatch`]: host-loop wrapper tying the three together
//!
//! # Snapshot flow
//!
//! 1. GGRS asks for a save: the driver copies the live state into a pooled
//!    snapshot and hands back its handle plus the folded world hash
//! 2. GGRS stores the handle in a reusable cell; when the cell is reused the
//!    old handle is freed back to the pool
//! 3. On a load the snapshot is copied back into the live state, which keeps
//!    its identity, and the following advances re-simulate

mod config;
mod driver;
mod events;
mod session;
mod store;

pub use config::{
    BrawlConfig, DEFAULT_CHECK_DISTANCE, DEFAULT_INPUT_DELAY, DEFAULT_ONLINE_INPUT_DELAY,
    MAX_INPUT_DELAY, MAX_ROLLBACK_FRAMES, STATE_POOL_SIZE, SessionConfig,
};
pub use driver::{RollbackDriver, RollbackMatch, SavedFrame, SessionCallbacks};
pub use events::{SessionError, SessionEvent};
pub use session::{GgrsSession, RollbackSession, SessionType};
pub use store::{SnapshotError, SnapshotHandle, SnapshotStore};
