//! Replay recording and playback
//!
//! A replay is the raw input stream of a match. Because the simulation is
//! deterministic, re-stepping a match from the same config with the same
//! inputs reproduces it exactly.
//!
//! # File Structure
//!
//! ```text
//! magic: [0x64, 0x64, 0x44, 0x61]            4 bytes
//! record 0:
//!     checksum: u64 (LE, xxh3 of inputs)     8 bytes
//!     inputs: MAX_PLAYERS × FrameInput      40 bytes
//! record 1:
//!     ...
//! ```
//!
//! Every record is the same width regardless of how many players were in the
//! match, so record `n` always starts at `4 + n * 48` and files are seekable.
//! Each record carries its own checksum; a mismatch means the file is corrupt
//! (or from an incompatible format) and playback must stop.

mod binary;

pub use binary::{ReplayReader, ReplayWriter};

use crate::input::TICK_INPUT_BYTES;

/// File magic.
pub const MAGIC: [u8; 4] = [0x64, 0x64, 0x44, 0x61];

/// Size of a record's checksum field.
pub const CHECKSUM_SIZE: usize = 8;

/// Size of one record: checksum followed by a full input block.
pub const RECORD_SIZE: usize = CHECKSUM_SIZE + TICK_INPUT_BYTES;

/// Checksum stored in front of each input block.
#[inline]
pub fn record_checksum(block: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(block)
}

/// Errors from reading or writing replays.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("replay I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("replay is missing its header")]
    MissingHeader,
    #[error("not a replay file (magic {found:02x?})")]
    InvalidMagic { found: [u8; 4] },
    #[error("record {record} is truncated ({bytes} of {RECORD_SIZE} bytes)")]
    Truncated { record: u64, bytes: usize },
    #[error("checksum mismatch in record {record}: stored {expected:#018x}, computed {actual:#018x}")]
    ChecksumMismatch { record: u64, expected: u64, actual: u64 },
}
