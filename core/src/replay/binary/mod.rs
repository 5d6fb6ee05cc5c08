//! Fixed-width binary replay stream
//!
//! Both halves own their underlying sink/source and hand it back through
//! `into_inner`.

mod reader;
mod writer;

pub use reader::ReplayReader;
pub use writer::ReplayWriter;
