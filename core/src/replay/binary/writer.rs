//! Replay writer

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::input::{TickInputs, tick_bytes};
use crate::replay::{MAGIC, ReplayError, record_checksum};

/// Appends one checksummed record per tick to a sink.
pub struct ReplayWriter<W: Write> {
    writer: W,
    records: u64,
}

impl<W: Write> ReplayWriter<W> {
    /// Take ownership of `writer` and write the file magic.
    pub fn new(mut writer: W) -> Result<Self, ReplayError> {
        writer.write_all(&MAGIC)?;
        Ok(Self { writer, records: 0 })
    }

    /// Write one tick's inputs. The record is flushed before returning so
    /// records are never batched across ticks.
    pub fn write_inputs(&mut self, inputs: &TickInputs) -> Result<(), ReplayError> {
        let block = tick_bytes(inputs);
        self.writer.write_u64::<LittleEndian>(record_checksum(block))?;
        self.writer.write_all(block)?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> Result<(), ReplayError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Flush and hand back the sink.
    pub fn into_inner(mut self) -> Result<W, ReplayError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
