//! Replay reader

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};

use crate::input::{TICK_INPUT_BYTES, TickInputs, tick_from_bytes};
use crate::replay::{CHECKSUM_SIZE, MAGIC, RECORD_SIZE, ReplayError, record_checksum};

/// Reads and verifies records from a replay source.
#[derive(Debug)]
pub struct ReplayReader<R: Read> {
    reader: R,
    records: u64,
    failed: bool,
}

impl<R: Read> ReplayReader<R> {
    /// Take ownership of `reader` and validate the file magic.
    pub fn new(mut reader: R) -> Result<Self, ReplayError> {
        let mut magic = [0u8; 4];
        if read_full(&mut reader, &mut magic)? < magic.len() {
            return Err(ReplayError::MissingHeader);
        }
        if magic != MAGIC {
            return Err(ReplayError::InvalidMagic { found: magic });
        }
        Ok(Self {
            reader,
            records: 0,
            failed: false,
        })
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` at a clean end of stream. A partial record or a
    /// checksum mismatch is an error; the reader does not retry or skip.
    pub fn read_inputs(&mut self) -> Result<Option<TickInputs>, ReplayError> {
        let mut record = [0u8; RECORD_SIZE];
        let read = read_full(&mut self.reader, &mut record)?;
        if read == 0 {
            return Ok(None);
        }
        if read < RECORD_SIZE {
            return Err(ReplayError::Truncated {
                record: self.records,
                bytes: read,
            });
        }

        let expected = LittleEndian::read_u64(&record[..CHECKSUM_SIZE]);
        let mut block = [0u8; TICK_INPUT_BYTES];
        block.copy_from_slice(&record[CHECKSUM_SIZE..]);
        let actual = record_checksum(&block);
        if expected != actual {
            return Err(ReplayError::ChecksumMismatch {
                record: self.records,
                expected,
                actual,
            });
        }

        self.records += 1;
        Ok(Some(tick_from_bytes(&block)))
    }

    /// Index of the next record to be read.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> ReplayReader<R> {
    /// Position the reader at record `index`.
    pub fn seek_record(&mut self, index: u64) -> Result<(), ReplayError> {
        let offset = MAGIC.len() as u64 + index * RECORD_SIZE as u64;
        self.reader.seek(SeekFrom::Start(offset))?;
        self.records = index;
        self.failed = false;
        Ok(())
    }

    /// Number of complete records in the stream. The read position is preserved.
    pub fn record_count(&mut self) -> Result<u64, ReplayError> {
        let position = self.reader.stream_position()?;
        let end = self.reader.seek(SeekFrom::End(0))?;
        self.reader.seek(SeekFrom::Start(position))?;
        Ok(end.saturating_sub(MAGIC.len() as u64) / RECORD_SIZE as u64)
    }
}

/// Yields records until the end of the stream or the first error.
impl<R: Read> Iterator for ReplayReader<R> {
    type Item = Result<TickInputs, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_inputs() {
            Ok(Some(inputs)) => Some(Ok(inputs)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Read until `buf` is full or the source is exhausted. Returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
