//! Sequential reader over a buffer of concatenated GRIB2 records.

use std::collections::VecDeque;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::MessageError;
use crate::message::{parse_record, Grib2Message};

const MAGIC: &[u8; 4] = b"GRIB";

/// Yields one [`Grib2Message`] per field, record after record.
///
/// A failed record is reported once; the reader then skips it using the
/// consumed length from the error, or resynchronizes on the next `GRIB`
/// marker when the length is unknown.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
    record_start: usize,
    pending: VecDeque<Grib2Message>,
}

impl Grib2Reader {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            offset: 0,
            record_start: 0,
            pending: VecDeque::new(),
        }
    }

    /// Reader positioned at `offset`.
    pub fn at(data: Bytes, offset: usize) -> Self {
        Self {
            data,
            offset,
            record_start: offset,
            pending: VecDeque::new(),
        }
    }

    /// Byte offset of the next record to read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Start of the record most recently read, including a failed one.
    pub fn record_offset(&self) -> usize {
        self.record_start
    }

    fn find_magic(&self, from: usize) -> Option<usize> {
        self.data
            .get(from..)?
            .windows(MAGIC.len())
            .position(|w| w == MAGIC)
            .map(|p| from + p)
    }

    /// Next field, `Ok(None)` once the buffer is exhausted.
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>, MessageError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }

        let start = match self.find_magic(self.offset) {
            Some(start) => start,
            None => {
                if self.offset < self.data.len() {
                    debug!(
                        offset = self.offset,
                        bytes = self.data.len() - self.offset,
                        "No further GRIB marker, ignoring trailing bytes"
                    );
                }
                self.offset = self.data.len();
                return Ok(None);
            }
        };
        if start > self.offset {
            debug!(
                offset = self.offset,
                skipped = start - self.offset,
                "Skipping bytes before GRIB marker"
            );
        }
        self.offset = start;
        self.record_start = start;

        match parse_record(&self.data, start) {
            Ok(record) => {
                self.offset = start + record.consumed;
                self.pending.extend(record.messages);
                Ok(self.pending.pop_front())
            }
            Err(err) => {
                match err.consumed {
                    Some(consumed) => self.offset = start + consumed,
                    None => {
                        warn!(offset = start, error = %err, "Record length unknown, resynchronizing");
                        self.offset = start + 1;
                    }
                }
                Err(err)
            }
        }
    }
}

impl Iterator for Grib2Reader {
    type Item = Result<Grib2Message, MessageError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_message().transpose()
    }
}
