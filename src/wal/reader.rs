//! Log reader for replaying `.log` files.

use super::record::{Record, RecordHeader, RecordType, BLOCK_SIZE, HEADER_SIZE};
use crate::config::Options;
use crate::error::{Error, Result};
use crate::write_batch::{WriteBatch, WriteOp};
use bytes::{Bytes, BytesMut};
use std::path::{Path, PathBuf};

/// Everything replayed from one log file.
#[derive(Debug, Clone, Default)]
pub struct LogContents {
    /// Operations of all batches, in log order
    pub ops: Vec<WriteOp>,
    /// Batches decoded (including truncated ones)
    pub batches: usize,
    /// Batches that stopped early or could not be decoded at all
    pub damaged_batches: usize,
    /// Set when a malformed record ended reading before end of file
    pub stopped_early: bool,
}

/// Log reader that reassembles fragmented records into write batches.
pub struct LogReader {
    path: PathBuf,
    data: Bytes,
    /// Current read position
    position: usize,
    max_batch_key_len: usize,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open<P: AsRef<Path>>(path: P, options: &Options) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = Bytes::from(std::fs::read(&path).map_err(Error::Io)?);
        Ok(Self::from_bytes(path, data, options))
    }

    /// Build a reader over log bytes already in memory
    pub fn from_bytes(path: PathBuf, data: Bytes, options: &Options) -> Self {
        Self { path, data, position: 0, max_batch_key_len: options.max_batch_key_len }
    }

    /// Read the next complete logical record.
    ///
    /// Returns None at end of file. Middle or Last fragments without a
    /// preceding First are dropped, as is a pending fragment interrupted by a
    /// new Full or First record. Zero and unknown record types are skipped.
    pub fn read_next(&mut self) -> Result<Option<Bytes>> {
        let mut pending: Option<BytesMut> = None;

        loop {
            let record = match self.read_record() {
                Ok(Some(r)) => r,
                Ok(None) => {
                    if pending.is_some() {
                        log::warn!("{}: incomplete record at end of file", self.path.display());
                    }
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

            match record.record_type() {
                Ok(RecordType::Zero) => {}
                Ok(RecordType::Full) => {
                    if pending.take().is_some() {
                        log::warn!("{}: Full record interrupts fragment", self.path.display());
                    }
                    return Ok(Some(record.data));
                }
                Ok(RecordType::First) => {
                    if pending.is_some() {
                        log::warn!("{}: First record interrupts fragment", self.path.display());
                    }
                    pending = Some(BytesMut::from(&record.data[..]));
                }
                Ok(RecordType::Middle) => match pending.as_mut() {
                    Some(buf) => buf.extend_from_slice(&record.data),
                    None => log::warn!(
                        "{}: dropping Middle record without First at {}",
                        self.path.display(),
                        self.position
                    ),
                },
                Ok(RecordType::Last) => match pending.take() {
                    Some(mut buf) => {
                        buf.extend_from_slice(&record.data);
                        return Ok(Some(buf.freeze()));
                    }
                    None => log::warn!(
                        "{}: dropping Last record without First at {}",
                        self.path.display(),
                        self.position
                    ),
                },
                Err(e) => log::debug!("{}: skipping record: {}", self.path.display(), e),
            }
        }
    }

    /// Read a single physical record
    fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            let block_remaining = BLOCK_SIZE - self.position % BLOCK_SIZE;
            if block_remaining < HEADER_SIZE {
                // Trailer padding
                self.position += block_remaining;
                continue;
            }
            if self.position + HEADER_SIZE > self.data.len() {
                return Ok(None);
            }

            let header =
                RecordHeader::decode(&self.data[self.position..self.position + HEADER_SIZE])?;
            let length = header.length as usize;
            if HEADER_SIZE + length > block_remaining {
                return Err(Error::corruption(format!(
                    "Record of {} bytes at {} crosses block boundary",
                    length, self.position
                )));
            }

            let start = self.position + HEADER_SIZE;
            let end = start + length;
            if end > self.data.len() {
                return Err(Error::corruption(format!(
                    "Record of {} bytes at {} runs past end of file",
                    length, self.position
                )));
            }

            self.position = end;
            return Ok(Some(Record { type_byte: header.type_byte, data: self.data.slice(start..end) }));
        }
    }

    /// Get the current read position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Replay every batch in the file.
    ///
    /// Stops on the first malformed physical record, keeping everything read
    /// before it.
    pub fn read_ops(&mut self) -> LogContents {
        let mut contents = LogContents::default();

        loop {
            let data = match self.read_next() {
                Ok(Some(data)) => data,
                Ok(None) => break,
                Err(e) => {
                    log::warn!(
                        "{}: log corruption at position {}: {}",
                        self.path.display(),
                        self.position,
                        e
                    );
                    contents.stopped_early = true;
                    break;
                }
            };

            match WriteBatch::decode(&data, self.max_batch_key_len) {
                Ok(batch) => {
                    contents.batches += 1;
                    if batch.is_truncated() {
                        contents.damaged_batches += 1;
                    }
                    contents.ops.extend(batch.into_ops());
                }
                Err(e) => {
                    log::warn!("{}: skipping batch: {}", self.path.display(), e);
                    contents.damaged_batches += 1;
                }
            }
        }

        log::debug!(
            "{}: {} operations from {} batches",
            self.path.display(),
            contents.ops.len(),
            contents.batches
        );
        contents
    }
}
