//! Block format implementation.
//!
//! Data blocks and index blocks share one layout. Keys are prefix-compressed
//! against the entry immediately before them; restart points are read only
//! to locate the end of the entries.

use crate::config::BlockLimits;
use crate::error::{Error, Result};
use crate::varint::read_varint32;
use bytes::Bytes;

/// Block stores key-value pairs with prefix compression.
///
/// Format:
/// ```text
/// [Entry 1]
/// [Entry 2]
/// ...
/// [Entry N]
/// [Restart Point 1: u32]
/// ...
/// [Restart Point M: u32]
/// [Num Restarts: u32]
/// ```
///
/// Each entry format:
/// ```text
/// [shared_key_len: varint32]    // Length of shared prefix with previous key
/// [unshared_key_len: varint32]  // Length of unshared key suffix
/// [value_len: varint32]         // Length of value
/// [unshared_key: bytes]         // Key suffix
/// [value: bytes]                // Value data
/// ```
#[derive(Debug, Clone)]
pub struct Block {
    data: Bytes,
    restart_offset: usize,
    num_restarts: u32,
    limits: BlockLimits,
}

impl Block {
    /// Create a new Block from raw (decompressed) data
    pub fn new(data: Bytes, limits: BlockLimits) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::corruption("Block too small"));
        }

        let tail = &data[data.len() - 4..];
        let num_restarts = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        if num_restarts > limits.max_restarts {
            return Err(Error::corruption(format!(
                "Implausible restart count: {}",
                num_restarts
            )));
        }

        // restart_offset = data_len - 4 (num_restarts) - 4 * num_restarts (restart points)
        let restart_offset = (data.len() - 4)
            .checked_sub(num_restarts as usize * 4)
            .ok_or_else(|| Error::corruption("Invalid restart offset"))?;

        Ok(Self { data, restart_offset, num_restarts, limits })
    }

    /// Get the number of restart points
    pub fn num_restarts(&self) -> u32 {
        self.num_restarts
    }

    /// Get the raw data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Create an iterator over the block's entries
    pub fn iter(&self) -> BlockIterator {
        BlockIterator::new(self.clone())
    }
}

/// Iterator over entries in a block.
///
/// Yields `(key, value)` pairs in stored order and stops at the first entry
/// whose lengths are implausible or would read past the entry region.
/// Entries before that point are still produced.
#[derive(Debug)]
pub struct BlockIterator {
    block: Block,
    current: usize,
    key: Vec<u8>,
    corrupt: bool,
}

impl BlockIterator {
    fn new(block: Block) -> Self {
        Self { block, current: 0, key: Vec::new(), corrupt: false }
    }

    /// Returns true if iteration stopped on a malformed entry rather than at
    /// the end of the block.
    pub fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    fn parse_next_entry(&mut self) -> Option<(Vec<u8>, Bytes)> {
        let end = self.block.restart_offset;
        if self.current >= end {
            return None;
        }

        let data = &self.block.data[..end];
        let limits = &self.block.limits;

        let (shared, pos) = read_varint32(data, self.current);
        let (unshared, pos) = read_varint32(data, pos);
        let (value_len, pos) = read_varint32(data, pos);
        let (shared, unshared, value_len) = (shared as usize, unshared as usize, value_len as usize);

        if shared > limits.max_shared_len
            || unshared > limits.max_unshared_len
            || value_len > limits.max_value_len
        {
            log::debug!(
                "Implausible block entry at {}: shared={} unshared={} value={}",
                self.current,
                shared,
                unshared,
                value_len
            );
            return self.stop();
        }
        if shared > self.key.len() {
            log::debug!("Shared prefix {} longer than previous key {}", shared, self.key.len());
            return self.stop();
        }
        if pos + unshared + value_len > end {
            log::debug!("Block entry at {} overruns block", self.current);
            return self.stop();
        }

        // Reconstruct key
        self.key.truncate(shared);
        self.key.extend_from_slice(&data[pos..pos + unshared]);

        let value_start = pos + unshared;
        let value = self.block.data.slice(value_start..value_start + value_len);

        self.current = value_start + value_len;
        Some((self.key.clone(), value))
    }

    fn stop(&mut self) -> Option<(Vec<u8>, Bytes)> {
        self.corrupt = true;
        self.current = self.block.restart_offset;
        None
    }
}

impl Iterator for BlockIterator {
    type Item = (Vec<u8>, Bytes);

    fn next(&mut self) -> Option<Self::Item> {
        self.parse_next_entry()
    }
}
