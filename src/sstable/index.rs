//! Index block implementation for sorted tables.
//!
//! The index block maps separator keys to data blocks. Only the handles are
//! used here; every data block is read in index order.

use crate::config::BlockLimits;
use crate::error::Result;
use crate::sstable::block::Block;
use crate::sstable::footer::BlockHandle;
use bytes::Bytes;

/// IndexEntry represents a single entry in the index block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Separator key (at least the largest key of the data block)
    pub key: Vec<u8>,
    /// Handle to the data block
    pub handle: BlockHandle,
}

/// IndexBlock lists the data blocks of a table.
#[derive(Debug)]
pub struct IndexBlock {
    block: Block,
}

impl IndexBlock {
    /// Create a new IndexBlock from raw (decompressed) data
    pub fn new(data: Bytes, limits: BlockLimits) -> Result<Self> {
        let block = Block::new(data, limits)?;
        Ok(Self { block })
    }

    /// All entries in stored order.
    ///
    /// Entries with an empty value carry no handle and are skipped.
    pub fn entries(&self) -> Vec<IndexEntry> {
        let mut iter = self.block.iter();
        let entries: Vec<IndexEntry> = iter
            .by_ref()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| {
                let (handle, _) = BlockHandle::decode_from(&value, 0);
                IndexEntry { key, handle }
            })
            .collect();

        if iter.is_corrupt() {
            log::warn!("Index block truncated after {} entries", entries.len());
        }
        entries
    }

    /// Data block handles worth reading.
    ///
    /// Handles of size zero or of at least `max_block_size` are dropped.
    pub fn handles(&self, max_block_size: u64) -> Vec<BlockHandle> {
        self.entries()
            .into_iter()
            .map(|entry| entry.handle)
            .filter(|handle| handle.size > 0 && handle.size < max_block_size)
            .collect()
    }
}
