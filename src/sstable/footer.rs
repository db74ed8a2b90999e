//! Table footer implementation.
//!
//! The footer is a fixed-size (48 bytes) structure at the end of a table file
//! that contains pointers to the index block and meta index block.

use crate::error::{Error, Result};
use crate::sstable::{FOOTER_SIZE, TABLE_MAGIC_NUMBER};
use crate::varint::read_varint64;

/// BlockHandle represents a pointer to a block in the table file.
///
/// The size excludes the 5-byte block trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    /// Offset of the block in the file
    pub offset: u64,
    /// Size of the block in bytes
    pub size: u64,
}

impl BlockHandle {
    /// Create a new BlockHandle
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Decode a BlockHandle (two varint64s) starting at `pos`.
    ///
    /// Returns the handle and the position after it.
    pub fn decode_from(data: &[u8], pos: usize) -> (Self, usize) {
        let (offset, pos) = read_varint64(data, pos);
        let (size, pos) = read_varint64(data, pos);
        (Self { offset, size }, pos)
    }

    /// Get the end offset of this block, excluding the trailer
    pub fn end_offset(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }
}

/// Footer is the last 48 bytes of a table file.
///
/// Format:
/// ```text
/// [meta_index_handle: 2 x varint64]
/// [index_handle: 2 x varint64]
/// [padding up to byte 40]
/// [magic: u64 le]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    /// Handle to the meta index block (unused by this reader)
    pub meta_index_handle: BlockHandle,
    /// Handle to the index block
    pub index_handle: BlockHandle,
}

impl Footer {
    /// Decode a footer from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != FOOTER_SIZE {
            return Err(Error::corruption(format!(
                "Footer size mismatch: expected {}, got {}",
                FOOTER_SIZE,
                data.len()
            )));
        }

        let mut magic_bytes = [0u8; 8];
        magic_bytes.copy_from_slice(&data[40..48]);
        let magic = u64::from_le_bytes(magic_bytes);
        if magic != TABLE_MAGIC_NUMBER {
            return Err(Error::BadMagic { expected: TABLE_MAGIC_NUMBER, actual: magic });
        }

        // Handles live in the first 40 bytes; never read into the magic.
        let handles = &data[..40];
        let (meta_index_handle, pos) = BlockHandle::decode_from(handles, 0);
        let (index_handle, _) = BlockHandle::decode_from(handles, pos);

        Ok(Self { meta_index_handle, index_handle })
    }
}
