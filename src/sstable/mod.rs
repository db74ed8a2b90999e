//! Sorted table (`.ldb` / `.sst`) reading.
//!
//! ## File Format
//!
//! ```text
//! [Data Block 1][trailer]
//! [Data Block 2][trailer]
//! ...
//! [Data Block N][trailer]
//! [Meta Blocks]           // ignored
//! [Meta Index Block]      // ignored
//! [Index Block][trailer]  // one handle per data block
//! [Footer: 48B]           // points to the index block
//! ```
//!
//! Each block is followed by a 5-byte trailer:
//! `[compression type: u8][crc: u32]`. The checksum is not verified.
//!
//! ## Index Format
//!
//! The index block uses the ordinary block entry format. Each value is a
//! [`BlockHandle`] encoded as two varint64s: offset and size.

pub mod block;
pub mod footer;
pub mod index;
pub mod internal_key;
pub mod reader;
pub mod scan;

pub use block::{Block, BlockIterator};
pub use footer::{BlockHandle, Footer};
pub use index::IndexBlock;
pub use internal_key::{InternalKey, ValueType};
pub use reader::{TableContents, TableReader, TableSource};
pub use scan::scan_structures;

/// Footer size in bytes (fixed)
pub const FOOTER_SIZE: usize = 48;

/// Size of the trailer after every block: compression type + checksum
pub const BLOCK_TRAILER_SIZE: usize = 5;

/// Magic number at the end of every table file
pub const TABLE_MAGIC_NUMBER: u64 = 0xdb4775248b80fb57;
