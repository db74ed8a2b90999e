//! Table reader implementation.
//!
//! Reads every entry of a table file. A file whose footer or index cannot be
//! used is recovered with a raw scan for structure templates instead.

use crate::compression::{self, CompressionType};
use crate::config::Options;
use crate::error::{Error, Result};
use crate::sstable::block::Block;
use crate::sstable::footer::{BlockHandle, Footer};
use crate::sstable::index::IndexBlock;
use crate::sstable::internal_key::{InternalKey, ValueType};
use crate::sstable::scan::scan_structures;
use crate::sstable::{BLOCK_TRAILER_SIZE, FOOTER_SIZE};
use crate::write_batch::WriteOp;
use bytes::Bytes;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// How the entries of a table were recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSource {
    /// Footer, index and data blocks were parsed.
    Parsed,
    /// The file was byte-scanned for structure templates.
    RawScan,
}

/// Everything read from one table file.
#[derive(Debug, Clone)]
pub struct TableContents {
    /// Operations in stored order
    pub ops: Vec<WriteOp>,
    /// How `ops` were obtained
    pub source: TableSource,
    /// Data blocks parsed (at least partially)
    pub blocks_read: usize,
    /// Data blocks skipped because they could not be read
    pub blocks_skipped: usize,
}

/// TableReader provides read access to a `.ldb` / `.sst` file.
///
/// Usage:
/// ```no_run
/// use bedrockdb::sstable::TableReader;
/// use bedrockdb::Options;
///
/// let reader = TableReader::open("000005.ldb", &Options::default()).unwrap();
/// for op in reader.read_entries().unwrap().ops {
///     println!("{:?}", op.key());
/// }
/// ```
#[derive(Debug)]
pub struct TableReader {
    path: PathBuf,
    data: Bytes,
    options: Options,
}

impl TableReader {
    /// Open a table file for reading
    pub fn open<P: AsRef<Path>>(path: P, options: &Options) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = Bytes::from(std::fs::read(&path)?);
        Ok(Self::from_bytes(path, data, options))
    }

    /// Build a reader over table bytes already in memory
    pub fn from_bytes(path: PathBuf, data: Bytes, options: &Options) -> Self {
        Self { path, data, options: options.clone() }
    }

    /// Path the reader was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes
    pub fn file_size(&self) -> usize {
        self.data.len()
    }

    /// Read all entries of the table.
    ///
    /// Structural errors (bad magic, short file, unreadable index) fall back
    /// to the raw scan unless it is disabled in [`Options`].
    pub fn read_entries(&self) -> Result<TableContents> {
        match self.parse() {
            Ok(contents) => Ok(contents),
            Err(e) if e.is_structural() && self.options.raw_scan_fallback => {
                log::warn!("{}: {}, falling back to raw scan", self.path.display(), e);
                let ops = scan_structures(&self.data, &self.options.scan);
                log::debug!("{}: raw scan found {} structures", self.path.display(), ops.len());
                Ok(TableContents { ops, source: TableSource::RawScan, blocks_read: 0, blocks_skipped: 0 })
            }
            Err(e) => Err(e),
        }
    }

    fn parse(&self) -> Result<TableContents> {
        let file_size = self.data.len();
        if file_size < FOOTER_SIZE {
            return Err(Error::corruption(format!(
                "File too small to be a table: {} bytes",
                file_size
            )));
        }

        let footer = Footer::decode(&self.data[file_size - FOOTER_SIZE..])?;
        let index_data = self
            .read_block(&footer.index_handle)
            .map_err(|e| Error::corruption(format!("Unreadable index block: {}", e)))?;
        let index = IndexBlock::new(index_data, self.options.index_block_limits)?;
        let handles = index.handles(self.options.max_block_size);

        let mut contents = TableContents {
            ops: Vec::new(),
            source: TableSource::Parsed,
            blocks_read: 0,
            blocks_skipped: 0,
        };

        for handle in &handles {
            match self.read_data_block(handle, &mut contents.ops) {
                Ok(()) => contents.blocks_read += 1,
                Err(e) => {
                    log::warn!(
                        "{}: skipping block at offset {}: {}",
                        self.path.display(),
                        handle.offset,
                        e
                    );
                    contents.blocks_skipped += 1;
                }
            }
        }

        log::debug!(
            "{}: {} entries from {} blocks ({} skipped)",
            self.path.display(),
            contents.ops.len(),
            contents.blocks_read,
            contents.blocks_skipped
        );
        Ok(contents)
    }

    fn read_data_block(&self, handle: &BlockHandle, ops: &mut Vec<WriteOp>) -> Result<()> {
        let data = self.read_block(handle)?;
        let block = Block::new(data, self.options.data_block_limits)?;

        let mut iter = block.iter();
        for (raw_key, value) in iter.by_ref() {
            let key = InternalKey::decode(&raw_key);
            if key.user_key().is_empty() {
                continue;
            }

            let user_key = Bytes::copy_from_slice(key.user_key());
            ops.push(match key.value_type() {
                ValueType::Value => WriteOp::Put { key: user_key, value },
                ValueType::Deletion => WriteOp::Delete { key: user_key },
            });
        }

        if iter.is_corrupt() {
            log::warn!(
                "{}: block at offset {} truncated by malformed entry",
                self.path.display(),
                handle.offset
            );
        }
        Ok(())
    }

    /// Read a block's contents, decompressed per its trailer tag.
    ///
    /// Layout: `[data: size][compression type: u8][checksum: u32]`
    fn read_block(&self, handle: &BlockHandle) -> Result<Bytes> {
        let end = handle
            .end_offset()
            .and_then(|end| end.checked_add(BLOCK_TRAILER_SIZE as u64))
            .filter(|&end| end <= self.data.len() as u64)
            .ok_or_else(|| {
                Error::corruption(format!(
                    "Block {}+{} outside file of {} bytes",
                    handle.offset,
                    handle.size,
                    self.data.len()
                ))
            })?;

        let start = handle.offset as usize;
        let data_end = end as usize - BLOCK_TRAILER_SIZE;
        let compression = CompressionType::from_tag(self.data[data_end]);
        let raw = self.data.slice(start..data_end);

        Ok(match compression::decompress(&raw, compression, self.options.max_decompressed_size) {
            Cow::Borrowed(_) => raw,
            Cow::Owned(decoded) => Bytes::from(decoded),
        })
    }
}
