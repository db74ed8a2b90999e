// Shared fixture writers for integration tests.
// They produce table and log files in the on-disk layout Bedrock uses.

#![allow(dead_code)]

use bedrockdb::varint::{encode_varint32, encode_varint64};
use bedrockdb::wal::{BLOCK_SIZE, HEADER_SIZE};
use bedrockdb::{CompressionType, WriteBatch};
use std::io::Write;
use std::path::Path;

/// Table magic number written into the footer
pub const TABLE_MAGIC: u64 = 0xdb4775248b80fb57;

/// Value of the structure used by the end-to-end scenarios
pub const HOUSE_PAYLOAD: [u8; 12] = [0x01, 0, 0, 0, 0x04, 0, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD];

pub fn init_logging() {
    env_logger::try_init().ok();
}

/// Builds a table file in memory.
///
/// Entries are written in the order added; every key is prefix-compressed
/// against the entry before it.
pub struct TableBuilder {
    buf: Vec<u8>,
    block_entries: Vec<(Vec<u8>, Vec<u8>)>,
    block_bytes: usize,
    index: Vec<(Vec<u8>, u64, u64)>,
    block_size: usize,
    compression: CompressionType,
    sequence: u64,
    magic: u64,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            block_entries: Vec::new(),
            block_bytes: 0,
            index: Vec::new(),
            block_size: 4096,
            compression: CompressionType::None,
            sequence: 1,
            magic: TABLE_MAGIC,
        }
    }

    /// Set the block size (default: 4KB)
    pub fn set_block_size(&mut self, size: usize) {
        self.block_size = size;
    }

    /// Set the compression type for data blocks
    pub fn set_compression(&mut self, compression: CompressionType) {
        self.compression = compression;
    }

    /// Write a different magic number into the footer
    pub fn set_magic(&mut self, magic: u64) {
        self.magic = magic;
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.add(key, 1, value);
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.add(key, 0, b"");
    }

    fn add(&mut self, user_key: &[u8], kind: u8, value: &[u8]) {
        let mut key = user_key.to_vec();
        key.extend_from_slice(&((self.sequence << 8) | kind as u64).to_le_bytes());
        self.sequence += 1;

        self.block_bytes += key.len() + value.len();
        self.block_entries.push((key, value.to_vec()));
        if self.block_bytes >= self.block_size {
            self.flush_data_block();
        }
    }

    fn flush_data_block(&mut self) {
        if self.block_entries.is_empty() {
            return;
        }
        let entries = std::mem::take(&mut self.block_entries);
        self.block_bytes = 0;

        let last_key = entries.last().map(|(k, _)| k.clone()).unwrap_or_default();
        let block = encode_block(&entries);
        let compressed = compress(&block, self.compression);
        let offset = self.buf.len() as u64;
        self.buf.extend_from_slice(&compressed);
        self.buf.push(tag(self.compression));
        self.buf.extend_from_slice(&[0u8; 4]);
        self.index.push((last_key, offset, compressed.len() as u64));
    }

    /// Finish the table: index block and footer.
    pub fn finish(mut self) -> Vec<u8> {
        self.flush_data_block();

        let index_entries: Vec<(Vec<u8>, Vec<u8>)> = self
            .index
            .iter()
            .map(|(key, offset, size)| {
                let mut handle = Vec::new();
                encode_varint64(&mut handle, *offset);
                encode_varint64(&mut handle, *size);
                (key.clone(), handle)
            })
            .collect();
        let index_block = encode_block(&index_entries);
        let index_offset = self.buf.len() as u64;
        self.buf.extend_from_slice(&index_block);
        self.buf.push(0);
        self.buf.extend_from_slice(&[0u8; 4]);

        let mut footer = Vec::with_capacity(48);
        encode_varint64(&mut footer, 0);
        encode_varint64(&mut footer, 0);
        encode_varint64(&mut footer, index_offset);
        encode_varint64(&mut footer, index_block.len() as u64);
        footer.resize(40, 0);
        footer.extend_from_slice(&self.magic.to_le_bytes());
        self.buf.extend_from_slice(&footer);
        self.buf
    }

    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.finish()).unwrap();
    }
}

/// Encodes entries in the block format with one restart point.
pub fn encode_block(entries: &[(Vec<u8>, Vec<u8>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut last_key: &[u8] = &[];
    for (key, value) in entries {
        let shared = last_key.iter().zip(key.iter()).take_while(|(a, b)| a == b).count();
        encode_varint32(&mut buf, shared as u32);
        encode_varint32(&mut buf, (key.len() - shared) as u32);
        encode_varint32(&mut buf, value.len() as u32);
        buf.extend_from_slice(&key[shared..]);
        buf.extend_from_slice(value);
        last_key = key;
    }
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf
}

fn tag(compression: CompressionType) -> u8 {
    match compression {
        CompressionType::None => 0,
        CompressionType::Snappy => 1,
        CompressionType::Zlib => 2,
        CompressionType::Lz4 => 4,
        CompressionType::Zstd => 7,
        CompressionType::Unknown(tag) => tag,
    }
}

fn compress(data: &[u8], compression: CompressionType) -> Vec<u8> {
    match compression {
        CompressionType::Snappy => snap::raw::Encoder::new().compress_vec(data).unwrap(),
        CompressionType::Zlib => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        CompressionType::Lz4 => lz4::block::compress(data, None, true).unwrap(),
        _ => data.to_vec(),
    }
}

/// Builds a log file in memory, fragmenting records across 32 KiB blocks.
#[derive(Default)]
pub struct LogWriter {
    buf: Vec<u8>,
}

impl LogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch as one logical record
    pub fn add_batch(&mut self, batch: &WriteBatch) {
        self.append(&batch.encode());
    }

    /// Append a logical record, split into fragments as needed.
    pub fn append(&mut self, data: &[u8]) {
        let mut rest = data;
        let mut first = true;
        loop {
            let left = BLOCK_SIZE - self.buf.len() % BLOCK_SIZE;
            if left < HEADER_SIZE {
                self.buf.resize(self.buf.len() + left, 0);
                continue;
            }
            let n = rest.len().min(left - HEADER_SIZE);
            let last = n == rest.len();
            let kind = match (first, last) {
                (true, true) => 1,
                (true, false) => 2,
                (false, false) => 3,
                (false, true) => 4,
            };
            self.add_raw_record(kind, &rest[..n]);
            rest = &rest[n..];
            first = false;
            if last {
                break;
            }
        }
    }

    /// Append one physical record without any fragmentation
    pub fn add_raw_record(&mut self, kind: u8, data: &[u8]) {
        self.buf.extend_from_slice(&[0u8; 4]);
        self.buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
        self.buf.push(kind);
        self.buf.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.buf).unwrap();
    }
}

pub fn batch(puts: &[(&[u8], &[u8])], deletes: &[&[u8]]) -> WriteBatch {
    let mut batch = WriteBatch::new();
    for (key, value) in puts {
        batch.put(key, value);
    }
    for key in deletes {
        batch.delete(key);
    }
    batch
}
