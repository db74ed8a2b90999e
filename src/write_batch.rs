//! Write batches as stored in log records.
//!
//! Each logical log record holds one batch of put and delete operations.
//!
//! ## Format
//!
//! ```text
//! [sequence: u64 le][count: u32 le]
//! count x {
//!     [type: u8]                  // 1 = put, 0 = delete
//!     [key_len: varint32][key]
//!     [value_len: varint32][value] // puts only
//! }
//! ```
//!
//! # Example
//!
//! ```rust
//! use bedrockdb::{WriteBatch, WriteOp};
//!
//! let mut batch = WriteBatch::new();
//! batch.put(b"key1", b"value1");
//! batch.delete(b"key2");
//!
//! let decoded = WriteBatch::decode(&batch.encode().into(), 10_000).unwrap();
//! assert_eq!(decoded.len(), 2);
//! assert!(matches!(decoded.iter().next(), Some(WriteOp::Put { .. })));
//! ```

use crate::error::{Error, Result};
use crate::varint::{encode_varint32, read_varint32};
use bytes::{Buf, Bytes};

/// Size of the batch header (sequence + count)
pub const BATCH_HEADER_SIZE: usize = 12;

const TYPE_DELETE: u8 = 0;
const TYPE_PUT: u8 = 1;

/// A single put or delete, as read from a table or a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Put operation with key and value
    Put {
        /// Key to insert
        key: Bytes,
        /// Value to associate with the key
        value: Bytes,
    },
    /// Delete operation with key
    Delete {
        /// Key to delete
        key: Bytes,
    },
}

impl WriteOp {
    /// The key this operation applies to
    pub fn key(&self) -> &Bytes {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }

    /// The value of a put, `None` for a delete
    pub fn value(&self) -> Option<&Bytes> {
        match self {
            WriteOp::Put { value, .. } => Some(value),
            WriteOp::Delete { .. } => None,
        }
    }
}

/// WriteBatch is a sequence of operations applied together.
///
/// Decoding keeps every operation read before an inconsistency; such a
/// batch reports [`WriteBatch::is_truncated`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    sequence: u64,
    declared_count: u32,
    operations: Vec<WriteOp>,
    truncated: bool,
}

impl WriteBatch {
    /// Creates a new empty WriteBatch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sequence number written by [`WriteBatch::encode`].
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Adds a Put operation to the batch.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.operations.push(WriteOp::Put {
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
        });
        self.declared_count += 1;
    }

    /// Adds a Delete operation to the batch.
    pub fn delete(&mut self, key: &[u8]) {
        self.operations.push(WriteOp::Delete { key: Bytes::copy_from_slice(key) });
        self.declared_count += 1;
    }

    /// Decodes a batch from a logical log record.
    ///
    /// Fails only when the 12-byte header is missing. Entries are validated
    /// one by one: a key length outside `1..=max_key_len`, an unknown type
    /// byte, or a length running past the record ends decoding.
    pub fn decode(data: &Bytes, max_key_len: usize) -> Result<Self> {
        if data.len() < BATCH_HEADER_SIZE {
            return Err(Error::corruption(format!(
                "Write batch too short: {} bytes",
                data.len()
            )));
        }

        let mut header = &data[..BATCH_HEADER_SIZE];
        let sequence = header.get_u64_le();
        let declared_count = header.get_u32_le();

        let mut batch = Self { sequence, declared_count, operations: Vec::new(), truncated: false };
        let mut pos = BATCH_HEADER_SIZE;

        for i in 0..declared_count {
            match decode_op(data, pos, max_key_len) {
                Ok((op, next)) => {
                    batch.operations.push(op);
                    pos = next;
                }
                Err(e) => {
                    log::warn!(
                        "Write batch {} stopped at entry {} of {}: {}",
                        sequence,
                        i,
                        declared_count,
                        e
                    );
                    batch.truncated = true;
                    break;
                }
            }
        }

        Ok(batch)
    }

    /// Encodes the batch in log record format.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BATCH_HEADER_SIZE + self.approximate_size());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&(self.operations.len() as u32).to_le_bytes());
        for op in &self.operations {
            match op {
                WriteOp::Put { key, value } => {
                    buf.push(TYPE_PUT);
                    encode_varint32(&mut buf, key.len() as u32);
                    buf.extend_from_slice(key);
                    encode_varint32(&mut buf, value.len() as u32);
                    buf.extend_from_slice(value);
                }
                WriteOp::Delete { key } => {
                    buf.push(TYPE_DELETE);
                    encode_varint32(&mut buf, key.len() as u32);
                    buf.extend_from_slice(key);
                }
            }
        }
        buf
    }

    /// Sequence number of the first operation
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Operation count stated in the header
    pub fn declared_count(&self) -> u32 {
        self.declared_count
    }

    /// Returns true if decoding stopped before `declared_count` operations.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the number of operations in the batch.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the batch contains no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns the approximate encoded size of the operations in bytes.
    pub fn approximate_size(&self) -> usize {
        self.operations
            .iter()
            .map(|op| op.key().len() + op.value().map_or(0, |v| v.len()) + 11)
            .sum()
    }

    /// Returns an iterator over the operations in the batch.
    pub fn iter(&self) -> impl Iterator<Item = &WriteOp> {
        self.operations.iter()
    }

    /// Consumes the batch, returning its operations.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.operations
    }
}

fn decode_op(data: &Bytes, pos: usize, max_key_len: usize) -> Result<(WriteOp, usize)> {
    let op_type = *data
        .get(pos)
        .ok_or_else(|| Error::corruption("Missing operation type"))?;
    if op_type != TYPE_PUT && op_type != TYPE_DELETE {
        return Err(Error::corruption(format!("Unknown operation type: {}", op_type)));
    }

    let (key_len, pos) = read_varint32(data, pos + 1);
    let key_len = key_len as usize;
    if key_len == 0 || key_len > max_key_len {
        return Err(Error::corruption(format!("Implausible key length: {}", key_len)));
    }
    let key = slice(data, pos, key_len)?;
    let pos = pos + key_len;

    if op_type == TYPE_DELETE {
        return Ok((WriteOp::Delete { key }, pos));
    }

    let (value_len, pos) = read_varint32(data, pos);
    let value = slice(data, pos, value_len as usize)?;
    Ok((WriteOp::Put { key, value }, pos + value_len as usize))
}

fn slice(data: &Bytes, pos: usize, len: usize) -> Result<Bytes> {
    match pos.checked_add(len) {
        Some(end) if end <= data.len() => Ok(data.slice(pos..end)),
        _ => Err(Error::corruption(format!("Length {} at {} overruns record", len, pos))),
    }
}
