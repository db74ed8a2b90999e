//! Log record format.
//!
//! A log file is a sequence of 32 KiB blocks. Each physical record is:
//! - Checksum (4 bytes): CRC32C of type and data, not verified here
//! - Length (2 bytes): Length of the data
//! - Type (1 byte): Record type (Full, First, Middle, Last)
//! - Data (variable): Record payload
//!
//! A record never spans a block boundary; fewer than 7 bytes left in a block
//! are zero padding.

use crate::error::{Error, Result};
use bytes::{Buf, Bytes};

/// Size of a log block
pub const BLOCK_SIZE: usize = 32 * 1024;

/// Size of the record header (checksum + length + type)
pub const HEADER_SIZE: usize = 7;

/// Record types for handling large entries that span multiple blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Preallocated, zero-filled space
    Zero = 0,
    /// Complete record contained in a single block
    Full = 1,
    /// First fragment of a multi-block record
    First = 2,
    /// Middle fragment of a multi-block record
    Middle = 3,
    /// Last fragment of a multi-block record
    Last = 4,
}

impl RecordType {
    /// Convert from u8 to RecordType
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(RecordType::Zero),
            1 => Ok(RecordType::Full),
            2 => Ok(RecordType::First),
            3 => Ok(RecordType::Middle),
            4 => Ok(RecordType::Last),
            _ => Err(Error::Corruption(format!("Invalid record type: {}", value))),
        }
    }
}

/// A physical record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Length of the data following the header
    pub length: u16,
    /// Raw type byte
    pub type_byte: u8,
}

impl RecordHeader {
    /// Decode a header from its 7 bytes
    pub fn decode(mut header: &[u8]) -> Result<Self> {
        if header.len() < HEADER_SIZE {
            return Err(Error::corruption("Truncated record header"));
        }
        header.advance(4);
        let length = header.get_u16_le();
        let type_byte = header.get_u8();
        Ok(Self { length, type_byte })
    }
}

/// A physical log record
#[derive(Debug, Clone)]
pub struct Record {
    /// Raw type byte
    pub type_byte: u8,
    /// Data payload
    pub data: Bytes,
}

impl Record {
    /// The record type, or an error for a type byte outside 0..=4
    pub fn record_type(&self) -> Result<RecordType> {
        RecordType::from_u8(self.type_byte)
    }
}
