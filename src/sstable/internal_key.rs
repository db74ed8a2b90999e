//! # Internal Key Format
//!
//! Keys stored in table data blocks carry an 8-byte trailer after the user
//! key.
//!
//! ## Format
//!
//! ```text
//! InternalKey:
//!   [user_key: bytes] [tag: u64 le]
//!
//! tag = (sequence << 8) | type
//! ```
//!
//! Because the tag is little-endian, the type is the first trailer byte.

/// The type of a value in a table.
///
/// - `Value`: A normal key-value pair
/// - `Deletion`: A tombstone marking that a key has been deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// A tombstone indicating the key has been deleted
    Deletion,

    /// A normal value
    Value,
}

impl ValueType {
    /// Type byte 1 is a value; every other byte reads as a deletion.
    pub fn from_u8(value: u8) -> Self {
        if value == 1 {
            ValueType::Value
        } else {
            ValueType::Deletion
        }
    }
}

/// Size of the internal key trailer
pub const TAG_SIZE: usize = 8;

/// A decoded view over an internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalKey<'a> {
    user_key: &'a [u8],
    sequence: u64,
    value_type: ValueType,
}

impl<'a> InternalKey<'a> {
    /// Splits raw block key bytes into user key and tag.
    ///
    /// Keys of `TAG_SIZE` bytes or fewer have no trailer: they are taken
    /// verbatim as values with sequence 0.
    pub fn decode(raw: &'a [u8]) -> Self {
        if raw.len() <= TAG_SIZE {
            return Self { user_key: raw, sequence: 0, value_type: ValueType::Value };
        }

        let split = raw.len() - TAG_SIZE;
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&raw[split..]);
        let tag = u64::from_le_bytes(tag);

        Self {
            user_key: &raw[..split],
            sequence: tag >> 8,
            value_type: ValueType::from_u8(raw[split]),
        }
    }

    /// Returns the user key.
    pub fn user_key(&self) -> &'a [u8] {
        self.user_key
    }

    /// Returns the sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(user_key: &[u8], sequence: u64, kind: u8) -> Vec<u8> {
        let mut buf = user_key.to_vec();
        buf.extend_from_slice(&((sequence << 8) | kind as u64).to_le_bytes());
        buf
    }

    #[test]
    fn test_decode_value() {
        let raw = encode(b"structuretemplate_a:b", 42, 1);
        let key = InternalKey::decode(&raw);
        assert_eq!(key.user_key(), b"structuretemplate_a:b");
        assert_eq!(key.sequence(), 42);
        assert_eq!(key.value_type(), ValueType::Value);
    }

    #[test]
    fn test_decode_deletion() {
        let raw = encode(b"key", 7, 0);
        let key = InternalKey::decode(&raw);
        assert_eq!(key.user_key(), b"key");
        assert_eq!(key.value_type(), ValueType::Deletion);
    }

    #[test]
    fn test_unknown_type_is_deletion() {
        let raw = encode(b"key", 7, 9);
        assert_eq!(InternalKey::decode(&raw).value_type(), ValueType::Deletion);
    }

    #[test]
    fn test_short_key_verbatim() {
        let key = InternalKey::decode(b"12345678");
        assert_eq!(key.user_key(), b"12345678");
        assert_eq!(key.value_type(), ValueType::Value);

        let key = InternalKey::decode(b"");
        assert!(key.user_key().is_empty());
    }

    #[test]
    fn test_nine_byte_key() {
        let key = InternalKey::decode(&[b'k', 1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(key.user_key(), b"k");
        assert_eq!(key.value_type(), ValueType::Value);
    }
}
