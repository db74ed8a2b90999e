//! LEB128 variable-length integers, as used by the table and log formats.
//!
//! Decoding never fails. A truncated varint yields whatever bits were
//! accumulated and a position at the end of the input; callers validate the
//! decoded value (e.g. reject absurd lengths) instead.

/// Maximum encoded length of a varint32.
pub const MAX_VARINT32_LEN: usize = 5;

/// Maximum encoded length of a varint64.
pub const MAX_VARINT64_LEN: usize = 10;

/// Decodes a varint32 starting at `pos`.
///
/// Returns the value and the position just past the last byte consumed.
pub fn read_varint32(data: &[u8], pos: usize) -> (u32, usize) {
    let (value, pos) = read_groups(data, pos, MAX_VARINT32_LEN);
    (value as u32, pos)
}

/// Decodes a varint64 starting at `pos`.
///
/// Returns the value and the position just past the last byte consumed.
pub fn read_varint64(data: &[u8], pos: usize) -> (u64, usize) {
    read_groups(data, pos, MAX_VARINT64_LEN)
}

fn read_groups(data: &[u8], mut pos: usize, max_groups: usize) -> (u64, usize) {
    let mut result = 0u64;
    for group in 0..max_groups {
        let Some(&byte) = data.get(pos) else {
            return (result, data.len());
        };
        pos += 1;
        // The tenth group of a varint64 only has one meaningful bit.
        result |= u64::from(byte & 0x7F).checked_shl(7 * group as u32).unwrap_or(0);
        if byte & 0x80 == 0 {
            break;
        }
    }
    (result, pos)
}

/// Appends the varint32 encoding of `value` to `buf`.
pub fn encode_varint32(buf: &mut Vec<u8>, value: u32) {
    encode_varint64(buf, u64::from(value));
}

/// Appends the varint64 encoding of `value` to `buf`.
pub fn encode_varint64(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}
