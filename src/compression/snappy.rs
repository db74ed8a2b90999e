//! Snappy raw-format decoder.
//!
//! Format:
//! ```text
//! [uncompressed_len: varint32]
//! [tag][payload] ...
//! ```
//!
//! The low two bits of each tag select the element:
//! - `00` literal: length-1 in the upper six bits, or 60..63 meaning 1..4
//!   little-endian length bytes follow
//! - `01` copy with 1-byte offset: length-4 in bits 2..4, offset high bits in 5..7
//! - `10` copy with 2-byte little-endian offset: length-1 in the upper six bits
//! - `11` copy with 4-byte little-endian offset: length-1 in the upper six bits

use crate::error::{Error, Result};
use crate::varint::read_varint32;

const TAG_LITERAL: u8 = 0b00;
const TAG_COPY_1: u8 = 0b01;
const TAG_COPY_2: u8 = 0b10;

/// Decompresses a Snappy raw-format buffer.
pub fn decompress(data: &[u8], max_size: usize) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(Error::corruption("Empty snappy block"));
    }

    let (expected, mut pos) = read_varint32(data, 0);
    let expected = expected as usize;
    if expected == 0 || expected > max_size {
        return Err(Error::corruption(format!("Implausible snappy length: {}", expected)));
    }

    let mut output = Vec::with_capacity(expected);

    while pos < data.len() && output.len() < expected {
        let tag = data[pos];
        pos += 1;

        match tag & 0x03 {
            TAG_LITERAL => {
                let mut len = (tag >> 2) as usize;
                if len >= 60 {
                    let extra = len - 59;
                    let bytes = take(data, pos, extra)?;
                    pos += extra;
                    len = bytes.iter().rev().fold(0usize, |acc, &b| (acc << 8) | b as usize);
                }
                len += 1;

                let literal = take(data, pos, len)?;
                if output.len() + len > expected {
                    return Err(Error::corruption("Snappy literal overruns output"));
                }
                output.extend_from_slice(literal);
                pos += len;
            }
            kind => {
                let (len, offset) = match kind {
                    TAG_COPY_1 => {
                        let b = take(data, pos, 1)?[0];
                        pos += 1;
                        let len = ((tag >> 2) & 0x07) as usize + 4;
                        let offset = (((tag & 0xE0) as usize) << 3) | b as usize;
                        (len, offset)
                    }
                    TAG_COPY_2 => {
                        let b = take(data, pos, 2)?;
                        pos += 2;
                        ((tag >> 2) as usize + 1, u16::from_le_bytes([b[0], b[1]]) as usize)
                    }
                    _ => {
                        let b = take(data, pos, 4)?;
                        pos += 4;
                        let offset = u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize;
                        ((tag >> 2) as usize + 1, offset)
                    }
                };

                copy_back_reference(&mut output, offset, len, expected)?;
            }
        }
    }

    if output.len() != expected {
        return Err(Error::corruption(format!(
            "Snappy output incomplete: {}/{}",
            output.len(),
            expected
        )));
    }

    Ok(output)
}

/// Copies `len` bytes starting `offset` bytes back from the end of `output`.
///
/// The source may overlap the bytes being written, so the copy runs one byte
/// at a time.
pub(crate) fn copy_back_reference(
    output: &mut Vec<u8>,
    offset: usize,
    len: usize,
    limit: usize,
) -> Result<()> {
    if offset == 0 || offset > output.len() {
        return Err(Error::corruption(format!(
            "Invalid copy offset {} with {} bytes written",
            offset,
            output.len()
        )));
    }
    if output.len() + len > limit {
        return Err(Error::corruption("Copy overruns declared output length"));
    }

    let start = output.len() - offset;
    for i in 0..len {
        let byte = output[start + i];
        output.push(byte);
    }
    Ok(())
}

fn take(data: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    data.get(pos..pos + len).ok_or_else(|| Error::corruption("Snappy input truncated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAX: usize = 16 * 1024 * 1024;

    #[test]
    fn test_literal() {
        let data = [0x05, 0x10, b'h', b'e', b'l', b'l', b'o'];
        assert_eq!(decompress(&data, MAX).unwrap(), b"hello");
    }

    #[test]
    fn test_long_literal_extension() {
        // 70-byte literal: tag 60 << 2 with one extension byte holding 69.
        let payload = vec![b'x'; 70];
        let mut data = vec![70, 60 << 2, 69];
        data.extend_from_slice(&payload);
        assert_eq!(decompress(&data, MAX).unwrap(), payload);
    }

    #[test]
    fn test_overlapping_copy() {
        // "ab" literal followed by a copy-1 of length 6 at offset 2.
        let tag = ((6 - 4) << 2) as u8 | TAG_COPY_1;
        let data = [0x08, 0x04, b'a', b'b', tag, 0x02];
        assert_eq!(decompress(&data, MAX).unwrap(), b"abababab");
    }

    #[test]
    fn test_copy_2_and_copy_4() {
        let copy2 = ((3 - 1) << 2) as u8 | TAG_COPY_2;
        let data = [0x06, 0x08, b'x', b'y', b'z', copy2, 0x03, 0x00];
        assert_eq!(decompress(&data, MAX).unwrap(), b"xyzxyz");

        let copy4 = ((2 - 1) << 2) as u8 | 0b11;
        let data = [0x04, 0x04, b'p', b'q', copy4, 0x02, 0x00, 0x00, 0x00];
        assert_eq!(decompress(&data, MAX).unwrap(), b"pqpq");
    }

    #[test]
    fn test_invalid_offsets() {
        // Offset larger than bytes written.
        let tag = TAG_COPY_1;
        let data = [0x08, 0x04, b'a', b'b', tag, 0x09];
        assert!(decompress(&data, MAX).is_err());

        // Offset zero.
        let data = [0x08, 0x04, b'a', b'b', tag, 0x00];
        assert!(decompress(&data, MAX).is_err());
    }

    #[test]
    fn test_truncated_and_oversized() {
        // Literal claims 5 bytes but only 2 follow.
        assert!(decompress(&[0x05, 0x10, b'h', b'e'], MAX).is_err());
        // Declared length above the cap.
        assert!(decompress(&[0x80, 0x80, 0x04], 1024).is_err());
        // Zero declared length.
        assert!(decompress(&[0x00], MAX).is_err());
    }

    #[test]
    fn test_reference_compressor() {
        let data: Vec<u8> = b"structuretemplate_mystruct:house "
            .iter()
            .cycle()
            .take(10_000)
            .copied()
            .collect();
        let compressed = snap::raw::Encoder::new().compress_vec(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed, MAX).unwrap(), data);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_reference(data in proptest::collection::vec(0u8..8, 1..4096)) {
            let compressed = snap::raw::Encoder::new().compress_vec(&data).unwrap();
            prop_assert_eq!(decompress(&compressed, MAX).unwrap(), data);
        }

        #[test]
        fn prop_garbage_never_panics(data: Vec<u8>) {
            let _ = decompress(&data, 64 * 1024);
        }
    }
}
