//! LZ4 block decoder.
//!
//! Blocks carry a 4-byte little-endian uncompressed size, followed by a run
//! of sequences:
//! ```text
//! [token: literal_len << 4 | match_len]
//! [literal_len extension: 255, 255, ..., n]   if literal_len == 15
//! [literals]
//! [offset: u16 le]
//! [match_len extension: 255, 255, ..., n]     if match_len == 15
//! ```
//! Match lengths are stored minus 4. The final sequence has literals only.

use super::snappy::copy_back_reference;
use crate::error::{Error, Result};

const MIN_MATCH: usize = 4;

/// Decompresses a size-prefixed LZ4 block.
pub fn decompress(data: &[u8], max_size: usize) -> Result<Vec<u8>> {
    let Some(prefix) = data.get(..4) else {
        return Err(Error::corruption("LZ4 block shorter than size prefix"));
    };
    let expected = i32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
    if expected <= 0 || expected as usize > max_size {
        return Err(Error::corruption(format!("Implausible LZ4 size: {}", expected)));
    }
    let expected = expected as usize;

    let mut output = Vec::with_capacity(expected);
    let mut pos = 4;

    while pos < data.len() && output.len() < expected {
        let token = data[pos];
        pos += 1;

        let mut literal_len = (token >> 4) as usize;
        if literal_len == 15 {
            literal_len += read_extension(data, &mut pos);
        }

        let literal = data
            .get(pos..pos + literal_len)
            .ok_or_else(|| Error::corruption("LZ4 literal run truncated"))?;
        if output.len() + literal_len > expected {
            return Err(Error::corruption("LZ4 literal run overruns output"));
        }
        output.extend_from_slice(literal);
        pos += literal_len;

        // The last sequence ends after its literals.
        if pos >= data.len() || output.len() >= expected {
            break;
        }

        let offset = data
            .get(pos..pos + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]) as usize)
            .ok_or_else(|| Error::corruption("LZ4 match offset truncated"))?;
        pos += 2;

        let mut match_len = (token & 0x0F) as usize;
        if match_len == 15 {
            match_len += read_extension(data, &mut pos);
        }
        match_len += MIN_MATCH;

        copy_back_reference(&mut output, offset, match_len, expected)?;
    }

    if output.len() != expected {
        return Err(Error::corruption(format!(
            "LZ4 output incomplete: {}/{}",
            output.len(),
            expected
        )));
    }

    Ok(output)
}

/// Sums a run of 255-valued continuation bytes and its terminating byte.
fn read_extension(data: &[u8], pos: &mut usize) -> usize {
    let mut total = 0;
    while let Some(&b) = data.get(*pos) {
        *pos += 1;
        total += b as usize;
        if b != 255 {
            break;
        }
    }
    total
}
