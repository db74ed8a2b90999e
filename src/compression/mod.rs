//! Block decompression.
//!
//! Bedrock tables tag each block with a one-byte compression type. The
//! codecs here are fail-open: a block that cannot be decompressed is handed
//! back unchanged so the rest of the load can continue.
//!
//! | tag    | codec                                  |
//! |--------|----------------------------------------|
//! | 0      | none                                   |
//! | 1      | Snappy (raw format)                    |
//! | 2      | zlib / raw DEFLATE                     |
//! | 4, 5   | LZ4 block with 4-byte size prefix      |
//! | 7      | Zstandard (not supported, passthrough) |

pub mod lz4;
pub mod snappy;
pub mod zlib;

use std::borrow::Cow;

/// Compression algorithms that may appear in a block trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// No compression.
    None,
    /// Snappy raw format.
    Snappy,
    /// zlib-wrapped or raw DEFLATE.
    Zlib,
    /// LZ4 block format with a little-endian size prefix.
    Lz4,
    /// Zstandard. Recognised but never decoded.
    Zstd,
    /// A tag this reader does not know.
    Unknown(u8),
}

impl CompressionType {
    /// Convert from the trailer tag byte
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => CompressionType::None,
            1 => CompressionType::Snappy,
            2 => CompressionType::Zlib,
            4 | 5 => CompressionType::Lz4,
            7 => CompressionType::Zstd,
            other => CompressionType::Unknown(other),
        }
    }
}

/// Decompresses `data` according to `compression`.
///
/// Returns the input unchanged when the codec is a passthrough or when
/// decoding fails. `max_size` bounds the uncompressed size any codec may
/// produce.
pub fn decompress(data: &[u8], compression: CompressionType, max_size: usize) -> Cow<'_, [u8]> {
    let result = match compression {
        CompressionType::None => return Cow::Borrowed(data),
        CompressionType::Snappy => snappy::decompress(data, max_size),
        CompressionType::Zlib => zlib::decompress(data, max_size),
        CompressionType::Lz4 => lz4::decompress(data, max_size),
        // Zstandard blocks are passed through undecoded.
        CompressionType::Zstd => return Cow::Borrowed(data),
        CompressionType::Unknown(tag) => {
            log::debug!("Unknown compression tag {}, using block as-is", tag);
            return Cow::Borrowed(data);
        }
    };

    match result {
        Ok(decoded) if !decoded.is_empty() => Cow::Owned(decoded),
        Ok(_) => Cow::Borrowed(data),
        Err(e) => {
            log::warn!("{:?} decompression failed, using raw block: {}", compression, e);
            Cow::Borrowed(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1024 * 1024;

    #[test]
    fn test_from_tag() {
        assert_eq!(CompressionType::from_tag(0), CompressionType::None);
        assert_eq!(CompressionType::from_tag(1), CompressionType::Snappy);
        assert_eq!(CompressionType::from_tag(2), CompressionType::Zlib);
        assert_eq!(CompressionType::from_tag(4), CompressionType::Lz4);
        assert_eq!(CompressionType::from_tag(5), CompressionType::Lz4);
        assert_eq!(CompressionType::from_tag(7), CompressionType::Zstd);
        assert_eq!(CompressionType::from_tag(3), CompressionType::Unknown(3));
    }

    #[test]
    fn test_zstd_passthrough() {
        let data = [0x28, 0xB5, 0x2F, 0xFD, 0x00, 0x01];
        let out = decompress(&data, CompressionType::Zstd, MAX);
        assert_eq!(&*out, &data);
    }

    #[test]
    fn test_none_and_unknown_passthrough() {
        let data = b"plain block";
        assert_eq!(&*decompress(data, CompressionType::None, MAX), data);
        assert_eq!(&*decompress(data, CompressionType::Unknown(9), MAX), data);
    }

    #[test]
    fn test_failed_decode_returns_input() {
        // Snappy: declares 10 bytes, then a copy with offset 0.
        let bad_snappy = [0x0A, 0x01, 0x00];
        assert_eq!(&*decompress(&bad_snappy, CompressionType::Snappy, MAX), &bad_snappy);

        // LZ4: negative size prefix.
        let bad_lz4 = [0xFF, 0xFF, 0xFF, 0xFF, 0x10, b'a'];
        assert_eq!(&*decompress(&bad_lz4, CompressionType::Lz4, MAX), &bad_lz4);

        // Not a DEFLATE stream in either framing.
        let bad_zlib = [0xFF, 0xFF, 0xFF];
        assert_eq!(&*decompress(&bad_zlib, CompressionType::Zlib, MAX), &bad_zlib);
    }

    #[test]
    fn test_dispatch_decodes() {
        // Snappy literal "abc".
        let snappy = [0x03, 0x08, b'a', b'b', b'c'];
        assert_eq!(&*decompress(&snappy, CompressionType::Snappy, MAX), b"abc");

        // LZ4 literal-only sequence "abc".
        let lz4 = [0x03, 0x00, 0x00, 0x00, 0x30, b'a', b'b', b'c'];
        assert_eq!(&*decompress(&lz4, CompressionType::Lz4, MAX), b"abc");
    }
}
