//! DEFLATE decoding for zlib-tagged blocks.
//!
//! Bedrock writes these blocks as raw DEFLATE without a zlib header, so that
//! framing is tried first. Output is accepted as soon as either framing
//! produces any bytes, even if the stream is damaged further in.

use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;

/// Inflates a raw DEFLATE or zlib-wrapped buffer.
pub fn decompress(data: &[u8], max_size: usize) -> Result<Vec<u8>> {
    let raw = inflate(DeflateDecoder::new(data), max_size);
    if !raw.is_empty() {
        return Ok(raw);
    }

    let wrapped = inflate(ZlibDecoder::new(data), max_size);
    if !wrapped.is_empty() {
        return Ok(wrapped);
    }

    Err(Error::corruption("Inflate produced no output"))
}

fn inflate<R: Read>(decoder: R, max_size: usize) -> Vec<u8> {
    let mut output = Vec::new();
    // On error, read_to_end keeps whatever was decoded before the failure.
    if let Err(e) = decoder.take(max_size as u64).read_to_end(&mut output) {
        log::debug!("Inflate stopped after {} bytes: {}", output.len(), e);
    }
    output
}
