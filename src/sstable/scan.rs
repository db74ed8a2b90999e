//! Raw byte scan for structure templates.
//!
//! Used when a table cannot be parsed through its footer. The scan looks
//! for the literal structure key prefix, takes the printable run that
//! follows as the key, then probes forward for a payload header:
//!
//! ```text
//! [version: i32 le][length: i32 le][length bytes]
//! ```
//!
//! The value is the header plus payload (`8 + length` bytes).

use crate::config::ScanOptions;
use crate::key::STRUCTURE_PREFIX;
use crate::write_batch::WriteOp;
use bytes::Bytes;

const PAYLOAD_HEADER_SIZE: usize = 8;

/// Recovers structure template puts from arbitrary table bytes.
pub fn scan_structures(data: &Bytes, options: &ScanOptions) -> Vec<WriteOp> {
    let mut ops = Vec::new();
    let Some(limit) = data.len().checked_sub(STRUCTURE_PREFIX.len() + options.tail_guard) else {
        return ops;
    };

    let mut i = 0;
    while i < limit {
        if !data[i..].starts_with(STRUCTURE_PREFIX) {
            i += 1;
            continue;
        }

        let Some(key_end) = printable_run_end(data, i, options.max_key_len) else {
            i += 1;
            continue;
        };

        match probe_payload(data, key_end, options) {
            Some((start, len)) => {
                let key = data.slice(i..key_end);
                log::debug!(
                    "Raw scan recovered {} ({} bytes)",
                    String::from_utf8_lossy(&key),
                    len
                );
                ops.push(WriteOp::Put { key, value: data.slice(start..start + len) });
                i = start + len;
            }
            None => i += 1,
        }
    }

    ops
}

/// End of the printable ASCII run starting at `start`.
///
/// The run must terminate within `max_len` bytes and before end of input.
fn printable_run_end(data: &[u8], start: usize, max_len: usize) -> Option<usize> {
    let window_end = data.len().min(start + max_len);
    (start..window_end).find(|&pos| !(32..=126).contains(&data[pos]))
}

/// Finds the first plausible payload header after a key.
///
/// Returns the value offset and its total length including the header.
fn probe_payload(data: &[u8], key_end: usize, options: &ScanOptions) -> Option<(usize, usize)> {
    let search_end = data
        .len()
        .saturating_sub(PAYLOAD_HEADER_SIZE)
        .min(key_end + options.probe_window);

    (key_end..search_end).find_map(|start| {
        let len = plausible_payload_len(data, start, options)?;
        Some((start, len))
    })
}

fn plausible_payload_len(data: &[u8], start: usize, options: &ScanOptions) -> Option<usize> {
    let header = data.get(start..start + PAYLOAD_HEADER_SIZE)?;
    let version = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if version < options.min_version || version > options.max_version {
        return None;
    }
    if length <= 0 || length as u32 >= options.max_payload_len {
        return None;
    }

    let total = PAYLOAD_HEADER_SIZE + length as usize;
    (start + total <= data.len()).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: [u8; 12] = [0x01, 0, 0, 0, 0x04, 0, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD];

    fn with_padding(body: &[u8]) -> Bytes {
        let mut data = vec![0xFFu8; 16];
        data.extend_from_slice(body);
        data.extend_from_slice(&[0u8; 32]);
        Bytes::from(data)
    }

    #[test]
    fn test_scan_finds_structure() {
        let mut body = b"structuretemplate_mystruct:house".to_vec();
        body.push(0x00);
        body.extend_from_slice(&PAYLOAD);

        let ops = scan_structures(&with_padding(&body), &ScanOptions::default());
        assert_eq!(
            ops,
            vec![WriteOp::Put {
                key: Bytes::from_static(b"structuretemplate_mystruct:house"),
                value: Bytes::copy_from_slice(&PAYLOAD),
            }]
        );
    }

    #[test]
    fn test_scan_probes_past_gap() {
        let mut body = b"structuretemplate_a:b".to_vec();
        body.extend_from_slice(&[0x80, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00]);
        body.extend_from_slice(&PAYLOAD);

        let ops = scan_structures(&with_padding(&body), &ScanOptions::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].value().map(|v| v.len()), Some(12));
    }

    #[test]
    fn test_scan_multiple_structures() {
        let mut body = Vec::new();
        for name in ["one", "two"] {
            body.extend_from_slice(format!("structuretemplate_ns:{}", name).as_bytes());
            body.push(0x1F);
            body.extend_from_slice(&PAYLOAD);
        }

        let ops = scan_structures(&with_padding(&body), &ScanOptions::default());
        let keys: Vec<_> = ops.iter().map(|op| op.key().clone()).collect();
        assert_eq!(
            keys,
            vec![
                Bytes::from_static(b"structuretemplate_ns:one"),
                Bytes::from_static(b"structuretemplate_ns:two"),
            ]
        );
    }

    #[test]
    fn test_scan_rejects_implausible_version() {
        let mut body = b"structuretemplate_a:b".to_vec();
        body.push(0);
        body.extend_from_slice(&[0x40, 0, 0, 0, 0x04, 0, 0, 0, 1, 2, 3, 4]);

        let ops = scan_structures(&with_padding(&body), &ScanOptions::default());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_scan_configurable_version_range() {
        let mut body = b"structuretemplate_a:b".to_vec();
        body.push(0);
        body.extend_from_slice(&[0x40, 0, 0, 0, 0x04, 0, 0, 0, 1, 2, 3, 4]);

        let options = ScanOptions { max_version: 100, ..ScanOptions::default() };
        assert_eq!(scan_structures(&with_padding(&body), &options).len(), 1);
    }

    #[test]
    fn test_scan_payload_must_fit() {
        let mut body = b"structuretemplate_a:b".to_vec();
        body.push(0);
        body.extend_from_slice(&[0x01, 0, 0, 0, 0x00, 0x10, 0, 0]);

        let ops = scan_structures(&with_padding(&body), &ScanOptions::default());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_scan_unterminated_key() {
        let mut data = b"structuretemplate_".to_vec();
        data.extend_from_slice(&[b'x'; 300]);
        data.extend_from_slice(&[0u8; 64]);

        let ops = scan_structures(&Bytes::from(data), &ScanOptions::default());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_scan_short_input() {
        let ops = scan_structures(&Bytes::from_static(b"structuretemplate_"), &ScanOptions::default());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_scan_ignores_marker_near_end() {
        let mut data = vec![0u8; 8];
        data.extend_from_slice(b"structuretemplate_");
        data.extend_from_slice(&[0u8; 10]);

        let ops = scan_structures(&Bytes::from(data), &ScanOptions::default());
        assert!(ops.is_empty());
    }
}
