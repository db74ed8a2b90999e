//! Configuration options for reading a world database.
//!
//! Every threshold here exists to keep parsing of hostile or damaged files
//! bounded. The defaults match what real Bedrock worlds need.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration options for loading a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Limits applied while parsing data blocks.
    pub data_block_limits: BlockLimits,

    /// Limits applied while parsing index blocks.
    pub index_block_limits: BlockLimits,

    /// Largest block handle size accepted from an index block (in bytes).
    /// Default: 100MB
    pub max_block_size: u64,

    /// Largest uncompressed size a Snappy or LZ4 block may declare.
    /// Default: 100MB
    pub max_decompressed_size: usize,

    /// Largest key accepted from a write batch.
    /// Default: 10000
    pub max_batch_key_len: usize,

    /// Heuristics for the raw structure scan used on non-conformant tables.
    pub scan: ScanOptions,

    /// Fall back to the raw structure scan when a table cannot be parsed.
    /// Default: true
    pub raw_scan_fallback: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            data_block_limits: BlockLimits::data_block(),
            index_block_limits: BlockLimits::index_block(),
            max_block_size: 100 * 1024 * 1024,         // 100MB
            max_decompressed_size: 100 * 1024 * 1024, // 100MB
            max_batch_key_len: 10_000,
            scan: ScanOptions::default(),
            raw_scan_fallback: true,
        }
    }
}

/// Upper bounds for the fields of a block entry.
///
/// Parsing stops at the first entry that exceeds any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLimits {
    /// Maximum restart count read from the block trailer.
    pub max_restarts: u32,
    /// Maximum shared key prefix length.
    pub max_shared_len: usize,
    /// Maximum non-shared key length.
    pub max_unshared_len: usize,
    /// Maximum value length.
    pub max_value_len: usize,
}

impl BlockLimits {
    /// Limits for data blocks.
    pub const fn data_block() -> Self {
        Self {
            max_restarts: 100_000,
            max_shared_len: 10_000,
            max_unshared_len: 10_000,
            max_value_len: 50 * 1024 * 1024,
        }
    }

    /// Limits for index blocks, whose values are just encoded block handles.
    pub const fn index_block() -> Self {
        Self {
            max_restarts: 10_000,
            max_shared_len: 10_000,
            max_unshared_len: 10_000,
            max_value_len: 100,
        }
    }
}

/// Tunables for the raw `structuretemplate_` scan.
///
/// A candidate payload starts with two little-endian `i32`s: a version and a
/// byte length. Both must be plausible for the payload to be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Smallest accepted version field.
    pub min_version: i32,
    /// Largest accepted version field.
    pub max_version: i32,
    /// Payload lengths must be strictly below this.
    pub max_payload_len: u32,
    /// How many bytes past the key to probe for a payload header.
    pub probe_window: usize,
    /// Longest printable key considered.
    pub max_key_len: usize,
    /// The scan stops this many bytes before the end of the file.
    pub tail_guard: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_version: 1,
            max_version: 10,
            max_payload_len: 10 * 1024 * 1024,
            probe_window: 100,
            max_key_len: 256,
            tail_guard: 20,
        }
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the raw scan heuristics.
    pub fn scan(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    /// Enables or disables the raw scan fallback.
    pub fn raw_scan_fallback(mut self, value: bool) -> Self {
        self.raw_scan_fallback = value;
        self
    }

    /// Sets the data block limits.
    pub fn data_block_limits(mut self, limits: BlockLimits) -> Self {
        self.data_block_limits = limits;
        self
    }

    /// Sets the maximum uncompressed block size.
    pub fn max_decompressed_size(mut self, size: usize) -> Self {
        self.max_decompressed_size = size;
        self
    }

    /// Parses options from a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Options = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serializes the options to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_decompressed_size == 0 {
            return Err(Error::invalid_argument("max_decompressed_size must be > 0"));
        }
        if self.max_block_size == 0 {
            return Err(Error::invalid_argument("max_block_size must be > 0"));
        }
        if self.max_batch_key_len == 0 {
            return Err(Error::invalid_argument("max_batch_key_len must be > 0"));
        }
        if self.scan.min_version > self.scan.max_version {
            return Err(Error::invalid_argument(
                "scan.min_version must not exceed scan.max_version",
            ));
        }
        if self.scan.max_payload_len == 0 {
            return Err(Error::invalid_argument("scan.max_payload_len must be > 0"));
        }
        Ok(())
    }
}
