//! # bedrockdb - Reading Bedrock world databases without a database engine
//!
//! Minecraft Bedrock Edition stores a world in a LevelDB-family key/value
//! store. This crate reads the on-disk files directly to recover saved
//! structure templates, tolerating damaged or non-conformant files.
//!
//! ## Architecture
//!
//! The reader consists of several components:
//!
//! - **Varint**: LEB128 integers used throughout the formats
//! - **Compression**: Snappy, zlib/DEFLATE and LZ4 block decoding (fail-open)
//! - **Keys**: Classification of chunk, structure and general keys
//! - **SSTable**: Footer, index and data block parsing with a raw scan fallback
//! - **WAL**: Log block framing and write batch replay
//! - **Loader**: Merges all tables, then all logs, into one snapshot
//! - **Catalog**: Lists and exports structure templates
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bedrockdb::{DatabaseLoader, Options, StructureCatalog};
//!
//! # fn main() -> Result<(), bedrockdb::Error> {
//! let snapshot = DatabaseLoader::for_world("minecraftWorlds/abc123", Options::default()).load()?;
//!
//! let catalog = StructureCatalog::from_snapshot(&snapshot);
//! for structure in catalog.entries() {
//!     println!("{} ({})", structure.id(), structure.formatted_size());
//! }
//!
//! catalog.export_all("./export")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod catalog;
pub mod compression;
pub mod config;
pub mod error;
pub mod key;
pub mod loader;
pub mod sstable;
pub mod varint;
pub mod wal;
pub mod write_batch;

// Re-exports
pub use catalog::{sanitize_file_name, ExportSummary, StructureCatalog, StructureEntry};
pub use compression::CompressionType;
pub use config::{BlockLimits, Options, ScanOptions};
pub use error::{Error, Result};
pub use key::{classify, is_structure_key, parse_key, structure_id, ChunkPos, ChunkTag, KeyKind, ParsedKey};
pub use loader::{CancelToken, DatabaseLoader, Entry, LoadHandle, LoadProgress, LoadStats, Snapshot};
pub use write_batch::{WriteBatch, WriteOp};
