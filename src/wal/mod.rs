//! Write-ahead log (`.log`) replay.
//!
//! Log files hold writes that have not been compacted into tables yet.
//! Replaying them on top of the tables yields the newest state of every key.
//!
//! ## Architecture
//!
//! - **Record Format**: 32 KiB blocks of physical records with a 7-byte header
//! - **Fragmentation**: Large batches are split into First/Middle/Last records
//! - **Batches**: Each logical record is one [`WriteBatch`](crate::WriteBatch)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bedrockdb::wal::LogReader;
//! use bedrockdb::Options;
//!
//! # fn main() -> Result<(), bedrockdb::Error> {
//! let mut reader = LogReader::open("000003.log", &Options::default())?;
//! for op in reader.read_ops().ops {
//!     println!("Replayed: {:?}", op);
//! }
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod record;

pub use reader::{LogContents, LogReader};
pub use record::{Record, RecordHeader, RecordType, BLOCK_SIZE, HEADER_SIZE};
