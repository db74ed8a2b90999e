//! Error types for the bedrockdb reader.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The result type used throughout bedrockdb.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for bedrockdb operations.
///
/// Only [`Error::DirectoryNotFound`] and [`Error::Cancelled`] ever abort a
/// whole database load. Everything else is scoped to one file, block or
/// write batch and is handled by skipping or falling back.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Data corruption was detected.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// The table footer did not end with the table magic number.
    #[error("Bad table magic: expected {expected:#x}, got {actual:#x}")]
    BadMagic {
        /// The expected magic number.
        expected: u64,
        /// The magic number found in the file.
        actual: u64,
    },

    /// The database directory is missing or is not a directory.
    #[error("Database directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// The requested item was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The load was cancelled between two files.
    #[error("Load cancelled")]
    Cancelled,
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Returns true if this error means the file contents could not be
    /// understood, as opposed to the file not being readable at all.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Corruption(_) | Error::BadMagic { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
