//! Error types for the NIF library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for NIF operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Banner, endianness or version fields are malformed
    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    /// A block's framing (type index, declared size, payload) is invalid
    #[error("Corrupt block {block}: {reason}")]
    CorruptBlock { block: u32, reason: String },

    /// A field combination this library does not implement
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A decoder consumed a different number of bytes than the block declared
    #[error("Block {block} declared {declared} bytes but its decoder consumed {consumed}")]
    BlockSizeMismatch { block: u32, declared: u32, consumed: u64 },

    /// A block reference points outside the block table
    #[error("Block {from} references missing block {target}")]
    UnresolvedReference { from: u32, target: u32 },

    /// A string reference points outside the string table
    #[error("String index {0} is out of range")]
    UnresolvedString(u32),

    /// Vertex stream semantics do not line up with its component list
    #[error("Format mismatch: {0}")]
    FormatMismatch(String),

    /// A vertex attribute cannot be expressed as a wire component format
    #[error("Unsupported component format: {0}")]
    UnsupportedComponentFormat(String),

    /// A primitive read ran past the end of the current buffer
    #[error("Read of {wanted} bytes at offset {offset} runs past the end of the buffer")]
    Truncated { offset: u64, wanted: usize },

    /// No parser is registered for this file extension
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a corrupt header error.
    pub fn corrupt_header(msg: impl Into<String>) -> Self {
        Self::CorruptHeader(msg.into())
    }

    /// Create a corrupt block error.
    pub fn corrupt_block(block: u32, reason: impl Into<String>) -> Self {
        Self::CorruptBlock { block, reason: reason.into() }
    }
}

/// Result type alias for NIF operations.
pub type Result<T> = std::result::Result<T, Error>;
