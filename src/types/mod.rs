//! Shared identifiers and error types for the dbfile crate.

use thiserror::Error;

/// Identifier of a block: the absolute offset of its first byte in the file.
pub type BlockId = u32;
/// Byte offset within a block.
pub type BlockOffset = u32;
/// Size of a block in bytes.
pub type BlockSize = u32;

/// Errors reported by the builder and reader.
///
/// Every failure is terminal for the operation that produced it; there is no
/// retry path because all operations are local and deterministic over
/// already-resident memory.
#[derive(Debug, Error)]
pub enum DbFileError {
    /// File open, read, or write failure.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// The arena or serialized file would cross the 32-bit signed offset ceiling.
    #[error("size limit exceeded: {0}")]
    SizeLimitExceeded(&'static str),
    /// Block offset past the end of the arena.
    #[error("invalid block id {0}")]
    InvalidBlock(BlockId),
    /// Link endpoint falls outside its block at creation time.
    #[error("link out of bounds: {0}")]
    LinkOutOfBounds(&'static str),
    /// Link endpoint falls outside the loaded file at relocation time.
    #[error("link out of range: {0}")]
    LinkOutOfRange(&'static str),
    /// Structural mutation attempted after `finalize`.
    #[error("builder already finalized")]
    AlreadyFinalized,
    /// The loaded bytes are not a valid dbfile.
    #[error("invalid file: {0}")]
    InvalidFormat(#[from] FormatError),
}

/// Header-level rejection reasons raised while validating a loaded buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The first eight bytes do not match the format magic.
    #[error("bad magic")]
    BadMagic,
    /// Format version below the minimum this crate supports.
    #[error("version {found:#04x} below minimum {min:#04x}")]
    VersionTooOld {
        /// Version byte found in the header.
        found: u8,
        /// Minimum version this crate accepts.
        min: u8,
    },
    /// The buffer ends before the bytes the header promises.
    #[error("truncated file: {0}")]
    TruncatedFile(&'static str),
    /// `start_offset` points past `file_size`.
    #[error("start offset past end of file")]
    StartOffsetOutOfRange,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DbFileError>;
