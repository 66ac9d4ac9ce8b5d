//! Flat, self-describing binary buffers with load-time pointer relocation.
//!
//! `dbfile` assembles heterogeneous byte regions ("blocks") plus an internal
//! pointer-relocation table into a single flat buffer that can be written to
//! storage and reloaded with its internal pointers patched to valid
//! in-process addresses, giving zero-copy access to a typed object graph
//! without a deserialization pass.
//!
//! The build phase allocates blocks and records links through
//! [`DbFileBuilder`]; the load phase validates and relocates through
//! [`DbFileReader`]:
//!
//! ```
//! use dbfile::{DbFileBuilder, DbFileReader};
//!
//! # fn main() -> dbfile::Result<()> {
//! let mut builder = DbFileBuilder::new();
//! let payload = builder.create_block(b"hello world")?;
//! let (index, _view) = builder.reserve_block(8)?;
//! builder.create_link(index, 0, payload, 0)?;
//!
//! let reader = DbFileReader::from_vec(builder.into_bytes()?)?;
//! assert_eq!(&reader.start()[..11], b"hello world");
//! assert_eq!(
//!     reader.patched_ptr(reader.links()[0].origin)? as usize,
//!     reader.base_addr() + reader.links()[0].destination as usize,
//! );
//! # Ok(())
//! # }
//! ```
//!
//! Relocation mutates the loaded buffer in place exactly once, at reader
//! construction. A relocated buffer is only meaningful inside the loading
//! process and must not be re-persisted as a portable file.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod format;
pub mod reader;
pub mod types;

pub use builder::DbFileBuilder;
pub use format::{
    FileHeader, LinkEntry, DB_FILE_CURR_VERSION, DB_FILE_MAGIC, DB_FILE_MIN_VERSION, HEADER_LEN,
};
pub use reader::DbFileReader;
pub use types::{BlockId, BlockOffset, BlockSize, DbFileError, FormatError, Result};
