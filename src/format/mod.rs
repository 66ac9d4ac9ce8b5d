//! Wire format: header layout, link-table entries, and format constants.
//!
//! All multi-byte fields are host-endian by contract. A serialized file is
//! portable between hosts of the same byte order; once relocated it is bound
//! to the loading process and must not be re-persisted.

use std::ops::Range;

use crate::types::{FormatError, Result};

/// Format identity constant stored in the first eight bytes.
pub const DB_FILE_MAGIC: u64 = 0x0d0a_4642_4424;
/// Minimum format version this crate accepts.
pub const DB_FILE_MIN_VERSION: u8 = 0x10;
/// Version stamped on files produced by the builder.
pub const DB_FILE_CURR_VERSION: u8 = 0x10;
/// Versions at or above this threshold carry a link table that must be
/// applied during load.
pub const FEATURE_LINKING: u8 = 0x10;

/// Serialized header length in bytes.
pub const HEADER_LEN: usize = 28;
/// Serialized length of one link-table entry.
pub const LINK_ENTRY_LEN: usize = 8;
/// Width of a patched pointer field at a link origin.
pub const LINK_PTR_LEN: usize = 8;
/// Offsets must stay representable as 32-bit signed values.
pub const MAX_FILE_SIZE: usize = i32::MAX as usize;

const HDR_MAGIC: Range<usize> = 0..8;
const HDR_VERSION: usize = 8;
const HDR_FLAGS: usize = 9;
const HDR_LINKS_COUNT: Range<usize> = 10..12;
const HDR_LINKS_TABLE_OFFSET: Range<usize> = 12..16;
const HDR_START_OFFSET: Range<usize> = 16..20;
const HDR_DATA_SIZE: Range<usize> = 20..24;
const HDR_FILE_SIZE: Range<usize> = 24..28;

/// Parsed file header.
///
/// The magic is implicit: `decode` rejects buffers that do not carry it and
/// `encode` always writes [`DB_FILE_MAGIC`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version byte.
    pub version: u8,
    /// Reserved flag byte.
    pub flags: u8,
    /// Number of entries in the trailing link table.
    pub links_count: u16,
    /// Absolute offset of the link table.
    pub links_table_offset: u32,
    /// Offset of the root block from the header base.
    pub start_offset: u32,
    /// Payload bytes excluding the header.
    pub data_size: u32,
    /// Total serialized size in bytes.
    pub file_size: u32,
}

impl FileHeader {
    /// Encodes the header into the first [`HEADER_LEN`] bytes of `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < HEADER_LEN {
            return Err(FormatError::TruncatedFile("header buffer too small").into());
        }
        buf[HDR_MAGIC].copy_from_slice(&DB_FILE_MAGIC.to_ne_bytes());
        buf[HDR_VERSION] = self.version;
        buf[HDR_FLAGS] = self.flags;
        buf[HDR_LINKS_COUNT].copy_from_slice(&self.links_count.to_ne_bytes());
        buf[HDR_LINKS_TABLE_OFFSET].copy_from_slice(&self.links_table_offset.to_ne_bytes());
        buf[HDR_START_OFFSET].copy_from_slice(&self.start_offset.to_ne_bytes());
        buf[HDR_DATA_SIZE].copy_from_slice(&self.data_size.to_ne_bytes());
        buf[HDR_FILE_SIZE].copy_from_slice(&self.file_size.to_ne_bytes());
        Ok(())
    }

    /// Decodes and gate-checks a header from the front of `buf`.
    ///
    /// Rejects buffers shorter than [`HEADER_LEN`], with a foreign magic, or
    /// with a version below [`DB_FILE_MIN_VERSION`]. Checks that depend on
    /// the loaded length (`file_size`, `start_offset`) are the reader's job.
    pub fn decode(buf: &[u8]) -> Result<FileHeader> {
        if buf.len() < HEADER_LEN {
            return Err(FormatError::TruncatedFile("shorter than header").into());
        }
        let magic = u64::from_ne_bytes(buf[HDR_MAGIC].try_into().expect("slice is 8 bytes"));
        if magic != DB_FILE_MAGIC {
            return Err(FormatError::BadMagic.into());
        }
        let version = buf[HDR_VERSION];
        if version < DB_FILE_MIN_VERSION {
            return Err(FormatError::VersionTooOld {
                found: version,
                min: DB_FILE_MIN_VERSION,
            }
            .into());
        }
        Ok(FileHeader {
            version,
            flags: buf[HDR_FLAGS],
            links_count: u16::from_ne_bytes(
                buf[HDR_LINKS_COUNT].try_into().expect("slice is 2 bytes"),
            ),
            links_table_offset: u32::from_ne_bytes(
                buf[HDR_LINKS_TABLE_OFFSET]
                    .try_into()
                    .expect("slice is 4 bytes"),
            ),
            start_offset: u32::from_ne_bytes(
                buf[HDR_START_OFFSET].try_into().expect("slice is 4 bytes"),
            ),
            data_size: u32::from_ne_bytes(buf[HDR_DATA_SIZE].try_into().expect("slice is 4 bytes")),
            file_size: u32::from_ne_bytes(buf[HDR_FILE_SIZE].try_into().expect("slice is 4 bytes")),
        })
    }
}

/// One relocation instruction: after load, the eight bytes at `origin` hold
/// the address of the byte at `destination`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkEntry {
    /// Absolute offset of the pointer-sized field to patch.
    pub origin: u32,
    /// Absolute offset the patched field must point at.
    pub destination: u32,
}

impl LinkEntry {
    /// Appends the serialized entry to `dst`.
    pub fn encode_into(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(&self.origin.to_ne_bytes());
        dst.extend_from_slice(&self.destination.to_ne_bytes());
    }

    /// Decodes one entry from the front of `src`.
    ///
    /// Callers must hand in at least [`LINK_ENTRY_LEN`] bytes.
    pub fn decode(src: &[u8]) -> LinkEntry {
        LinkEntry {
            origin: u32::from_ne_bytes(src[..4].try_into().expect("slice is 4 bytes")),
            destination: u32::from_ne_bytes(src[4..8].try_into().expect("slice is 4 bytes")),
        }
    }
}
