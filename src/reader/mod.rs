//! Load-phase façade: header validation and one-shot relocation.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::format::{FileHeader, LinkEntry, FEATURE_LINKING, LINK_ENTRY_LEN, LINK_PTR_LEN};
use crate::types::{DbFileError, FormatError, Result};

mod reloc;

/// A validated, relocated dbfile buffer.
///
/// Construction performs the whole validation sequence and, when the file's
/// version carries the linking feature, patches every recorded pointer field
/// in place. Either a fully relocated reader is returned or an error and no
/// reader; a buffer touched by a failed load must be discarded.
///
/// Every constructor gives the reader a process-private owned buffer, so a
/// physical buffer is relocated exactly once and patched addresses are never
/// re-read as offsets. The addresses are valid only for this reader's
/// lifetime and address space: a relocated buffer must not be re-persisted.
#[derive(Debug)]
pub struct DbFileReader {
    buf: Vec<u8>,
    header: FileHeader,
    links: Vec<LinkEntry>,
}

impl DbFileReader {
    /// Reads the file at `path` into an owned buffer and loads it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let buf = fs::read(path.as_ref())?;
        debug!(path = %path.as_ref().display(), len = buf.len(), "read dbfile image");
        Self::from_vec(buf)
    }

    /// Copies `bytes` into an owned buffer and loads it.
    ///
    /// The copy guarantees relocation happens against a private buffer, so
    /// the caller's bytes stay untouched and re-loadable.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_vec(bytes.to_vec())
    }

    /// Takes ownership of `buf`, validates it, and relocates in place.
    pub fn from_vec(mut buf: Vec<u8>) -> Result<Self> {
        let header = FileHeader::decode(&buf)?;
        if header.file_size as usize > buf.len() {
            return Err(FormatError::TruncatedFile("declared file size exceeds loaded bytes").into());
        }
        if header.start_offset > header.file_size {
            return Err(FormatError::StartOffsetOutOfRange.into());
        }
        let mut links = Vec::new();
        if header.version >= FEATURE_LINKING && header.links_count > 0 {
            let table_start = header.links_table_offset as usize;
            let table_len = header.links_count as usize * LINK_ENTRY_LEN;
            let table_end = table_start
                .checked_add(table_len)
                .ok_or(FormatError::TruncatedFile("link table offset overflows"))?;
            if table_end > buf.len() {
                return Err(FormatError::TruncatedFile("link table past the end of the file").into());
            }
            links.reserve(header.links_count as usize);
            for chunk in buf[table_start..table_end].chunks_exact(LINK_ENTRY_LEN) {
                links.push(LinkEntry::decode(chunk));
            }
            reloc::relocate(&mut buf, header.file_size, &links)?;
        }
        debug!(
            file_size = header.file_size,
            links = links.len(),
            "dbfile loaded and relocated"
        );
        Ok(Self { buf, header, links })
    }

    /// Parsed header view.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Links decoded from the table, in stored order.
    pub fn links(&self) -> &[LinkEntry] {
        &self.links
    }

    /// The loaded image, from header base to `file_size`.
    ///
    /// Pointer fields named by links hold process-local addresses, not
    /// offsets, once the reader exists.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.header.file_size as usize]
    }

    /// Base address of the loaded buffer; link destinations are relative to
    /// this value.
    pub fn base_addr(&self) -> usize {
        self.buf.as_ptr() as usize
    }

    /// Root block bytes, from `start_offset` to `file_size`.
    pub fn start(&self) -> &[u8] {
        &self.buf[self.header.start_offset as usize..self.header.file_size as usize]
    }

    /// Address of the root block, for typed reinterpretation by the caller.
    ///
    /// Dereferencing is the embedding host's responsibility; this crate only
    /// guarantees the pointer stays valid while the reader is alive.
    pub fn start_ptr(&self) -> *const u8 {
        self.buf[self.header.start_offset as usize..].as_ptr()
    }

    /// Reads the patched pointer field at `offset` and returns it as a raw
    /// pointer, verifying first that the stored address lands inside the
    /// loaded buffer.
    ///
    /// This is the checked alternative to dereferencing addresses found by
    /// walking the object graph by hand.
    pub fn patched_ptr(&self, offset: u32) -> Result<*const u8> {
        let start = offset as usize;
        let end = start.checked_add(LINK_PTR_LEN).ok_or(DbFileError::LinkOutOfRange(
            "pointer field offset overflows",
        ))?;
        let field = self
            .buf
            .get(start..end)
            .ok_or(DbFileError::LinkOutOfRange(
                "pointer field outside the loaded buffer",
            ))?;
        let addr = u64::from_ne_bytes(field.try_into().expect("slice is 8 bytes")) as usize;
        let base = self.base_addr();
        if addr < base || addr > base + self.header.file_size as usize {
            return Err(DbFileError::LinkOutOfRange(
                "stored address outside the loaded buffer",
            ));
        }
        Ok(addr as *const u8)
    }
}
