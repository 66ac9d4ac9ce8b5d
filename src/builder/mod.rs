//! Build-phase façade: block allocation, link recording, finalization.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::format::{FileHeader, DB_FILE_CURR_VERSION, HEADER_LEN};
use crate::types::{BlockId, BlockOffset, BlockSize, DbFileError, Result};

pub mod arena;
pub mod links;

use arena::BlockArena;
use links::LinkRecorder;

/// Assembles blocks and links into a finalized flat buffer.
///
/// The builder is **Open** until [`DbFileBuilder::finalize`] runs, after
/// which it is **Linked**: structural mutation fails with
/// [`DbFileError::AlreadyFinalized`] and repeated finalize calls return the
/// same bytes without re-appending the link table.
#[derive(Debug)]
pub struct DbFileBuilder {
    arena: BlockArena,
    links: LinkRecorder,
    linked: bool,
}

impl Default for DbFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DbFileBuilder {
    /// Creates an empty builder with the header region reserved.
    pub fn new() -> Self {
        Self {
            arena: BlockArena::with_reserved(HEADER_LEN),
            links: LinkRecorder::default(),
            linked: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.linked {
            return Err(DbFileError::AlreadyFinalized);
        }
        Ok(())
    }

    /// Offset of the root block; the first block created lands here.
    pub fn start_offset(&self) -> u32 {
        HEADER_LEN as u32
    }

    /// Copies `bytes` into the file as a new block and returns its id.
    pub fn create_block(&mut self, bytes: &[u8]) -> Result<BlockId> {
        self.ensure_open()?;
        self.arena.create_block(bytes)
    }

    /// Reserves `len` zeroed bytes as a new block and returns its id plus a
    /// mutable view for in-place construction.
    ///
    /// The view borrows the builder and is released before any further
    /// allocation; use [`DbFileBuilder::block_mut`] to revisit the block.
    pub fn reserve_block(&mut self, len: usize) -> Result<(BlockId, &mut [u8])> {
        self.ensure_open()?;
        self.arena.reserve_block(len)
    }

    /// Read-only view of the file starting at block `id`.
    ///
    /// Inherits the arena's relaxed contract: any offset up to the current
    /// file length is accepted, issued or not.
    pub fn block(&self, id: BlockId) -> Result<&[u8]> {
        self.arena.block(id)
    }

    /// Mutable view of the file starting at block `id`; rejected once the
    /// builder is linked so the finalized image cannot be corrupted.
    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut [u8]> {
        self.ensure_open()?;
        self.arena.block_mut(id)
    }

    /// Recorded size of block `id`, or 0 for zero-length and unknown ids.
    pub fn block_size(&self, id: BlockId) -> BlockSize {
        self.arena.block_size(id)
    }

    /// Records a link: after load, the eight bytes at
    /// `(origin_block, origin_off)` will hold the address of
    /// `(dest_block, dest_off)`.
    ///
    /// Links sharing an origin resolve last-created-wins at load time.
    pub fn create_link(
        &mut self,
        origin_block: BlockId,
        origin_off: BlockOffset,
        dest_block: BlockId,
        dest_off: BlockOffset,
    ) -> Result<()> {
        self.ensure_open()?;
        self.links
            .record(&self.arena, origin_block, origin_off, dest_block, dest_off)
    }

    /// Shorthand for a link targeting the first byte of `dest_block`.
    pub fn create_link_to_block(
        &mut self,
        origin_block: BlockId,
        origin_off: BlockOffset,
        dest_block: BlockId,
    ) -> Result<()> {
        self.create_link(origin_block, origin_off, dest_block, 0)
    }

    /// Appends the link table, stamps the header, and returns the finished
    /// file image. Idempotent: later calls return the same bytes.
    pub fn finalize(&mut self) -> Result<&[u8]> {
        if self.linked {
            return Ok(self.arena.as_slice());
        }
        let data_size = (self.arena.len() - HEADER_LEN) as u32;
        let links_table_offset = self.arena.len() as u32;
        if !self.links.is_empty() {
            let table = self.links.encode();
            self.arena.append_tail(&table)?;
        }
        let header = FileHeader {
            version: DB_FILE_CURR_VERSION,
            flags: 0,
            links_count: self.links.len() as u16,
            links_table_offset,
            start_offset: HEADER_LEN as u32,
            data_size,
            file_size: self.arena.len() as u32,
        };
        header.encode(self.arena.as_mut_slice())?;
        self.linked = true;
        debug!(
            file_size = header.file_size,
            data_size = header.data_size,
            links = header.links_count,
            "builder finalized"
        );
        Ok(self.arena.as_slice())
    }

    /// Finalizes and writes exactly `file_size` bytes to `path`.
    pub fn write_to_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.finalize()?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.write_all(self.arena.as_slice())?;
        file.sync_all()?;
        debug!(path = %path.as_ref().display(), "wrote dbfile image");
        Ok(())
    }

    /// Finalizes and takes the backing buffer, for in-memory loads.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.finalize()?;
        Ok(self.arena.into_vec())
    }
}
