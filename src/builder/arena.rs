//! Append-only byte arena backing all blocks during the build phase.

use rustc_hash::FxHashMap;

use crate::format::MAX_FILE_SIZE;
use crate::types::{BlockId, BlockSize, DbFileError, Result};

/// Growable byte buffer plus a block-id to block-size lookup.
///
/// A block id is the arena length at the moment the block was created, so ids
/// are strictly increasing across the build phase. Zero-length blocks receive
/// an id but no size entry.
#[derive(Debug, Default)]
pub struct BlockArena {
    data: Vec<u8>,
    sizes: FxHashMap<BlockId, BlockSize>,
}

impl BlockArena {
    /// Creates an arena whose first `reserved` bytes are zeroed and owned by
    /// the caller (the builder parks the header there).
    pub fn with_reserved(reserved: usize) -> Self {
        Self {
            data: vec![0; reserved],
            sizes: FxHashMap::default(),
        }
    }

    /// Current arena length in bytes; also the id the next block will get.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when the arena holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check_ceiling(&self, extra: usize) -> Result<()> {
        if self.data.len().saturating_add(extra) > MAX_FILE_SIZE {
            return Err(DbFileError::SizeLimitExceeded(
                "arena would exceed the 2^31-1 byte offset ceiling",
            ));
        }
        Ok(())
    }

    /// Appends a copy of `bytes` as a new block and returns its id.
    ///
    /// Zero-length input still consumes an id (the current arena length) but
    /// records no size, so [`BlockArena::block_size`] reports 0 for it.
    pub fn create_block(&mut self, bytes: &[u8]) -> Result<BlockId> {
        let id = self.data.len() as BlockId;
        if !bytes.is_empty() {
            self.check_ceiling(bytes.len())?;
            self.data.extend_from_slice(bytes);
            self.sizes.insert(id, bytes.len() as BlockSize);
        }
        Ok(id)
    }

    /// Grows the arena by `len` zeroed bytes and returns the new block's id
    /// together with a mutable view of its bytes for in-place construction.
    ///
    /// The view borrows the arena, so it cannot outlive the next allocation;
    /// use [`BlockArena::block_mut`] to revisit the block later.
    pub fn reserve_block(&mut self, len: usize) -> Result<(BlockId, &mut [u8])> {
        let id = self.data.len() as BlockId;
        if len > 0 {
            self.check_ceiling(len)?;
            self.data.resize(self.data.len() + len, 0);
            self.sizes.insert(id, len as BlockSize);
        }
        let start = id as usize;
        Ok((id, &mut self.data[start..]))
    }

    /// Returns a view of the arena starting at block `id`.
    ///
    /// Relaxed contract: `id` is only checked against the arena length, not
    /// against the set of issued block ids, so any interior offset is
    /// accepted and the view runs to the arena end.
    pub fn block(&self, id: BlockId) -> Result<&[u8]> {
        if id as usize > self.data.len() {
            return Err(DbFileError::InvalidBlock(id));
        }
        Ok(&self.data[id as usize..])
    }

    /// Mutable variant of [`BlockArena::block`], same relaxed contract.
    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut [u8]> {
        if id as usize > self.data.len() {
            return Err(DbFileError::InvalidBlock(id));
        }
        Ok(&mut self.data[id as usize..])
    }

    /// Recorded size of block `id`, or 0 for zero-length and never-issued ids.
    pub fn block_size(&self, id: BlockId) -> BlockSize {
        self.sizes.get(&id).copied().unwrap_or(0)
    }

    /// Appends raw bytes without issuing a block id (used for the trailing
    /// link table).
    pub fn append_tail(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_ceiling(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Whole arena as an immutable slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Whole arena as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the arena, yielding its backing buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}
