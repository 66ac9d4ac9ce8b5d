//! Build-phase link recorder: validates endpoints and serializes the
//! trailing link table.

use crate::builder::arena::BlockArena;
use crate::format::{LinkEntry, LINK_PTR_LEN};
use crate::types::{BlockId, BlockOffset, DbFileError, Result};

/// Ordered collection of relocation instructions recorded during the build.
///
/// Creation order is preserved on the wire. Relocation is order-independent
/// except for duplicate origins, where the table is replayed in stored order
/// and the last-created link wins.
#[derive(Debug, Default)]
pub struct LinkRecorder {
    links: Vec<LinkEntry>,
}

impl LinkRecorder {
    /// Number of recorded links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true when no links have been recorded.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Recorded entries in creation order.
    pub fn entries(&self) -> &[LinkEntry] {
        &self.links
    }

    /// Validates and records a link from `(origin_block, origin_off)` to
    /// `(dest_block, dest_off)`.
    ///
    /// The origin must leave room for a pointer-sized field inside its block;
    /// the destination may land exactly one byte past its block's end (the
    /// empty-range sentinel). Offsets are measured against the sizes the
    /// arena recorded, so a zero-length or never-issued block only admits a
    /// destination at offset 0 and never an origin.
    pub fn record(
        &mut self,
        arena: &BlockArena,
        origin_block: BlockId,
        origin_off: BlockOffset,
        dest_block: BlockId,
        dest_off: BlockOffset,
    ) -> Result<()> {
        let origin_size = arena.block_size(origin_block) as u64;
        let dest_size = arena.block_size(dest_block) as u64;
        if origin_off as u64 + LINK_PTR_LEN as u64 > origin_size {
            return Err(DbFileError::LinkOutOfBounds(
                "origin field extends past the end of its block",
            ));
        }
        if dest_off as u64 > dest_size {
            return Err(DbFileError::LinkOutOfBounds(
                "destination offset past the end of its block",
            ));
        }
        if self.links.len() >= u16::MAX as usize {
            return Err(DbFileError::SizeLimitExceeded(
                "link table cannot hold more than 65535 entries",
            ));
        }
        self.links.push(LinkEntry {
            origin: origin_block + origin_off,
            destination: dest_block + dest_off,
        });
        Ok(())
    }

    /// Serializes the table in creation order.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.links.len() * std::mem::size_of::<LinkEntry>());
        for link in &self.links {
            link.encode_into(&mut buf);
        }
        buf
    }
}
