//! In-place pointer patching for loaded buffers.

use crate::format::{LinkEntry, LINK_PTR_LEN};
use crate::types::{DbFileError, Result};

/// Applies every link to `buf`, converting stored offsets into addresses
/// valid inside the current process.
///
/// Entries are replayed in stored order, so duplicate origins resolve to the
/// last entry's destination. Runs at most once per loaded buffer; the reader
/// only calls it during construction, and a failure aborts the load, so a
/// patched buffer is never re-walked.
///
/// Beyond the recorded `file_size` bounds, each origin must leave room for
/// the full pointer field inside the loaded buffer; the original format left
/// that unchecked.
pub(crate) fn relocate(buf: &mut [u8], file_size: u32, links: &[LinkEntry]) -> Result<()> {
    let base = buf.as_ptr() as usize;
    for link in links {
        if link.origin > file_size || link.destination > file_size {
            return Err(DbFileError::LinkOutOfRange(
                "link endpoint past the end of the file",
            ));
        }
        let origin = link.origin as usize;
        let end = origin + LINK_PTR_LEN;
        if end > buf.len() {
            return Err(DbFileError::LinkOutOfRange(
                "origin field extends past the loaded buffer",
            ));
        }
        let addr = (base + link.destination as usize) as u64;
        buf[origin..end].copy_from_slice(&addr.to_ne_bytes());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patches_each_origin_with_base_plus_destination() {
        let mut buf = vec![0u8; 64];
        let base = buf.as_ptr() as usize;
        let links = [
            LinkEntry {
                origin: 0,
                destination: 32,
            },
            LinkEntry {
                origin: 16,
                destination: 0,
            },
        ];
        relocate(&mut buf, 64, &links).unwrap();
        let first = u64::from_ne_bytes(buf[0..8].try_into().unwrap());
        let second = u64::from_ne_bytes(buf[16..24].try_into().unwrap());
        assert_eq!(first, (base + 32) as u64);
        assert_eq!(second, base as u64);
    }

    #[test]
    fn duplicate_origins_last_applied_wins() {
        let mut buf = vec![0u8; 32];
        let base = buf.as_ptr() as usize;
        let links = [
            LinkEntry {
                origin: 8,
                destination: 24,
            },
            LinkEntry {
                origin: 8,
                destination: 16,
            },
        ];
        relocate(&mut buf, 32, &links).unwrap();
        let value = u64::from_ne_bytes(buf[8..16].try_into().unwrap());
        assert_eq!(value, (base + 16) as u64);
    }

    #[test]
    fn endpoint_past_file_size_is_rejected() {
        let mut buf = vec![0u8; 32];
        let links = [LinkEntry {
            origin: 0,
            destination: 33,
        }];
        assert!(matches!(
            relocate(&mut buf, 32, &links).unwrap_err(),
            DbFileError::LinkOutOfRange(_)
        ));
    }

    #[test]
    fn origin_without_room_for_pointer_is_rejected() {
        // origin == file_size passes the recorded bound but leaves no room
        // for the eight-byte field.
        let mut buf = vec![0u8; 32];
        let links = [LinkEntry {
            origin: 32,
            destination: 0,
        }];
        assert!(matches!(
            relocate(&mut buf, 32, &links).unwrap_err(),
            DbFileError::LinkOutOfRange(_)
        ));
    }
}
