#![allow(missing_docs)]

use dbfile::{DbFileBuilder, DbFileReader, Result, HEADER_LEN};
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn patched_field(reader: &DbFileReader, origin: u32) -> u64 {
    let start = origin as usize;
    u64::from_ne_bytes(reader.as_bytes()[start..start + 8].try_into().unwrap())
}

#[test]
fn build_persist_reload_patches_every_link() -> Result<()> {
    init_tracing();
    let dir = tempdir()?;
    let path = dir.path().join("bundle.dbf");

    let mut builder = DbFileBuilder::new();
    let a = builder.create_block(&[0xa1; 32])?;
    let b = builder.create_block(&[0xb2; 16])?;
    let c = builder.create_block(&[0xc3; 24])?;
    builder.create_link(a, 0, b, 0)?;
    builder.create_link(a, 8, c, 4)?;
    builder.create_link(b, 0, a, 16)?;
    builder.create_link(c, 16, c, 24)?; // one-past-end sentinel destination
    builder.write_to_file(&path)?;

    let reader = DbFileReader::open(&path)?;
    assert_eq!(reader.links().len(), 4, "all links survive the round trip");
    for link in reader.links() {
        assert_eq!(
            patched_field(&reader, link.origin) as usize,
            reader.base_addr() + link.destination as usize,
            "field at {} must hold the address of {}",
            link.origin,
            link.destination
        );
    }
    Ok(())
}

#[test]
fn reserved_block_scenario() -> Result<()> {
    // Block A from 16 bytes at the start offset, in-place block B of size 4
    // right behind it, one link from A's first field to B.
    let mut builder = DbFileBuilder::new();
    let start = builder.start_offset();
    let a = builder.create_block(&[7; 16])?;
    let (b, view) = builder.reserve_block(4)?;
    view[..4].copy_from_slice(&[1, 2, 3, 4]);
    assert_eq!(a, start);
    assert_eq!(b, start + 16);
    builder.create_link(a, 0, b, 0)?;

    let dir = tempdir()?;
    let path = dir.path().join("scenario.dbf");
    builder.write_to_file(&path)?;

    let reader = DbFileReader::open(&path)?;
    let start = reader.header().start_offset;
    assert_eq!(
        patched_field(&reader, start) as usize,
        reader.base_addr() + start as usize + 16,
        "first field of the root block points at the reserved block"
    );
    assert_eq!(&reader.start()[16..20], &[1, 2, 3, 4]);
    Ok(())
}

#[test]
fn duplicate_origins_resolve_to_last_created_link() -> Result<()> {
    let mut builder = DbFileBuilder::new();
    let a = builder.create_block(&[0; 8])?;
    let b = builder.create_block(&[0; 8])?;
    let c = builder.create_block(&[0; 8])?;
    builder.create_link_to_block(a, 0, b)?;
    builder.create_link_to_block(a, 0, c)?;

    let reader = DbFileReader::from_vec(builder.into_bytes()?)?;
    assert_eq!(
        patched_field(&reader, a) as usize,
        reader.base_addr() + c as usize,
        "later link wins over the earlier one sharing its origin"
    );
    Ok(())
}

#[test]
fn finalize_twice_writes_one_link_table() -> Result<()> {
    let mut builder = DbFileBuilder::new();
    let a = builder.create_block(&[0; 16])?;
    builder.create_link(a, 0, a, 8)?;
    let first = builder.finalize()?.to_vec();
    let second = builder.finalize()?.to_vec();
    assert_eq!(first, second);

    let reader = DbFileReader::from_vec(second)?;
    assert_eq!(reader.links().len(), 1);
    assert_eq!(reader.header().file_size as usize, first.len());
    Ok(())
}

#[test]
fn file_without_links_round_trips() -> Result<()> {
    let mut builder = DbFileBuilder::new();
    builder.create_block(b"just bytes")?;
    let reader = DbFileReader::from_vec(builder.into_bytes()?)?;
    assert!(reader.links().is_empty());
    assert_eq!(reader.start(), b"just bytes");
    assert_eq!(reader.header().data_size, 10);
    Ok(())
}

#[test]
fn zero_length_block_shares_the_next_block_offset() -> Result<()> {
    let mut builder = DbFileBuilder::new();
    let empty = builder.create_block(&[])?;
    let next = builder.create_block(&[5; 8])?;
    assert_eq!(empty, next, "empty block does not advance the arena");
    assert_eq!(builder.block_size(empty), 8, "size entry belongs to the real block");
    assert_eq!(empty as usize, HEADER_LEN);
    Ok(())
}

#[test]
fn block_views_follow_the_relaxed_contract() -> Result<()> {
    let mut builder = DbFileBuilder::new();
    let a = builder.create_block(&[9; 8])?;
    // Interior offsets are accepted even though they were never issued.
    assert_eq!(builder.block(a + 4)?.len(), 4);
    assert!(builder.block(a + 9).is_err());
    assert_eq!(builder.block_size(a + 4), 0);
    Ok(())
}

#[test]
fn in_memory_and_on_disk_loads_agree() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("agree.dbf");

    let mut builder = DbFileBuilder::new();
    let a = builder.create_block(&[3; 16])?;
    let b = builder.create_block(&[4; 8])?;
    builder.create_link(a, 8, b, 0)?;
    builder.write_to_file(&path)?;
    let bytes = builder.finalize()?.to_vec();

    let from_disk = DbFileReader::open(&path)?;
    let from_memory = DbFileReader::from_vec(bytes)?;
    assert_eq!(from_disk.header(), from_memory.header());
    assert_eq!(from_disk.links(), from_memory.links());
    assert_eq!(from_disk.start().len(), from_memory.start().len());
    Ok(())
}
