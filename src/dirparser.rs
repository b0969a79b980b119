//! Directory slot decoding: walks a fixed root extent (FAT16) or a cluster
//! chain (FAT32 root, or any subdirectory), assembling long names from
//! runs of fragments ahead of each short entry, and the handful of
//! mutating primitives (free-slot lookup, entry create/delete) the error
//! injector and cluster swapper build on.
//!
//! Reworks the teacher's `dir.rs` traversal (`find_by_lfn`/`find_by_sfn`/
//! `empty_entry_index`), which walked through a VFS `find` API, into a flat
//! decode pass over raw 32-byte slots.

use crate::direntry::{
    self, pack_raw_name, DirectoryEntry, LongNameFragment, RawSlot, DIRENT_SIZE,
};
use crate::error::FsError;
use crate::fatentry::{self, FatLinkKind};
use crate::geometry::Geometry;
use crate::io::ImageIo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirHandle {
    FixedRoot,
    Cluster(u32),
}

/// Every byte offset, in order, that a directory's slots occupy on disk.
fn slot_offsets(io: &mut ImageIo, geom: &Geometry, handle: DirHandle) -> Result<Vec<u64>, FsError> {
    let mut offsets = Vec::new();
    match handle {
        DirHandle::FixedRoot => {
            let base = geom.fixed_root_offset();
            let len = geom.fixed_root_byte_len();
            let mut off = base;
            while off < base + len {
                offsets.push(off);
                off += DIRENT_SIZE as u64;
            }
        }
        DirHandle::Cluster(start) => {
            let mut current = start;
            loop {
                let cluster_base = geom.cluster_offset(current);
                let mut off = cluster_base;
                while off < cluster_base + geom.bytes_per_cluster() {
                    offsets.push(off);
                    off += DIRENT_SIZE as u64;
                }
                let next = fatentry::read_primary(io, geom, current)?;
                match fatentry::classify(geom, next) {
                    FatLinkKind::Live(n) => current = n,
                    _ => break,
                }
            }
        }
    }
    Ok(offsets)
}

fn decode_run(io: &mut ImageIo, offsets: &[u64]) -> Result<Vec<DirectoryEntry>, FsError> {
    let mut entries = Vec::new();
    let mut pending: Vec<LongNameFragment> = Vec::new();

    for &offset in offsets {
        let raw = io.read_at(offset, DIRENT_SIZE)?;
        let mut bytes = [0u8; DIRENT_SIZE];
        bytes.copy_from_slice(&raw);

        match direntry::decode_slot(&bytes, offset) {
            RawSlot::EndOfDirectory => break,
            RawSlot::Free => {
                pending.clear();
            }
            RawSlot::LongFragment(frag) => {
                pending.push(frag);
            }
            RawSlot::Short {
                short_name,
                attr,
                first_cluster,
                file_size,
                entry_point,
            } => {
                let long_name = if pending.is_empty() {
                    None
                } else {
                    Some(direntry::assemble_long_name(&pending))
                };
                pending.clear();
                entries.push(DirectoryEntry {
                    short_name,
                    long_name,
                    attr,
                    first_cluster,
                    file_size,
                    entry_point,
                });
            }
        }
    }
    Ok(entries)
}

pub fn parse_dir(io: &mut ImageIo, geom: &Geometry, handle: DirHandle) -> Result<Vec<DirectoryEntry>, FsError> {
    let offsets = slot_offsets(io, geom, handle)?;
    decode_run(io, &offsets)
}

/// Decodes only the slots physically inside one cluster — used by the
/// cluster swapper's child `entry_point` repair step, which must not
/// follow the chain past the cluster that just moved.
pub fn parse_one_cluster(io: &mut ImageIo, geom: &Geometry, cluster: u32) -> Result<Vec<DirectoryEntry>, FsError> {
    let cluster_base = geom.cluster_offset(cluster);
    let mut offsets = Vec::new();
    let mut off = cluster_base;
    while off < cluster_base + geom.bytes_per_cluster() {
        offsets.push(off);
        off += DIRENT_SIZE as u64;
    }
    decode_run(io, &offsets)
}

pub fn find_free_slot(io: &mut ImageIo, geom: &Geometry, handle: DirHandle) -> Result<Option<u64>, FsError> {
    let offsets = slot_offsets(io, geom, handle)?;
    for offset in offsets {
        let raw = io.read_at(offset, DIRENT_SIZE)?;
        if raw[0] == direntry::free_marker() || raw[0] == direntry::end_marker() {
            return Ok(Some(offset));
        }
    }
    Ok(None)
}

pub fn delete_entry(io: &mut ImageIo, entry_point: u64) -> Result<(), FsError> {
    io.write_bytes_at(entry_point, &[direntry::free_marker()])
}

/// Stamps a fresh short entry at `offset`: raw 11-byte name (no 8.3 dot
/// splitting — callers pass names that already fit), a single attribute
/// byte, a first-cluster number, and a file size of 1 so the entry reads
/// as a minimal regular file.
pub fn create_entry(
    io: &mut ImageIo,
    offset: u64,
    name: &str,
    attr: u8,
    first_cluster: u32,
) -> Result<(), FsError> {
    if attr != 0 && attr.count_ones() > 1 {
        return Err(FsError::InvalidArgument(format!(
            "attribute byte {attr:#04x} has more than one bit set"
        )));
    }
    let raw_name = pack_raw_name(name);
    io.write_bytes_at(offset, &raw_name)?;
    io.write_uint(attr as u64, 1)?;
    io.write_bytes(&[0u8; 8])?; // NTRes, CrtTimeTenth, CrtTime, CrtDate, LstAccDate
    io.write_uint(((first_cluster >> 16) & 0xFFFF) as u64, 2)?; // FstClusHI
    io.write_bytes(&[0u8; 4])?; // WrtTime, WrtDate
    io.write_uint((first_cluster & 0xFFFF) as u64, 2)?; // FstClusLO
    io.write_uint(1, 4)?; // FileSize
    Ok(())
}

pub fn write_first_cluster(io: &mut ImageIo, entry_point: u64, new_cluster: u32) -> Result<(), FsError> {
    io.write_uint_at(entry_point + 20, ((new_cluster >> 16) & 0xFFFF) as u64, 2)?;
    io.write_uint_at(entry_point + 26, (new_cluster & 0xFFFF) as u64, 2)?;
    Ok(())
}
