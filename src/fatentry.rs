//! FAT accessor: reads and writes individual FAT entries (across any of the
//! `num_fats` on-disk mirrors), classifies entry values, and reads/writes
//! whole cluster payloads.
//!
//! Generalizes the teacher's `fat.rs` (`ClusterChain`, `FatManager`), which
//! only ever addressed a single implicit FAT copy, into explicit
//! per-mirror addressing.

use crate::error::FsError;
use crate::geometry::{FatVariant, Geometry};
use crate::io::ImageIo;

const EOC_FAT16: u32 = 0xFFF8;
const BAD_FAT16: u32 = 0xFFF7;
const EOC_FAT32: u32 = 0x0FFFFFF8;
const BAD_FAT32: u32 = 0x0FFFFFF7;
const FAT32_MASK: u32 = 0x0FFFFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatLinkKind {
    Free,
    Live(u32),
    Bad,
    Eoc,
}

fn entry_width(variant: FatVariant) -> usize {
    match variant {
        FatVariant::Fat16 => 2,
        FatVariant::Fat32 => 4,
    }
}

fn entry_offset(geom: &Geometry, fat_index: u8, cluster: u32) -> Result<u64, FsError> {
    if fat_index >= geom.num_fats {
        return Err(FsError::InvalidArgument(format!(
            "FAT index {fat_index} out of range (num_fats={})",
            geom.num_fats
        )));
    }
    if cluster > geom.max_cluster() {
        return Err(FsError::OutOfBounds(format!(
            "cluster {cluster} outside valid FAT entry range [0, {}]",
            geom.max_cluster()
        )));
    }
    Ok(geom.fat_offset(fat_index) + cluster as u64 * entry_width(geom.variant) as u64)
}

pub fn classify(geom: &Geometry, value: u32) -> FatLinkKind {
    match geom.variant {
        FatVariant::Fat16 => {
            if value == 0 {
                FatLinkKind::Free
            } else if value == BAD_FAT16 {
                FatLinkKind::Bad
            } else if value >= EOC_FAT16 {
                FatLinkKind::Eoc
            } else {
                FatLinkKind::Live(value)
            }
        }
        FatVariant::Fat32 => {
            let value = value & FAT32_MASK;
            if value == 0 {
                FatLinkKind::Free
            } else if value == BAD_FAT32 {
                FatLinkKind::Bad
            } else if value >= EOC_FAT32 {
                FatLinkKind::Eoc
            } else {
                FatLinkKind::Live(value)
            }
        }
    }
}

pub fn eoc_value(geom: &Geometry) -> u32 {
    match geom.variant {
        FatVariant::Fat16 => 0xFFFF,
        FatVariant::Fat32 => 0x0FFFFFFF,
    }
}

pub fn read_entry(io: &mut ImageIo, geom: &Geometry, fat_index: u8, cluster: u32) -> Result<u32, FsError> {
    let offset = entry_offset(geom, fat_index, cluster)?;
    let raw = match geom.variant {
        FatVariant::Fat16 => io.read_u16_at(offset)? as u32,
        FatVariant::Fat32 => io.read_u32_at(offset)? & FAT32_MASK,
    };
    Ok(raw)
}

pub fn read_primary(io: &mut ImageIo, geom: &Geometry, cluster: u32) -> Result<u32, FsError> {
    read_entry(io, geom, 0, cluster)
}

pub fn write_entry_one(
    io: &mut ImageIo,
    geom: &Geometry,
    fat_index: u8,
    cluster: u32,
    value: u32,
) -> Result<(), FsError> {
    let offset = entry_offset(geom, fat_index, cluster)?;
    match geom.variant {
        FatVariant::Fat16 => io.write_uint_at(offset, value as u64, 2),
        FatVariant::Fat32 => {
            // preserve the reserved top nibble already on disk
            let existing = io.read_u32_at(offset)?;
            let patched = (existing & !FAT32_MASK) | (value & FAT32_MASK);
            io.write_uint_at(offset, patched as u64, 4)
        }
    }
}

pub fn write_entry_all(io: &mut ImageIo, geom: &Geometry, cluster: u32, value: u32) -> Result<(), FsError> {
    for fat_index in 0..geom.num_fats {
        write_entry_one(io, geom, fat_index, cluster, value)?;
    }
    Ok(())
}

pub fn read_cluster(io: &mut ImageIo, geom: &Geometry, cluster: u32) -> Result<Vec<u8>, FsError> {
    if cluster < 2 || cluster > geom.max_cluster() {
        return Err(FsError::OutOfBounds(format!(
            "cluster {cluster} outside valid range [2, {}]",
            geom.max_cluster()
        )));
    }
    let offset = geom.cluster_offset(cluster);
    io.read_at(offset, geom.bytes_per_cluster() as usize)
}

pub fn write_cluster(io: &mut ImageIo, geom: &Geometry, cluster: u32, data: &[u8]) -> Result<(), FsError> {
    if cluster < 2 || cluster > geom.max_cluster() {
        return Err(FsError::OutOfBounds(format!(
            "cluster {cluster} outside valid range [2, {}]",
            geom.max_cluster()
        )));
    }
    let offset = geom.cluster_offset(cluster);
    io.write_bytes_at(offset, data)
}

/// Scans the primary FAT for the first `count` free clusters, in ascending
/// order starting at cluster 2.
pub fn allocate_free_clusters(io: &mut ImageIo, geom: &Geometry, count: usize) -> Result<Vec<u32>, FsError> {
    let mut found = Vec::with_capacity(count);
    for cluster in 2..=geom.max_cluster() {
        if found.len() == count {
            break;
        }
        let value = read_primary(io, geom, cluster)?;
        if classify(geom, value) == FatLinkKind::Free {
            found.push(cluster);
        }
    }
    if found.len() < count {
        return Err(FsError::Exhausted(format!(
            "need {count} free clusters, only found {}",
            found.len()
        )));
    }
    Ok(found)
}
