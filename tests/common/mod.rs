//! Synthetic FAT16 image builder shared by the integration tests, in the
//! style of `fat32expander`'s `tempfile`-built fixture images.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use tempfile::NamedTempFile;

pub const BYTES_PER_SECTOR: u64 = 512;
pub const SECTORS_PER_CLUSTER: u64 = 1;
pub const RESERVED_SECTORS: u64 = 1;
pub const NUM_FATS: u64 = 2;
pub const ROOT_ENTRY_COUNT: u64 = 16;
pub const FAT_SIZE_SECTORS: u64 = 16;
pub const CLUSTER_COUNT: u64 = 4085; // comfortably under the FAT16/FAT32 threshold of 65525

pub const ROOT_DIR_SECTORS: u64 = (ROOT_ENTRY_COUNT * 32).div_ceil(BYTES_PER_SECTOR);
pub const FIRST_DATA_SECTOR: u64 = RESERVED_SECTORS + NUM_FATS * FAT_SIZE_SECTORS + ROOT_DIR_SECTORS;
pub const TOTAL_SECTORS: u64 = FIRST_DATA_SECTOR + CLUSTER_COUNT * SECTORS_PER_CLUSTER;

pub const FAT0_OFFSET: u64 = RESERVED_SECTORS * BYTES_PER_SECTOR;
pub const FAT1_OFFSET: u64 = FAT0_OFFSET + FAT_SIZE_SECTORS * BYTES_PER_SECTOR;
pub const ROOT_OFFSET: u64 = (RESERVED_SECTORS + NUM_FATS * FAT_SIZE_SECTORS) * BYTES_PER_SECTOR;
pub const DATA_OFFSET: u64 = FIRST_DATA_SECTOR * BYTES_PER_SECTOR;

pub fn cluster_offset(cluster: u64) -> u64 {
    DATA_OFFSET + (cluster - 2) * SECTORS_PER_CLUSTER * BYTES_PER_SECTOR
}

pub struct Image {
    pub file: NamedTempFile,
}

impl Image {
    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }
}

fn write_at(file: &mut File, offset: u64, bytes: &[u8]) {
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(bytes).unwrap();
}

pub fn fat_entry_offset(fat_base: u64, cluster: u64) -> u64 {
    fat_base + cluster * 2
}

pub fn set_fat_entry(file: &mut File, fat_base: u64, cluster: u64, value: u16) {
    write_at(file, fat_entry_offset(fat_base, cluster), &value.to_le_bytes());
}

pub fn set_fat_entry_both(file: &mut File, cluster: u64, value: u16) {
    set_fat_entry(file, FAT0_OFFSET, cluster, value);
    set_fat_entry(file, FAT1_OFFSET, cluster, value);
}

/// Writes a 32-byte short directory entry at an absolute byte offset.
pub fn write_entry_at(file: &mut File, offset: u64, raw_name: &[u8; 11], attr: u8, first_cluster: u16, file_size: u32) {
    write_at(file, offset, raw_name);
    write_at(file, offset + 11, &[attr]);
    write_at(file, offset + 12, &[0u8; 8]);
    write_at(file, offset + 20, &0u16.to_le_bytes()); // FstClusHI always 0 for FAT16
    write_at(file, offset + 22, &[0u8; 4]);
    write_at(file, offset + 26, &first_cluster.to_le_bytes());
    write_at(file, offset + 28, &file_size.to_le_bytes());
}

/// Writes a 32-byte short directory entry at `slot` inside the fixed root.
pub fn write_root_entry(file: &mut File, slot_index: u64, raw_name: &[u8; 11], attr: u8, first_cluster: u16, file_size: u32) {
    write_entry_at(file, ROOT_OFFSET + slot_index * 32, raw_name, attr, first_cluster, file_size);
}

const ATTR_LONG_NAME: u8 = 0x0F;
const LAST_LONG_ENTRY: u8 = 0x40;

fn write_long_fragment(file: &mut File, offset: u64, order_byte: u8, units: &[u16; 13]) {
    write_at(file, offset, &[order_byte]);
    for (i, u) in units[0..5].iter().enumerate() {
        write_at(file, offset + 1 + i as u64 * 2, &u.to_le_bytes());
    }
    write_at(file, offset + 11, &[ATTR_LONG_NAME]);
    write_at(file, offset + 12, &[0u8]); // type, always 0
    write_at(file, offset + 13, &[0u8]); // checksum, unchecked by this parser
    for (i, u) in units[5..11].iter().enumerate() {
        write_at(file, offset + 14 + i as u64 * 2, &u.to_le_bytes());
    }
    write_at(file, offset + 26, &0u16.to_le_bytes()); // FstClusLO, always 0
    for (i, u) in units[11..13].iter().enumerate() {
        write_at(file, offset + 28 + i as u64 * 2, &u.to_le_bytes());
    }
}

/// Writes a long-name entry (one or more LFN fragments, followed by the
/// trailing short entry) at `base_offset`, returning the absolute offset of
/// the next free slot after it. The short entry's own 8.3 name is an
/// arbitrary placeholder, since this parser never re-derives or validates
/// it — only the assembled long name is exposed as `display_name()`.
pub fn write_long_name_entry(
    file: &mut File,
    base_offset: u64,
    name: &str,
    attr: u8,
    first_cluster: u16,
    file_size: u32,
) -> u64 {
    let mut units: Vec<u16> = name.encode_utf16().collect();
    units.push(0); // NUL terminator
    let chunk_count = units.len().div_ceil(13);
    while units.len() < chunk_count * 13 {
        units.push(0xFFFF);
    }

    let mut offset = base_offset;
    for i in (0..chunk_count).rev() {
        let mut chunk = [0u16; 13];
        chunk.copy_from_slice(&units[i * 13..i * 13 + 13]);
        let order = (i + 1) as u8;
        let order_byte = if i == chunk_count - 1 { order | LAST_LONG_ENTRY } else { order };
        write_long_fragment(file, offset, order_byte, &chunk);
        offset += 32;
    }

    let placeholder: String = name
        .chars()
        .filter(|c| *c != ' ' && *c != '.')
        .take(8)
        .collect::<String>()
        .to_ascii_uppercase();
    write_entry_at(file, offset, &raw_name(&placeholder), attr, first_cluster, file_size);
    offset + 32
}

/// Builds a blank, correctly-geometried FAT16 image with both FAT mirrors
/// zeroed and an empty root directory.
pub fn blank_fat16() -> Image {
    let mut file = NamedTempFile::new().unwrap();
    file.as_file_mut()
        .set_len(TOTAL_SECTORS * BYTES_PER_SECTOR)
        .unwrap();

    let f = file.as_file_mut();
    write_at(f, 0x0B, &(BYTES_PER_SECTOR as u16).to_le_bytes());
    write_at(f, 0x0D, &[SECTORS_PER_CLUSTER as u8]);
    write_at(f, 0x0E, &(RESERVED_SECTORS as u16).to_le_bytes());
    write_at(f, 0x10, &[NUM_FATS as u8]);
    write_at(f, 0x11, &(ROOT_ENTRY_COUNT as u16).to_le_bytes());
    write_at(f, 0x13, &(TOTAL_SECTORS as u16).to_le_bytes());
    write_at(f, 0x16, &(FAT_SIZE_SECTORS as u16).to_le_bytes());
    write_at(f, 0x20, &0u32.to_le_bytes());
    write_at(f, 0x24, &0u32.to_le_bytes());

    // reserved clusters 0 and 1 in both FAT mirrors
    set_fat_entry(f, FAT0_OFFSET, 0, 0xFFF8);
    set_fat_entry(f, FAT0_OFFSET, 1, 0xFFFF);
    set_fat_entry(f, FAT1_OFFSET, 0, 0xFFF8);
    set_fat_entry(f, FAT1_OFFSET, 1, 0xFFFF);

    Image { file }
}

/// Fills cluster `cluster`'s on-disk data region with `byte`, repeated.
pub fn fill_cluster(file: &mut File, cluster: u64, byte: u8) {
    let offset = cluster_offset(cluster);
    write_at(file, offset, &vec![byte; (BYTES_PER_SECTOR * SECTORS_PER_CLUSTER) as usize]);
}

pub fn read_cluster_bytes(file: &mut File, cluster: u64) -> Vec<u8> {
    use std::io::Read as _;
    let offset = cluster_offset(cluster);
    file.seek(SeekFrom::Start(offset)).unwrap();
    let mut buf = vec![0u8; (BYTES_PER_SECTOR * SECTORS_PER_CLUSTER) as usize];
    file.read_exact(&mut buf).unwrap();
    buf
}

pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;

/// Writes the `.` and `..` self/parent entries at the start of a
/// subdirectory's cluster. `parent_cluster` is 0 when the parent is the
/// FAT16 fixed root.
pub fn write_dot_entries(file: &mut File, dir_cluster: u64, self_cluster: u16, parent_cluster: u16) {
    let base = cluster_offset(dir_cluster);
    write_entry_at(file, base, &raw_name("."), ATTR_DIRECTORY, self_cluster, 0);
    write_entry_at(file, base + 32, &raw_name(".."), ATTR_DIRECTORY, parent_cluster, 0);
}

pub fn raw_name(name: &str) -> [u8; 11] {
    let mut raw = [b' '; 11];
    for (i, b) in name.as_bytes().iter().take(11).enumerate() {
        raw[i] = *b;
    }
    raw
}
