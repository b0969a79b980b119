mod common;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use fatimg_fix::FileSystem;

fn read_whole_file(path: &std::path::Path) -> Vec<u8> {
    let mut f = File::open(path).unwrap();
    let mut buf = Vec::new();
    f.seek(SeekFrom::Start(0)).unwrap();
    f.read_to_end(&mut buf).unwrap();
    buf
}

#[test]
fn swap_of_a_cluster_with_itself_is_a_no_op() {
    let mut image = common::blank_fat16();
    {
        let f = image.file.as_file_mut();
        common::write_root_entry(f, 0, &common::raw_name("D.TXT"), 0x20, 2, 512);
        common::set_fat_entry_both(f, 2, 0xFFFF);
        common::fill_cluster(f, 2, 0xAB);
    }
    let before = read_whole_file(image.path());

    let mut fs = FileSystem::open(image.path()).unwrap();
    let mut tables = fs.build_index().unwrap();
    fs.swap(&mut tables, 2, 2).unwrap();
    drop(fs);

    let after = read_whole_file(image.path());
    assert_eq!(before, after);
}

#[test]
fn swapping_twice_restores_the_image_byte_for_byte() {
    let mut image = common::blank_fat16();
    {
        let f = image.file.as_file_mut();
        common::write_root_entry(f, 0, &common::raw_name("E.TXT"), 0x20, 2, 512);
        common::set_fat_entry_both(f, 2, 3);
        common::set_fat_entry_both(f, 3, 0xFFFF);
        common::fill_cluster(f, 2, 0x11);
        common::fill_cluster(f, 3, 0x22);
        // An unrelated, unindexed free cluster to swap against.
        common::fill_cluster(f, 6, 0x33);
    }
    let before = read_whole_file(image.path());

    let mut fs = FileSystem::open(image.path()).unwrap();
    let mut tables = fs.build_index().unwrap();
    fs.swap(&mut tables, 2, 6).unwrap();
    fs.swap(&mut tables, 2, 6).unwrap();
    drop(fs);

    let after = read_whole_file(image.path());
    assert_eq!(before, after);
}

#[test]
fn swap_preserves_file_contents_across_the_chain() {
    let mut image = common::blank_fat16();
    {
        let f = image.file.as_file_mut();
        common::write_root_entry(f, 0, &common::raw_name("F.TXT"), 0x20, 2, 1024);
        common::set_fat_entry_both(f, 2, 3);
        common::set_fat_entry_both(f, 3, 0xFFFF);
        common::fill_cluster(f, 2, 0xCA);
        common::fill_cluster(f, 3, 0xFE);
    }
    let contents_before = {
        let f = image.file.as_file_mut();
        [common::read_cluster_bytes(f, 2), common::read_cluster_bytes(f, 3)].concat()
    };

    let mut fs = FileSystem::open(image.path()).unwrap();
    let mut tables = fs.build_index().unwrap();
    fs.swap(&mut tables, 2, 6).unwrap();
    drop(fs);

    // Walk the chain from its (possibly new) first cluster by re-reading
    // the directory entry and following FAT links, and confirm the bytes
    // read in chain order are unchanged.
    let mut fs = FileSystem::open(image.path()).unwrap();
    let tables = fs.build_index().unwrap();
    let entry = tables
        .correct
        .values()
        .find(|e| e.entry.display_name() == "F.TXT")
        .unwrap()
        .clone();

    let mut raw_file = File::open(image.path()).unwrap();
    let mut contents_after = Vec::new();
    let mut cluster = entry.entry.first_cluster;
    loop {
        contents_after.extend(common::read_cluster_bytes(&mut raw_file, cluster as u64));
        let next = fs.read_primary_fat(cluster).unwrap();
        match fatimg_fix::fatentry::classify(&fs.geometry, next) {
            fatimg_fix::fatentry::FatLinkKind::Live(n) => cluster = n,
            _ => break,
        }
    }
    assert_eq!(contents_before, contents_after);
}
