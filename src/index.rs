//! The indexer: walks the whole directory tree and builds a reverse index
//! from cluster number to the directory entry (or entries) claiming it.
//!
//! No direct teacher counterpart — the teacher's VFS never builds a
//! cluster-to-owner index — but the traversal itself follows `dir.rs`'s
//! recursive-descent shape and `fat.rs`'s chain-walk shape.

use std::collections::HashMap;

use crate::direntry::DirectoryEntry;
use crate::dirparser::{self, DirHandle};
use crate::error::FsError;
use crate::fatentry::{self, FatLinkKind};
use crate::geometry::{FatVariant, Geometry};
use crate::io::ImageIo;

pub const ROOT_NAME: &str = "\\";

#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub entry: DirectoryEntry,
    pub current: u32,
    pub previous: Option<u32>,
    pub is_dir: bool,
}

#[derive(Debug, Default)]
pub struct IndexTables {
    pub full: HashMap<u32, Vec<IndexedEntry>>,
    pub correct: HashMap<u32, IndexedEntry>,
}

impl IndexTables {
    fn push(&mut self, cluster: u32, indexed: IndexedEntry) {
        self.correct.entry(cluster).or_insert_with(|| indexed.clone());
        self.full.entry(cluster).or_default().push(indexed);
    }

    fn claimant_names(&self, cluster: u32) -> Vec<String> {
        self.full
            .get(&cluster)
            .map(|v| v.iter().map(|e| e.entry.display_name()).collect())
            .unwrap_or_default()
    }
}

/// Walks a file/directory's own cluster chain starting at `first_cluster`,
/// indexing each cluster against `owner`. Stops early (without error) on
/// an inline self-loop (a later cluster claimed by an entry with the same
/// name already present at that cluster) or when the next FAT link is
/// marked bad.
fn walk_chain(
    io: &mut ImageIo,
    geom: &Geometry,
    tables: &mut IndexTables,
    owner: &DirectoryEntry,
    is_dir: bool,
    first_cluster: u32,
) -> Result<(), FsError> {
    if first_cluster == 0 {
        return Ok(());
    }
    let owner_name = owner.display_name();
    let mut previous: Option<u32> = None;
    let mut current = first_cluster;

    loop {
        if tables
            .claimant_names(current)
            .iter()
            .any(|n| *n == owner_name)
        {
            tables.push(
                current,
                IndexedEntry {
                    entry: owner.clone(),
                    current,
                    previous,
                    is_dir,
                },
            );
            break;
        }

        tables.push(
            current,
            IndexedEntry {
                entry: owner.clone(),
                current,
                previous,
                is_dir,
            },
        );

        let next_value = fatentry::read_primary(io, geom, current)?;
        match fatentry::classify(geom, next_value) {
            FatLinkKind::Live(next) => {
                previous = Some(current);
                current = next;
            }
            FatLinkKind::Bad | FatLinkKind::Eoc | FatLinkKind::Free => break,
        }
    }
    Ok(())
}

fn walk_directory(
    io: &mut ImageIo,
    geom: &Geometry,
    tables: &mut IndexTables,
    owner: &DirectoryEntry,
    handle: DirHandle,
) -> Result<(), FsError> {
    let entries = dirparser::parse_dir(io, geom, handle)?;
    for child in &entries {
        if child.is_dot_or_dotdot() {
            continue;
        }
        if child.is_directory() {
            walk_chain(io, geom, tables, child, true, child.first_cluster)?;
            if child.first_cluster != 0 {
                walk_directory(io, geom, tables, child, DirHandle::Cluster(child.first_cluster))?;
            }
        } else {
            walk_chain(io, geom, tables, child, false, child.first_cluster)?;
        }
    }
    let _ = owner;
    Ok(())
}

pub fn build(io: &mut ImageIo, geom: &Geometry) -> Result<IndexTables, FsError> {
    let mut tables = IndexTables::default();

    let root_handle = match geom.variant {
        FatVariant::Fat16 => DirHandle::FixedRoot,
        FatVariant::Fat32 => DirHandle::Cluster(geom.root_cluster),
    };

    let root_entry = DirectoryEntry {
        short_name: crate::direntry::pack_raw_name(ROOT_NAME),
        long_name: Some(ROOT_NAME.to_string()),
        attr: crate::direntry::ATTR_DIRECTORY,
        first_cluster: geom.root_cluster,
        file_size: 0,
        entry_point: 0,
    };

    if geom.variant == FatVariant::Fat32 {
        walk_chain(io, geom, &mut tables, &root_entry, true, geom.root_cluster)?;
    }

    walk_directory(io, geom, &mut tables, &root_entry, root_handle)?;

    Ok(tables)
}
