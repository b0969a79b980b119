//! `FileSystem`: the facade tying image I/O, geometry, the FAT accessor
//! and the indexer together, and the public entry points for every
//! top-level operation (detect/repair, defragment, fragment, inject).
//!
//! Reworks the teacher's `fs.rs` (`FileSystem::open`, ownership of
//! `bpb`/`fat`/`device`) from a VFS-root holder into a stateless-per-call
//! facade.

use std::collections::HashSet;
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::detect::{self, Anomalies};
use crate::dirparser::DirHandle;
use crate::error::FsError;
use crate::fatentry;
use crate::fragment;
use crate::geometry::{FatVariant, Geometry};
use crate::index::{self, IndexTables, ROOT_NAME};
use crate::inject;
use crate::io::ImageIo;
use crate::{defrag, swap};

pub struct FileSystem {
    pub io: ImageIo,
    pub geometry: Geometry,
}

impl FileSystem {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FsError> {
        let mut io = ImageIo::open(path)?;
        let geometry = Geometry::parse(&mut io)?;
        info!(
            "opened image as {:?}, {} data cluster(s)",
            geometry.variant, geometry.cluster_count
        );
        Ok(Self { io, geometry })
    }

    pub fn build_index(&mut self) -> Result<IndexTables, FsError> {
        index::build(&mut self.io, &self.geometry)
    }

    /// Resolves `name` to a directory handle by scanning the index for a
    /// directory entry with that display name (root name is `\`). The
    /// first match wins if the image has duplicate directory names in
    /// different parents.
    pub fn resolve_directory(&mut self, tables: &IndexTables, name: &str) -> Result<DirHandle, FsError> {
        if name == ROOT_NAME {
            return Ok(match self.geometry.variant {
                FatVariant::Fat16 => DirHandle::FixedRoot,
                FatVariant::Fat32 => DirHandle::Cluster(self.geometry.root_cluster),
            });
        }
        let mut seen = HashSet::new();
        for indexed in tables.correct.values() {
            if !indexed.is_dir || indexed.previous.is_some() {
                continue;
            }
            if !seen.insert(indexed.entry.entry_point) {
                continue;
            }
            if indexed.entry.display_name() == name {
                return Ok(DirHandle::Cluster(indexed.entry.first_cluster));
            }
        }
        Err(FsError::NotFound(format!("no directory named {name}")))
    }

    pub fn fragmentation_percent(&mut self) -> Result<f64, FsError> {
        fragment::fragmentation_percent(&mut self.io, &self.geometry)
    }

    pub fn defragment(&mut self) -> Result<(), FsError> {
        let mut tables = self.build_index()?;
        defrag::defragment(&mut self.io, &self.geometry, &mut tables)
    }

    pub fn fragment_random(&mut self, swap_count: usize, seed: u64) -> Result<(), FsError> {
        let mut tables = self.build_index()?;
        let mut rng = StdRng::seed_from_u64(seed);
        fragment::fragment(&mut self.io, &self.geometry, &mut tables, swap_count, &mut rng)
    }

    pub fn detect(&mut self, authoritative_fat: u8) -> Result<Anomalies, FsError> {
        let tables = self.build_index()?;
        detect::detect(&mut self.io, &self.geometry, &tables, authoritative_fat)
    }

    pub fn repair_fat_mirrors(&mut self, authoritative_fat: u8) -> Result<(), FsError> {
        let diffs = detect::find_mirror_diffs(&mut self.io, &self.geometry, authoritative_fat)?;
        detect::repair_mirrors(&mut self.io, &self.geometry, authoritative_fat, &diffs)
    }

    pub fn repair_loops_and_intersections(&mut self) -> Result<(), FsError> {
        let tables = self.build_index()?;
        let (looped, intersections) = detect::classify_loops_and_intersections(&tables);
        detect::repair_looped_and_intersecting(&mut self.io, &self.geometry, &tables, &looped, &intersections)
    }

    pub fn inject_mirror_divergence(&mut self, fat_num: u8) -> Result<(), FsError> {
        inject::inject_mirror_divergence(&mut self.io, &self.geometry, fat_num)
    }

    pub fn inject_looped_file(&mut self, folder: &str) -> Result<(), FsError> {
        let tables = self.build_index()?;
        let handle = self.resolve_directory(&tables, folder)?;
        inject::inject_looped_file(&mut self.io, &self.geometry, handle)
    }

    pub fn inject_intersecting_files(&mut self, folder: &str) -> Result<(), FsError> {
        let tables = self.build_index()?;
        let handle = self.resolve_directory(&tables, folder)?;
        inject::inject_intersecting_files(&mut self.io, &self.geometry, handle)
    }

    /// Direct swap passthrough, used by tests that want to exercise the
    /// swapper against an index they built themselves.
    pub fn swap(&mut self, tables: &mut IndexTables, a: u32, b: u32) -> Result<(), FsError> {
        swap::swap_clusters(&mut self.io, &self.geometry, tables, a, b)
    }

    pub fn read_primary_fat(&mut self, cluster: u32) -> Result<u32, FsError> {
        fatentry::read_primary(&mut self.io, &self.geometry, cluster)
    }
}
