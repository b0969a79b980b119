//! The defragmenter: sweeps a monotonically increasing target cluster
//! across every indexed file and directory (root excluded), swapping each
//! one into place so its chain becomes contiguous.
//!
//! No direct teacher counterpart; built atop `index.rs`/`swap.rs`.

use std::collections::HashSet;

use log::info;

use crate::error::FsError;
use crate::fatentry::{self, FatLinkKind};
use crate::geometry::Geometry;
use crate::index::{IndexTables, ROOT_NAME};
use crate::io::ImageIo;
use crate::swap;

/// Directory entries in first-appearance order, deduplicated by
/// `entry_point`, excluding the root pseudo-entry.
fn ordered_entries(tables: &IndexTables) -> Vec<(u32, u64)> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut out = Vec::new();
    let mut clusters: Vec<u32> = tables.correct.keys().copied().collect();
    clusters.sort_unstable();
    for cluster in clusters {
        let indexed = &tables.correct[&cluster];
        if indexed.entry.display_name() == ROOT_NAME {
            continue;
        }
        if indexed.previous.is_some() {
            continue; // only start from each file's first cluster
        }
        if seen.insert(indexed.entry.entry_point) {
            out.push((indexed.current, indexed.entry.entry_point));
        }
    }
    out
}

fn target_is_blocked(io: &mut ImageIo, geom: &Geometry, tables: &IndexTables, target: u32) -> Result<bool, FsError> {
    if let Some(indexed) = tables.correct.get(&target) {
        if indexed.entry.display_name() == ROOT_NAME {
            return Ok(true);
        }
    }
    let value = fatentry::read_primary(io, geom, target)?;
    Ok(fatentry::classify(geom, value) == FatLinkKind::Bad)
}

pub fn defragment(io: &mut ImageIo, geom: &Geometry, tables: &mut IndexTables) -> Result<(), FsError> {
    let files = ordered_entries(tables);
    let mut target: u32 = 2;
    let mut swaps = 0usize;

    for (first_cluster, _entry_point) in files {
        if first_cluster == 0 {
            continue;
        }
        let mut source = first_cluster;
        loop {
            while target <= geom.max_cluster() && target_is_blocked(io, geom, tables, target)? {
                target += 1;
            }
            if target > geom.max_cluster() {
                break;
            }
            swap::swap_clusters(io, geom, tables, target, source)?;
            swaps += 1;

            let next = fatentry::read_primary(io, geom, target)?;
            target += 1;
            match fatentry::classify(geom, next) {
                FatLinkKind::Live(n) => source = n,
                _ => break,
            }
        }
    }

    info!("defragmented image with {swaps} cluster swap(s)");
    Ok(())
}
