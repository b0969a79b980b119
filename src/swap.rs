//! The cluster swapper: exchanges two clusters' FAT links, incoming chain
//! references, index entries, and data payloads, then repairs any
//! directory-child `entry_point`s that moved.
//!
//! Generalizes the teacher's `fat.rs` chain-link bookkeeping
//! (`ClusterChain::write`, `previous`/`next_cluster`) from "append a
//! cluster to a chain" into "exchange two chains' worth of metadata".

use log::debug;

use crate::dirparser;
use crate::error::FsError;
use crate::fatentry::{self, FatLinkKind};
use crate::geometry::Geometry;
use crate::index::IndexTables;
use crate::io::ImageIo;

/// Updates whatever points *into* cluster `this` (a directory entry's
/// first-cluster field, or a previous cluster's FAT link) so it now points
/// at `other` instead, and records the new `previous` for whatever cluster
/// `this` used to point at.
fn rewire(
    io: &mut ImageIo,
    geom: &Geometry,
    tables: &mut IndexTables,
    this: u32,
    other: u32,
    value_before_swap: u32,
) -> Result<(), FsError> {
    if let Some(indexed) = tables.correct.get(&this).cloned() {
        match indexed.previous {
            None => {
                dirparser::write_first_cluster(io, indexed.entry.entry_point, other)?;
                if let Some(e) = tables.correct.get_mut(&this) {
                    e.entry.first_cluster = other;
                }
            }
            Some(_) if this == value_before_swap => {
                // degenerate self-link: `this` pointed at itself before the swap.
                fatentry::write_entry_all(io, geom, this, other)?;
                if let Some(e) = tables.correct.get_mut(&this) {
                    e.previous = Some(this);
                }
            }
            Some(prev) => {
                fatentry::write_entry_all(io, geom, prev, other)?;
            }
        }
    }

    if let FatLinkKind::Live(next) = fatentry::classify(geom, value_before_swap) {
        if next != other {
            if let Some(e) = tables.correct.get_mut(&next) {
                e.previous = Some(other);
            }
        }
    }
    Ok(())
}

pub fn swap_clusters(io: &mut ImageIo, geom: &Geometry, tables: &mut IndexTables, a: u32, b: u32) -> Result<(), FsError> {
    if a == b {
        return Ok(());
    }
    if a < 2 || a > geom.max_cluster() || b < 2 || b > geom.max_cluster() {
        return Err(FsError::OutOfBounds(format!(
            "swap endpoints {a}, {b} outside valid range [2, {}]",
            geom.max_cluster()
        )));
    }

    let va = fatentry::read_primary(io, geom, a)?;
    let vb = fatentry::read_primary(io, geom, b)?;

    // Step 1: swap the FAT link values themselves.
    fatentry::write_entry_all(io, geom, a, vb)?;
    fatentry::write_entry_all(io, geom, b, va)?;

    // Step 2: rewire whatever pointed into each cluster.
    rewire(io, geom, tables, a, b, va)?;
    rewire(io, geom, tables, b, a, vb)?;

    // Step 3: swap the index entries themselves.
    let ea = tables.correct.remove(&a);
    let eb = tables.correct.remove(&b);
    if let Some(mut e) = ea {
        e.current = b;
        tables.correct.insert(b, e);
    }
    if let Some(mut e) = eb {
        e.current = a;
        tables.correct.insert(a, e);
    }

    // Step 4: swap the cluster payloads.
    let data_a = fatentry::read_cluster(io, geom, a)?;
    let data_b = fatentry::read_cluster(io, geom, b)?;
    fatentry::write_cluster(io, geom, a, &data_b)?;
    fatentry::write_cluster(io, geom, b, &data_a)?;

    // Step 5: if either cluster is a directory, its children's entry_point
    // fields now live at different byte offsets than before the swap.
    repair_children(io, geom, tables, a)?;
    repair_children(io, geom, tables, b)?;

    debug!("swapped clusters {a} and {b}");
    Ok(())
}

fn repair_children(io: &mut ImageIo, geom: &Geometry, tables: &mut IndexTables, cluster: u32) -> Result<(), FsError> {
    let is_dir = tables.correct.get(&cluster).map(|e| e.is_dir).unwrap_or(false);
    if !is_dir {
        return Ok(());
    }
    let children = dirparser::parse_one_cluster(io, geom, cluster)?;
    for child in &children {
        if child.is_dot_or_dotdot() || child.first_cluster == 0 {
            continue;
        }
        if let Some(indexed) = tables.correct.get_mut(&child.first_cluster) {
            indexed.entry.entry_point = child.entry_point;
        }
    }
    Ok(())
}
