//! The fragmenter (seeded-random cluster swaps, for building adversarial
//! test fixtures) and the `fragmentation_data` metric.
//!
//! Puts the teacher's `rand` dependency — declared in its CLI crate but
//! never actually used — to work, seeded deterministically per §4.9/§4.10.

use log::info;
use rand::rngs::StdRng;
use rand::Rng;

use crate::error::FsError;
use crate::fatentry::{self, FatLinkKind};
use crate::geometry::Geometry;
use crate::index::{IndexTables, ROOT_NAME};
use crate::io::ImageIo;
use crate::swap;

fn is_eligible(tables: &IndexTables, cluster: u32) -> bool {
    match tables.correct.get(&cluster) {
        Some(indexed) => !indexed.is_dir && indexed.entry.display_name() != ROOT_NAME,
        None => false,
    }
}

pub fn fragment(
    io: &mut ImageIo,
    geom: &Geometry,
    tables: &mut IndexTables,
    swap_count: usize,
    rng: &mut StdRng,
) -> Result<(), FsError> {
    let clusters: Vec<u32> = tables
        .correct
        .keys()
        .copied()
        .filter(|c| is_eligible(tables, *c))
        .collect();

    if clusters.len() < 2 {
        return Err(FsError::Exhausted(
            "not enough eligible (non-directory, non-root) clusters to fragment".into(),
        ));
    }

    let mut done = 0usize;
    while done < swap_count {
        let a = clusters[rng.gen_range(0..clusters.len())];
        let b = clusters[rng.gen_range(0..clusters.len())];
        if a == b {
            continue;
        }
        swap::swap_clusters(io, geom, tables, a, b)?;
        done += 1;
    }

    info!("fragmented image with {done} random cluster swap(s)");
    Ok(())
}

/// For every cluster n in [0, cluster_count): live if FAT[n] != 0; broken
/// if live and FAT[n] is neither EOC nor exactly n+1. 0 if there are no
/// live clusters at all.
pub fn fragmentation_percent(io: &mut ImageIo, geom: &Geometry) -> Result<f64, FsError> {
    let mut live: u64 = 0;
    let mut broken: u64 = 0;

    for n in 0..geom.cluster_count {
        let value = fatentry::read_primary(io, geom, n)?;
        if value == 0 {
            continue;
        }
        live += 1;
        let is_eoc = fatentry::classify(geom, value) == FatLinkKind::Eoc;
        if !is_eoc && value != n + 1 {
            broken += 1;
        }
    }

    if live == 0 {
        Ok(0.0)
    } else {
        Ok(100.0 * broken as f64 / live as f64)
    }
}
