//! Anomaly detection and repair: FAT-mirror divergence, cluster-chain
//! loops and intersections (derived from the indexer's full table), and
//! orphaned clusters.
//!
//! No direct teacher counterpart — the teacher never checks mirror
//! consistency or scrubs orphans — built from the indexed tables `index.rs`
//! produces.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use crate::error::FsError;
use crate::fatentry::{self, FatLinkKind};
use crate::geometry::Geometry;
use crate::index::IndexTables;
use crate::io::ImageIo;

#[derive(Debug, Default)]
pub struct Anomalies {
    pub mirror_diffs: Vec<u32>,
    pub looped_names: Vec<String>,
    pub intersections: Vec<(u32, Vec<String>)>,
    pub orphans: Vec<u32>,
}

pub fn find_mirror_diffs(io: &mut ImageIo, geom: &Geometry, authoritative: u8) -> Result<Vec<u32>, FsError> {
    let mut diffs = Vec::new();
    if geom.num_fats < 2 {
        return Ok(diffs);
    }
    for cluster in 0..geom.cluster_count {
        let reference = fatentry::read_entry(io, geom, authoritative, cluster)?;
        for fat_index in 0..geom.num_fats {
            if fat_index == authoritative {
                continue;
            }
            let other = fatentry::read_entry(io, geom, fat_index, cluster)?;
            if other != reference {
                diffs.push(cluster);
                break;
            }
        }
    }
    Ok(diffs)
}

/// Groups every cluster with more than one claimant by owning-entry name.
/// A name claiming the same cluster more than once is a loop; two or more
/// distinct names claiming the same cluster is an intersection.
pub fn classify_loops_and_intersections(tables: &IndexTables) -> (HashSet<String>, Vec<(u32, Vec<String>)>) {
    let mut looped = HashSet::new();
    let mut intersections = Vec::new();

    for (&cluster, claimants) in &tables.full {
        if claimants.len() <= 1 {
            continue;
        }
        let mut counts: HashMap<String, usize> = HashMap::new();
        for claimant in claimants {
            *counts.entry(claimant.entry.display_name()).or_insert(0) += 1;
        }
        for (name, count) in &counts {
            if *count > 1 {
                looped.insert(name.clone());
            }
        }
        let distinct: Vec<String> = counts.keys().cloned().collect();
        if distinct.len() >= 2 {
            intersections.push((cluster, distinct));
        }
    }
    intersections.sort_by_key(|(c, _)| *c);
    (looped, intersections)
}

pub fn find_orphans(io: &mut ImageIo, geom: &Geometry, tables: &IndexTables) -> Result<Vec<u32>, FsError> {
    let mut orphans = Vec::new();
    for cluster in 2..geom.cluster_count {
        let value = fatentry::read_primary(io, geom, cluster)?;
        if fatentry::classify(geom, value) == FatLinkKind::Free {
            continue;
        }
        if !tables.correct.contains_key(&cluster) {
            orphans.push(cluster);
        }
    }
    Ok(orphans)
}

pub fn detect(io: &mut ImageIo, geom: &Geometry, tables: &IndexTables, authoritative: u8) -> Result<Anomalies, FsError> {
    let mirror_diffs = find_mirror_diffs(io, geom, authoritative)?;
    let (looped, intersections) = classify_loops_and_intersections(tables);
    let orphans = find_orphans(io, geom, tables)?;

    if !mirror_diffs.is_empty() {
        warn!("{} cluster(s) diverge between FAT mirrors", mirror_diffs.len());
    }
    if !looped.is_empty() {
        warn!("{} file(s) have a looped cluster chain", looped.len());
    }
    if !intersections.is_empty() {
        warn!("{} cluster(s) are claimed by intersecting files", intersections.len());
    }
    if !orphans.is_empty() {
        info!("{} orphaned cluster(s) found", orphans.len());
    }
    if mirror_diffs.is_empty() && looped.is_empty() && intersections.is_empty() && orphans.is_empty() {
        debug!("no anomalies found");
    }

    Ok(Anomalies {
        mirror_diffs,
        looped_names: looped.into_iter().collect(),
        intersections,
        orphans,
    })
}

pub fn repair_mirrors(io: &mut ImageIo, geom: &Geometry, authoritative: u8, diffs: &[u32]) -> Result<(), FsError> {
    for &cluster in diffs {
        let value = fatentry::read_entry(io, geom, authoritative, cluster)?;
        for fat_index in 0..geom.num_fats {
            if fat_index != authoritative {
                fatentry::write_entry_one(io, geom, fat_index, cluster, value)?;
            }
        }
    }
    warn!("repaired {} divergent FAT mirror entries", diffs.len());
    Ok(())
}

fn zero_cluster_fat(io: &mut ImageIo, geom: &Geometry, cluster: u32) -> Result<(), FsError> {
    for fat_index in 0..geom.num_fats {
        fatentry::write_entry_one(io, geom, fat_index, cluster, 0)?;
    }
    Ok(())
}

/// Deletes every directory entry implicated in a loop or intersection, then
/// scrubs every cluster they (or any never-indexed orphan) held.
pub fn repair_looped_and_intersecting(
    io: &mut ImageIo,
    geom: &Geometry,
    tables: &IndexTables,
    looped_names: &HashSet<String>,
    intersections: &[(u32, Vec<String>)],
) -> Result<(), FsError> {
    let mut pending_removal: HashSet<String> = looped_names.clone();
    for (_, names) in intersections {
        for name in names {
            pending_removal.insert(name.clone());
        }
    }

    let mut deleted_entry_points: HashSet<u64> = HashSet::new();
    for claimants in tables.full.values() {
        for claimant in claimants {
            let name = claimant.entry.display_name();
            if pending_removal.contains(&name) && !deleted_entry_points.contains(&claimant.entry.entry_point) {
                crate::dirparser::delete_entry(io, claimant.entry.entry_point)?;
                deleted_entry_points.insert(claimant.entry.entry_point);
            }
        }
    }

    let mut scrubbed: HashSet<u32> = HashSet::new();
    for (&cluster, claimants) in &tables.full {
        if claimants
            .iter()
            .any(|c| pending_removal.contains(&c.entry.display_name()))
            && scrubbed.insert(cluster)
        {
            zero_cluster_fat(io, geom, cluster)?;
        }
    }

    let orphans = find_orphans(io, geom, tables)?;
    for cluster in orphans {
        if scrubbed.insert(cluster) {
            zero_cluster_fat(io, geom, cluster)?;
        }
    }

    warn!(
        "removed {} file(s) involved in loops/intersections, scrubbed {} cluster(s)",
        deleted_entry_points.len(),
        scrubbed.len()
    );
    Ok(())
}
