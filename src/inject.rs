//! Error injector: builds the three canonical corruption fixtures used to
//! exercise detection and repair — FAT-mirror divergence, a looped file,
//! and a pair of intersecting files.
//!
//! Built on `dirparser::create_entry` and `fatentry::allocate_free_clusters`.

use log::info;

use crate::direntry::ATTR_ARCHIVE;
use crate::dirparser::{self, DirHandle};
use crate::error::FsError;
use crate::fatentry;
use crate::geometry::Geometry;
use crate::io::ImageIo;

/// Flips a non-authoritative FAT mirror's entry for cluster 2 so it no
/// longer agrees with FAT 0.
pub fn inject_mirror_divergence(io: &mut ImageIo, geom: &Geometry, fat_num: u8) -> Result<(), FsError> {
    if fat_num == 0 || fat_num >= geom.num_fats {
        return Err(FsError::InvalidArgument(format!(
            "fat_num must be in 1..{} (got {fat_num})",
            geom.num_fats
        )));
    }
    let cluster = 2;
    let current = fatentry::read_entry(io, geom, fat_num, cluster)?;
    let flipped = current ^ 0xFF;
    fatentry::write_entry_one(io, geom, fat_num, cluster, flipped)?;
    info!("injected FAT mirror {fat_num} divergence at cluster {cluster}");
    Ok(())
}

fn locate_free_slot(io: &mut ImageIo, geom: &Geometry, folder: DirHandle) -> Result<u64, FsError> {
    dirparser::find_free_slot(io, geom, folder)?
        .ok_or_else(|| FsError::Exhausted("no free directory slot in target folder".into()))
}

/// Allocates three free clusters, chains the first two normally, and
/// points the third cluster's FAT entry back at the first, then plants a
/// directory entry named `ERRORLOOP` pointing at the first cluster.
pub fn inject_looped_file(io: &mut ImageIo, geom: &Geometry, folder: DirHandle) -> Result<(), FsError> {
    let clusters = fatentry::allocate_free_clusters(io, geom, 3)?;
    let (c1, c2, c3) = (clusters[0], clusters[1], clusters[2]);

    fatentry::write_entry_all(io, geom, c1, c2)?;
    fatentry::write_entry_all(io, geom, c2, c3)?;
    fatentry::write_entry_all(io, geom, c3, c1)?;

    let slot = locate_free_slot(io, geom, folder)?;
    dirparser::create_entry(io, slot, "ERRORLOOP", ATTR_ARCHIVE, c1)?;

    info!("injected looped file ERRORLOOP over clusters {c1}, {c2}, {c3}");
    Ok(())
}

/// Allocates four free clusters: three form file `ERRINTERSEC`
/// (x -> y -> z -> EOC), and the fourth forms a one-cluster file
/// `ERRINTERS 2` whose only link points into `y`, so the two files' chains
/// share clusters y and z.
pub fn inject_intersecting_files(io: &mut ImageIo, geom: &Geometry, folder: DirHandle) -> Result<(), FsError> {
    let clusters = fatentry::allocate_free_clusters(io, geom, 4)?;
    let (x, y, z, w) = (clusters[0], clusters[1], clusters[2], clusters[3]);

    let eoc = fatentry::eoc_value(geom);
    fatentry::write_entry_all(io, geom, x, y)?;
    fatentry::write_entry_all(io, geom, y, z)?;
    fatentry::write_entry_all(io, geom, z, eoc)?;
    fatentry::write_entry_all(io, geom, w, y)?;

    let slot1 = locate_free_slot(io, geom, folder)?;
    dirparser::create_entry(io, slot1, "ERRINTERSEC", ATTR_ARCHIVE, x)?;
    let slot2 = locate_free_slot(io, geom, folder)?;
    dirparser::create_entry(io, slot2, "ERRINTERS 2", ATTR_ARCHIVE, w)?;

    info!("injected intersecting files ERRINTERSEC (cluster {x}) and ERRINTERS 2 (cluster {w}) sharing cluster {y}");
    Ok(())
}
