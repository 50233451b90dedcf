//! Lot reference data: the master image and its parking spots.
//!
//! A lot on disk is a directory `<root>/<lot_id>/` holding `master.jpg` (or
//! `master.JPG`) and `parking.json`, a list of
//! `{"id": "A1", "polygon": [[x, y], ...]}` objects in master-frame pixels.
//! [`LotRegistry`] shares loaded lots as immutable `Arc` snapshots.

use crate::geometry::Point;
use crate::image::Image;
use crate::occupancy::ParkingSpot;
use crate::util::{ParkAlignError, ParkAlignResult};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

/// Master image and spot definitions of one parking lot.
#[derive(Clone, Debug, PartialEq)]
pub struct Lot {
    id: String,
    master: Image,
    spots: Vec<ParkingSpot>,
}

impl Lot {
    /// Builds a lot; spot ids must be unique.
    pub fn new(
        id: impl Into<String>,
        master: Image,
        spots: Vec<ParkingSpot>,
    ) -> ParkAlignResult<Self> {
        ensure_unique_ids(&spots)?;
        Ok(Self {
            id: id.into(),
            master,
            spots,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn master(&self) -> &Image {
        &self.master
    }

    pub fn spots(&self) -> &[ParkingSpot] {
        &self.spots
    }
}

fn ensure_unique_ids(spots: &[ParkingSpot]) -> ParkAlignResult<()> {
    let mut seen = HashSet::with_capacity(spots.len());
    for spot in spots {
        if !seen.insert(spot.id()) {
            return Err(ParkAlignError::DuplicateSpotId {
                id: spot.id().to_string(),
            });
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct RawSpot {
    id: String,
    polygon: Vec<[f64; 2]>,
}

/// Parses and validates `parking.json` content.
pub fn parse_spots_json(json: &str) -> ParkAlignResult<Vec<ParkingSpot>> {
    let raw: Vec<RawSpot> =
        serde_json::from_str(json).map_err(|err| ParkAlignError::InvalidSpotJson {
            reason: err.to_string(),
        })?;
    let spots = raw
        .into_iter()
        .map(|spot| ParkingSpot::new(spot.id, spot.polygon.into_iter().map(Point::from).collect()))
        .collect::<ParkAlignResult<Vec<_>>>()?;
    ensure_unique_ids(&spots)?;
    Ok(spots)
}

#[cfg(feature = "image-io")]
mod fs {
    use super::{parse_spots_json, Lot};
    use crate::image::io::load_image;
    use crate::util::{ParkAlignError, ParkAlignResult};
    use std::path::{Path, PathBuf};

    const MASTER_NAMES: [&str; 2] = ["master.jpg", "master.JPG"];
    const SPOTS_NAME: &str = "parking.json";

    fn lot_error(lot_id: &str, reason: impl Into<String>) -> ParkAlignError {
        ParkAlignError::LotIo {
            lot_id: lot_id.to_string(),
            reason: reason.into(),
        }
    }

    fn lot_dir(root: &Path, lot_id: &str) -> ParkAlignResult<PathBuf> {
        let plain = !lot_id.is_empty()
            && lot_id != "."
            && lot_id != ".."
            && !lot_id.contains(['/', '\\']);
        if !plain {
            return Err(lot_error(lot_id, "lot id must be a plain directory name"));
        }
        Ok(root.join(lot_id))
    }

    /// Loads `<root>/<lot_id>/` from disk.
    pub fn load_lot_dir<P: AsRef<Path>>(root: P, lot_id: &str) -> ParkAlignResult<Lot> {
        let dir = lot_dir(root.as_ref(), lot_id)?;
        let master_path = MASTER_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| lot_error(lot_id, "master image missing"))?;

        let spots_path = dir.join(SPOTS_NAME);
        if !spots_path.is_file() {
            return Err(lot_error(lot_id, "parking data missing"));
        }
        let json = std::fs::read_to_string(&spots_path)
            .map_err(|err| lot_error(lot_id, format!("{}: {err}", spots_path.display())))?;

        let master = load_image(&master_path)?;
        let spots = parse_spots_json(&json)?;
        Lot::new(lot_id, master, spots)
    }
}

#[cfg(feature = "image-io")]
pub use fs::load_lot_dir;

/// Thread-safe map of lot id to the current lot snapshot.
///
/// Readers clone the `Arc` and release the lock at once; replacing a lot
/// never changes a snapshot already handed out.
#[derive(Debug, Default)]
pub struct LotRegistry {
    lots: RwLock<HashMap<String, Arc<Lot>>>,
}

impl LotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a lot, returning the previous snapshot.
    pub fn register(&self, lot: Lot) -> Option<Arc<Lot>> {
        let lot = Arc::new(lot);
        self.lots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(lot.id().to_string(), lot)
    }

    /// Loads a lot from disk and registers it, replacing any previous
    /// version.
    #[cfg(feature = "image-io")]
    pub fn reload<P: AsRef<std::path::Path>>(
        &self,
        root: P,
        lot_id: &str,
    ) -> ParkAlignResult<Arc<Lot>> {
        let lot = Arc::new(load_lot_dir(root, lot_id)?);
        self.lots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(lot_id.to_string(), Arc::clone(&lot));
        Ok(lot)
    }

    pub fn get(&self, lot_id: &str) -> Option<Arc<Lot>> {
        self.lots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(lot_id)
            .cloned()
    }

    pub fn remove(&self, lot_id: &str) -> Option<Arc<Lot>> {
        self.lots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(lot_id)
    }

    /// Registered lot ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
