use serde::ser::{Serialize, Serializer};

/// Occupancy decision for one spot.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyRecord {
    pub id: String,
    pub occupied: bool,
    /// Highest confidence among detections inside the spot; 0 when free.
    pub confidence: f64,
}

/// Per-spot decisions in spot order.
///
/// Serializes to `{"occupied": [{id, confidence}], "free": [...],
/// "total_detected": n}`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OccupancyReport {
    records: Vec<OccupancyRecord>,
    total_detected: usize,
}

impl OccupancyReport {
    pub(crate) fn new(records: Vec<OccupancyRecord>, total_detected: usize) -> Self {
        Self {
            records,
            total_detected,
        }
    }

    pub fn records(&self) -> &[OccupancyRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&OccupancyRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn occupied(&self) -> impl Iterator<Item = &OccupancyRecord> {
        self.records.iter().filter(|r| r.occupied)
    }

    pub fn free(&self) -> impl Iterator<Item = &OccupancyRecord> {
        self.records.iter().filter(|r| !r.occupied)
    }

    /// Detections that took part in the evaluation.
    pub fn total_detected(&self) -> usize {
        self.total_detected
    }
}

#[derive(serde::Serialize)]
struct SpotEntry<'a> {
    id: &'a str,
    confidence: f64,
}

fn entry(record: &OccupancyRecord) -> SpotEntry<'_> {
    SpotEntry {
        id: &record.id,
        confidence: record.confidence,
    }
}

#[derive(serde::Serialize)]
struct ReportView<'a> {
    occupied: Vec<SpotEntry<'a>>,
    free: Vec<SpotEntry<'a>>,
    total_detected: usize,
}

impl Serialize for OccupancyReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReportView {
            occupied: self.occupied().map(entry).collect(),
            free: self.free().map(entry).collect(),
            total_detected: self.total_detected,
        }
        .serialize(serializer)
    }
}
