//! Occupancy decisions from detections and spot polygons.
//!
//! A spot is occupied when the centroid of at least one detection lies inside
//! its polygon (edges count as inside). The spot's confidence is the largest
//! confidence among those detections. Evaluation is pure and never fails.

mod detection;
mod report;
mod spot;

pub use detection::Detection;
pub use report::{OccupancyRecord, OccupancyReport};
pub use spot::ParkingSpot;

use crate::geometry::Point;
use crate::trace::{trace_event, trace_span};
use crate::util::{ParkAlignError, ParkAlignResult};

/// Maps detections onto spots.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OccupancyEvaluator {
    min_confidence: f64,
}

impl OccupancyEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores detections whose confidence is below `min_confidence`.
    pub fn with_min_confidence(mut self, min_confidence: f64) -> ParkAlignResult<Self> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(ParkAlignError::InvalidConfidence {
                value: min_confidence,
                max: 1.0,
            });
        }
        self.min_confidence = min_confidence;
        Ok(self)
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Decides occupancy for every spot, in spot order.
    pub fn evaluate(&self, detections: &[Detection], spots: &[ParkingSpot]) -> OccupancyReport {
        let _span = trace_span!(
            "evaluate_occupancy",
            detections = detections.len(),
            spots = spots.len()
        )
        .entered();

        let kept: Vec<(Point, f64)> = detections
            .iter()
            .filter(|d| d.confidence() >= self.min_confidence)
            .map(|d| (d.centroid(), d.confidence()))
            .collect();

        let records: Vec<OccupancyRecord> = spots
            .iter()
            .map(|spot| {
                let best = kept
                    .iter()
                    .filter(|(c, _)| spot.contains(*c))
                    .map(|&(_, conf)| conf)
                    .fold(None, |acc: Option<f64>, conf| Some(acc.map_or(conf, |a| a.max(conf))));
                OccupancyRecord {
                    id: spot.id().to_string(),
                    occupied: best.is_some(),
                    confidence: best.unwrap_or(0.0),
                }
            })
            .collect();

        let report = OccupancyReport::new(records, kept.len());
        trace_event!(
            "occupancy",
            occupied = report.occupied().count(),
            free = report.free().count()
        );
        report
    }
}

/// Evaluates with the default evaluator (no confidence floor).
pub fn evaluate(detections: &[Detection], spots: &[ParkingSpot]) -> OccupancyReport {
    OccupancyEvaluator::default().evaluate(detections, spots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> ParkingSpot {
        ParkingSpot::new(
            id,
            vec![
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
        )
        .unwrap()
    }

    fn lot() -> Vec<ParkingSpot> {
        vec![
            square("A1", 100.0, 100.0, 200.0, 200.0),
            square("A2", 300.0, 300.0, 400.0, 400.0),
        ]
    }

    #[test]
    fn centroid_inside_marks_spot_occupied() {
        let dets = [Detection::new(120.0, 120.0, 180.0, 180.0, 0.95).unwrap()];
        let report = evaluate(&dets, &lot());
        let a1 = report.get("A1").unwrap();
        assert!(a1.occupied);
        assert_eq!(a1.confidence, 0.95);
        let a2 = report.get("A2").unwrap();
        assert!(!a2.occupied);
        assert_eq!(a2.confidence, 0.0);
        assert_eq!(report.total_detected(), 1);
    }

    #[test]
    fn confidence_is_max_of_contained_detections() {
        let dets = [
            Detection::new(110.0, 110.0, 150.0, 150.0, 0.6).unwrap(),
            Detection::new(140.0, 140.0, 190.0, 190.0, 0.9).unwrap(),
            Detection::new(310.0, 0.0, 390.0, 20.0, 0.99).unwrap(),
        ];
        let report = evaluate(&dets, &lot());
        assert_eq!(report.get("A1").unwrap().confidence, 0.9);
        assert!(!report.get("A2").unwrap().occupied);
    }

    #[test]
    fn centroid_on_edge_counts_as_inside() {
        // Centroid (200, 150) lies on A1's right edge.
        let dets = [Detection::new(180.0, 130.0, 220.0, 170.0, 0.7).unwrap()];
        let report = evaluate(&dets, &lot());
        assert!(report.get("A1").unwrap().occupied);
    }

    #[test]
    fn no_detections_means_all_free() {
        let report = evaluate(&[], &lot());
        assert_eq!(report.occupied().count(), 0);
        assert_eq!(report.free().count(), 2);
        assert!(evaluate(&[], &[]).records().is_empty());
    }

    #[test]
    fn confidence_floor_drops_weak_detections() {
        let dets = [Detection::new(120.0, 120.0, 180.0, 180.0, 0.3).unwrap()];
        let evaluator = OccupancyEvaluator::new().with_min_confidence(0.4).unwrap();
        let report = evaluator.evaluate(&dets, &lot());
        assert!(!report.get("A1").unwrap().occupied);
        assert_eq!(report.total_detected(), 0);
        assert!(OccupancyEvaluator::new().with_min_confidence(40.0).is_err());
    }

    #[test]
    fn report_serializes_to_occupied_free_lists() {
        let dets = [Detection::new(120.0, 120.0, 180.0, 180.0, 0.95).unwrap()];
        let json = serde_json::to_value(evaluate(&dets, &lot())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "occupied": [{"id": "A1", "confidence": 0.95}],
                "free": [{"id": "A2", "confidence": 0.0}],
                "total_detected": 1
            })
        );
    }
}
