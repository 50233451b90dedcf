use crate::geometry::{contains_inclusive, Point};
use crate::util::{ParkAlignError, ParkAlignResult};

/// Named parking spot outline in master-frame pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ParkingSpot {
    id: String,
    polygon: Vec<Point>,
}

impl ParkingSpot {
    /// Validates a non-empty id and a finite polygon of at least three points.
    pub fn new(id: impl Into<String>, polygon: Vec<Point>) -> ParkAlignResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ParkAlignError::EmptySpotId);
        }
        if polygon.len() < 3 {
            return Err(ParkAlignError::InvalidPolygon {
                id,
                points: polygon.len(),
            });
        }
        if !polygon.iter().all(Point::is_finite) {
            return Err(ParkAlignError::NonFiniteCoordinate {
                context: "spot polygon",
            });
        }
        Ok(Self { id, polygon })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn polygon(&self) -> &[Point] {
        &self.polygon
    }

    /// Boundary-inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        contains_inclusive(&self.polygon, p)
    }
}
