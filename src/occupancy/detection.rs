use crate::geometry::Point;
use crate::util::{ParkAlignError, ParkAlignResult};

/// Vehicle bounding box in aligned (master-frame) pixels.
///
/// Coordinates are finite with `x1 <= x2` and `y1 <= y2`; confidence lies in
/// `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

impl Detection {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> ParkAlignResult<Self> {
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return Err(ParkAlignError::NonFiniteCoordinate {
                context: "detection box",
            });
        }
        if x1 > x2 || y1 > y2 {
            return Err(ParkAlignError::InvalidDetection {
                reason: "corners are not ordered (x1 <= x2, y1 <= y2)",
            });
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ParkAlignError::InvalidConfidence {
                value: confidence,
                max: 1.0,
            });
        }
        Ok(Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
        })
    }

    /// Builds a detection from a confidence on the `[0, 100]` scale.
    pub fn from_percent(x1: f64, y1: f64, x2: f64, y2: f64, percent: f64) -> ParkAlignResult<Self> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(ParkAlignError::InvalidConfidence {
                value: percent,
                max: 100.0,
            });
        }
        Self::new(x1, y1, x2, y2, percent / 100.0)
    }

    /// Builds a detection from a centre/size box with a `[0, 100]` confidence.
    pub fn from_center_percent(
        cx: f64,
        cy: f64,
        width: f64,
        height: f64,
        percent: f64,
    ) -> ParkAlignResult<Self> {
        if width < 0.0 || height < 0.0 {
            return Err(ParkAlignError::InvalidDetection {
                reason: "negative box size",
            });
        }
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::from_percent(cx - hw, cy - hh, cx + hw, cy + hh, percent)
    }

    /// Corners as `[x1, y1, x2, y2]`.
    pub fn bounds(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Box centre, the point tested against spot polygons.
    pub fn centroid(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}
