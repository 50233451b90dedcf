//! Vehicle detection seam.
//!
//! Detection itself happens outside this crate. A [`Detector`] receives the
//! aligned image and returns boxes in its pixel frame; the pipeline owns the
//! detector it is given, so there is no global client state.

use crate::image::Image;
use crate::occupancy::Detection;
use crate::util::ParkAlignResult;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an external detector.
#[derive(Debug, Error)]
#[error("detector failed: {message}")]
pub struct DetectorError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DetectorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Produces vehicle detections for an image.
pub trait Detector {
    fn detect(&self, image: &Image) -> Result<Vec<Detection>, DetectorError>;
}

impl<D: Detector + ?Sized> Detector for &D {
    fn detect(&self, image: &Image) -> Result<Vec<Detection>, DetectorError> {
        (**self).detect(image)
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&self, image: &Image) -> Result<Vec<Detection>, DetectorError> {
        (**self).detect(image)
    }
}

impl<D: Detector + ?Sized> Detector for Arc<D> {
    fn detect(&self, image: &Image) -> Result<Vec<Detection>, DetectorError> {
        (**self).detect(image)
    }
}

/// Returns the same detections for every image, e.g. boxes produced offline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticDetector {
    detections: Vec<Detection>,
}

impl StaticDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }
}

impl Detector for StaticDetector {
    fn detect(&self, _image: &Image) -> Result<Vec<Detection>, DetectorError> {
        Ok(self.detections.clone())
    }
}

/// Centre/size prediction with a `[0, 100]` confidence, the format hosted
/// detection services commonly return.
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CenterBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

impl CenterBox {
    pub fn to_detection(&self) -> ParkAlignResult<Detection> {
        Detection::from_center_percent(self.x, self.y, self.width, self.height, self.confidence)
    }
}
