//! Landmark detection capability and the image → classification pipeline.

use crate::classifier;
use crate::types::{ClassificationResult, LandmarkSet, Point, ShapeError};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LandmarkerError {
    #[error("model file not found: {0} — place the ONNX model in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no face detected")]
    NoFaceDetected,
    #[error(transparent)]
    Incomplete(#[from] ShapeError),
    #[error("landmarker error: {0}")]
    Landmarker(#[from] LandmarkerError),
}

/// One face's landmarks in normalized image coordinates (fractions of width/height).
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLandmarks {
    pub points: Vec<(f32, f32)>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self { points }
    }

    /// Scale to pixel space: x by image width, y by image height.
    pub fn to_pixels(&self, width: u32, height: u32) -> Result<LandmarkSet, ShapeError> {
        let (w, h) = (f64::from(width), f64::from(height));
        let points = self
            .points
            .iter()
            .map(|&(x, y)| Point::new(f64::from(x) * w, f64::from(y) * h))
            .collect();
        LandmarkSet::new(points)
    }
}

/// Something that finds facial landmarks in an RGB image.
///
/// Implementations may hold inference sessions that need exclusive access,
/// hence `&mut self`.
pub trait Landmarker: Send {
    /// Short identifier of the backend, reported by the service status.
    fn name(&self) -> &str;

    /// Detect faces; an empty vector means no face was found.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLandmarks>, LandmarkerError>;
}

impl<L: Landmarker + ?Sized> Landmarker for Box<L> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLandmarks>, LandmarkerError> {
        (**self).detect(image)
    }
}

/// Run landmark detection on a decoded image and classify the first face.
pub fn analyze<L: Landmarker + ?Sized>(
    landmarker: &mut L,
    image: &RgbImage,
) -> Result<ClassificationResult, AnalysisError> {
    let faces = landmarker.detect(image)?;
    tracing::debug!(faces = faces.len(), backend = landmarker.name(), "landmarks detected");

    let face = faces.first().ok_or(AnalysisError::NoFaceDetected)?;
    let landmarks = face.to_pixels(image.width(), image.height())?;

    Ok(classifier::classify(&landmarks)?)
}
