//! Face-shape classification from mesh landmarks.
//!
//! Three distances between fixed landmark pairs give two ratios, which are
//! checked against constant thresholds in a fixed order.

use crate::types::{
    ClassificationResult, FaceShape, LandmarkSet, Measurements, ShapeError, ShapeMetrics,
};

// --- Landmark indices (face-mesh numbering) ---
const CHEEKBONE_LEFT: usize = 454;
const CHEEKBONE_RIGHT: usize = 234;
const JAW_LEFT: usize = 435;
const JAW_RIGHT: usize = 215;
const FOREHEAD_TOP: usize = 10;
const CHIN_BOTTOM: usize = 152;

// --- Thresholds ---
const SQUARE_MAX_FACE_TO_JAW: f64 = 1.13;
const OBLONG_MIN_FACE_RATIO: f64 = 1.2;
const OVAL_MIN_FACE_RATIO: f64 = 1.1;

/// Measure face width, jaw width and face height plus the derived ratios.
///
/// Fails when coincident or non-finite landmarks leave a ratio undefined.
pub fn measure(landmarks: &LandmarkSet) -> Result<Measurements, ShapeError> {
    let face_width = landmarks
        .point(CHEEKBONE_LEFT)
        .distance(&landmarks.point(CHEEKBONE_RIGHT));
    let jaw_width = landmarks.point(JAW_LEFT).distance(&landmarks.point(JAW_RIGHT));
    let face_height = landmarks
        .point(FOREHEAD_TOP)
        .distance(&landmarks.point(CHIN_BOTTOM));

    let measurements = Measurements {
        face_width,
        jaw_width,
        face_height,
        face_ratio: face_height / face_width,
        face_to_jaw_ratio: face_width / jaw_width,
    };

    for (measurement, value) in [
        ("face_width", face_width),
        ("jaw_width", jaw_width),
        ("face_height", face_height),
        ("face_ratio", measurements.face_ratio),
        ("face_to_jaw_ratio", measurements.face_to_jaw_ratio),
    ] {
        if !value.is_finite() {
            return Err(ShapeError::DegenerateGeometry { measurement });
        }
    }
    Ok(measurements)
}

impl FaceShape {
    /// Pick a shape from unrounded ratios. First matching branch wins.
    pub fn from_ratios(face_ratio: f64, face_to_jaw_ratio: f64) -> FaceShape {
        if face_to_jaw_ratio < SQUARE_MAX_FACE_TO_JAW {
            FaceShape::Square
        } else if face_ratio > OBLONG_MIN_FACE_RATIO {
            FaceShape::Oblong
        } else if (OVAL_MIN_FACE_RATIO..=OBLONG_MIN_FACE_RATIO).contains(&face_ratio) {
            FaceShape::Oval
        } else {
            FaceShape::Round
        }
    }
}

/// Classify one face. Pure and deterministic.
pub fn classify(landmarks: &LandmarkSet) -> Result<ClassificationResult, ShapeError> {
    let measurements = measure(landmarks)?;
    let face_shape =
        FaceShape::from_ratios(measurements.face_ratio, measurements.face_to_jaw_ratio);

    tracing::debug!(
        shape = face_shape.code(),
        face_ratio = measurements.face_ratio,
        face_to_jaw_ratio = measurements.face_to_jaw_ratio,
        "face classified"
    );

    Ok(ClassificationResult {
        face_shape,
        reason: face_shape.reason(),
        metrics: ShapeMetrics::from(&measurements),
    })
}
