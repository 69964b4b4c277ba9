use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest landmark index read by the classifier (right cheekbone).
pub const MAX_LANDMARK_INDEX: usize = 454;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("face detection incomplete: {found} landmarks, need at least {required}")]
    IncompleteLandmarks { found: usize, required: usize },
    #[error("face detection incomplete: {measurement} is not a usable measurement")]
    DegenerateGeometry { measurement: &'static str },
}

/// A 2-D point in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in the image plane.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Facial landmarks for one face, in the detector's index scheme.
///
/// Construction guarantees every index the classifier reads is present,
/// so lookups through [`LandmarkSet::point`] never fall out of range.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    /// Minimum number of points a usable set must carry.
    pub const REQUIRED_LEN: usize = MAX_LANDMARK_INDEX + 1;

    pub fn new(points: Vec<Point>) -> Result<Self, ShapeError> {
        if points.len() < Self::REQUIRED_LEN {
            return Err(ShapeError::IncompleteLandmarks {
                found: points.len(),
                required: Self::REQUIRED_LEN,
            });
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Point at a named index. Indices up to [`MAX_LANDMARK_INDEX`] are always valid.
    pub fn point(&self, index: usize) -> Point {
        self.points[index]
    }
}

/// Unrounded face measurements. Classification reads these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub face_width: f64,
    pub jaw_width: f64,
    pub face_height: f64,
    /// face_height / face_width
    pub face_ratio: f64,
    /// face_width / jaw_width
    pub face_to_jaw_ratio: f64,
}

/// Measurements rounded for display: distances to 2 decimals, ratios to 3.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeMetrics {
    pub face_width: f64,
    pub face_height: f64,
    pub face_ratio: f64,
    pub jaw_width: f64,
    pub face_to_jaw_ratio: f64,
}

impl From<&Measurements> for ShapeMetrics {
    fn from(m: &Measurements) -> Self {
        Self {
            face_width: round_to(m.face_width, 2),
            face_height: round_to(m.face_height, 2),
            face_ratio: round_to(m.face_ratio, 3),
            jaw_width: round_to(m.jaw_width, 2),
            face_to_jaw_ratio: round_to(m.face_to_jaw_ratio, 3),
        }
    }
}

/// Round through the exact decimal expansion of `value`. Scaling by a power
/// of ten first would itself round and push values like 2.675 onto a half.
fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

/// Coarse face-shape category. Serialized as its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceShape {
    #[serde(rename = "四角型")]
    Square,
    #[serde(rename = "面長型")]
    Oblong,
    #[serde(rename = "卵型")]
    Oval,
    #[serde(rename = "丸型")]
    Round,
}

impl FaceShape {
    pub const ALL: [FaceShape; 4] = [
        FaceShape::Square,
        FaceShape::Oblong,
        FaceShape::Oval,
        FaceShape::Round,
    ];

    /// Stable ASCII identifier, used in logs.
    pub fn code(self) -> &'static str {
        match self {
            FaceShape::Square => "square",
            FaceShape::Oblong => "oblong",
            FaceShape::Oval => "oval",
            FaceShape::Round => "round",
        }
    }

    /// Display label returned to clients.
    pub fn label(self) -> &'static str {
        match self {
            FaceShape::Square => "四角型",
            FaceShape::Oblong => "面長型",
            FaceShape::Oval => "卵型",
            FaceShape::Round => "丸型",
        }
    }

    /// Fixed justification paired with each label.
    pub fn reason(self) -> &'static str {
        match self {
            FaceShape::Square => "顔幅と顎幅が近く、角ばった印象があります。",
            FaceShape::Oblong => "顔の縦の長さが横幅に比べて長く、面長な印象です。",
            FaceShape::Oval => "顔の縦横比のバランスが取れており、滑らかな卵型です。",
            FaceShape::Round => "顔の縦横比が低く、丸みを帯びた印象です。",
        }
    }
}

impl std::fmt::Display for FaceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of classifying one face.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub face_shape: FaceShape,
    pub reason: &'static str,
    pub metrics: ShapeMetrics,
}
