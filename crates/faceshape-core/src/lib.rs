//! faceshape-core — Face-shape classification from facial landmarks.
//!
//! Landmarks come from a [`Landmarker`]; the bundled one runs SCRFD for face
//! detection and the MediaPipe face mesh for landmarks, both via ONNX Runtime.

pub mod classifier;
pub mod detector;
pub mod landmarker;
pub mod mesh;
pub mod types;

pub use classifier::{classify, measure};
pub use landmarker::{analyze, AnalysisError, FaceLandmarks, Landmarker, LandmarkerError};
pub use mesh::{MeshLandmarker, MeshOptions};
pub use types::{
    ClassificationResult, FaceShape, LandmarkSet, Measurements, Point, ShapeError, ShapeMetrics,
};

/// File name of the SCRFD detection model inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// File name of the face-landmark model inside the model directory.
pub const MESH_MODEL_FILE: &str = "face_landmarks_detector.onnx";
