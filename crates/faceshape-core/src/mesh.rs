//! Face-mesh landmarker via ONNX Runtime.
//!
//! Two stages: SCRFD finds the face box, then the MediaPipe face-landmark model
//! runs on a padded square crop around it and yields 478 (or 468) points.

use crate::detector::{FaceBox, FaceDetector, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::landmarker::{FaceLandmarks, Landmarker, LandmarkerError};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const MESH_INPUT_SIZE: u32 = 256;
/// Crop padding on each side, as a fraction of the face box width.
const MESH_CROP_PADDING: f32 = 0.25;
const MESH_POINT_COUNTS: [usize; 2] = [478, 468];

pub const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.5;

/// Tunables for [`MeshLandmarker::load`].
#[derive(Debug, Clone, Copy)]
pub struct MeshOptions {
    /// Minimum SCRFD score for a face box.
    pub detection_threshold: f32,
    /// Minimum sigmoid of the mesh model's face-presence logit.
    pub presence_threshold: f32,
    pub intra_threads: usize,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            detection_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
            intra_threads: 2,
        }
    }
}

/// Region of the photo fed to the mesh model, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Square crop centred on the face box, padded, clamped to the image.
    ///
    /// Returns `None` when nothing of the box lies inside the image.
    pub fn around(face: &FaceBox, image_width: u32, image_height: u32) -> Option<Self> {
        let side = face.width.max(face.height) + 2.0 * MESH_CROP_PADDING * face.width;
        let cx = face.x + face.width / 2.0;
        let cy = face.y + face.height / 2.0;

        let x0 = (cx - side / 2.0).max(0.0);
        let y0 = (cy - side / 2.0).max(0.0);
        let x1 = (cx + side / 2.0).min(image_width as f32);
        let y1 = (cy + side / 2.0).min(image_height as f32);
        if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
            return None;
        }

        Some(Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// Map a point in mesh input pixels to normalized image coordinates.
    fn to_image_normalized(&self, px: f32, py: f32, image_width: u32, image_height: u32) -> (f32, f32) {
        let scale = MESH_INPUT_SIZE as f32;
        let x = self.x as f32 + px / scale * self.width as f32;
        let y = self.y as f32 + py / scale * self.height as f32;
        (x / image_width as f32, y / image_height as f32)
    }
}

pub struct MeshLandmarker {
    detector: FaceDetector,
    session: Session,
    output_count: usize,
    presence_threshold: f32,
}

impl MeshLandmarker {
    /// Load the SCRFD detector and the face-landmark model.
    pub fn load(
        detector_path: &Path,
        mesh_path: &Path,
        options: MeshOptions,
    ) -> Result<Self, LandmarkerError> {
        if !mesh_path.exists() {
            return Err(LandmarkerError::ModelNotFound(mesh_path.display().to_string()));
        }
        let detector =
            FaceDetector::load(detector_path, options.detection_threshold, options.intra_threads)?;

        let session = Session::builder()?
            .with_intra_threads(options.intra_threads)?
            .commit_from_file(mesh_path)?;

        tracing::info!(
            path = %mesh_path.display(),
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face-landmark model"
        );

        let output_count = session.outputs().len();
        Ok(Self {
            detector,
            session,
            output_count,
            presence_threshold: options.presence_threshold,
        })
    }

    /// Run the mesh model on one crop. Returns `None` if the model rejects the crop.
    fn run_mesh(
        &mut self,
        image: &RgbImage,
        crop: CropRect,
    ) -> Result<Option<FaceLandmarks>, LandmarkerError> {
        let input = preprocess_crop(image, crop);
        let output_count = self.output_count;
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut tensors = Vec::with_capacity(output_count);
        for idx in 0..output_count {
            let (_, data) = outputs[idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| LandmarkerError::InferenceFailed(format!("mesh output: {e}")))?;
            tensors.push(data);
        }

        let (raw_points, presence_logit) = select_mesh_outputs(&tensors);
        let raw_points = raw_points.ok_or_else(|| {
            LandmarkerError::InferenceFailed("mesh model returned no landmark tensor".into())
        })?;
        let presence = presence_logit.map_or(1.0, sigmoid);
        tracing::debug!(presence, points = raw_points.len() / 3, "mesh inference done");

        if presence < self.presence_threshold {
            return Ok(None);
        }

        let points = raw_points
            .chunks_exact(3)
            .map(|p| crop.to_image_normalized(p[0], p[1], image.width(), image.height()))
            .collect();
        Ok(Some(FaceLandmarks::new(points)))
    }
}

impl Landmarker for MeshLandmarker {
    fn name(&self) -> &str {
        "scrfd+facemesh"
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLandmarks>, LandmarkerError> {
        let faces = self.detector.detect(image)?;
        let Some(face) = faces.first() else {
            return Ok(Vec::new());
        };
        let Some(crop) = CropRect::around(face, image.width(), image.height()) else {
            tracing::debug!(?face, "face box outside image");
            return Ok(Vec::new());
        };

        Ok(self.run_mesh(image, crop)?.into_iter().collect())
    }
}

/// Crop, resize to 256×256 and scale to [0, 1], NHWC.
fn preprocess_crop(image: &RgbImage, crop: CropRect) -> Array4<f32> {
    let cropped = imageops::crop_imm(image, crop.x, crop.y, crop.width, crop.height).to_image();
    let resized = imageops::resize(&cropped, MESH_INPUT_SIZE, MESH_INPUT_SIZE, FilterType::Triangle);

    let size = MESH_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
        }
    }
    tensor
}

/// Pick the landmark tensor and the face-presence logit from the mesh outputs.
///
/// Outputs are matched by length in session order. The presence flag is the
/// first single-element output; later scalars are ignored.
fn select_mesh_outputs<'a>(tensors: &[&'a [f32]]) -> (Option<&'a [f32]>, Option<f32>) {
    let points = tensors
        .iter()
        .copied()
        .find(|data| MESH_POINT_COUNTS.iter().any(|&n| data.len() == n * 3));
    let presence = tensors.iter().find(|data| data.len() == 1).map(|data| data[0]);
    (points, presence)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x: f32, y: f32, w: f32, h: f32) -> FaceBox {
        FaceBox { x, y, width: w, height: h, confidence: 0.9 }
    }

    #[test]
    fn test_crop_is_padded_square() {
        // 100×120 box centred at (200, 200): side = 120 + 50 = 170
        let crop = CropRect::around(&face(150.0, 140.0, 100.0, 120.0), 640, 480).unwrap();
        assert_eq!(crop, CropRect { x: 115, y: 115, width: 170, height: 170 });
    }

    #[test]
    fn test_crop_clamped_to_image() {
        let crop = CropRect::around(&face(-20.0, 10.0, 100.0, 100.0), 200, 100).unwrap();
        assert_eq!(crop.x, 0);
        assert_eq!(crop.y, 0);
        assert!(crop.x + crop.width <= 200);
        assert!(crop.y + crop.height <= 100);
    }

    #[test]
    fn test_crop_outside_image() {
        assert!(CropRect::around(&face(500.0, 500.0, 10.0, 10.0), 100, 100).is_none());
    }

    #[test]
    fn test_crop_maps_back_to_normalized() {
        let crop = CropRect { x: 100, y: 50, width: 200, height: 100 };
        let (x, y) = crop.to_image_normalized(128.0, 256.0, 400, 200);
        // 100 + 0.5 * 200 = 200 of 400; 50 + 1.0 * 100 = 150 of 200
        assert!((x - 0.5).abs() < 1e-6);
        assert!((y - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_crop_shape_and_range() {
        let image = RgbImage::from_pixel(300, 200, image::Rgb([255, 0, 51]));
        let tensor = preprocess_crop(&image, CropRect { x: 10, y: 10, width: 100, height: 100 });
        assert_eq!(tensor.shape(), &[1, 256, 256, 3]);
        assert!((tensor[[0, 128, 128, 0]] - 1.0).abs() < 0.01);
        assert!(tensor[[0, 128, 128, 1]].abs() < 0.01);
        assert!((tensor[[0, 128, 128, 2]] - 0.2).abs() < 0.01);
    }

    #[test]
    fn test_select_mesh_outputs_keeps_first_scalar() {
        let points = vec![0.5f32; 478 * 3];
        let (points, flag, extra) = (points.as_slice(), &[3.0f32][..], &[-7.0f32][..]);
        let (found, presence) = select_mesh_outputs(&[points, flag, extra]);
        assert_eq!(found.map(<[f32]>::len), Some(478 * 3));
        assert_eq!(presence, Some(3.0));

        let (_, presence) = select_mesh_outputs(&[extra, points, flag]);
        assert_eq!(presence, Some(-7.0));
    }

    #[test]
    fn test_select_mesh_outputs_without_landmarks() {
        let other = vec![0.0f32; 10];
        let (found, presence) = select_mesh_outputs(&[other.as_slice()]);
        assert!(found.is_none());
        assert!(presence.is_none());

        let legacy = vec![0.0f32; 468 * 3];
        let (found, _) = select_mesh_outputs(&[other.as_slice(), legacy.as_slice()]);
        assert_eq!(found.map(<[f32]>::len), Some(468 * 3));
    }

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_load_missing_model() {
        let err = MeshLandmarker::load(
            Path::new("/nonexistent/det_10g.onnx"),
            Path::new("/nonexistent/face_landmarks_detector.onnx"),
            MeshOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, LandmarkerError::ModelNotFound(_)));
    }
}
