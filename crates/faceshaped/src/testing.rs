//! Fakes shared by the service tests.

use faceshape_core::{FaceLandmarks, Landmarker, LandmarkerError};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// Landmarker that returns the same faces for every image.
pub struct ScriptedLandmarker {
    faces: Vec<FaceLandmarks>,
}

impl ScriptedLandmarker {
    /// On a 200×100 image: face width 100 px, jaw 50 px, height 115 px.
    pub fn oval() -> Self {
        let mut points = vec![(0.0f32, 0.0f32); 478];
        points[234] = (0.25, 0.4);
        points[454] = (0.75, 0.4);
        points[215] = (0.375, 0.8);
        points[435] = (0.625, 0.8);
        points[10] = (0.5, 0.0);
        points[152] = (0.5, 1.15);
        Self { faces: vec![FaceLandmarks::new(points)] }
    }

    pub fn empty() -> Self {
        Self { faces: Vec::new() }
    }

    /// A full mesh with both cheekbones on the same point.
    pub fn collapsed() -> Self {
        let mut points = vec![(0.0f32, 0.0f32); 478];
        points[234] = (0.5, 0.4);
        points[454] = (0.5, 0.4);
        points[215] = (0.375, 0.8);
        points[435] = (0.625, 0.8);
        points[152] = (0.5, 1.0);
        Self { faces: vec![FaceLandmarks::new(points)] }
    }

    /// A face whose mesh is missing most points.
    pub fn short() -> Self {
        Self { faces: vec![FaceLandmarks::new(vec![(0.5, 0.5); 68])] }
    }
}

impl Landmarker for ScriptedLandmarker {
    fn name(&self) -> &str {
        "scripted"
    }

    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<FaceLandmarks>, LandmarkerError> {
        Ok(self.faces.clone())
    }
}

/// Panics on the first call, then behaves like [`ScriptedLandmarker::oval`].
pub struct PanicOnceLandmarker {
    panicked: bool,
    inner: ScriptedLandmarker,
}

impl PanicOnceLandmarker {
    pub fn new() -> Self {
        Self { panicked: false, inner: ScriptedLandmarker::oval() }
    }
}

impl Landmarker for PanicOnceLandmarker {
    fn name(&self) -> &str {
        "panic-once"
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLandmarks>, LandmarkerError> {
        if !self.panicked {
            self.panicked = true;
            panic!("mesh exploded");
        }
        self.inner.detect(image)
    }
}

/// A gray PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]));
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}
