use faceshape_core::{AnalysisError, ClassificationResult, Landmarker};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Pending requests the engine thread may queue before senders wait.
const ENGINE_QUEUE_DEPTH: usize = 4;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
    #[error("landmarker panicked: {0}")]
    Panicked(String),
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Classify {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<ClassificationResult, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    backend: String,
}

impl EngineHandle {
    /// Decode an encoded image, find the face and classify its shape.
    pub async fn classify(&self, image: Vec<u8>) -> Result<ClassificationResult, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Classify {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Name of the landmark backend the engine runs.
    pub fn backend(&self) -> &str {
        &self.backend
    }
}

/// Spawn the engine on a dedicated OS thread that owns `landmarker`.
///
/// Inference sessions need exclusive access, so all requests are served
/// one at a time from this thread. A panic inside the landmarker fails that
/// request only. The thread exits once every handle has been dropped.
pub fn spawn_engine(landmarker: Box<dyn Landmarker>) -> Result<EngineHandle, EngineError> {
    let backend = landmarker.name().to_string();
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(ENGINE_QUEUE_DEPTH);

    let mut landmarker = landmarker;
    std::thread::Builder::new()
        .name("faceshape-engine".into())
        .spawn(move || {
            tracing::info!(backend = landmarker.name(), "engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Classify { image, reply } => {
                        let result =
                            catch_unwind(AssertUnwindSafe(|| run_classify(&mut landmarker, &image)))
                                .unwrap_or_else(|panic| {
                                    let message = panic_message(panic.as_ref());
                                    tracing::error!(%message, "landmarker panicked, request dropped");
                                    Err(EngineError::Panicked(message))
                                });
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx, backend })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Decode in memory, then detect and classify.
fn run_classify(
    landmarker: &mut Box<dyn Landmarker>,
    encoded: &[u8],
) -> Result<ClassificationResult, EngineError> {
    let image = image::load_from_memory(encoded)?.to_rgb8();
    tracing::debug!(
        bytes = encoded.len(),
        width = image.width(),
        height = image.height(),
        "image decoded"
    );

    let result = faceshape_core::analyze(landmarker, &image)?;
    tracing::info!(
        shape = result.face_shape.code(),
        face_ratio = result.metrics.face_ratio,
        face_to_jaw_ratio = result.metrics.face_to_jaw_ratio,
        "classified"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{png_bytes, PanicOnceLandmarker, ScriptedLandmarker};
    use faceshape_core::FaceShape;

    #[tokio::test]
    async fn test_classify_round_trip() {
        let engine = spawn_engine(Box::new(ScriptedLandmarker::oval())).unwrap();
        assert_eq!(engine.backend(), "scripted");

        let result = engine.classify(png_bytes(200, 100)).await.unwrap();
        assert_eq!(result.face_shape, FaceShape::Oval);
        assert_eq!(result.metrics.face_width, 100.0);
    }

    #[tokio::test]
    async fn test_handles_share_engine() {
        let engine = spawn_engine(Box::new(ScriptedLandmarker::oval())).unwrap();
        let other = engine.clone();
        let (a, b) = tokio::join!(
            engine.classify(png_bytes(200, 100)),
            other.classify(png_bytes(200, 100))
        );
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test]
    async fn test_undecodable_image() {
        let engine = spawn_engine(Box::new(ScriptedLandmarker::oval())).unwrap();
        let err = engine.classify(b"definitely not an image".to_vec()).await.unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[tokio::test]
    async fn test_no_face() {
        let engine = spawn_engine(Box::new(ScriptedLandmarker::empty())).unwrap();
        let err = engine.classify(png_bytes(32, 32)).await.unwrap_err();
        assert!(matches!(err, EngineError::Analysis(AnalysisError::NoFaceDetected)));
    }

    #[tokio::test]
    async fn test_engine_survives_landmarker_panic() {
        let engine = spawn_engine(Box::new(PanicOnceLandmarker::new())).unwrap();

        let err = engine.classify(png_bytes(200, 100)).await.unwrap_err();
        assert!(matches!(err, EngineError::Panicked(ref m) if m.contains("mesh exploded")));

        let result = engine.classify(png_bytes(200, 100)).await.unwrap();
        assert_eq!(result.face_shape, FaceShape::Oval);
    }
}
