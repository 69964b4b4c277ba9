use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use faceshape_core::ClassificationResult;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::EngineHandle;
use crate::error::ApiError;

/// Multipart field that carries the photo.
const IMAGE_FIELD: &str = "image";

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
}

/// Build the HTTP router: `POST /upload`, `GET /status`, permissive CORS.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload", post(upload))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassificationResult>, ApiError> {
    // A request that is not multipart has no image part either.
    let mut multipart = multipart.map_err(|_| ApiError::MissingImage)?;
    let image = read_image_part(&mut multipart).await?;

    let result = state.engine.classify(image).await?;
    Ok(Json(result))
}

/// Bytes of the first `image` part that is a file upload.
async fn read_image_part(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let filename = match field.file_name() {
            // a plain form value, not a file
            None => continue,
            Some("") => return Err(ApiError::EmptyFilename),
            Some(name) => name.to_string(),
        };

        let data = field.bytes().await.map_err(upload_error)?;
        tracing::debug!(filename = %filename, bytes = data.len(), "image received");
        return Ok(data.to_vec());
    }
    Err(ApiError::MissingImage)
}

fn upload_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        tracing::debug!(error = %err, "malformed multipart body");
        ApiError::MalformedUpload
    }
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "landmarker": state.engine.backend(),
    }))
}
