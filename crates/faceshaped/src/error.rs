use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use faceshape_core::AnalysisError;
use serde_json::json;

use crate::engine::EngineError;

/// Failures surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    MissingImage,
    EmptyFilename,
    MalformedUpload,
    PayloadTooLarge,
    UndecodableImage,
    NoFaceDetected,
    IncompleteFace,
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ApiError::MissingImage => "画像ファイルが必要です",
            ApiError::EmptyFilename => "ファイル名がありません",
            ApiError::MalformedUpload => "アップロードの読み込みに失敗しました",
            ApiError::PayloadTooLarge => "画像ファイルが大きすぎます",
            ApiError::UndecodableImage => "画像の読み込みに失敗しました",
            ApiError::NoFaceDetected => "顔が検出されませんでした",
            ApiError::IncompleteFace => "顔の検出が不完全です",
            ApiError::Internal => "内部エラーが発生しました",
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Decode(e) => {
                tracing::debug!(error = %e, "upload is not a decodable image");
                ApiError::UndecodableImage
            }
            EngineError::Analysis(AnalysisError::NoFaceDetected) => ApiError::NoFaceDetected,
            EngineError::Analysis(AnalysisError::Incomplete(e)) => {
                tracing::warn!(error = %e, "landmarks unusable for measurement");
                ApiError::IncompleteFace
            }
            other => {
                tracing::error!(error = %other, "classification failed");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}
