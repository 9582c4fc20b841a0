use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use docid::{IdentifyError, OcrError, StorageError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Identify(IdentifyError),

    #[error(transparent)]
    Ocr(#[from] OcrError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({"status": "error", "message": message}),
            ),
            ApiError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"status": "error"}),
                )
            }
            ApiError::Identify(e) => {
                tracing::warn!("Identification failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"status": "error"}),
                )
            }
            ApiError::Ocr(OcrError::NoData { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no data"}),
            ),
            ApiError::Ocr(e @ OcrError::Storage(StorageError::NotFound { .. }))
            | ApiError::Ocr(e @ OcrError::Storage(StorageError::RootUnconfigured)) => {
                tracing::warn!("OCR upload failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"status": "error"}),
                )
            }
            ApiError::Ocr(e) => {
                tracing::error!("OCR request failed: {}", e);
                let status = match e.status() {
                    Some(code) => {
                        StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY)
                    }
                    None if matches!(
                        e,
                        OcrError::Remote { .. } | OcrError::Http(_) | OcrError::MalformedResponse(_)
                    ) =>
                    {
                        StatusCode::BAD_GATEWAY
                    }
                    None => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, json!({"status": "error", "message": e.to_string()}))
            }
        };

        (status, Json(body)).into_response()
    }
}
