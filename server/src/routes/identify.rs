use std::sync::Arc;

use axum::{extract::State, Json};
use docid::IdentificationPipeline;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::extract::JsonOrForm;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    pub file_pdf: String,
}

/// POST /app/qrcode/start/
pub async fn identify_qr(
    State(state): State<AppState>,
    JsonOrForm(request): JsonOrForm<IdentifyRequest>,
) -> Result<Json<Value>, ApiError> {
    identify(state.qr(), request.file_pdf).await
}

/// POST /app/barcode/start/
pub async fn identify_barcode(
    State(state): State<AppState>,
    JsonOrForm(request): JsonOrForm<IdentifyRequest>,
) -> Result<Json<Value>, ApiError> {
    identify(state.barcode(), request.file_pdf).await
}

async fn identify(
    pipeline: Arc<IdentificationPipeline>,
    reference: String,
) -> Result<Json<Value>, ApiError> {
    let result = tokio::task::spawn_blocking(move || pipeline.identify(&reference))
        .await
        .map_err(|e| ApiError::Internal(format!("identification task failed: {}", e)))?;

    match result.outcome {
        Ok(identifier) => Ok(Json(json!({ "data": identifier }))),
        Err(e) if e.is_skipped() => Ok(Json(json!({
            "data": null,
            "skipped": true,
            "message": e.to_string(),
        }))),
        Err(e) if e.is_soft() => Ok(Json(json!({
            "data": null,
            "reason": e.to_string(),
        }))),
        Err(e) => Err(ApiError::Identify(e)),
    }
}
