use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use docid::{OcrError, OcrJobOrchestrator};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::extract::{id_string, JsonOrForm};
use crate::state::AppState;

fn orchestrator(state: &AppState) -> Result<Arc<OcrJobOrchestrator>, ApiError> {
    state
        .ocr()
        .cloned()
        .ok_or(ApiError::Ocr(OcrError::NotConfigured))
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Remote ids are echoed as numbers when they are numeric.
fn id_value(id: &str) -> Value {
    match id.parse::<i64>() {
        Ok(n) => json!(n),
        Err(_) => json!(id),
    }
}

/// POST /app/aidoc/create_folder_aidoc/
pub async fn create_folder(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let folder_id = orchestrator(&state)?.create_folder().await?;
    Ok(Json(json!({ "status": "ok", "folder_id": id_value(&folder_id) })))
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(deserialize_with = "id_string")]
    pub folder_id: String,
    pub file_pdf: String,
}

/// POST /app/aidoc/upload_aidoc/
pub async fn upload(
    State(state): State<AppState>,
    JsonOrForm(request): JsonOrForm<UploadRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let status = orchestrator(&state)?
        .upload(&request.folder_id, &request.file_pdf)
        .await?;

    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((code, Json(json!({ "status": status }))))
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub folder_id: String,
    pub total_files: u64,
}

/// GET /app/aidoc/check_ocr_done/
pub async fn check_ocr_done(
    State(state): State<AppState>,
    params: Result<Query<CheckParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let params = query(params)?;
    let completion = orchestrator(&state)?
        .poll_completion(&params.folder_id, params.total_files)
        .await?;

    Ok(Json(json!({ "status": "ok", "data": completion.as_str() })))
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub folder_id: String,
}

/// GET /app/aidoc/download_file/
pub async fn download_file(
    State(state): State<AppState>,
    params: Result<Query<DownloadParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let params = query(params)?;
    let downloaded = orchestrator(&state)?
        .download_next(&params.folder_id)
        .await?;

    Ok(Json(json!({ "data": downloaded.file_name() })))
}
