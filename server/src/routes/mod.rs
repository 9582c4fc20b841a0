//! HTTP routes, mounted under `/app`.

pub mod identify;
pub mod ocr;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/qrcode/start/", post(identify::identify_qr))
        .route("/barcode/start/", post(identify::identify_barcode))
        .route("/aidoc/create_folder_aidoc/", post(ocr::create_folder))
        .route("/aidoc/upload_aidoc/", post(ocr::upload))
        .route("/aidoc/check_ocr_done/", get(ocr::check_ocr_done))
        .route("/aidoc/download_file/", get(ocr::download_file))
        .route("/aidoc/download_pdf2layer/", get(ocr::download_file))
}
