use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::OcrConfig;
use crate::error::DocidError;
use crate::sanitize;

use super::error::OcrError;
use super::service::{ExportStream, OcrService};
use super::types::{RequestId, ResultItem};

const FOLDER_PATH: &str = "/home/api/v1/folder";
const UPLOAD_PATH: &str = "/home/api/v1/upload-file";
const COUNT_DONE_PATH: &str = "/home/api/v1/response-api/count_data_ocr_done/";
const LIST_DONE_PATH: &str = "/home/api/v1/response-api/get_data_ocr_done/";
const EXPORT_PATH: &str = "/home/api/v1/ocr-general-demo/download-response/type";

/// Maximum length of a remote error body kept in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;
/// The service accepts PDFs only, whatever the scan file is called.
const UPLOAD_MIME: &str = "application/pdf";

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}

#[derive(Deserialize)]
struct CreatedFolder {
    id: Option<Value>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct DoneCount {
    count: u64,
}

/// HTTP client for the AI-doc OCR service.
pub struct AidocClient {
    client: Client,
    base_url: String,
    token: SecretString,
    parent_folder_id: String,
}

impl AidocClient {
    pub fn new(
        base_url: &str,
        token: SecretString,
        parent_folder_id: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, OcrError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token,
            parent_folder_id: parent_folder_id.trim().to_string(),
        })
    }

    pub fn from_config(config: &OcrConfig) -> Result<Self, DocidError> {
        if !config.is_configured() {
            return Err(OcrError::NotConfigured.into());
        }

        let token = match config.resolve_token()? {
            Some(token) => token,
            None => {
                warn!("No OCR token configured; requests will be sent without credentials");
                SecretString::from(String::new())
            }
        };

        Ok(Self::new(
            &config.base_url,
            token,
            &config.parent_folder_id,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, self.token.expose_secret())
    }

    /// The parent id goes out as a JSON number when it looks like one.
    fn parent_id_value(&self) -> Value {
        match self.parent_folder_id.parse::<i64>() {
            Ok(id) => json!(id),
            Err(_) => json!(self.parent_folder_id),
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, OcrError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(OcrError::remote(Some(status.as_u16()), truncate_body(&body)))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, OcrError> {
    let body = ensure_success(response).await?.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| {
        OcrError::MalformedResponse(format!(
            "{} in {}",
            e,
            truncate_body(&String::from_utf8_lossy(&body))
        ))
    })
}

#[async_trait]
impl OcrService for AidocClient {
    async fn create_folder(&self, name: &str) -> Result<String, OcrError> {
        let payload = json!({
            "parent_id": self.parent_id_value(),
            "folder_name": name,
            "form_id": [],
        });
        debug!("Creating OCR folder '{}'", name);

        let response = self
            .authorized(self.client.post(self.url(FOLDER_PATH)))
            .json(&payload)
            .send()
            .await?;
        let created: CreatedFolder = read_json(response).await?;

        match created.id {
            Some(Value::Number(id)) => Ok(id.to_string()),
            Some(Value::String(id)) if !id.is_empty() => Ok(id),
            _ => Err(OcrError::remote(None, "folder response carries no id")),
        }
    }

    async fn upload(&self, folder_id: &str, path: &Path) -> Result<u16, OcrError> {
        let io_error = |source| OcrError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = tokio::fs::File::open(path).await.map_err(io_error)?;
        let length = file.metadata().await.map_err(io_error)?.len();
        let file_name = sanitize::redact_path(path);
        let part = Part::stream_with_length(file, length)
            .file_name(file_name.clone())
            .mime_str(UPLOAD_MIME)?;
        let form = Form::new()
            .text("folder", folder_id.to_string())
            .text("get_value", "1")
            .part("file", part);

        let response = self
            .authorized(self.client.post(self.url(UPLOAD_PATH)))
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        info!("Uploaded {} ({} bytes) to folder {}: {}", file_name, length, folder_id, status);
        Ok(status)
    }

    async fn count_done(&self, folder_id: &str) -> Result<u64, OcrError> {
        let response = self
            .authorized(self.client.get(self.url(COUNT_DONE_PATH)))
            .query(&[("folder_id", folder_id)])
            .send()
            .await?;

        let envelope: Envelope<DoneCount> = read_json(response).await?;
        envelope
            .data
            .map(|data| data.count)
            .ok_or_else(|| OcrError::MalformedResponse("count response carries no data".to_string()))
    }

    async fn fetch_done_page(
        &self,
        folder_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ResultItem>, OcrError> {
        let response = self
            .authorized(self.client.get(self.url(LIST_DONE_PATH)))
            .query(&[
                ("folder_id", folder_id.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;

        let envelope: Envelope<Vec<ResultItem>> = read_json(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn export(&self, request_id: &RequestId) -> Result<ExportStream, OcrError> {
        let response = self
            .authorized(self.client.post(self.url(EXPORT_PATH)))
            .header(ACCEPT, "application/json")
            .form(&[
                ("request_id", request_id.to_string()),
                ("type_export", "pdf".to_string()),
            ])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(OcrError::from))
            .boxed())
    }
}
