use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use super::error::OcrError;
use super::types::{RequestId, ResultItem};

/// Body of an exported result, streamed chunk by chunk.
pub type ExportStream = BoxStream<'static, Result<Bytes, OcrError>>;

/// The remote two-layer OCR service.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Creates a folder below the configured parent and returns its id.
    async fn create_folder(&self, name: &str) -> Result<String, OcrError>;

    /// Uploads one PDF into `folder_id`. Returns the remote HTTP status.
    async fn upload(&self, folder_id: &str, path: &Path) -> Result<u16, OcrError>;

    /// Number of files in `folder_id` the service has finished.
    async fn count_done(&self, folder_id: &str) -> Result<u64, OcrError>;

    /// One page of finished results. An empty page ends the listing.
    async fn fetch_done_page(
        &self,
        folder_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ResultItem>, OcrError>;

    /// Exports one result as a two-layer PDF.
    async fn export(&self, request_id: &RequestId) -> Result<ExportStream, OcrError>;
}
