//! In-process fakes for the remote OCR service.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use docid::ocr::{ExportStream, OcrError, OcrService, RequestId, ResultItem};

/// Replays a fixed result listing and records every call.
#[derive(Default)]
pub struct FakeOcrService {
    pub done: AtomicU64,
    pub results: Mutex<Vec<ResultItem>>,
    pub failing_exports: Mutex<HashSet<String>>,
    pub export_delay: Option<Duration>,
    pub created_folders: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<(String, PathBuf)>>,
    pub count_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
    pub export_calls: AtomicUsize,
}

impl FakeOcrService {
    pub fn with_results(titles: &[&str]) -> Self {
        let results = titles
            .iter()
            .enumerate()
            .map(|(i, title)| ResultItem::new(RequestId::Int(i as i64 + 1), *title))
            .collect();
        Self {
            results: Mutex::new(results),
            ..Default::default()
        }
    }

    pub fn set_done(&self, done: u64) {
        self.done.store(done, Ordering::SeqCst);
    }

    pub fn fail_export(&self, request_id: &str) {
        self.failing_exports
            .lock()
            .unwrap()
            .insert(request_id.to_string());
    }

    pub fn heal_export(&self, request_id: &str) {
        self.failing_exports.lock().unwrap().remove(request_id);
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn export_calls(&self) -> usize {
        self.export_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrService for FakeOcrService {
    async fn create_folder(&self, name: &str) -> Result<String, OcrError> {
        let mut folders = self.created_folders.lock().unwrap();
        folders.push(name.to_string());
        Ok(format!("{}", 100 + folders.len()))
    }

    async fn upload(&self, folder_id: &str, path: &Path) -> Result<u16, OcrError> {
        self.uploads
            .lock()
            .unwrap()
            .push((folder_id.to_string(), path.to_path_buf()));
        Ok(200)
    }

    async fn count_done(&self, _folder_id: &str) -> Result<u64, OcrError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.done.load(Ordering::SeqCst))
    }

    async fn fetch_done_page(
        &self,
        _folder_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ResultItem>, OcrError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .results
            .lock()
            .unwrap()
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn export(&self, request_id: &RequestId) -> Result<ExportStream, OcrError> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.export_delay {
            tokio::time::sleep(delay).await;
        }

        let id = request_id.to_string();
        if self.failing_exports.lock().unwrap().contains(&id) {
            return Err(OcrError::remote(Some(500), "export failed"));
        }

        let chunks = vec![
            Ok(Bytes::from_static(b"%PDF-1.5 two-layer ")),
            Ok(Bytes::from(id)),
        ];
        Ok(futures_util::stream::iter(chunks).boxed())
    }
}
