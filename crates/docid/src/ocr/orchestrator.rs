use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::io::AsyncWriteExt;
use tracing::{info_span, Instrument};

use crate::cache::{folder_key, ResultCache};
use crate::config::OcrConfig;
use crate::error::StorageError;
use crate::sanitize;
use crate::storage::{
    ensure_directory, safe_file_name, unique_path, FileLocator, FileMover, Renamer,
};

use super::error::OcrError;
use super::lock::FolderLocks;
use super::service::OcrService;
use super::types::{Completion, PendingResultQueue, ResultItem};

/// Job records not touched for this long are forgotten.
pub const DEFAULT_JOB_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
const MAX_TRACKED_JOBS: u64 = 10_000;
const RENAME_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Uploading,
    Polling,
    Harvested,
}

/// Local view of one remote OCR folder.
#[derive(Debug, Clone)]
pub struct OcrJob {
    pub folder_id: String,
    pub state: JobState,
    pub expected_total: Option<u64>,
    pub processed: u64,
    pub uploaded: u32,
}

impl OcrJob {
    fn new(folder_id: &str) -> Self {
        Self {
            folder_id: folder_id.to_string(),
            state: JobState::Created,
            expected_total: None,
            processed: 0,
            uploaded: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub folder_name_prefix: String,
    pub page_size: u32,
    pub result_ttl: Duration,
    pub max_download_attempts: u32,
    pub output_directory: PathBuf,
    pub job_idle_timeout: Duration,
}

impl From<&OcrConfig> for OrchestratorSettings {
    fn from(config: &OcrConfig) -> Self {
        Self {
            folder_name_prefix: config.folder_name_prefix.clone(),
            page_size: config.page_size.max(1),
            result_ttl: config.result_ttl(),
            max_download_attempts: config.max_download_attempts.max(1),
            output_directory: config.output_path(),
            job_idle_timeout: DEFAULT_JOB_IDLE_TIMEOUT,
        }
    }
}

/// A result written to the output directory.
#[derive(Debug, Clone)]
pub struct DownloadedResult {
    pub item: ResultItem,
    pub path: PathBuf,
}

impl DownloadedResult {
    pub fn file_name(&self) -> String {
        sanitize::redact_path(&self.path)
    }
}

/// Drives remote OCR folders from creation to the last download.
///
/// Polls and downloads for the same folder are serialized by a per-folder
/// lock, so a folder is harvested once and every queued result is handed out
/// exactly once. Job records are informational and may be forgotten; the
/// set of harvested folders is kept for the life of the process.
pub struct OcrJobOrchestrator {
    service: Arc<dyn OcrService>,
    cache: Arc<dyn ResultCache>,
    locator: Option<FileLocator>,
    renamer: Renamer,
    settings: OrchestratorSettings,
    jobs: moka::sync::Cache<String, Arc<Mutex<OcrJob>>>,
    harvested: Mutex<HashSet<String>>,
    locks: FolderLocks,
}

impl OcrJobOrchestrator {
    pub fn new(
        service: Arc<dyn OcrService>,
        cache: Arc<dyn ResultCache>,
        source_root: Option<PathBuf>,
        settings: OrchestratorSettings,
    ) -> Self {
        let jobs = moka::sync::Cache::builder()
            .max_capacity(MAX_TRACKED_JOBS)
            .time_to_idle(settings.job_idle_timeout)
            .build();

        Self {
            service,
            cache,
            locator: source_root.map(FileLocator::new),
            renamer: Renamer::new(),
            settings,
            jobs,
            harvested: Mutex::new(HashSet::new()),
            locks: FolderLocks::default(),
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    fn update_job<F>(&self, folder_id: &str, update: F)
    where
        F: FnOnce(&mut OcrJob),
    {
        let job = self.jobs.get_with(folder_id.to_string(), || {
            Arc::new(Mutex::new(OcrJob::new(folder_id)))
        });
        let mut job = job.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut job);
    }

    /// Current local state of a folder, if it is tracked.
    pub fn job_snapshot(&self, folder_id: &str) -> Option<OcrJob> {
        let job = self.jobs.get(folder_id)?;
        let snapshot = job.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Some(snapshot)
    }

    fn is_harvested(&self, folder_id: &str) -> bool {
        self.harvested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(folder_id)
    }

    fn mark_harvested(&self, folder_id: &str) {
        self.harvested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(folder_id.to_string());
    }

    /// A drained queue is removed instead of kept as an empty entry.
    fn store_queue(&self, key: &str, queue: PendingResultQueue) {
        if queue.is_empty() {
            self.cache.remove(key);
        } else {
            self.cache.set(key, queue, self.settings.result_ttl);
        }
    }

    /// Creates a timestamped folder on the remote service.
    pub async fn create_folder(&self) -> Result<String, OcrError> {
        let now = chrono::Utc::now();
        let name = format!(
            "{} - {}.{:06}",
            self.settings.folder_name_prefix,
            now.timestamp(),
            now.timestamp_subsec_micros()
        );

        let folder_id = self
            .service
            .create_folder(&name)
            .instrument(info_span!("ocr.create_folder"))
            .await?;

        self.update_job(&folder_id, |_| {});
        info!("Created OCR folder {} ('{}')", folder_id, name);
        Ok(folder_id)
    }

    /// Uploads the file named by `reference` into `folder_id`.
    ///
    /// The remote status is returned as is, successful or not.
    pub async fn upload(&self, folder_id: &str, reference: &str) -> Result<u16, OcrError> {
        let span = info_span!(
            "ocr.upload",
            folder_id,
            reference = %sanitize::redact_reference(reference),
        );

        self.upload_in_span(folder_id, reference)
            .instrument(span)
            .await
    }

    async fn upload_in_span(&self, folder_id: &str, reference: &str) -> Result<u16, OcrError> {
        let locator = self
            .locator
            .clone()
            .ok_or(StorageError::RootUnconfigured)?;
        let owned_reference = reference.to_string();
        let path = tokio::task::spawn_blocking(move || locator.locate(&owned_reference))
            .await
            .map_err(|e| OcrError::Task(e.to_string()))??;

        let status = self.service.upload(folder_id, &path).await?;

        self.update_job(folder_id, |job| {
            if job.state == JobState::Created {
                job.state = JobState::Uploading;
            }
            if (200..300).contains(&status) {
                job.uploaded += 1;
            }
        });
        Ok(status)
    }

    /// Compares the remote done-count with `expected_total`.
    ///
    /// The first poll that sees the folder complete harvests its results into
    /// the cache. Later polls only report.
    pub async fn poll_completion(
        &self,
        folder_id: &str,
        expected_total: u64,
    ) -> Result<Completion, OcrError> {
        let span = info_span!("ocr.poll", folder_id, expected_total);

        self.poll_in_span(folder_id, expected_total)
            .instrument(span)
            .await
    }

    async fn poll_in_span(
        &self,
        folder_id: &str,
        expected_total: u64,
    ) -> Result<Completion, OcrError> {
        let _folder = self.locks.lock(folder_id).await;

        let processed = self.service.count_done(folder_id).await?;
        let harvested = self.is_harvested(folder_id);
        self.update_job(folder_id, |job| {
            job.processed = processed;
            job.expected_total = Some(expected_total);
            job.state = if harvested {
                JobState::Harvested
            } else {
                JobState::Polling
            };
        });
        info!("Folder {}: {} / {} processed", folder_id, processed, expected_total);

        if processed < expected_total {
            return Ok(Completion::Processing);
        }
        if harvested {
            debug!("Folder {} already harvested", folder_id);
            return Ok(Completion::Done);
        }

        let queue = self.harvest(folder_id).await?;
        info!("Harvested {} result(s) for folder {}", queue.len(), folder_id);
        self.store_queue(&folder_key(folder_id), queue);
        self.mark_harvested(folder_id);
        self.update_job(folder_id, |job| job.state = JobState::Harvested);

        Ok(Completion::Done)
    }

    async fn harvest(&self, folder_id: &str) -> Result<PendingResultQueue, OcrError> {
        let limit = self.settings.page_size;
        let mut queue = PendingResultQueue::new();
        let mut offset = 0u32;

        loop {
            let page = self
                .service
                .fetch_done_page(folder_id, offset, limit)
                .instrument(info_span!("ocr.harvest_page", offset, limit))
                .await?;
            if page.is_empty() {
                break;
            }
            queue.extend(page);
            offset = offset.saturating_add(limit);
        }

        Ok(queue)
    }

    /// Downloads the oldest pending result of `folder_id`.
    ///
    /// The result leaves the queue only once it is on disk. A failed download
    /// keeps it at the head until it has failed `max_download_attempts` times.
    /// A folder without pending results is answered with `NoData` and no state
    /// is touched.
    pub async fn download_next(&self, folder_id: &str) -> Result<DownloadedResult, OcrError> {
        let span = info_span!("ocr.download", folder_id);

        self.download_in_span(folder_id)
            .instrument(span)
            .await
    }

    async fn download_in_span(&self, folder_id: &str) -> Result<DownloadedResult, OcrError> {
        let no_data = || OcrError::NoData {
            folder_id: folder_id.to_string(),
        };

        let key = folder_key(folder_id);
        if self.cache.get(&key).map_or(true, |queue| queue.is_empty()) {
            return Err(no_data());
        }

        let _folder = self.locks.lock(folder_id).await;
        let mut queue = self.cache.get(&key).unwrap_or_default();
        let Some(head) = queue.front().cloned() else {
            return Err(no_data());
        };

        match self.fetch_to_disk(&head).await {
            Ok(path) => {
                queue.pop_front();
                self.store_queue(&key, queue);
                info!(
                    "Downloaded result {} to {}",
                    head.request_id,
                    sanitize::redact_path(&path)
                );
                Ok(DownloadedResult { item: head, path })
            }
            Err(e) => {
                let attempts = queue.front_mut().map_or(0, |item| {
                    item.attempts += 1;
                    item.attempts
                });
                if attempts >= self.settings.max_download_attempts {
                    error!(
                        "Dropping result {} of folder {} after {} failed downloads: {}",
                        head.request_id, folder_id, attempts, e
                    );
                    queue.pop_front();
                } else {
                    warn!(
                        "Download of result {} failed (attempt {}): {}",
                        head.request_id, attempts, e
                    );
                }
                self.store_queue(&key, queue);
                Err(e)
            }
        }
    }

    /// Number of folders with a poll or download in flight.
    pub fn active_folders(&self) -> usize {
        self.locks.len()
    }

    /// Streams the export into a temporary file, then moves it to a free name
    /// in the output directory.
    async fn fetch_to_disk(&self, item: &ResultItem) -> Result<PathBuf, OcrError> {
        let output = &self.settings.output_directory;
        ensure_directory(output)?;

        let file_name = safe_file_name(&item.title)
            .unwrap_or_else(|| format!("{}.pdf", item.request_id));
        let partial = output.join(format!(
            ".{}.{}.part",
            file_name,
            uuid::Uuid::new_v4().simple()
        ));

        if let Err(e) = self.write_export(item, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        let result = self.claim_name(&partial, &output.join(&file_name));
        if result.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        result
    }

    async fn write_export(&self, item: &ResultItem, partial: &Path) -> Result<(), OcrError> {
        let io_error = |source| OcrError::Io {
            path: partial.to_path_buf(),
            source,
        };

        let mut body = self.service.export(&item.request_id).await?;
        let mut file = tokio::fs::File::create(partial).await.map_err(io_error)?;
        while let Some(chunk) = body.next().await {
            file.write_all(&chunk?).await.map_err(io_error)?;
        }
        file.flush().await.map_err(io_error)?;
        Ok(())
    }

    fn claim_name(&self, partial: &Path, desired: &Path) -> Result<PathBuf, OcrError> {
        for _ in 0..RENAME_ATTEMPTS {
            let destination = unique_path(desired);
            match self.renamer.move_file(partial, &destination) {
                Ok(()) => return Ok(destination),
                Err(StorageError::RenameConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::RenameConflict {
            from: partial.to_path_buf(),
            to: desired.to_path_buf(),
        }
        .into())
    }
}
