//! Remote two-layer OCR jobs.

pub mod client;
pub mod error;
mod lock;
pub mod orchestrator;
pub mod service;
pub mod types;

pub use client::AidocClient;
pub use error::OcrError;
pub use orchestrator::{
    DownloadedResult, JobState, OcrJob, OcrJobOrchestrator, OrchestratorSettings,
    DEFAULT_JOB_IDLE_TIMEOUT,
};
pub use service::{ExportStream, OcrService};
pub use types::{Completion, PendingResultQueue, RequestId, ResultItem};
