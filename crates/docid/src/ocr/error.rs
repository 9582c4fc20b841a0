use std::path::PathBuf;

use thiserror::Error;

use crate::error::StorageError;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR service is not configured")]
    NotConfigured,

    #[error("OCR service returned {}: {message}", display_status(.status))]
    Remote {
        status: Option<u16>,
        message: String,
    },

    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed OCR response: {0}")]
    MalformedResponse(String),

    #[error("No pending results for folder '{folder_id}'")]
    NoData { folder_id: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_status(status: &Option<u16>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "an error".to_string(),
    }
}

impl OcrError {
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        OcrError::Remote {
            status,
            message: message.into(),
        }
    }

    /// HTTP status reported by the remote service, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            OcrError::Remote { status, .. } => *status,
            OcrError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
