use thiserror::Error;

use crate::error::{ProcessError, StorageError};

/// Why an identification attempt produced no identifier.
#[derive(Error, Debug)]
pub enum IdentifyError {
    #[error("Skipped OS metadata file '{0}'")]
    Skipped(String),

    #[error("Page could not be rendered: {0}")]
    UnreadablePage(#[source] ProcessError),

    #[error("Code detection failed: {0}")]
    Detection(#[source] ProcessError),

    #[error("No code found on the first page")]
    NoCodeFound,

    #[error("Payload '{payload}' matches no configured pattern")]
    PatternMismatch { payload: String },

    #[error("Payload '{payload}' is not usable as a file name")]
    InvalidIdentifier { payload: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IdentifyError {
    /// Soft failures are reported to the client as a null identifier.
    ///
    /// Every storage failure is hard: lookup (no root, no file, bad
    /// reference) as well as I/O during the rename.
    pub fn is_soft(&self) -> bool {
        !matches!(self, IdentifyError::Storage(_) | IdentifyError::Skipped(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, IdentifyError::Skipped(_))
    }
}
