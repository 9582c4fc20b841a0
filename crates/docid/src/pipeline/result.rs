use std::path::PathBuf;

use super::error::IdentifyError;

/// Outcome of one identification attempt.
#[derive(Debug)]
pub struct IdentificationResult {
    /// The file reference exactly as the client sent it.
    pub reference: String,
    pub source: Option<PathBuf>,
    /// Where the document was renamed to. Set only on success.
    pub destination: Option<PathBuf>,
    pub outcome: Result<String, IdentifyError>,
}

impl IdentificationResult {
    pub(crate) fn failed(reference: &str, source: Option<PathBuf>, error: IdentifyError) -> Self {
        Self {
            reference: reference.to_string(),
            source,
            destination: None,
            outcome: Err(error),
        }
    }

    pub(crate) fn identified(
        reference: &str,
        source: PathBuf,
        destination: PathBuf,
        identifier: String,
    ) -> Self {
        Self {
            reference: reference.to_string(),
            source: Some(source),
            destination: Some(destination),
            outcome: Ok(identifier),
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&IdentifyError> {
        self.outcome.as_ref().err()
    }

    pub fn is_skipped(&self) -> bool {
        self.error().is_some_and(IdentifyError::is_skipped)
    }
}
