use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use tracing::info_span;

use crate::config::Config;
use crate::error::{ConfigError, StorageError};
use crate::processor::{CodeDetector, PageRasterizer};
use crate::sanitize;
use crate::storage::{unique_path, FileLocator, FileMover, Renamer};

use super::error::IdentifyError;
use super::result::IdentificationResult;
use super::strategy::DetectionStrategy;

const FIRST_PAGE: u32 = 1;
const RENAME_ATTEMPTS: usize = 3;

/// Locates a scanned PDF, reads the code on its first page and renames the
/// file to the decoded identifier.
pub struct IdentificationPipeline {
    locator: Option<FileLocator>,
    rasterizer: Arc<dyn PageRasterizer>,
    mover: Arc<dyn FileMover>,
    dpi: u32,
    skip_names: Vec<String>,
    strategy: DetectionStrategy,
}

impl IdentificationPipeline {
    pub fn new(
        source_root: Option<PathBuf>,
        rasterizer: Arc<dyn PageRasterizer>,
        strategy: DetectionStrategy,
    ) -> Self {
        Self {
            locator: source_root.map(FileLocator::new),
            rasterizer,
            mover: Arc::new(Renamer::new()),
            dpi: 300,
            skip_names: Vec::new(),
            strategy,
        }
    }

    /// Builds the QR and barcode pipelines from one configuration.
    pub fn from_config(
        config: &Config,
        rasterizer: Arc<dyn PageRasterizer>,
        qr_detector: Arc<dyn CodeDetector>,
        barcode_detector: Arc<dyn CodeDetector>,
    ) -> Result<(Self, Self), ConfigError> {
        let patterns = config.identification.compiled_patterns()?;
        let build = |strategy| {
            Self::new(config.source_root_path(), rasterizer.clone(), strategy)
                .with_dpi(config.identification.dpi)
                .with_skip_names(config.identification.skip_names.clone())
        };

        Ok((
            build(DetectionStrategy::qr(qr_detector, patterns)),
            build(DetectionStrategy::barcode(barcode_detector)),
        ))
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_skip_names(mut self, skip_names: Vec<String>) -> Self {
        self.skip_names = skip_names;
        self
    }

    pub fn with_mover(mut self, mover: Arc<dyn FileMover>) -> Self {
        self.mover = mover;
        self
    }

    pub fn strategy(&self) -> &DetectionStrategy {
        &self.strategy
    }

    /// Runs the whole identification for one file reference.
    ///
    /// Never fails: every error ends up in the returned result.
    pub fn identify(&self, reference: &str) -> IdentificationResult {
        let _span = info_span!(
            "identify",
            strategy = self.strategy.name,
            reference = %sanitize::redact_reference(reference),
        )
        .entered();

        if self.locator.is_none() {
            warn!("No source root configured");
            return IdentificationResult::failed(
                reference,
                None,
                StorageError::RootUnconfigured.into(),
            );
        }

        if let Some(name) = self.skipped_name(reference) {
            debug!("Skipping OS metadata file {}", name);
            return IdentificationResult::failed(
                reference,
                None,
                IdentifyError::Skipped(name.to_string()),
            );
        }

        // Step 1: Locate
        let source = {
            let _step = info_span!("locate").entered();
            match self.step_locate(reference) {
                Ok(source) => {
                    debug!(
                        "Located {} [{}]",
                        sanitize::redact_path(&source),
                        sanitize::hash_path(&source)
                    );
                    source
                }
                Err(e) => {
                    warn!("Could not resolve '{}': {}", sanitize::redact_reference(reference), e);
                    return IdentificationResult::failed(reference, None, e.into());
                }
            }
        };

        let result = match self.step_read_codes(&source) {
            Ok(candidates) => self.step_accept_and_rename(reference, &source, candidates),
            Err(e) => IdentificationResult::failed(reference, Some(source.clone()), e),
        };

        match &result.outcome {
            Ok(identifier) => info!(
                "Identified {} as {}",
                sanitize::redact_path(&source),
                identifier
            ),
            Err(e) => warn!(
                "Identification of {} failed: {}",
                sanitize::redact_path(&source),
                e
            ),
        }

        result
    }

    /// The final component of `reference` (one trailing `:` ignored) when it
    /// names an OS metadata file.
    fn skipped_name<'a>(&self, reference: &'a str) -> Option<&'a str> {
        let last = sanitize::redact_reference(reference);
        let name = last.strip_suffix(':').unwrap_or(last);
        self.skip_names
            .iter()
            .any(|skip| skip == name)
            .then_some(name)
    }

    fn step_locate(&self, reference: &str) -> Result<PathBuf, StorageError> {
        self.locator
            .as_ref()
            .ok_or(StorageError::RootUnconfigured)?
            .locate(reference)
    }

    /// Steps 2 to 4: rasterize, crop and detect.
    fn step_read_codes(&self, source: &Path) -> Result<Vec<String>, IdentifyError> {
        let page = {
            let _step = info_span!("rasterize", dpi = self.dpi).entered();
            self.rasterizer
                .render_page(source, FIRST_PAGE, self.dpi)
                .map_err(IdentifyError::UnreadablePage)?
        };

        let region = {
            let _step = info_span!("select_region").entered();
            let region = self.strategy.region.select(page.width(), page.height());
            if region.is_empty() {
                return Err(IdentifyError::NoCodeFound);
            }
            region.crop(&page)
        };

        let payloads = {
            let _step =
                info_span!("detect", detector = self.strategy.detector.name()).entered();
            self.strategy
                .detector
                .detect(&region)
                .map_err(IdentifyError::Detection)?
        };
        debug!("Detector returned {} payload(s)", payloads.len());

        let candidates = self.strategy.candidates(payloads);
        if candidates.is_empty() {
            return Err(IdentifyError::NoCodeFound);
        }
        Ok(candidates)
    }

    /// Steps 5 and 6: validate each candidate and rename on the first
    /// acceptable one.
    fn step_accept_and_rename(
        &self,
        reference: &str,
        source: &Path,
        candidates: Vec<String>,
    ) -> IdentificationResult {
        let _step = info_span!("accept_and_rename").entered();
        let mut last_error = IdentifyError::NoCodeFound;

        for candidate in candidates {
            if !self.strategy.validator.accepts(&candidate) {
                debug!("Payload '{}' rejected by patterns", candidate);
                last_error = IdentifyError::PatternMismatch { payload: candidate };
                continue;
            }
            if !is_safe_identifier(&candidate) {
                last_error = IdentifyError::InvalidIdentifier { payload: candidate };
                continue;
            }

            match self.rename_to_identifier(source, &candidate) {
                Ok(destination) => {
                    return IdentificationResult::identified(
                        reference,
                        source.to_path_buf(),
                        destination,
                        candidate,
                    )
                }
                Err(e) => {
                    warn!("Rename to '{}' failed: {}", candidate, e);
                    last_error = e.into();
                }
            }
        }

        IdentificationResult::failed(reference, Some(source.to_path_buf()), last_error)
    }

    fn rename_to_identifier(&self, source: &Path, identifier: &str) -> Result<PathBuf, StorageError> {
        let parent = source.parent().unwrap_or_else(|| Path::new(""));
        let desired = parent.join(format!("{}.pdf", identifier));

        if desired == source {
            debug!("{} already carries its identifier", sanitize::redact_path(source));
            return Ok(desired);
        }

        let mut conflict = None;
        for attempt in 1..=RENAME_ATTEMPTS {
            let destination = unique_path(&desired);
            match self.mover.move_file(source, &destination) {
                Ok(()) => return Ok(destination),
                Err(e @ StorageError::RenameConflict { .. }) => {
                    debug!(
                        "{} was claimed concurrently (attempt {})",
                        sanitize::redact_path(&destination),
                        attempt
                    );
                    conflict = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(conflict.unwrap_or(StorageError::RenameConflict {
            from: source.to_path_buf(),
            to: desired,
        }))
    }
}

/// An identifier becomes a file name in the source directory, so it must
/// stay a single plain path component.
fn is_safe_identifier(identifier: &str) -> bool {
    !matches!(identifier, "" | "." | "..")
        && !identifier.contains(['/', '\\', '\0'])
}
