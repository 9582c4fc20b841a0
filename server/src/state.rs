use std::sync::Arc;

use docid::cache::MokaResultCache;
use docid::ocr::{AidocClient, OcrJobOrchestrator, OcrService, OrchestratorSettings};
use docid::{
    CodeDetector, Config, DocidError, IdentificationPipeline, PageRasterizer, PdftoppmRasterizer,
    QrDetector, ResultCache, ZbarDetector,
};
use log::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    qr: Arc<IdentificationPipeline>,
    barcode: Arc<IdentificationPipeline>,
    /// `None` when no OCR service is configured.
    ocr: Option<Arc<OcrJobOrchestrator>>,
    detectors: Vec<Arc<dyn CodeDetector>>,
}

impl AppState {
    /// Production wiring: poppler, rqrr, zbar and the AI-doc client.
    pub fn from_config(config: &Config) -> Result<Self, DocidError> {
        let rasterizer: Arc<dyn PageRasterizer> = Arc::new(PdftoppmRasterizer::new());
        let qr_detector: Arc<dyn CodeDetector> = Arc::new(QrDetector::new());
        let barcode_detector: Arc<dyn CodeDetector> = Arc::new(ZbarDetector::new());

        let (qr, barcode) = IdentificationPipeline::from_config(
            config,
            rasterizer,
            qr_detector.clone(),
            barcode_detector.clone(),
        )?;

        let ocr = if config.ocr.is_configured() {
            let service: Arc<dyn OcrService> = Arc::new(AidocClient::from_config(&config.ocr)?);
            Some(Self::orchestrator(config, service))
        } else {
            warn!("OCR service not configured; OCR routes will answer with errors");
            None
        };

        Ok(Self::new(qr, barcode, ocr, vec![qr_detector, barcode_detector]))
    }

    pub fn new(
        qr: IdentificationPipeline,
        barcode: IdentificationPipeline,
        ocr: Option<Arc<OcrJobOrchestrator>>,
        detectors: Vec<Arc<dyn CodeDetector>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                qr: Arc::new(qr),
                barcode: Arc::new(barcode),
                ocr,
                detectors,
            }),
        }
    }

    pub fn orchestrator(config: &Config, service: Arc<dyn OcrService>) -> Arc<OcrJobOrchestrator> {
        let cache: Arc<dyn ResultCache> = Arc::new(MokaResultCache::new());
        Arc::new(OcrJobOrchestrator::new(
            service,
            cache,
            config.source_root_path(),
            OrchestratorSettings::from(&config.ocr),
        ))
    }

    pub fn qr(&self) -> Arc<IdentificationPipeline> {
        self.inner.qr.clone()
    }

    pub fn barcode(&self) -> Arc<IdentificationPipeline> {
        self.inner.barcode.clone()
    }

    pub fn ocr(&self) -> Option<&Arc<OcrJobOrchestrator>> {
        self.inner.ocr.as_ref()
    }

    /// Checks every detector backend once. Missing ones are logged, not fatal.
    pub fn warm_up(&self) {
        for detector in &self.inner.detectors {
            match detector.warm_up() {
                Ok(()) => info!("Detector '{}' ready", detector.name()),
                Err(e) => warn!("Detector '{}' unavailable: {}", detector.name(), e),
            }
        }
    }

    pub fn shutdown(&self) {
        for detector in &self.inner.detectors {
            detector.shutdown();
        }
    }
}
