//! Test harness for isolated test execution.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, GrayImage, Luma};
use tempfile::TempDir;

use docid::processor::{CodeDetector, PageRasterizer, QrDetector};
use docid::{DetectionStrategy, IdentificationPipeline, ProcessError};

/// US Letter at 100 DPI.
pub const PAGE_WIDTH: u32 = 850;
pub const PAGE_HEIGHT: u32 = 1100;

/// Isolated source tree plus output and config directories.
pub struct TestHarness {
    temp_dir: TempDir,
    pub source_root: PathBuf,
    pub output_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let source_root = base.join("scans");
        let output_dir = base.join("output");
        let config_dir = base.join("config");

        std::fs::create_dir_all(&source_root).expect("Failed to create source root");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        Self {
            temp_dir,
            source_root,
            output_dir,
            config_dir,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a placeholder PDF below the source root.
    pub fn write_scan(&self, relative: &str) -> PathBuf {
        let path = self.source_root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create scan dir");
        }
        std::fs::write(&path, format!("%PDF-1.5 {}", relative)).expect("Failed to write scan");
        path
    }

    pub fn write_config(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.config_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write config file");
        path
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.source_root.join(relative).exists()
    }

    /// Every file name below the source root, sorted.
    pub fn scan_names(&self) -> Vec<String> {
        let mut names: Vec<String> = walkdir::WalkDir::new(&self.source_root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn qr_pipeline(&self, page: DynamicImage, patterns: &[&str]) -> IdentificationPipeline {
        let patterns = patterns
            .iter()
            .map(|p| regex::Regex::new(p).expect("valid test pattern"))
            .collect();
        IdentificationPipeline::new(
            Some(self.source_root.clone()),
            Arc::new(FixedPage(page)),
            DetectionStrategy::qr(Arc::new(QrDetector::new()), patterns),
        )
        .with_skip_names(vec![".DS_Store".to_string(), "Thumbs.db".to_string()])
    }

    pub fn barcode_pipeline(
        &self,
        page: DynamicImage,
        detector: Arc<dyn CodeDetector>,
    ) -> IdentificationPipeline {
        IdentificationPipeline::new(
            Some(self.source_root.clone()),
            Arc::new(FixedPage(page)),
            DetectionStrategy::barcode(detector),
        )
        .with_skip_names(vec![".DS_Store".to_string()])
    }
}

/// Rasterizer that returns the same bitmap for every document.
pub struct FixedPage(pub DynamicImage);

impl PageRasterizer for FixedPage {
    fn render_page(&self, path: &Path, _page: u32, _dpi: u32) -> Result<DynamicImage, ProcessError> {
        std::fs::metadata(path).map_err(|e| ProcessError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(self.0.clone())
    }
}

/// Rasterizer for documents without pages.
pub struct EmptyDocument;

impl PageRasterizer for EmptyDocument {
    fn render_page(&self, path: &Path, _page: u32, _dpi: u32) -> Result<DynamicImage, ProcessError> {
        Err(ProcessError::NoPages(path.to_path_buf()))
    }
}

/// Stand-in for a printed barcode: reports `payload` whenever the region it
/// is given contains at least one black pixel.
pub struct InkDetector {
    pub payload: String,
    pub regions: Mutex<Vec<(u32, u32)>>,
}

impl InkDetector {
    pub fn new(payload: &str) -> Arc<Self> {
        Arc::new(Self {
            payload: payload.to_string(),
            regions: Mutex::new(Vec::new()),
        })
    }
}

impl CodeDetector for InkDetector {
    fn name(&self) -> &'static str {
        "ink"
    }

    fn detect(&self, region: &DynamicImage) -> Result<Vec<String>, ProcessError> {
        let gray = region.to_luma8();
        self.regions.lock().unwrap().push(gray.dimensions());
        if gray.pixels().any(|p| p[0] < 128) {
            Ok(vec![self.payload.clone()])
        } else {
            Ok(Vec::new())
        }
    }
}

pub fn blank_page() -> GrayImage {
    GrayImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, Luma([255]))
}

/// A white page with a black block at `(x, y)`.
pub fn page_with_mark(x: u32, y: u32) -> DynamicImage {
    let mut page = blank_page();
    for dy in 0..40 {
        for dx in 0..120 {
            page.put_pixel(x + dx, y + dy, Luma([0]));
        }
    }
    DynamicImage::ImageLuma8(page)
}

/// A white page with a QR code for `payload` drawn at `(x, y)`.
pub fn page_with_qr(payload: &str, x: u32, y: u32) -> DynamicImage {
    const MODULE: u32 = 6;

    let code = qrcode::QrCode::new(payload.as_bytes()).expect("payload fits a QR code");
    let width = code.width();
    let colors = code.to_colors();

    let mut page = blank_page();
    for (index, color) in colors.iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let mx = (index % width) as u32;
        let my = (index / width) as u32;
        for dy in 0..MODULE {
            for dx in 0..MODULE {
                page.put_pixel(x + mx * MODULE + dx, y + my * MODULE + dy, Luma([0]));
            }
        }
    }
    DynamicImage::ImageLuma8(page)
}
