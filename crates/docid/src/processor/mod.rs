//! Rasterizer and detector capabilities.
//!
//! The identification pipeline only sees the two traits below; the concrete
//! adapters wrap poppler, rqrr and zbar.

pub mod barcode;
pub mod pdf;
pub mod qr;
pub mod region;

use std::path::Path;

use image::DynamicImage;

use crate::error::ProcessError;

pub use barcode::ZbarDetector;
pub use pdf::PdftoppmRasterizer;
pub use qr::QrDetector;
pub use region::{CodeRegion, RegionPolicy};

/// Renders one page of a PDF to a bitmap.
pub trait PageRasterizer: Send + Sync {
    /// Renders `page` (1-based) of the PDF at `path`.
    fn render_page(&self, path: &Path, page: u32, dpi: u32) -> Result<DynamicImage, ProcessError>;
}

/// Decodes machine-readable codes from a bitmap region.
///
/// Detectors are built once at startup and shared by every request.
pub trait CodeDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once before the first request. Fails if the backend is missing.
    fn warm_up(&self) -> Result<(), ProcessError> {
        Ok(())
    }

    /// Returns every decoded payload, in detection order.
    fn detect(&self, region: &DynamicImage) -> Result<Vec<String>, ProcessError>;

    /// Called once on shutdown.
    fn shutdown(&self) {}
}
