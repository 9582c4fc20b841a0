use image::DynamicImage;
use log::debug;

use crate::error::ProcessError;
use crate::processor::CodeDetector;

/// QR detector backed by `rqrr`.
#[derive(Debug, Clone, Default)]
pub struct QrDetector;

impl QrDetector {
    pub fn new() -> Self {
        Self
    }
}

impl CodeDetector for QrDetector {
    fn name(&self) -> &'static str {
        "qr"
    }

    fn detect(&self, region: &DynamicImage) -> Result<Vec<String>, ProcessError> {
        let _span = tracing::info_span!("processor.detect_qr").entered();

        let gray = region.to_luma8();
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                gray.get_pixel(x as u32, y as u32)[0]
            });

        let mut payloads = Vec::new();
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, content)) => payloads.push(content),
                Err(e) => debug!("Found a QR grid that failed to decode: {:?}", e),
            }
        }

        Ok(payloads)
    }
}
