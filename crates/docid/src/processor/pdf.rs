use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use log::{debug, warn};

use crate::error::ProcessError;
use crate::processor::PageRasterizer;

/// Renders pages with poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::with_binary("pdftoppm")
    }

    pub fn with_binary<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn render_page(&self, path: &Path, page: u32, dpi: u32) -> Result<DynamicImage, ProcessError> {
        let _span = tracing::info_span!("processor.rasterize", page, dpi).entered();

        std::fs::metadata(path).map_err(|e| ProcessError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        check_page_exists(path, page)?;

        let png = render_pdf_page_to_png(&self.binary, path, page, dpi)?;
        image::load_from_memory(&png).map_err(|e| ProcessError::Image(e.to_string()))
    }
}

/// Cheap structural check so empty documents never spawn a process.
///
/// A document lopdf cannot parse is left to pdftoppm, which copes with more
/// damaged files.
fn check_page_exists(path: &Path, page: u32) -> Result<(), ProcessError> {
    match lopdf::Document::load(path) {
        Ok(doc) => {
            let page_count = doc.get_pages().len();
            if page == 0 || page as usize > page_count {
                return Err(ProcessError::NoPages(path.to_path_buf()));
            }
            debug!("{} has {} pages", path.display(), page_count);
            Ok(())
        }
        Err(e) => {
            warn!(
                "lopdf failed to parse {}: {}. Leaving it to pdftoppm.",
                path.display(),
                e
            );
            Ok(())
        }
    }
}

fn render_pdf_page_to_png(
    binary: &Path,
    pdf_path: &Path,
    page: u32,
    dpi: u32,
) -> Result<Vec<u8>, ProcessError> {
    let output_prefix =
        std::env::temp_dir().join(format!("docid_page_{}", uuid::Uuid::new_v4()));

    let output = Command::new(binary)
        .arg("-png")
        .arg("-singlefile")
        .args(["-r", &dpi.to_string()])
        .args(["-f", &page.to_string()])
        .args(["-l", &page.to_string()])
        .arg(pdf_path)
        .arg(&output_prefix)
        .output()
        .map_err(|e| {
            ProcessError::Render(format!(
                "Failed to run {}: {}. Make sure poppler-utils is installed.",
                binary.display(),
                e
            ))
        })?;

    // -singlefile drops the page number suffix.
    let image_path = output_prefix.with_extension("png");

    if !output.status.success() {
        let _ = std::fs::remove_file(&image_path);
        return Err(ProcessError::Render(format!(
            "pdftoppm failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let image_data = std::fs::read(&image_path).map_err(|e| {
        ProcessError::Render(format!("Failed to read rendered page image: {}", e))
    })?;

    let _ = std::fs::remove_file(&image_path);

    Ok(image_data)
}
