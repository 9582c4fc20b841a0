use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use log::{debug, info};

use crate::error::ProcessError;
use crate::processor::CodeDetector;

/// zbarimg exits with this status when the image holds no symbols.
const ZBAR_NO_SYMBOLS: i32 = 4;

/// 1D barcode (and any other zbar symbology) decoder backed by `zbarimg`.
pub struct ZbarDetector {
    binary: PathBuf,
}

impl ZbarDetector {
    pub fn new() -> Self {
        Self::with_binary("zbarimg")
    }

    pub fn with_binary<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }
}

impl Default for ZbarDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeDetector for ZbarDetector {
    fn name(&self) -> &'static str {
        "barcode"
    }

    fn warm_up(&self) -> Result<(), ProcessError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .map_err(|e| {
                ProcessError::DetectorUnavailable(format!(
                    "Failed to run {}: {}. Make sure zbar-tools is installed.",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(ProcessError::DetectorUnavailable(format!(
                "{} --version failed",
                self.binary.display()
            )));
        }

        info!(
            "Using zbarimg {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    fn detect(&self, region: &DynamicImage) -> Result<Vec<String>, ProcessError> {
        let _span = tracing::info_span!("processor.detect_barcode").entered();

        let image_path =
            std::env::temp_dir().join(format!("docid_region_{}.png", uuid::Uuid::new_v4()));

        region
            .save_with_format(&image_path, image::ImageFormat::Png)
            .map_err(|e| ProcessError::Image(format!("Failed to write region image: {}", e)))?;

        let output = Command::new(&self.binary)
            .args(["--quiet", "--raw"])
            .arg(&image_path)
            .output();

        let _ = std::fs::remove_file(&image_path);

        let output = output.map_err(|e| {
            ProcessError::DetectorUnavailable(format!(
                "Failed to run {}: {}",
                self.binary.display(),
                e
            ))
        })?;

        match output.status.code() {
            Some(0) => Ok(parse_raw_output(&String::from_utf8_lossy(&output.stdout))),
            Some(ZBAR_NO_SYMBOLS) => {
                debug!("zbarimg found no symbols");
                Ok(Vec::new())
            }
            _ => Err(ProcessError::Detection(format!(
                "zbarimg failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}

/// `--raw` prints one payload per line.
fn parse_raw_output(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
