use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::secrets::{expand_home, resolve_secret_optional};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    /// Root of the scanned document tree. Empty means unconfigured.
    #[serde(default)]
    pub source_root: String,
    #[serde(default)]
    pub identification: IdentificationConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            source_root: String::new(),
            identification: IdentificationConfig::default(),
            ocr: OcrConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// The configured source root, or `None` when unset.
    pub fn source_root_path(&self) -> Option<PathBuf> {
        let trimmed = self.source_root.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(expand_home(trimmed)))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentificationConfig {
    /// Ordered identifier patterns for the QR strategy. First match wins.
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// OS metadata files that are acknowledged without being processed.
    #[serde(default = "default_skip_names")]
    pub skip_names: Vec<String>,
}

fn default_dpi() -> u32 {
    300
}

fn default_skip_names() -> Vec<String> {
    vec![
        ".DS_Store".to_string(),
        "Thumbs.db".to_string(),
        "desktop.ini".to_string(),
    ]
}

impl Default for IdentificationConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            dpi: default_dpi(),
            skip_names: default_skip_names(),
        }
    }
}

impl IdentificationConfig {
    pub fn compiled_patterns(&self) -> Result<Vec<regex::Regex>, ConfigError> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(index, pattern)| {
                regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                    index,
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Base URL of the AI-doc service, e.g. `https://aidoc.example.com`.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_file: Option<String>,
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub parent_folder_id: String,
    #[serde(default = "default_folder_name_prefix")]
    pub folder_name_prefix: String,
    /// Where downloaded two-layer PDFs are written.
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,
    #[serde(default = "default_max_download_attempts")]
    pub max_download_attempts: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_folder_name_prefix() -> String {
    "Two-layer OCR data".to_string()
}

fn default_output_directory() -> String {
    "media/PDF_2_LAYER".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_result_ttl_secs() -> u64 {
    3600
}

fn default_max_download_attempts() -> u32 {
    3
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            token_file: None,
            token_env: None,
            parent_folder_id: String::new(),
            folder_name_prefix: default_folder_name_prefix(),
            output_directory: default_output_directory(),
            page_size: default_page_size(),
            result_ttl_secs: default_result_ttl_secs(),
            max_download_attempts: default_max_download_attempts(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl OcrConfig {
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    pub fn resolve_token(&self) -> Result<Option<SecretString>, ConfigError> {
        Ok(resolve_secret_optional(
            self.token.as_deref(),
            self.token_file.as_deref(),
            self.token_env.as_deref(),
        )?)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.output_directory))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Accepts `"42"` or `42` for ids that deployments write either way.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
