use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocidError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("OCR job error: {0}")]
    Ocr(#[from] crate::ocr::OcrError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid identifier pattern #{index} '{pattern}': {reason}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        reason: String,
    },

    #[error("Invalid value for environment variable '{name}': {reason}")]
    InvalidEnv { name: String, reason: String },

    #[error("Secret resolution failed: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

/// Failures of the external rasterizer and detector capabilities.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document has no pages: {0}")]
    NoPages(PathBuf),

    #[error("Failed to render PDF page: {0}")]
    Render(String),

    #[error("Failed to decode image: {0}")]
    Image(String),

    #[error("Code detection failed: {0}")]
    Detection(String),

    #[error("Detector unavailable: {0}")]
    DetectorUnavailable(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Source root is not configured")]
    RootUnconfigured,

    #[error("Source root '{path}' is unavailable: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No file matching '{reference}' under '{root}'")]
    NotFound { reference: String, root: PathBuf },

    #[error("Invalid file reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("Destination '{to}' appeared while moving '{from}'")]
    RenameConflict { from: PathBuf, to: PathBuf },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DocidError>;
