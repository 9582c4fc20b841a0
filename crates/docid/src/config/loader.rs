use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::secrets::has_secret_source;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "DOCID_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, ConfigFormat::from_path(path))
}

pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// `<config_dir>/docid/config.json`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("docid").join("config.json"))
}

/// Loads the configuration the server runs with.
///
/// Order: explicit path, `$DOCID_CONFIG`, the default config path if it
/// exists, built-in defaults. Environment overrides are applied last.
pub fn load_effective_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let candidate = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .or_else(|| default_config_path().filter(|p| p.exists()));

    let mut config = match candidate {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_config(&path)?
        }
        None => {
            debug!("No config file found, starting from defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    if config.ocr.is_configured()
        && !has_secret_source(
            config.ocr.token.as_deref(),
            config.ocr.token_file.as_deref(),
            config.ocr.token_env.as_deref(),
        )
    {
        warn!("OCR service configured without a token; requests will be unauthenticated");
    }

    Ok(config)
}

/// Applies `DATA_SRC_PATH`, `PATTERNS`, `DOMAIN_AIDOC`, `TOKEN_AIDOC`,
/// `PARENT_FOLDER_AIDOC` and `DOCID_BIND` from the process environment.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Same as [`apply_env_overrides`] with an injectable lookup.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = lookup("DATA_SRC_PATH") {
        config.source_root = root;
    }
    if let Some(raw) = lookup("PATTERNS") {
        config.identification.patterns = parse_pattern_list(&raw)?;
    }
    if let Some(url) = lookup("DOMAIN_AIDOC") {
        config.ocr.base_url = url;
    }
    if let Some(token) = lookup("TOKEN_AIDOC") {
        config.ocr.token = Some(token);
    }
    if let Some(parent) = lookup("PARENT_FOLDER_AIDOC") {
        config.ocr.parent_folder_id = parent;
    }
    if let Some(bind) = lookup("DOCID_BIND") {
        config.server.bind = bind;
    }
    Ok(())
}

/// `PATTERNS` is either a JSON array of strings or one pattern per line.
fn parse_pattern_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| ConfigError::InvalidEnv {
            name: "PATTERNS".to_string(),
            reason: e.to_string(),
        });
    }

    Ok(trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub(crate) fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    config.identification.compiled_patterns()?;

    let dpi = config.identification.dpi;
    if !(72..=1200).contains(&dpi) {
        return Err(ConfigError::Validation {
            message: format!("identification.dpi must be between 72 and 1200, got {}", dpi),
        });
    }

    let base_url = config.ocr.base_url.trim();
    if !base_url.is_empty() && !base_url.starts_with("http://") && !base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation {
            message: format!("ocr.base_url must be an http(s) URL, got '{}'", base_url),
        });
    }

    if config.ocr.page_size == 0 {
        return Err(ConfigError::Validation {
            message: "ocr.page_size must be at least 1".to_string(),
        });
    }

    if config.ocr.max_download_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "ocr.max_download_attempts must be at least 1".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_valid_json_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "source_root": "/mnt/scans",
            "identification": {
                "patterns": ["^HD\\d{6}", "^INV-\\d{4}-\\d{6}$"],
                "dpi": 300
            },
            "ocr": {
                "base_url": "https://aidoc.example.com",
                "token": "abc",
                "parent_folder_id": 17
            }
        }
        "#;

        let config = load_config_from_str(config_json, ConfigFormat::Json).unwrap();
        assert_eq!(config.source_root, "/mnt/scans");
        assert_eq!(config.identification.patterns.len(), 2);
        assert_eq!(config.ocr.parent_folder_id, "17");
        assert_eq!(config.ocr.output_directory, "media/PDF_2_LAYER");
    }

    #[test]
    fn test_load_valid_yaml_config() {
        let config_yaml = r#"
version: "1.0"
source_root: /mnt/scans
identification:
  patterns:
    - "^HD\\d{6}"
server:
  bind: 127.0.0.1:9000
"#;

        let config = load_config_from_str(config_yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.identification.patterns, vec!["^HD\\d{6}".to_string()]);
        assert_eq!(config.server.bind, "127.0.0.1:9000");
    }

    #[test]
    fn test_schema_rejects_unknown_field() {
        let result = load_config_from_str(r#"{"sourceRoot": "/x"}"#, ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_schema_rejects_out_of_range_dpi() {
        let result = load_config_from_str(
            r#"{"identification": {"dpi": 10}}"#,
            ConfigFormat::Json,
        );
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let result = load_config_from_str(
            r#"{"identification": {"patterns": ["(unclosed"]}}"#,
            ConfigFormat::Json,
        );
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn test_invalid_json_error() {
        let result = load_config_from_str("{ not json", ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = load_config_from_str(
            r#"{"ocr": {"base_url": "aidoc.example.com"}}"#,
            ConfigFormat::Json,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Json);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = Config {
            source_root: "/from/file".to_string(),
            ..Default::default()
        };

        let env: HashMap<&str, &str> = [
            ("DATA_SRC_PATH", "/from/env"),
            ("PATTERNS", r#"["^HD\\d+", "^PX"]"#),
            ("DOMAIN_AIDOC", "https://aidoc.local"),
            ("TOKEN_AIDOC", "Bearer xyz"),
            ("PARENT_FOLDER_AIDOC", "99"),
        ]
        .into_iter()
        .collect();

        apply_overrides(&mut config, |name| env.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.source_root, "/from/env");
        assert_eq!(config.identification.patterns, vec!["^HD\\d+", "^PX"]);
        assert_eq!(config.ocr.base_url, "https://aidoc.local");
        assert_eq!(config.ocr.token.as_deref(), Some("Bearer xyz"));
        assert_eq!(config.ocr.parent_folder_id, "99");
        assert_eq!(config.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn test_patterns_override_line_separated() {
        let mut config = Config::default();
        apply_overrides(&mut config, |name| {
            (name == "PATTERNS").then(|| "^HD\\d+\n\n  ^PX  \n".to_string())
        })
        .unwrap();
        assert_eq!(config.identification.patterns, vec!["^HD\\d+", "^PX"]);
    }

    #[test]
    fn test_patterns_override_bad_json() {
        let mut config = Config::default();
        let result = apply_overrides(&mut config, |name| {
            (name == "PATTERNS").then(|| "[not json".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }
}
