use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::RollError;
use crate::extraction::{FieldExtractor, HttpFieldExtractor};
use crate::gateway;
use crate::session::{RollSession, SessionSettings};
use crate::types::{BackendConfig, Config};
use crate::util::atomic_write_str;

/// Application state managed by Tauri
pub struct AppState {
    pub config: Config,
    pub session: RollSession,
    /// `None` when extraction is off or misconfigured.
    pub extractor: Option<Arc<dyn FieldExtractor>>,
}

impl AppState {
    /// Load ~/.voterroll/config.json (creating it on first run) and build
    /// the session on the configured backend.
    pub fn new() -> Result<Self, RollError> {
        let config = load_config(&config_path()?)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, RollError> {
        validate_config(&config)?;
        let gateway = gateway::from_config(&config.backend)?;
        log::info!("Roll backend: {}", gateway.describe());

        let extractor: Option<Arc<dyn FieldExtractor>> =
            match HttpFieldExtractor::from_config(&config.extraction) {
                Ok(Some(extractor)) => Some(Arc::new(extractor)),
                Ok(None) => None,
                Err(e) => {
                    log::warn!("{}. Field extraction disabled.", e);
                    None
                }
            };

        let session = RollSession::new(gateway, SessionSettings::from(&config));
        Ok(Self {
            config,
            session,
            extractor,
        })
    }

    /// Config as shown to the UI; the extraction API key is withheld.
    pub fn public_config(&self) -> Config {
        let mut config = self.config.clone();
        config.extraction.api_key = None;
        config
    }
}

/// Get the canonical config file path (~/.voterroll/config.json)
pub fn config_path() -> Result<PathBuf, RollError> {
    let home = dirs::home_dir()
        .ok_or_else(|| RollError::Configuration("Could not find home directory".to_string()))?;
    Ok(home.join(".voterroll").join("config.json"))
}

/// Load configuration from `path`.
///
/// A missing file yields the defaults, which are written back so the
/// operator has a file to edit.
pub fn load_config(path: &Path) -> Result<Config, RollError> {
    if !path.exists() {
        let config = Config::default();
        write_config(path, &config)?;
        log::info!("Wrote default config to {}", path.display());
        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| RollError::Configuration(format!("Failed to read config: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| RollError::Configuration(format!("Failed to parse config: {}", e)))
}

pub fn write_config(path: &Path, config: &Config) -> Result<(), RollError> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| RollError::Configuration(format!("Failed to serialize config: {}", e)))?;
    atomic_write_str(path, &content)
        .map_err(|e| RollError::Configuration(format!("Failed to write config: {}", e)))
}

pub fn validate_config(config: &Config) -> Result<(), RollError> {
    match &config.backend {
        BackendConfig::AppsScript { web_app_url } => {
            gateway::apps_script::parse_web_app_url(web_app_url)?;
        }
        BackendConfig::LocalSheet { path } => {
            if path.trim().is_empty() {
                return Err(RollError::Configuration(
                    "localSheet backend needs a path".to_string(),
                ));
            }
        }
    }
    if config.image.max_width == 0 {
        return Err(RollError::Configuration(
            "image.maxWidth must be positive".to_string(),
        ));
    }
    if !(1..=100).contains(&config.image.jpeg_quality) {
        return Err(RollError::Configuration(
            "image.jpegQuality must be between 1 and 100".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn local_config(dir: &Path) -> Config {
        Config {
            backend: BackendConfig::LocalSheet {
                path: dir.join("roll.json").to_string_lossy().into_owned(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_config_written_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let config = load_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.svn_prefix, "SUR");
        assert_eq!(config.target_date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(config.image.max_width, 600);

        // Reloading reads the file that was written.
        let again = load_config(&path).unwrap();
        assert_eq!(again.backend, config.backend);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"backend":{"kind":"appsScript","webAppUrl":"https://script.google.com/macros/s/x/exec"},"targetDate":"2025-01-01","unknown":1}"#,
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert!(matches!(config.backend, BackendConfig::AppsScript { .. }));
        assert_eq!(config.target_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(config.image.jpeg_quality, 70);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_bad_config_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(load_config(&path), Err(RollError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_non_http_backend() {
        let config = Config {
            backend: BackendConfig::AppsScript {
                web_app_url: "file:///etc/passwd".to_string(),
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_misconfigured_extraction_is_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = local_config(dir.path());
        config.extraction.enabled = true;
        let state = AppState::from_config(config).unwrap();
        assert!(state.extractor.is_none());
    }

    #[tokio::test]
    async fn test_state_on_local_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = local_config(dir.path());
        config.extraction = crate::types::ExtractionConfig {
            enabled: true,
            endpoint: Some("https://ocr.example.com/read".to_string()),
            api_key: Some("secret".to_string()),
        };
        let state = AppState::from_config(config).unwrap();
        assert!(state.extractor.is_some());
        assert!(state.public_config().extraction.api_key.is_none());
        assert_eq!(state.session.load().await.unwrap(), 0);
    }
}
