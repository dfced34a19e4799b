//! Persistence gateway for the voter roll.
//!
//! Two backends share one trait: the deployed Apps Script web app in front
//! of the Google Sheet, and a local JSON workbook with the same row
//! semantics for offline use and tests.

pub mod apps_script;
pub mod local;
pub mod sheet;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RollError;
use crate::types::{BackendConfig, DeleteReason, Member};

pub use apps_script::AppsScriptGateway;
pub use local::LocalSheetGateway;

#[async_trait]
pub trait RollGateway: Send + Sync {
    /// Full snapshot of the `Data` sheet.
    async fn fetch_all(&self) -> Result<Vec<Member>, RollError>;

    /// Overwrite the row with the same code, or append a new one.
    async fn upsert(&self, member: &Member) -> Result<(), RollError>;

    /// Move the row to the `Deleted` sheet with `reason` appended.
    async fn soft_delete(&self, svn: &str, reason: DeleteReason) -> Result<(), RollError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Build the configured backend.
pub fn from_config(config: &BackendConfig) -> Result<Arc<dyn RollGateway>, RollError> {
    match config {
        BackendConfig::AppsScript { web_app_url } => {
            Ok(Arc::new(AppsScriptGateway::new(web_app_url)?))
        }
        BackendConfig::LocalSheet { path } => {
            Ok(Arc::new(LocalSheetGateway::open(expand_home(path))?))
        }
    }
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/tmp/roll.json"), PathBuf::from("/tmp/roll.json"));
    }

    #[test]
    fn test_expand_home_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x/roll.json"), home.join("x/roll.json"));
        }
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = BackendConfig::AppsScript {
            web_app_url: "not a url".to_string(),
        };
        assert!(matches!(from_config(&config), Err(RollError::Configuration(_))));
    }
}
