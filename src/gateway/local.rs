//! File-backed roll for offline work.
//!
//! The workbook lives in one JSON file. Each write is applied to a copy,
//! persisted atomically, and only then swapped in, so a failed write leaves
//! both the file and the in-memory workbook unchanged.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::sheet::{RemovedEntry, Workbook};
use super::RollGateway;
use crate::error::RollError;
use crate::types::{DeleteReason, Member};
use crate::util::atomic_write_str;

pub struct LocalSheetGateway {
    /// `None` keeps the workbook in memory only.
    path: Option<PathBuf>,
    book: Mutex<Workbook>,
}

impl LocalSheetGateway {
    /// Open the workbook at `path`. A missing file starts an empty roll; the
    /// file is created by the first write.
    pub fn open(path: PathBuf) -> Result<Self, RollError> {
        let book = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                RollError::Configuration(format!("{} is not a roll workbook: {}", path.display(), e))
            })?
        } else {
            log::info!("No roll at {}, starting empty", path.display());
            Workbook::new()
        };
        Ok(Self {
            path: Some(path),
            book: Mutex::new(book),
        })
    }

    pub fn in_memory(book: Workbook) -> Self {
        Self {
            path: None,
            book: Mutex::new(book),
        }
    }

    pub async fn removed_log(&self) -> Vec<RemovedEntry> {
        self.book.lock().await.removed_log()
    }

    /// Write `book` to disk off the async runtime.
    async fn persist(&self, book: &Workbook) -> Result<(), RollError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(book)
            .map_err(|e| RollError::Io(format!("Failed to serialize roll: {}", e)))?;
        tokio::task::spawn_blocking(move || atomic_write_str(&path, &content))
            .await
            .map_err(|e| RollError::Io(format!("Roll write task failed: {}", e)))??;
        Ok(())
    }
}

#[async_trait]
impl RollGateway for LocalSheetGateway {
    async fn fetch_all(&self) -> Result<Vec<Member>, RollError> {
        Ok(self.book.lock().await.records())
    }

    async fn upsert(&self, member: &Member) -> Result<(), RollError> {
        let mut book = self.book.lock().await;
        let mut next = book.clone();
        let outcome = next.upsert(member)?;
        self.persist(&next).await?;
        *book = next;
        log::debug!("Local roll: {} {:?}", member.svn, outcome);
        Ok(())
    }

    async fn soft_delete(&self, svn: &str, reason: DeleteReason) -> Result<(), RollError> {
        let mut book = self.book.lock().await;
        let mut next = book.clone();
        next.soft_delete(svn, reason)?;
        self.persist(&next).await?;
        *book = next;
        log::debug!("Local roll: {} removed ({})", svn, reason);
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("local roll at {}", path.display()),
            None => "in-memory roll".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(svn: &str, name: &str) -> Member {
        Member {
            svn: svn.to_string(),
            voter_name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("roll.json");

        let gateway = LocalSheetGateway::open(path.clone()).unwrap();
        assert!(gateway.fetch_all().await.unwrap().is_empty());
        assert!(!path.exists());

        gateway.upsert(&member("SUR1", "Ram")).await.unwrap();
        gateway.upsert(&member("SUR2", "Sita")).await.unwrap();
        gateway.soft_delete("SUR1", DeleteReason::Death).await.unwrap();

        let reopened = LocalSheetGateway::open(path).unwrap();
        let records = reopened.fetch_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].svn, "SUR2");
        let log = reopened.removed_log().await;
        assert_eq!(log[0].reason, "मृत्यु");
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_roll_untouched() {
        let gateway = LocalSheetGateway::in_memory(Workbook::new());
        gateway.upsert(&member("SUR1", "Ram")).await.unwrap();
        let err = gateway.soft_delete("SUR2", DeleteReason::Duplicate).await.unwrap_err();
        assert!(matches!(err, RollError::NotFound(_)));
        assert_eq!(gateway.fetch_all().await.unwrap().len(), 1);
        // The removed log is only created by a committed delete.
        assert!(gateway.removed_log().await.is_empty());
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("roll.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            LocalSheetGateway::open(path),
            Err(RollError::Configuration(_))
        ));
    }
}
