//! Duplicate-Aadhaar check run before every save.
//!
//! Advisory only: it scans the client's copy of the roll, which may be stale
//! relative to the sheet.

use serde::{Deserialize, Serialize};

use crate::store::RecordStore;
use crate::types::Member;

/// Another record already carrying the draft's Aadhaar number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateWarning {
    /// Aadhaar number in conflict.
    pub aadhaar: String,
    /// Record being saved.
    pub draft_svn: String,
    pub conflicting_svn: String,
    pub conflicting_name: String,
}

/// How the operator answered the warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Acknowledgement {
    /// Close the warning; the next save is checked again.
    Dismiss,
    /// Close the warning and let one successful save of this number through.
    SaveAnyway,
}

/// First record with a different code and the same non-empty Aadhaar.
pub fn find_duplicate<'a>(store: &'a RecordStore, draft: &Member) -> Option<&'a Member> {
    let aadhaar = draft.aadhaar.trim();
    if aadhaar.is_empty() {
        return None;
    }
    store
        .members()
        .iter()
        .find(|m| m.svn != draft.svn && m.aadhaar.trim() == aadhaar)
}

/// Guard state carried by the session between save attempts.
#[derive(Debug, Clone, Default)]
pub struct DuplicateGuard {
    pending: Option<DuplicateWarning>,
    /// (draft svn, aadhaar) the operator chose to save anyway.
    waiver: Option<(String, String)>,
}

/// Outcome of running the guard before a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Clear,
    /// Save must not proceed; a warning is (now) pending.
    Blocked(DuplicateWarning),
    /// An earlier warning is still waiting for acknowledgement.
    Unacknowledged,
}

impl DuplicateGuard {
    pub fn pending(&self) -> Option<&DuplicateWarning> {
        self.pending.as_ref()
    }

    /// Check `draft` against the roll. A matching waiver lets the draft
    /// through but stays in place until [`clear_waiver`](Self::clear_waiver).
    pub fn check(&mut self, store: &RecordStore, draft: &Member) -> GuardVerdict {
        if self.pending.is_some() {
            return GuardVerdict::Unacknowledged;
        }
        let Some(duplicate) = find_duplicate(store, draft) else {
            return GuardVerdict::Clear;
        };

        let key = (draft.svn.clone(), draft.aadhaar.trim().to_string());
        if self.waiver.as_ref() == Some(&key) {
            log::info!(
                "Saving {} with Aadhaar shared by {} (acknowledged)",
                draft.svn,
                duplicate.svn
            );
            return GuardVerdict::Clear;
        }

        let warning = DuplicateWarning {
            aadhaar: key.1,
            draft_svn: key.0,
            conflicting_svn: duplicate.svn.clone(),
            conflicting_name: duplicate.voter_name.clone(),
        };
        self.pending = Some(warning.clone());
        GuardVerdict::Blocked(warning)
    }

    /// Close the pending warning. Returns false if nothing was pending.
    pub fn acknowledge(&mut self, ack: Acknowledgement) -> bool {
        let Some(warning) = self.pending.take() else {
            return false;
        };
        self.waiver = match ack {
            Acknowledgement::Dismiss => None,
            Acknowledgement::SaveAnyway => Some((warning.draft_svn, warning.aadhaar)),
        };
        true
    }

    /// Spend the waiver once the save it covered has been written.
    pub fn clear_waiver(&mut self) {
        self.waiver = None;
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.waiver = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(svn: &str, name: &str, aadhaar: &str) -> Member {
        Member {
            svn: svn.to_string(),
            voter_name: name.to_string(),
            aadhaar: aadhaar.to_string(),
            ..Default::default()
        }
    }

    fn store() -> RecordStore {
        let mut store = RecordStore::new();
        store.replace(vec![
            member("SUR1", "Ram", "111122223333"),
            member("SUR2", "Sita", ""),
            member("SUR3", "Gita", "444455556666"),
        ]);
        store
    }

    #[test]
    fn test_find_duplicate_ignores_same_code_and_blank() {
        let store = store();
        assert!(find_duplicate(&store, &member("SUR1", "Ram", "111122223333")).is_none());
        assert!(find_duplicate(&store, &member("SUR2", "Sita", "")).is_none());
        let dup = find_duplicate(&store, &member("SUR2", "Sita", "111122223333")).unwrap();
        assert_eq!(dup.svn, "SUR1");
    }

    #[test]
    fn test_blocks_until_acknowledged() {
        let store = store();
        let mut guard = DuplicateGuard::default();
        let draft = member("SUR2", "Sita", "444455556666");

        match guard.check(&store, &draft) {
            GuardVerdict::Blocked(w) => {
                assert_eq!(w.conflicting_svn, "SUR3");
                assert_eq!(w.conflicting_name, "Gita");
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
        assert_eq!(guard.check(&store, &draft), GuardVerdict::Unacknowledged);

        assert!(guard.acknowledge(Acknowledgement::Dismiss));
        // Unchanged number warns again.
        assert!(matches!(guard.check(&store, &draft), GuardVerdict::Blocked(_)));
    }

    #[test]
    fn test_changed_number_passes_after_dismiss() {
        let store = store();
        let mut guard = DuplicateGuard::default();
        let mut draft = member("SUR2", "Sita", "444455556666");
        assert!(matches!(guard.check(&store, &draft), GuardVerdict::Blocked(_)));
        guard.acknowledge(Acknowledgement::Dismiss);

        draft.aadhaar = "999988887777".to_string();
        assert_eq!(guard.check(&store, &draft), GuardVerdict::Clear);
    }

    #[test]
    fn test_save_anyway_waives_until_cleared() {
        let store = store();
        let mut guard = DuplicateGuard::default();
        let draft = member("SUR2", "Sita", "444455556666");
        assert!(matches!(guard.check(&store, &draft), GuardVerdict::Blocked(_)));
        guard.acknowledge(Acknowledgement::SaveAnyway);

        assert_eq!(guard.check(&store, &draft), GuardVerdict::Clear);
        // Still waived until the write goes through.
        assert_eq!(guard.check(&store, &draft), GuardVerdict::Clear);
        guard.clear_waiver();
        assert!(matches!(guard.check(&store, &draft), GuardVerdict::Blocked(_)));
    }

    #[test]
    fn test_waiver_bound_to_number() {
        let store = store();
        let mut guard = DuplicateGuard::default();
        let mut draft = member("SUR2", "Sita", "444455556666");
        guard.check(&store, &draft);
        guard.acknowledge(Acknowledgement::SaveAnyway);

        draft.aadhaar = "111122223333".to_string();
        assert!(matches!(guard.check(&store, &draft), GuardVerdict::Blocked(_)));
    }

    #[test]
    fn test_acknowledge_without_pending() {
        let mut guard = DuplicateGuard::default();
        assert!(!guard.acknowledge(Acknowledgement::Dismiss));
    }
}
