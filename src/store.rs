//! Client-side copy of the roll.
//!
//! Replaced wholesale on every fetch; never patched locally. The code index
//! keeps per-record lookups constant time so selection and the duplicate
//! guard stay cheap on rolls of a few thousand rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::Member;

#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    members: Vec<Member>,
    by_code: HashMap<String, usize>,
    loaded_at: Option<DateTime<Utc>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached roll with a fresh snapshot.
    ///
    /// If the snapshot carries the same code twice, the first row wins the
    /// index (the backend matches the first row on upsert too).
    pub fn replace(&mut self, members: Vec<Member>) {
        let mut by_code = HashMap::with_capacity(members.len());
        for (idx, member) in members.iter().enumerate() {
            if by_code.contains_key(&member.svn) {
                log::warn!("Roll snapshot has duplicate SVN {}", member.svn);
                continue;
            }
            by_code.insert(member.svn.clone(), idx);
        }
        self.members = members;
        self.by_code = by_code;
        self.loaded_at = Some(Utc::now());
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, svn: &str) -> Option<&Member> {
        self.by_code.get(svn).map(|&idx| &self.members[idx])
    }

    pub fn contains(&self, svn: &str) -> bool {
        self.by_code.contains_key(svn)
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}
