//! The single "currently editing" slot.

use chrono::NaiveDate;
use serde::Serialize;

use crate::age::calculated_age_text;
use crate::types::{Member, MemberField};

/// Aadhaar numbers are 12 digits.
pub const AADHAAR_DIGITS: usize = 12;

/// Holds a detached copy of one record. Nothing here touches the roll; the
/// copy is only persisted by an explicit save.
#[derive(Debug, Clone)]
pub struct EditorDraft {
    reference_date: NaiveDate,
    draft: Option<Member>,
}

impl EditorDraft {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            draft: None,
        }
    }

    /// Load a copy of `member` and recompute its age.
    pub fn open(&mut self, member: &Member) -> &Member {
        let mut copy = member.clone();
        copy.calculated_age = calculated_age_text(&copy.dob, self.reference_date);
        self.draft.insert(copy)
    }

    pub fn close(&mut self) -> Option<Member> {
        self.draft.take()
    }

    pub fn draft(&self) -> Option<&Member> {
        self.draft.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    /// Apply one edit. Returns `None` when nothing is open.
    ///
    /// A date-of-birth edit recomputes the computed age in the same step.
    /// Aadhaar input keeps digits only, capped at 12.
    pub fn edit(&mut self, field: MemberField, value: &str) -> Option<&Member> {
        let reference = self.reference_date;
        let draft = self.draft.as_mut()?;
        let value = match field {
            MemberField::Aadhaar => sanitize_aadhaar(value),
            _ => value.to_string(),
        };
        draft.set_field(field, value);
        if field == MemberField::Dob {
            draft.calculated_age = calculated_age_text(&draft.dob, reference);
        }
        Some(&*draft)
    }
}

/// Strip everything but ASCII digits, truncated to the Aadhaar length.
pub fn sanitize_aadhaar(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(AADHAAR_DIGITS)
        .collect()
}

/// What the save button should say for the open draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveLabel {
    /// First time an Aadhaar number is being recorded.
    Save,
    /// The stored record already carries an Aadhaar number.
    Update,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> EditorDraft {
        EditorDraft::new(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
    }

    fn sample() -> Member {
        Member {
            svn: "SUR100".to_string(),
            voter_name: "Ram".to_string(),
            dob: "2000-01-01".to_string(),
            calculated_age: "stale".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_copies_and_recomputes_age() {
        let source = sample();
        let mut editor = editor();
        let draft = editor.open(&source);
        assert_eq!(draft.calculated_age, "26");
        // source untouched
        assert_eq!(source.calculated_age, "stale");
    }

    #[test]
    fn test_edit_touches_draft_only() {
        let source = sample();
        let mut editor = editor();
        editor.open(&source);
        editor.edit(MemberField::VoterName, "Ram Prasad");
        assert_eq!(editor.draft().unwrap().voter_name, "Ram Prasad");
        assert_eq!(source.voter_name, "Ram");
    }

    #[test]
    fn test_dob_edit_recomputes_age() {
        let mut editor = editor();
        editor.open(&sample());
        let draft = editor.edit(MemberField::Dob, "2000-01-02").unwrap();
        assert_eq!(draft.calculated_age, "25");
        let draft = editor.edit(MemberField::Dob, "").unwrap();
        assert_eq!(draft.calculated_age, "");
    }

    #[test]
    fn test_other_edits_leave_age_alone() {
        let mut editor = editor();
        editor.open(&sample());
        editor.edit(MemberField::CalculatedAge, "99");
        let draft = editor.edit(MemberField::RelativeName, "Shyam").unwrap();
        assert_eq!(draft.calculated_age, "99");
    }

    #[test]
    fn test_aadhaar_input_mask() {
        let mut editor = editor();
        editor.open(&sample());
        let draft = editor.edit(MemberField::Aadhaar, "1234 5678 9012 345").unwrap();
        assert_eq!(draft.aadhaar, "123456789012");
        assert_eq!(sanitize_aadhaar("ab-12"), "12");
    }

    #[test]
    fn test_edit_without_draft_is_noop() {
        let mut editor = editor();
        assert!(editor.edit(MemberField::VoterName, "x").is_none());
        assert!(!editor.is_open());
    }

    #[test]
    fn test_close_discards() {
        let mut editor = editor();
        editor.open(&sample());
        editor.edit(MemberField::VoterName, "changed");
        let discarded = editor.close().unwrap();
        assert_eq!(discarded.voter_name, "changed");
        assert!(!editor.is_open());
    }
}
