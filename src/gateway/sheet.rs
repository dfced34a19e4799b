//! In-memory two-sheet workbook with the roll spreadsheet's row semantics.
//!
//! Columns are mapped by header text, never by position, so a sheet with
//! extra or reordered columns still reads correctly. Row 1 holds the
//! headers; the first record is row 2.

use serde::{Deserialize, Serialize};

use crate::error::{GatewayOp, RollError};
use crate::types::{DeleteReason, Member, MemberField};

pub const DATA_SHEET: &str = "Data";
pub const DELETED_SHEET: &str = "Deleted";
/// Extra column on the removed log.
pub const REASON_HEADER: &str = "हटाने का कारण";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn with_headers<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == header)
    }

    /// Read one row into a record. Cells past the end of a short row are empty.
    fn record(&self, row: &[String]) -> Member {
        let mut member = Member::default();
        for (idx, header) in self.headers.iter().enumerate() {
            if let Some(field) = MemberField::from_sheet_header(header) {
                member.set_field(field, row.get(idx).cloned().unwrap_or_default());
            }
        }
        member
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// One row of the removed log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedEntry {
    pub member: Member,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub data: Sheet,
    /// Created on the first delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Sheet>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self {
            data: Sheet::with_headers(MemberField::ALL.iter().map(|f| f.sheet_header())),
            deleted: None,
        }
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record on the `Data` sheet, with its row number.
    pub fn records(&self) -> Vec<Member> {
        self.data
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let mut member = self.data.record(row);
                member.row_id = Some(idx as u32 + 2);
                member
            })
            .collect()
    }

    /// Overwrite the first row with the same code, or append.
    ///
    /// Every column is rewritten from the record; columns the record has no
    /// field for are blanked.
    pub fn upsert(&mut self, member: &Member) -> Result<UpsertOutcome, RollError> {
        let photo = MemberField::AadhaarImage.sheet_header();
        if self.data.column(photo).is_none() {
            log::info!("Adding missing '{}' column to {} sheet", photo, DATA_SHEET);
            self.data.headers.push(photo.to_string());
        }
        let svn_col = self.svn_column()?;

        let row: Vec<String> = self
            .data
            .headers
            .iter()
            .map(|header| {
                MemberField::from_sheet_header(header)
                    .map(|field| member.field(field).to_string())
                    .unwrap_or_default()
            })
            .collect();

        let existing = self
            .data
            .rows
            .iter()
            .position(|r| r.get(svn_col).map(String::as_str).unwrap_or("") == member.svn);
        match existing {
            Some(idx) => {
                self.data.rows[idx] = row;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                self.data.rows.push(row);
                Ok(UpsertOutcome::Created)
            }
        }
    }

    /// Move the row with `svn` to the removed log, reason in the last cell.
    pub fn soft_delete(&mut self, svn: &str, reason: DeleteReason) -> Result<Member, RollError> {
        if self.deleted.is_none() {
            let mut headers = self.data.headers.clone();
            headers.push(REASON_HEADER.to_string());
            log::info!("Creating {} sheet", DELETED_SHEET);
            self.deleted = Some(Sheet::with_headers(headers));
        }

        let svn_col = self.svn_column()?;
        let idx = self
            .data
            .rows
            .iter()
            .position(|r| r.get(svn_col).map(String::as_str).unwrap_or("") == svn)
            .ok_or_else(|| RollError::NotFound(svn.to_string()))?;

        let mut row = self.data.rows.remove(idx);
        let removed = self.data.record(&row);
        row.resize(self.data.headers.len(), String::new());
        row.push(reason.as_str().to_string());
        if let Some(deleted) = self.deleted.as_mut() {
            deleted.rows.push(row);
        }
        Ok(removed)
    }

    /// Rows of the removed log, oldest first.
    pub fn removed_log(&self) -> Vec<RemovedEntry> {
        let Some(deleted) = &self.deleted else {
            return Vec::new();
        };
        deleted
            .rows
            .iter()
            .map(|row| RemovedEntry {
                member: deleted.record(row),
                reason: row.last().cloned().unwrap_or_default(),
            })
            .collect()
    }

    fn svn_column(&self) -> Result<usize, RollError> {
        let header = MemberField::Svn.sheet_header();
        self.data.column(header).ok_or_else(|| {
            let message = format!("{} sheet has no '{}' column", DATA_SHEET, header);
            RollError::backend(GatewayOp::Save, Some(&message))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(svn: &str, name: &str) -> Member {
        Member {
            booth_no: "1".to_string(),
            ward_no: "2".to_string(),
            house_no: "3".to_string(),
            svn: svn.to_string(),
            voter_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_records_number_rows_from_two() {
        let mut book = Workbook::new();
        book.upsert(&member("SUR1", "Ram")).unwrap();
        book.upsert(&member("SUR2", "Sita")).unwrap();
        let records = book.records();
        assert_eq!(records[0].row_id, Some(2));
        assert_eq!(records[1].row_id, Some(3));
        assert_eq!(records[1].voter_name, "Sita");
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut book = Workbook::new();
        let mut m = member("SUR1", "Ram");
        m.aadhaar = "123456789012".to_string();
        assert_eq!(book.upsert(&m).unwrap(), UpsertOutcome::Created);
        assert_eq!(book.upsert(&m).unwrap(), UpsertOutcome::Updated);

        let records = book.records();
        assert_eq!(records.len(), 1);
        let mut read = records[0].clone();
        read.row_id = None;
        assert_eq!(read, m);
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let mut book = Workbook::new();
        book.upsert(&member("SUR1", "Ram")).unwrap();
        book.upsert(&member("SUR2", "Sita")).unwrap();
        book.upsert(&member("SUR1", "Ram Prasad")).unwrap();
        let records = book.records();
        assert_eq!(records[0].voter_name, "Ram Prasad");
        assert_eq!(records[0].row_id, Some(2));
    }

    #[test]
    fn test_header_mapping_and_missing_photo_column() {
        let headers = ["SVN", "निर्वाचक का नाम", "Notes", "लिंग"];
        let mut book = Workbook {
            data: Sheet {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows: vec![vec!["SUR5".to_string(), "Gita".to_string()]],
            },
            deleted: None,
        };
        let read = book.records();
        assert_eq!(read[0].svn, "SUR5");
        assert_eq!(read[0].voter_name, "Gita");
        assert_eq!(read[0].booth_no, "");

        let mut m = member("SUR5", "Gita");
        m.aadhaar_image = Some("data:image/jpeg;base64,AAAA".to_string());
        book.upsert(&m).unwrap();
        assert_eq!(book.data.headers.last().unwrap(), "आधार कार्ड फोटो");
        // Columns with no field are blanked.
        assert_eq!(book.data.rows[0][2], "");
        assert_eq!(
            book.records()[0].aadhaar_image.as_deref(),
            Some("data:image/jpeg;base64,AAAA")
        );
    }

    #[test]
    fn test_rewrite_keeps_unrecognized_gender_cell() {
        let headers = ["SVN", "निर्वाचक का नाम", "लिंग"];
        let mut book = Workbook {
            data: Sheet {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows: vec![vec![
                    "SUR7".to_string(),
                    "Meena".to_string(),
                    "महिला".to_string(),
                ]],
            },
            deleted: None,
        };
        let mut read = book.records().remove(0);
        read.voter_name = "Meena Devi".to_string();
        book.upsert(&read).unwrap();

        assert_eq!(book.data.rows[0][1], "Meena Devi");
        assert_eq!(book.data.rows[0][2], "महिला");
    }

    #[test]
    fn test_soft_delete_moves_row_with_reason() {
        let mut book = Workbook::new();
        book.upsert(&member("SUR1", "Ram")).unwrap();
        book.upsert(&member("SUR2", "Sita")).unwrap();

        let removed = book.soft_delete("SUR1", DeleteReason::Migration).unwrap();
        assert_eq!(removed.voter_name, "Ram");
        assert!(book.records().iter().all(|m| m.svn != "SUR1"));
        assert_eq!(book.records()[0].row_id, Some(2));

        let deleted = book.deleted.as_ref().unwrap();
        assert_eq!(deleted.headers.last().unwrap(), REASON_HEADER);
        let log = book.removed_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].member.svn, "SUR1");
        assert_eq!(log[0].reason, "पलायन");
    }

    #[test]
    fn test_soft_delete_unknown_code() {
        let mut book = Workbook::new();
        book.upsert(&member("SUR1", "Ram")).unwrap();
        assert!(matches!(
            book.soft_delete("SUR404", DeleteReason::Marriage),
            Err(RollError::NotFound(code)) if code == "SUR404"
        ));
        assert_eq!(book.records().len(), 1);
    }

    #[test]
    fn test_missing_svn_column() {
        let mut book = Workbook {
            data: Sheet::with_headers(["निर्वाचक का नाम"]),
            deleted: None,
        };
        assert!(book.upsert(&member("SUR1", "Ram")).is_err());
    }

    #[test]
    fn test_workbook_json_shape() {
        let book = Workbook::new();
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["data"]["headers"][4], "SVN");
        assert!(json.get("deleted").is_none());
        let back: Workbook = serde_json::from_value(json).unwrap();
        assert_eq!(back, book);
    }
}
