//! Age at a fixed reference date.

use chrono::{DateTime, Datelike, NaiveDate};

/// Date layouts seen in the roll: the HTML date input and sheet export use
/// ISO, the printed Aadhaar card uses day-first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Parse a date of birth. Accepts a full timestamp too (the sheet backend
/// sometimes hands back `2000-01-01T00:00:00.000Z`).
pub fn parse_dob(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    let date_part = raw.split('T').next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Whole years between `dob` and `reference`.
///
/// `None` for a missing or unparseable date, or one after the reference.
pub fn age_at(dob: &str, reference: NaiveDate) -> Option<u32> {
    let birth = parse_dob(dob)?;
    if birth > reference {
        return None;
    }
    let mut years = reference.year() - birth.year();
    if (reference.month(), reference.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Age rendered for the `calculatedAge` column; empty when unknown.
pub fn calculated_age_text(dob: &str, reference: NaiveDate) -> String {
    age_at(dob, reference)
        .map(|a| a.to_string())
        .unwrap_or_default()
}

/// Normalize any accepted layout to `YYYY-MM-DD`.
pub fn normalize_dob(raw: &str) -> Option<String> {
    parse_dob(raw).map(|d| d.format("%Y-%m-%d").to_string())
}
