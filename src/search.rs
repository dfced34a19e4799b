//! Location drill-down options and result sets.
//!
//! Everything here is a pure function of the cached roll and the search
//! state, recomputed on every call.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use unicode_normalization::UnicodeNormalization;

use crate::types::{LocationFilter, Member, SearchMode, SearchState};

/// Distinct booth numbers, numeric ascending.
pub fn booth_options(members: &[Member]) -> Vec<String> {
    let mut out = distinct(members.iter().map(|m| m.booth_no.as_str()));
    out.sort_by(|a, b| numeric_cmp(a, b));
    out
}

/// Distinct wards within the selected booth; empty until a booth is chosen.
pub fn ward_options(members: &[Member], filters: &LocationFilter) -> Vec<String> {
    if filters.booth.is_empty() {
        return Vec::new();
    }
    let mut out = distinct(
        members
            .iter()
            .filter(|m| m.booth_no == filters.booth)
            .map(|m| m.ward_no.as_str()),
    );
    out.sort_by(|a, b| numeric_cmp(a, b));
    out
}

/// Distinct houses within the selected booth and ward, natural order.
pub fn house_options(members: &[Member], filters: &LocationFilter) -> Vec<String> {
    if filters.booth.is_empty() || filters.ward.is_empty() {
        return Vec::new();
    }
    let mut out = distinct(
        members
            .iter()
            .filter(|m| m.booth_no == filters.booth && m.ward_no == filters.ward)
            .map(|m| m.house_no.as_str()),
    );
    out.sort_by(|a, b| natural_cmp(a, b));
    out
}

/// Records matching the current search state, in roll order.
pub fn filter_members<'a>(members: &'a [Member], search: &SearchState) -> Vec<&'a Member> {
    match search.mode {
        SearchMode::Selection => {
            let f = &search.filters;
            if !f.is_complete() {
                return Vec::new();
            }
            members
                .iter()
                .filter(|m| m.booth_no == f.booth && m.ward_no == f.ward && m.house_no == f.house)
                .collect()
        }
        SearchMode::Name => {
            let q = fold_name(search.query.trim());
            if q.is_empty() {
                return Vec::new();
            }
            members
                .iter()
                .filter(|m| fold_name(&m.voter_name).contains(&q) || fold_name(&m.relative_name).contains(&q))
                .collect()
        }
        SearchMode::Svn => {
            let q = search.query.trim().to_uppercase();
            if q.is_empty() {
                return Vec::new();
            }
            members
                .iter()
                .filter(|m| m.svn.to_uppercase().contains(&q))
                .collect()
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Case-folded NFC form so composed and decomposed Devanagari compare equal.
fn fold_name(value: &str) -> String {
    value.nfc().collect::<String>().to_lowercase()
}

/// Numeric order for values that parse, after which everything else sorts
/// lexically.
pub fn numeric_cmp(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Compare with embedded digit runs treated as numbers: "2" < "10" < "10A".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lnum = take_digits(&mut left);
                let rnum = take_digits(&mut right);
                let ord = cmp_digit_runs(&lnum, &rnum);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
