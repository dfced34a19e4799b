//! Reading the Aadhaar number and date of birth off a card photo.
//!
//! The reading itself is done by an external endpoint. It may answer with
//! the two fields directly or with raw recognised text, in which case the
//! fields are pulled out here. A failed or empty read never blocks manual
//! entry.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::age::normalize_dob;
use crate::editor::AADHAAR_DIGITS;
use crate::error::RollError;
use crate::types::ExtractionConfig;

/// Fields read off the card. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub aadhaar: Option<String>,
    /// Always `YYYY-MM-DD`.
    pub dob: Option<String>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.aadhaar.is_none() && self.dob.is_none()
    }
}

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Read fields from a `data:` URL photo.
    async fn extract(&self, photo_data_url: &str) -> Result<ExtractedFields, RollError>;
}

/// Response body of the extraction endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
struct ExtractionResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    aadhaar: Option<String>,
    #[serde(default)]
    dob: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP extraction endpoint. Posts `{ "image": <data url> }`.
pub struct HttpFieldExtractor {
    client: reqwest::Client,
    endpoint: url::Url,
    api_key: Option<String>,
}

impl HttpFieldExtractor {
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self, RollError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| RollError::Configuration(format!("extraction endpoint: {}", e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: api_key.map(str::to_string),
        })
    }

    /// Build from config; `None` when extraction is switched off.
    pub fn from_config(config: &ExtractionConfig) -> Result<Option<Self>, RollError> {
        if !config.enabled {
            return Ok(None);
        }
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                RollError::Configuration("extraction is enabled but no endpoint is set".to_string())
            })?;
        Self::new(endpoint, config.api_key.as_deref()).map(Some)
    }
}

#[async_trait]
impl FieldExtractor for HttpFieldExtractor {
    async fn extract(&self, photo_data_url: &str) -> Result<ExtractedFields, RollError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "image": photo_data_url }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| RollError::ExtractionFailed(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RollError::ExtractionFailed(format!(
                "endpoint error {}: {}",
                status, text
            )));
        }

        let body: ExtractionResponse = resp
            .json()
            .await
            .map_err(|e| RollError::ExtractionFailed(format!("unreadable response: {}", e)))?;

        interpret_response(body)
    }
}

fn interpret_response(body: ExtractionResponse) -> Result<ExtractedFields, RollError> {
    if body.success == Some(false) {
        return Err(RollError::ExtractionFailed(
            body.error.unwrap_or_else(|| "endpoint reported failure".to_string()),
        ));
    }

    let from_text = body.text.as_deref().map(parse_card_text).unwrap_or_default();
    let fields = ExtractedFields {
        aadhaar: body
            .aadhaar
            .as_deref()
            .and_then(normalize_aadhaar)
            .or(from_text.aadhaar),
        dob: body.dob.as_deref().and_then(normalize_dob).or(from_text.dob),
    };

    if fields.is_empty() {
        return Err(RollError::ExtractionFailed(
            "no Aadhaar number or date of birth found".to_string(),
        ));
    }
    Ok(fields)
}

/// Pull the Aadhaar number and date of birth out of recognised card text.
pub fn parse_card_text(text: &str) -> ExtractedFields {
    static AADHAAR_RE: OnceLock<Regex> = OnceLock::new();
    static DATE_RE: OnceLock<Regex> = OnceLock::new();

    // Runs of digits joined by single spaces or hyphens.
    let aadhaar_re = AADHAAR_RE.get_or_init(|| {
        Regex::new(r"[0-9]+(?:[ \-][0-9]+)*").expect("aadhaar regex")
    });
    let date_re = DATE_RE.get_or_init(|| {
        Regex::new(r"\b([0-9]{2}[/\-][0-9]{2}[/\-][0-9]{4}|[0-9]{4}-[0-9]{2}-[0-9]{2})\b")
            .expect("date regex")
    });

    let dob = date_re
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .find_map(|m| normalize_dob(m.as_str()));
    // Dates are cut out first so their year never joins the number.
    let without_dates = date_re.replace_all(text, "\n");
    let aadhaar = aadhaar_re
        .find_iter(&without_dates)
        .find_map(|m| aadhaar_in_run(m.as_str()));

    ExtractedFields { aadhaar, dob }
}

/// The Aadhaar number inside one digit run: a 12-digit group, or exactly
/// three 4-digit groups. A fourth 4-digit group on either side makes it a
/// 16-digit VID, which is skipped.
fn aadhaar_in_run(run: &str) -> Option<String> {
    let groups: Vec<&str> = run.split([' ', '-']).collect();
    if let Some(whole) = groups.iter().find(|g| g.len() == AADHAAR_DIGITS) {
        return Some(whole.to_string());
    }
    let quad = |i: usize| groups.get(i).is_some_and(|g| g.len() == 4);
    (0..groups.len().saturating_sub(2))
        .find(|&i| {
            quad(i) && quad(i + 1) && quad(i + 2) && !quad(i + 3) && !(i > 0 && quad(i - 1))
        })
        .map(|i| groups[i..i + 3].concat())
}

fn normalize_aadhaar(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == AADHAAR_DIGITS).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_card_text_spaced_number_and_date() {
        let text = "भारत सरकार\nGovernment of India\nRam Kumar\nजन्म तिथि/DOB: 15/08/1975\nपुरुष/ MALE\n1234 5678 9012\nआधार - आम आदमी का अधिकार";
        let fields = parse_card_text(text);
        assert_eq!(fields.aadhaar.as_deref(), Some("123456789012"));
        assert_eq!(fields.dob.as_deref(), Some("1975-08-15"));
    }

    #[test]
    fn test_parse_card_text_ignores_longer_digit_runs() {
        let fields = parse_card_text("VID: 9123 4567 8901 2345\nEnrolment 1234567890123456");
        assert_eq!(fields.aadhaar, None);
    }

    #[test]
    fn test_parse_card_text_number_next_to_date() {
        let fields = parse_card_text("DOB: 15-08-1975 1234 5678 9012");
        assert_eq!(fields.aadhaar.as_deref(), Some("123456789012"));
        assert_eq!(fields.dob.as_deref(), Some("1975-08-15"));
    }

    #[test]
    fn test_parse_card_text_number_with_trailing_digits() {
        let fields = parse_card_text("1234 5678 9012 01");
        assert_eq!(fields.aadhaar.as_deref(), Some("123456789012"));
        let fields = parse_card_text("No. 123456789012");
        assert_eq!(fields.aadhaar.as_deref(), Some("123456789012"));
    }

    #[test]
    fn test_parse_card_text_nothing_found() {
        let fields = parse_card_text("blurry photo");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_interpret_prefers_direct_fields() {
        let body = ExtractionResponse {
            success: Some(true),
            aadhaar: Some("1111 2222 3333".to_string()),
            dob: Some("01/01/2000".to_string()),
            text: Some("4444 5555 6666 02/02/1990".to_string()),
            error: None,
        };
        let fields = interpret_response(body).unwrap();
        assert_eq!(fields.aadhaar.as_deref(), Some("111122223333"));
        assert_eq!(fields.dob.as_deref(), Some("2000-01-01"));
    }

    #[test]
    fn test_interpret_falls_back_to_text() {
        let body = ExtractionResponse {
            aadhaar: Some("12".to_string()),
            text: Some("DOB 1990-02-02 no number".to_string()),
            ..Default::default()
        };
        let fields = interpret_response(body).unwrap();
        assert_eq!(fields.aadhaar, None);
        assert_eq!(fields.dob.as_deref(), Some("1990-02-02"));
    }

    #[test]
    fn test_interpret_failure_and_empty() {
        let failed = ExtractionResponse {
            success: Some(false),
            error: Some("quota".to_string()),
            ..Default::default()
        };
        assert!(matches!(interpret_response(failed), Err(RollError::ExtractionFailed(m)) if m == "quota"));
        assert!(interpret_response(ExtractionResponse::default()).is_err());
    }

    #[test]
    fn test_from_config_disabled_and_missing_endpoint() {
        assert!(HttpFieldExtractor::from_config(&ExtractionConfig::default())
            .unwrap()
            .is_none());
        let enabled = ExtractionConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(matches!(
            HttpFieldExtractor::from_config(&enabled),
            Err(RollError::Configuration(_))
        ));
    }
}
