//! Client for the roll's Apps Script web app.
//!
//! POST bodies are sent as `text/plain` JSON; the script reads the raw body
//! and a plain-text request avoids a CORS preflight when the same script
//! also serves a browser client.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use super::RollGateway;
use crate::error::{GatewayOp, RollError};
use crate::types::{DeleteReason, GasResponse, Member};

pub struct AppsScriptGateway {
    client: reqwest::Client,
    url: url::Url,
}

#[derive(Serialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
enum WriteRequest<'a> {
    SaveMember(&'a Member),
    DeleteMember { svn: &'a str, reason: DeleteReason },
}

impl WriteRequest<'_> {
    fn op(&self) -> GatewayOp {
        match self {
            WriteRequest::SaveMember(_) => GatewayOp::Save,
            WriteRequest::DeleteMember { .. } => GatewayOp::Delete,
        }
    }
}

impl AppsScriptGateway {
    pub fn new(web_app_url: &str) -> Result<Self, RollError> {
        let url = parse_web_app_url(web_app_url)?;
        // No request timeout: a slow script run is waited out.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RollError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self { client, url })
    }

    fn fetch_url(&self) -> url::Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("action", "getData");
        url
    }

    async fn post(&self, request: &WriteRequest<'_>) -> Result<(), RollError> {
        let op = request.op();
        let body = serde_json::to_string(request).map_err(|e| RollError::transport(op, e))?;
        let started = Instant::now();

        let resp = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                log::warn!("Apps Script {:?} request failed: {}", op, e);
                RollError::transport(op, e)
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| RollError::transport(op, e))?;
        log::debug!(
            "Apps Script {:?} answered {} in {}ms",
            op,
            status,
            started.elapsed().as_millis()
        );
        interpret_write(op, status, &text)
    }
}

#[async_trait]
impl RollGateway for AppsScriptGateway {
    async fn fetch_all(&self) -> Result<Vec<Member>, RollError> {
        let started = Instant::now();
        let resp = self.client.get(self.fetch_url()).send().await.map_err(|e| {
            log::warn!("Apps Script fetch failed: {}", e);
            RollError::transport(GatewayOp::Fetch, e)
        })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RollError::transport(GatewayOp::Fetch, e))?;
        let members = interpret_fetch(status, &text)?;
        log::debug!(
            "Fetched {} records in {}ms",
            members.len(),
            started.elapsed().as_millis()
        );
        Ok(members)
    }

    async fn upsert(&self, member: &Member) -> Result<(), RollError> {
        self.post(&WriteRequest::SaveMember(member)).await
    }

    async fn soft_delete(&self, svn: &str, reason: DeleteReason) -> Result<(), RollError> {
        self.post(&WriteRequest::DeleteMember { svn, reason }).await
    }

    fn describe(&self) -> String {
        format!("Apps Script at {}", self.url.host_str().unwrap_or("?"))
    }
}

/// Only http(s) URLs are accepted.
pub fn parse_web_app_url(raw: &str) -> Result<url::Url, RollError> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| RollError::Configuration(format!("web app URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RollError::Configuration(format!(
            "web app URL must be http or https, got {}",
            other
        ))),
    }
}

/// A fetch needs a 2xx status and a JSON envelope.
fn interpret_fetch(status: StatusCode, body: &str) -> Result<Vec<Member>, RollError> {
    if !status.is_success() {
        return Err(RollError::transport(
            GatewayOp::Fetch,
            format!("HTTP {}", status),
        ));
    }
    let envelope: GasResponse<Vec<Member>> = serde_json::from_str(body)
        .map_err(|e| RollError::transport(GatewayOp::Fetch, format!("invalid JSON: {}", e)))?;
    if !envelope.success {
        return Err(RollError::backend(GatewayOp::Fetch, envelope.reason()));
    }
    Ok(envelope.data.unwrap_or_default())
}

/// Writes are lenient: a body that is not JSON still counts as success
/// when the status was 2xx, since the script host can answer a completed
/// run with an HTML page.
fn interpret_write(op: GatewayOp, status: StatusCode, body: &str) -> Result<(), RollError> {
    match serde_json::from_str::<GasResponse<serde_json::Value>>(body) {
        Ok(envelope) if envelope.success => Ok(()),
        Ok(envelope) => Err(RollError::backend(op, envelope.reason())),
        Err(_) if status.is_success() => {
            log::warn!("Apps Script {:?} returned non-JSON with {}; treating as success", op, status);
            Ok(())
        }
        Err(e) => {
            log::warn!("Apps Script {:?} returned {} with unreadable body: {}", op, status, e);
            Err(RollError::backend(op, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;

    #[test]
    fn test_fetch_url_carries_action() {
        let gateway = AppsScriptGateway::new("https://script.google.com/macros/s/abc/exec").unwrap();
        assert_eq!(
            gateway.fetch_url().as_str(),
            "https://script.google.com/macros/s/abc/exec?action=getData"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            parse_web_app_url("ftp://example.com/exec"),
            Err(RollError::Configuration(_))
        ));
        assert!(parse_web_app_url(" https://example.com/exec ").is_ok());
    }

    #[test]
    fn test_save_request_body() {
        let member = Member {
            svn: "SUR1".to_string(),
            booth_no: "12".to_string(),
            ..Default::default()
        };
        let json: serde_json::Value =
            serde_json::to_value(WriteRequest::SaveMember(&member)).unwrap();
        assert_eq!(json["action"], "saveMember");
        assert_eq!(json["data"]["svn"], "SUR1");
        assert_eq!(json["data"]["boothNo"], "12");
    }

    #[test]
    fn test_delete_request_body() {
        let json = serde_json::to_value(WriteRequest::DeleteMember {
            svn: "SUR9",
            reason: DeleteReason::Death,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"action": "deleteMember", "data": {"svn": "SUR9", "reason": "मृत्यु"}})
        );
    }

    #[test]
    fn test_interpret_fetch_reads_numeric_cells() {
        let body = r#"{"success":true,"data":[{"rowId":2,"boothNo":12,"svn":"SUR1","voterName":"Ram","gender":"पु"}]}"#;
        let members = interpret_fetch(StatusCode::OK, body).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].booth_no, "12");
        assert_eq!(members[0].gender, Gender::Male);
        assert_eq!(members[0].row_id, Some(2));
        assert_eq!(members[0].aadhaar, "");
    }

    #[test]
    fn test_interpret_fetch_failures() {
        let backend = interpret_fetch(
            StatusCode::OK,
            r#"{"success":false,"error":"Sheet 'Data' not found"}"#,
        )
        .unwrap_err();
        assert_eq!(backend.user_message(), "Sheet 'Data' not found");

        let transport = interpret_fetch(StatusCode::BAD_GATEWAY, "").unwrap_err();
        assert_eq!(transport.user_message(), "डाटा लोड करने में विफल");

        let html = interpret_fetch(StatusCode::OK, "<html></html>").unwrap_err();
        assert!(matches!(html, RollError::Transport { .. }));

        let empty = interpret_fetch(StatusCode::OK, r#"{"success":true}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_interpret_write_lenient_on_ok_status() {
        assert!(interpret_write(GatewayOp::Save, StatusCode::OK, "<html>moved</html>").is_ok());
        assert!(interpret_write(GatewayOp::Save, StatusCode::OK, r#"{"success":true}"#).is_ok());

        let err = interpret_write(GatewayOp::Save, StatusCode::INTERNAL_SERVER_ERROR, "oops").unwrap_err();
        assert_eq!(err.user_message(), "डाटा सुरक्षित करने में त्रुटि");
    }

    #[test]
    fn test_interpret_write_reports_backend_reason() {
        let err = interpret_write(
            GatewayOp::Delete,
            StatusCode::OK,
            r#"{"success":false,"error":"Member not found"}"#,
        )
        .unwrap_err();
        assert_eq!(err.user_message(), "Member not found");

        let silent = interpret_write(GatewayOp::Delete, StatusCode::OK, r#"{"success":false}"#).unwrap_err();
        assert_eq!(silent.user_message(), "हटाने में त्रुटि");
    }
}
