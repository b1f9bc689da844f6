//! Low-level client for the appliance's query-parameter web API
//!
//! Every operation is a GET against a CGI path under `/webapi` with the API
//! name, version and method passed as query parameters. The appliance always
//! answers with a JSON envelope carrying a `success` flag and either a
//! `data` or an `error` member. The client parses the envelope and nothing
//! else; interpreting the payload is the caller's job.

use serde::Deserialize;
use std::time::Duration;

use crate::error::Result;

/// One appliance API operation
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// CGI path relative to `/webapi`, e.g. "query.cgi" or "entry.cgi"
    pub cgi_path: String,
    /// API name, e.g. "SYNO.FileStation.DirSize"
    pub api: String,
    pub version: u32,
    pub method: String,
    /// Additional query parameters; values must already be in the
    /// appliance's expected textual form (JSON-encoded where required)
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(cgi_path: &str, api: &str, version: u32, method: &str) -> Self {
        ApiRequest {
            cgi_path: cgi_path.to_string(),
            api: api.to_string(),
            version,
            method: method.to_string(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }
}

/// Application-level error payload from the appliance
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
}

/// The appliance's response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl ApiResponse {
    /// The appliance error code, when the call failed application-side.
    pub fn error_code(&self) -> i64 {
        self.error.as_ref().map(|e| e.code).unwrap_or(-1)
    }
}

/// HTTP transport to one appliance
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the appliance at `base_url` with fixed
    /// connect/response timeouts.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Perform one API call and parse the response envelope.
    ///
    /// Network failures, non-2xx statuses and unparseable bodies surface as
    /// transport errors; a `success:false` envelope is a normal return.
    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}/webapi/{}", self.base_url, request.cgi_path);
        let version = request.version.to_string();

        let mut query: Vec<(&str, &str)> = vec![
            ("api", request.api.as_str()),
            ("version", version.as_str()),
            ("method", request.method.as_str()),
        ];
        for (key, value) in &request.params {
            query.push((key.as_str(), value.as_str()));
        }

        tracing::debug!(
            api = %request.api,
            method = %request.method,
            "Calling appliance API"
        );

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let envelope: ApiResponse = response.json().await?;
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_collects_params() {
        let request = ApiRequest::new("entry.cgi", "SYNO.FileStation.DirSize", 2, "start")
            .param("path", r#"["/volume1/backups"]"#)
            .param("_sid", "abc123");

        assert_eq!(request.cgi_path, "entry.cgi");
        assert_eq!(request.version, 2);
        assert_eq!(
            request.params,
            vec![
                ("path".to_string(), r#"["/volume1/backups"]"#.to_string()),
                ("_sid".to_string(), "abc123".to_string()),
            ]
        );
    }

    #[test]
    fn test_envelope_with_error_payload() {
        let envelope: ApiResponse =
            serde_json::from_str(r#"{"success":false,"error":{"code":400}}"#).expect("parse");
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error_code(), 400);
    }

    #[test]
    fn test_envelope_with_data_payload() {
        let envelope: ApiResponse =
            serde_json::from_str(r#"{"success":true,"data":{"sid":"token"}}"#).expect("parse");
        assert!(envelope.success);
        assert_eq!(envelope.error_code(), -1);
        let data = envelope.data.expect("data present");
        assert_eq!(data["sid"], "token");
    }

    #[test]
    fn test_envelope_tolerates_missing_members() {
        let envelope: ApiResponse = serde_json::from_str(r#"{"success":true}"#).expect("parse");
        assert!(envelope.success);
        assert!(envelope.data.is_none());
        assert!(envelope.error.is_none());
    }
}
