use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::{credentials::Credentials, errors::AppError};

pub const STATUS_OK: i64 = 20000;

/// Longest slice of a non-JSON error body carried into the error message.
const ERROR_BODY_LIMIT: usize = 200;

/// A failed upstream call. Reported to the client as a tool error result, never as
/// a protocol error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub message: String,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait SeoApi: Send + Sync {
    /// POSTs `body` to the API path using the caller's credentials and returns the
    /// decoded JSON response.
    async fn post(
        &self,
        credentials: &Credentials,
        path: &str,
        body: Value,
    ) -> Result<Value, UpstreamError>;
}

/// HTTP client for the DataForSEO v3 API.
///
/// The underlying connection pool is shared; credentials are supplied per call and
/// never stored on the client.
#[derive(Debug, Clone)]
pub struct DataForSeoClient {
    http: reqwest::Client,
    base_url: String,
}

impl DataForSeoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| AppError::internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SeoApi for DataForSeoClient {
    async fn post(
        &self,
        credentials: &Credentials,
        path: &str,
        body: Value,
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .json(&body)
            .send()
            .await
            .map_err(|err| UpstreamError::new(format!("request to {path} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejected(path, status, &body));
        }

        response
            .json()
            .await
            .map_err(|err| UpstreamError::new(format!("invalid response from {path}: {err}")))
    }
}

/// Describes a non-2xx reply. The API's own `status_message` is preferred; any other
/// body is quoted in truncated form.
fn rejected(path: &str, status: StatusCode, body: &str) -> UpstreamError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| {
            payload
                .get("status_message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "request rejected".to_string()
            } else {
                trimmed.chars().take(ERROR_BODY_LIMIT).collect()
            }
        });

    UpstreamError::new(format!("{path} returned HTTP {}: {detail}", status.as_u16()))
}

/// Extracts the first task's `result` from an API envelope.
///
/// Both the envelope and the task must report `status_code` 20000.
pub fn extract_task_result(payload: &Value) -> Result<Value, UpstreamError> {
    check_status(payload, "response")?;

    let task = payload
        .get("tasks")
        .and_then(Value::as_array)
        .and_then(|tasks| tasks.first())
        .ok_or_else(|| UpstreamError::new("response contained no tasks"))?;
    check_status(task, "task")?;

    Ok(task.get("result").cloned().unwrap_or(Value::Null))
}

fn check_status(value: &Value, scope: &str) -> Result<(), UpstreamError> {
    let code = value.get("status_code").and_then(Value::as_i64);
    if code == Some(STATUS_OK) {
        return Ok(());
    }

    let message = value
        .get("status_message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Err(UpstreamError::new(match code {
        Some(code) => format!("{scope} status {code}: {message}"),
        None => format!("{scope} status missing: {message}"),
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_first_task_result() {
        let payload = json!({
            "status_code": 20000,
            "status_message": "Ok.",
            "tasks": [{
                "status_code": 20000,
                "status_message": "Ok.",
                "result": [{"keyword": "espresso machine", "search_volume": 90500}]
            }]
        });

        let result = extract_task_result(&payload).expect("result");
        assert_eq!(result[0]["search_volume"], 90500);
    }

    #[test]
    fn rejects_failed_envelope() {
        let payload = json!({
            "status_code": 40100,
            "status_message": "You are not authorized to access this resource.",
            "tasks": []
        });

        let err = extract_task_result(&payload).expect_err("failed envelope");
        assert!(err.to_string().contains("40100"));
    }

    #[test]
    fn rejects_failed_task() {
        let payload = json!({
            "status_code": 20000,
            "tasks": [{
                "status_code": 40501,
                "status_message": "Invalid Field: 'keyword'.",
                "result": null
            }]
        });

        let err = extract_task_result(&payload).expect_err("failed task");
        assert!(err.to_string().contains("Invalid Field"));
    }

    #[test]
    fn rejects_missing_tasks() {
        let payload = json!({"status_code": 20000});

        assert!(extract_task_result(&payload).is_err());
    }

    #[test]
    fn rejection_prefers_api_status_message() {
        let err = rejected(
            "/v3/serp/google/organic/live/advanced",
            StatusCode::UNAUTHORIZED,
            r#"{"status_code":40100,"status_message":"You are not authorized to access this resource."}"#,
        );

        assert_eq!(
            err.message,
            "/v3/serp/google/organic/live/advanced returned HTTP 401: You are not authorized to access this resource."
        );
    }

    #[test]
    fn rejection_keeps_status_for_non_json_body() {
        let page = format!("<html><body>Bad Gateway{}</body></html>", " ".repeat(500));
        let err = rejected("/v3/backlinks/summary/live", StatusCode::BAD_GATEWAY, &page);

        assert!(err.message.starts_with("/v3/backlinks/summary/live returned HTTP 502: <html>"));
        assert!(err.message.contains("Bad Gateway"));
        assert!(err.message.len() < page.len());
    }

    #[test]
    fn rejection_with_empty_body_still_reports_status() {
        let err = rejected("/v3/backlinks/summary/live", StatusCode::SERVICE_UNAVAILABLE, "");

        assert_eq!(
            err.message,
            "/v3/backlinks/summary/live returned HTTP 503: request rejected"
        );
    }
}
