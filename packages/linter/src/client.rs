//! Client for the remote prose lint service.
//!
//! `POST {url}` with `{ "text": ... }`, answered by
//! `{ "errors": [...], "processingTime": ms }`. Any non-2xx status is an
//! error; callers treat every error as "no remote issues this round".

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::diagnostic::{Fix, Issue, IssueSource, Severity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintRequest {
    pub text: String,
}

/// One issue as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIssue {
    pub rule_id: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl From<RemoteIssue> for Issue {
    fn from(remote: RemoteIssue) -> Self {
        let mut issue = Issue::new(
            IssueSource::Remote,
            remote.severity,
            remote.rule_id,
            remote.message,
            remote.line,
            remote.column,
        );
        issue.fix = remote.fix;
        issue
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResponse {
    #[serde(default)]
    pub errors: Vec<RemoteIssue>,
    /// Milliseconds spent by the service, rounded when sent fractional
    #[serde(default, deserialize_with = "deserialize_millis")]
    pub processing_time: u64,
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis = f64::deserialize(deserializer)?;
    if !millis.is_finite() || millis <= 0.0 {
        return Ok(0);
    }
    Ok(millis.round() as u64)
}

/// Errors from the lint service layer
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// The HTTP request itself failed (connection refused, timeout, bad body)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code
    #[error("Lint service error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Lint service did not answer within {0:?}")]
    Timeout(Duration),
}

/// Anything that can lint raw Markdown text
#[async_trait]
pub trait LintService: Send + Sync {
    async fn lint(&self, text: &str) -> Result<LintResponse, LintError>;
}

/// HTTP client for a lint service instance
#[derive(Debug, Clone)]
pub struct HttpLintClient {
    client: reqwest::Client,
    url: String,
}

impl HttpLintClient {
    /// * `url` - full endpoint, e.g. `http://127.0.0.1:3030/api/lint`
    /// * `timeout` - per-request limit covering connect and body
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LintError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, url))
    }

    /// Reuse an existing [`reqwest::Client`]
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LintService for HttpLintClient {
    async fn lint(&self, text: &str) -> Result<LintResponse, LintError> {
        let request = LintRequest {
            text: text.to_string(),
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LintError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<LintResponse>().await?)
    }
}
