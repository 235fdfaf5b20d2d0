//! Cloud Logging v2 REST client

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::source::LogSource;
use crate::token_cache::TokenCache;
use gcloud_logs_types::{LogPage, LogRecord};

/// Public Cloud Logging endpoint
const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com";

/// Largest page size `entries:list` accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Non-success response from the logging backend
#[derive(Debug, Error)]
#[error("Cloud Logging returned {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    /// Build from a response body, preferring the Google error envelope's message
    fn from_body(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.trim().to_string());

        Self {
            status: status.as_u16(),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Body of `POST /v2/entries:list`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesRequest<'a> {
    resource_names: Vec<String>,
    filter: &'a str,
    order_by: &'static str,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesResponse {
    #[serde(default)]
    entries: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl From<ListEntriesResponse> for LogPage {
    fn from(response: ListEntriesResponse) -> Self {
        LogPage::new(
            response.entries.into_iter().map(LogRecord::from).collect(),
            // The API sends an empty token on the last page
            response.next_page_token.filter(|t| !t.is_empty()),
        )
    }
}

/// Cloud Logging client wrapper
#[derive(Debug)]
pub struct LoggingClient {
    http: reqwest::Client,
    endpoint: String,
    project: String,
    tokens: TokenCache,
}

impl LoggingClient {
    /// Create a client for `project`, or for gcloud's default project
    pub async fn new(project: Option<String>) -> Result<Self> {
        let project = match project {
            Some(project) => project,
            None => default_project().await?,
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!("gcloud-logs/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project,
            tokens: TokenCache::new(),
        })
    }

    /// Point the client at a different API root (emulators, proxies)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the project being queried
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Fetch one page, re-authenticating once if the cached token was rejected
    async fn fetch_page(&self, request: &ListEntriesRequest<'_>) -> Result<ListEntriesResponse> {
        let token = self.tokens.get_or_fetch(access_token).await?;
        let mut response = self.post(request, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("access token rejected, fetching a fresh one");
            self.tokens.clear().await;
            let token = self.tokens.get_or_fetch(access_token).await?;
            response = self.post(request, &token).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_body(status, &body).into());
        }

        response
            .json()
            .await
            .context("Failed to decode entries:list response")
    }

    async fn post(
        &self,
        request: &ListEntriesRequest<'_>,
        token: &str,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/v2/entries:list", self.endpoint);
        self.http
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))
    }

    fn request<'a>(
        &self,
        filter: &'a str,
        page_size: u32,
        page_token: Option<&'a str>,
    ) -> ListEntriesRequest<'a> {
        ListEntriesRequest {
            resource_names: vec![format!("projects/{}", self.project)],
            filter,
            order_by: "timestamp asc",
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            page_token,
        }
    }
}

#[async_trait]
impl LogSource for LoggingClient {
    async fn list_page(
        &self,
        filter: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<LogPage> {
        let request = self.request(filter, page_size, page_token);
        let page = LogPage::from(self.fetch_page(&request).await?);
        tracing::trace!(
            entries = page.records.len(),
            more = page.next_page_token.is_some(),
            "fetched page"
        );
        Ok(page)
    }
}

/// Run a gcloud command and return its trimmed stdout
async fn gcloud(args: &[&str]) -> Result<String> {
    let output = tokio::process::Command::new("gcloud")
        .args(args)
        .output()
        .await
        .context("Failed to run gcloud. Is the Google Cloud SDK installed?")?;

    if !output.status.success() {
        bail!(
            "`gcloud {}` failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout = String::from_utf8(output.stdout).context("gcloud printed invalid UTF-8")?;
    Ok(stdout.trim().to_string())
}

/// Fetch a fresh OAuth access token for the active gcloud account
async fn access_token() -> Result<String> {
    let token = gcloud(&["auth", "print-access-token"]).await?;
    if token.is_empty() {
        bail!("gcloud returned an empty access token. Run `gcloud auth login` first.");
    }
    Ok(token)
}

/// Read the default project from the gcloud configuration
async fn default_project() -> Result<String> {
    let project = gcloud(&["config", "get-value", "project"]).await?;
    parse_project(&project)
}

fn parse_project(value: &str) -> Result<String> {
    match value.trim() {
        "" | "(unset)" => bail!(
            "No default project set. Run `gcloud config set project <PROJECT_ID>` or pass --project."
        ),
        project => Ok(project.to_string()),
    }
}
