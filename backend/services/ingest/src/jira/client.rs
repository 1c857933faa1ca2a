use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use super::models::RemotePage;
use super::source::RemoteSource;

/// How requests authenticate against Jira.
#[derive(Clone)]
pub enum JiraCredential {
    /// Jira Cloud: account email plus API token.
    Basic { email: String, api_token: String },
    /// Jira Data Center personal access token.
    Bearer(String),
}

impl std::fmt::Debug for JiraCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { email, .. } => f
                .debug_struct("Basic")
                .field("email", email)
                .field("api_token", &"***")
                .finish(),
            Self::Bearer(_) => f.write_str("Bearer(***)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    pub base_url: String,
    pub credential: JiraCredential,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl JiraClientConfig {
    /// Load Jira config from environment.
    ///
    /// Returns `Ok(None)` if `JIRA_BASE_URL` is unset. Returns `Err` if the base URL is set
    /// but no usable credential is (fail-fast on misconfiguration).
    pub fn from_env() -> Result<Option<Self>, String> {
        let base_url = match std::env::var("JIRA_BASE_URL").ok() {
            Some(v) if !v.trim().is_empty() => v.trim().trim_end_matches('/').to_string(),
            _ => return Ok(None),
        };

        let credential = credential_from_env()?;

        let max_retries = std::env::var("JIRA_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let timeout_secs = std::env::var("JIRA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Ok(Some(Self {
            base_url,
            credential,
            max_retries,
            timeout_secs,
        }))
    }
}

fn credential_from_env() -> Result<JiraCredential, String> {
    let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty("JIRA_BEARER_TOKEN") {
        return Ok(JiraCredential::Bearer(token));
    }

    match (non_empty("JIRA_EMAIL"), non_empty("JIRA_API_TOKEN")) {
        (Some(email), Some(api_token)) => Ok(JiraCredential::Basic { email, api_token }),
        (Some(_), None) => Err("JIRA_EMAIL is set but JIRA_API_TOKEN is missing".to_string()),
        (None, Some(_)) => Err("JIRA_API_TOKEN is set but JIRA_EMAIL is missing".to_string()),
        (None, None) => Err(
            "JIRA_BASE_URL is set but neither JIRA_BEARER_TOKEN nor JIRA_EMAIL/JIRA_API_TOKEN are"
                .to_string(),
        ),
    }
}

#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    config: JiraClientConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum JiraClientError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl JiraClient {
    pub fn new(config: JiraClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// For testing: create a client pointing at a specific base URL (e.g., wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    pub async fn fetch_boards_page(
        &self,
        start_at: usize,
        max_results: usize,
    ) -> Result<RemotePage, JiraClientError> {
        let url = format!(
            "{}/rest/agile/1.0/board?startAt={}&maxResults={}",
            self.config.base_url, start_at, max_results
        );
        self.fetch_page(&url).await
    }

    /// Sprints of one board. Jira pages this listing too; only the first page is requested.
    pub async fn fetch_sprints(&self, board_id: i64) -> Result<RemotePage, JiraClientError> {
        let url = format!(
            "{}/rest/agile/1.0/board/{}/sprint",
            self.config.base_url, board_id
        );
        self.fetch_page(&url).await
    }

    pub async fn fetch_issues_page(
        &self,
        board_id: i64,
        start_at: usize,
        max_results: usize,
    ) -> Result<RemotePage, JiraClientError> {
        let url = format!(
            "{}/rest/agile/1.0/board/{}/issue?startAt={}&maxResults={}",
            self.config.base_url, board_id, start_at, max_results
        );
        self.fetch_page(&url).await
    }

    pub async fn fetch_board_configuration(
        &self,
        board_id: i64,
    ) -> Result<Value, JiraClientError> {
        let url = format!(
            "{}/rest/agile/1.0/board/{}/configuration",
            self.config.base_url, board_id
        );
        self.request_with_retry(&url).await
    }

    pub async fn fetch_teams(&self) -> Result<RemotePage, JiraClientError> {
        let url = format!("{}/rest/teams/1.0/teams/find", self.config.base_url);
        self.fetch_page(&url).await
    }

    async fn fetch_page(&self, url: &str) -> Result<RemotePage, JiraClientError> {
        let body: Value = self.request_with_retry(url).await?;
        Ok(RemotePage::from_json(body)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.credential {
            JiraCredential::Basic { email, api_token } => request.basic_auth(email, Some(api_token)),
            JiraCredential::Bearer(token) => request.bearer_auth(token),
        }
    }

    async fn request_with_retry<T>(&self, url: &str) -> Result<T, JiraClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff_secs = std::cmp::min(1u64 << attempt, 30);
                tracing::warn!(attempt, backoff_secs, url, "retrying after backoff");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }

            let request = self
                .authorize(self.client.get(url))
                .header("Accept", "application/json");

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() || e.is_connect() {
                        continue;
                    }
                    return Err(JiraClientError::RequestError(e));
                }
            };

            let status = response.status();

            if status.is_success() {
                return response.json::<T>().await.map_err(JiraClientError::RequestError);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if let Some(retry_after) = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    let wait = std::cmp::min(retry_after, 60);
                    tracing::warn!(wait, "rate-limited, waiting Retry-After");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                last_error = "429 Too Many Requests".to_string();
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = format!("{status}: {body}");
                continue;
            }

            // 4xx other than 429 will not improve on retry
            let body = response.text().await.unwrap_or_default();
            return Err(JiraClientError::HttpError { status, body });
        }

        Err(JiraClientError::MaxRetriesExceeded {
            attempts: self.config.max_retries + 1,
            last_error,
        })
    }
}

#[async_trait]
impl RemoteSource for JiraClient {
    async fn list_boards(&self, start_at: usize, max_results: usize) -> Option<RemotePage> {
        self.fetch_boards_page(start_at, max_results)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, start_at, "failed to fetch jira boards page"))
            .ok()
    }

    async fn list_sprints(&self, board_id: i64) -> Option<RemotePage> {
        self.fetch_sprints(board_id)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, board_id, "failed to fetch jira sprints"))
            .ok()
    }

    async fn list_issues(
        &self,
        board_id: i64,
        start_at: usize,
        max_results: usize,
    ) -> Option<RemotePage> {
        self.fetch_issues_page(board_id, start_at, max_results)
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, board_id, start_at, "failed to fetch jira issues page")
            })
            .ok()
    }

    async fn board_configuration(&self, board_id: i64) -> Option<Value> {
        self.fetch_board_configuration(board_id)
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, board_id, "failed to fetch jira board configuration")
            })
            .ok()
    }

    async fn list_teams(&self) -> Option<RemotePage> {
        self.fetch_teams()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "failed to fetch jira teams"))
            .ok()
    }
}
