use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, ETAG, IF_NONE_MATCH, USER_AGENT,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::auth::Token;
use crate::error::{CIDoctorError, Result};

use super::types::{
    GitHubComparison, GitHubJob, GitHubRun, GitHubWorkflow, WorkflowJobsResponse,
    WorkflowRunsResponse,
};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const JOBS_PAGE_SIZE: usize = 100;
const RUNS_PAGE_SIZE: usize = 100;

/// Body remembered for a URL together with the `ETag` it was served with.
struct CachedResponse {
    etag: String,
    body: Vec<u8>,
}

/// Read-only GitHub REST client.
///
/// Only issues GET requests. With the conditional cache enabled, responses
/// carrying an `ETag` are remembered and revalidated with `If-None-Match`.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    cache: Option<Mutex<HashMap<String, CachedResponse>>>,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `api_base` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `token` - GitHub token with `actions:read` and `contents:read`
    /// * `timeout` - Per-request timeout
    /// * `use_cache` - Enable the conditional HTTP cache
    pub fn new(api_base: &str, token: &Token, timeout: Duration, use_cache: bool) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|e| CIDoctorError::Config(format!("Invalid GitHub token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ci-doctor/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CIDoctorError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            cache: use_cache.then(|| Mutex::new(HashMap::new())),
        })
    }

    async fn get_bytes(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>> {
        let mut request = self
            .client
            .get(format!("{}{path}", self.api_base))
            .query(query)
            .build()?;
        let url = request.url().to_string();

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.lock().await.get(&url) {
                if let Ok(value) = HeaderValue::from_str(&cached.etag) {
                    request.headers_mut().insert(IF_NONE_MATCH, value);
                }
            }
        }

        debug!("GET {url}");
        let response = self.client.execute(request).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(CIDoctorError::Unauthorized);
        }

        if status == StatusCode::NOT_MODIFIED {
            if let Some(cache) = &self.cache {
                if let Some(cached) = cache.lock().await.get(&url) {
                    debug!("Not modified, serving cached body for {url}");
                    return Ok(cached.body.clone());
                }
            }
            return Err(CIDoctorError::MalformedResponse(format!(
                "304 Not Modified without cached body for {url}"
            )));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(CIDoctorError::Api {
                url,
                status: status.as_u16(),
                message,
            });
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        if let (Some(cache), Some(etag)) = (&self.cache, etag) {
            cache.lock().await.insert(
                url,
                CachedResponse {
                    etag,
                    body: body.clone(),
                },
            );
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let body = self.get_bytes(path, query).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn get_run(&self, owner: &str, repo: &str, run_id: u64) -> Result<GitHubRun> {
        self.get_json(&format!("/repos/{owner}/{repo}/actions/runs/{run_id}"), &[])
            .await
    }

    /// Fetch every job of a run, following pagination.
    pub async fn list_jobs(&self, owner: &str, repo: &str, run_id: u64) -> Result<Vec<GitHubJob>> {
        let path = format!("/repos/{owner}/{repo}/actions/runs/{run_id}/jobs");
        let mut jobs = Vec::new();
        let mut page = 1;

        loop {
            let response: WorkflowJobsResponse = self
                .get_json(
                    &path,
                    &[
                        ("per_page", JOBS_PAGE_SIZE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            let page_len = response.jobs.len();
            jobs.extend(response.jobs);

            if page_len < JOBS_PAGE_SIZE || jobs.len() >= response.total_count {
                break;
            }
            page += 1;
        }

        Ok(jobs)
    }

    pub async fn get_workflow(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: u64,
    ) -> Result<GitHubWorkflow> {
        self.get_json(
            &format!("/repos/{owner}/{repo}/actions/workflows/{workflow_id}"),
            &[],
        )
        .await
    }

    /// Fetch up to `limit` successful runs of a workflow on `branch`, newest first.
    pub async fn list_successful_runs(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: u64,
        branch: &str,
        limit: usize,
    ) -> Result<Vec<GitHubRun>> {
        let path = format!("/repos/{owner}/{repo}/actions/workflows/{workflow_id}/runs");
        let per_page = RUNS_PAGE_SIZE.min(limit);
        let mut runs = Vec::new();
        let mut page = 1;

        while runs.len() < limit {
            let response: WorkflowRunsResponse = self
                .get_json(
                    &path,
                    &[
                        ("branch", branch.to_string()),
                        ("status", "success".to_string()),
                        ("per_page", per_page.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            let page_len = response.workflow_runs.len();
            runs.extend(response.workflow_runs);

            if page_len < per_page || runs.len() >= response.total_count {
                break;
            }
            page += 1;
        }

        runs.truncate(limit);
        Ok(runs)
    }

    pub async fn compare(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<GitHubComparison> {
        self.get_json(&format!("/repos/{owner}/{repo}/compare/{base}...{head}"), &[])
            .await
    }

    /// Download the run's log archive. GitHub answers with a redirect to
    /// short-lived blob storage, which the client follows.
    pub async fn download_logs(&self, owner: &str, repo: &str, run_id: u64) -> Result<Vec<u8>> {
        self.get_bytes(&format!("/repos/{owner}/{repo}/actions/runs/{run_id}/logs"), &[])
            .await
    }
}
